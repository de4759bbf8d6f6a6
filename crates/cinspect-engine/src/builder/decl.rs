//! Declarations: functions, variables, records, enums and typedefs, plus the
//! C++ namespace, linkage and template wrappers.
//!
//! Types are spelled the way declarations print them: the specifiers first,
//! then the declarator with its name removed (`int *`, `char[4]`,
//! `int (*)(int)`).

use super::eval::parse_integer;
use super::{extent, squash, text, Builder, Context, FileCtx, FunctionScope};
use crate::ast::{Entity, FunctionInfo, NodeId, RecordInfo, StorageClass, VarInfo};
use crate::checks::{self, Initializer};
use tree_sitter::Node as TsNode;

/// Node kinds that name the declared entity.
const NAME_KINDS: &[&str] = &[
    "identifier",
    "field_identifier",
    "type_identifier",
    "qualified_identifier",
    "destructor_name",
    "operator_name",
];

const RECORD_KINDS: &[&str] = &[
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
    "class_specifier",
];

/// Declaration specifiers shared by every declarator of one declaration.
struct Specifiers<'t> {
    /// Qualifiers and type, e.g. `const char`
    base: String,
    type_node: Option<TsNode<'t>>,
    storage: StorageClass,
}

/// What one declarator adds on top of the specifiers.
struct Declarator<'t> {
    node: TsNode<'t>,
    name: Option<TsNode<'t>>,
    /// Declarator spelled without its name, e.g. `*`, `[10]`
    suffix: String,
    /// `function_declarator` applied directly to the name
    function: Option<TsNode<'t>>,
    init: Option<TsNode<'t>>,
}

#[derive(Default)]
pub(super) struct Parameters {
    types: Vec<String>,
    variadic: bool,
}

impl Parameters {
    fn spelling(&self) -> String {
        let mut out = self.types.join(", ");
        if self.variadic {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str("...");
        }
        out
    }
}

impl Builder<'_> {
    // ── Type spelling ─────────────────────────────────────────────────────

    fn specifiers<'t>(&self, node: TsNode<'t>, src: &str) -> Specifiers<'t> {
        let mut qualifiers = Vec::new();
        let mut storage = StorageClass::None;
        for child in node.children(&mut node.walk()) {
            match child.kind() {
                "type_qualifier" => qualifiers.push(text(child, src)),
                "storage_class_specifier" => {
                    storage = match text(child, src) {
                        "static" => StorageClass::Static,
                        "extern" => StorageClass::Extern,
                        "register" => StorageClass::Register,
                        "auto" => StorageClass::Auto,
                        _ => storage,
                    }
                }
                _ => {}
            }
        }

        let type_node = node.child_by_field_name("type");
        let mut base = match type_node {
            Some(t) => self.type_name(t, src),
            // Constructors, destructors and implicit int.
            None if self.language.is_cxx() => "void".to_string(),
            None => "int".to_string(),
        };
        if !qualifiers.is_empty() {
            base = format!("{} {}", qualifiers.join(" "), base);
        }
        Specifiers {
            base,
            type_node,
            storage,
        }
    }

    fn type_name(&self, type_node: TsNode<'_>, src: &str) -> String {
        let keyword = match type_node.kind() {
            "struct_specifier" => "struct",
            "union_specifier" => "union",
            "enum_specifier" => "enum",
            "class_specifier" => "class",
            _ => return squash(text(type_node, src)),
        };
        let name = type_node
            .child_by_field_name("name")
            .map(|n| squash(text(n, src)));
        match name {
            Some(name) if self.language.is_cxx() => name,
            Some(name) => format!("{keyword} {name}"),
            None => format!("{keyword} (anonymous)"),
        }
    }

    fn analyze<'t>(&self, node: TsNode<'t>, src: &str) -> Declarator<'t> {
        let (decl, init) = if node.kind() == "init_declarator" {
            (
                node.child_by_field_name("declarator").unwrap_or(node),
                node.child_by_field_name("value"),
            )
        } else {
            (node, node.child_by_field_name("default_value"))
        };
        let function = function_core(decl);
        Declarator {
            node,
            name: declared_name(decl),
            suffix: self.render(decl, function, src),
            function,
            init,
        }
    }

    /// Spell a declarator without its name. `core` renders as nothing, which
    /// is how a function's own declarator drops out of its return type.
    fn render(&self, node: TsNode<'_>, core: Option<TsNode<'_>>, src: &str) -> String {
        if core.is_some_and(|c| c == node) {
            return String::new();
        }
        let inner = inner_declarator(node)
            .map(|n| self.render(n, core, src))
            .unwrap_or_default();

        match node.kind() {
            "pointer_declarator" | "abstract_pointer_declarator" => {
                let qualifiers: Vec<&str> = node
                    .children(&mut node.walk())
                    .filter(|c| c.kind() == "type_qualifier")
                    .map(|c| text(c, src))
                    .collect();
                let mut out = format!("*{}", qualifiers.join(" "));
                if !qualifiers.is_empty() && !inner.is_empty() {
                    out.push(' ');
                }
                out + &inner
            }
            "reference_declarator" | "abstract_reference_declarator" => {
                let amp = if text(node, src).starts_with("&&") { "&&" } else { "&" };
                format!("{amp}{inner}")
            }
            "array_declarator" | "abstract_array_declarator" => {
                let size = node
                    .child_by_field_name("size")
                    .map(|s| squash(text(s, src)))
                    .unwrap_or_default();
                format!("{inner}[{size}]")
            }
            "function_declarator" | "abstract_function_declarator" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.parameters(p, src).spelling())
                    .unwrap_or_default();
                format!("{inner}({params})")
            }
            "parenthesized_declarator" | "abstract_parenthesized_declarator" if !inner.is_empty() => {
                format!("({inner})")
            }
            _ => inner,
        }
    }

    pub(super) fn parameters(&self, list: TsNode<'_>, src: &str) -> Parameters {
        let mut params = Parameters::default();
        for child in list.children(&mut list.walk()) {
            match child.kind() {
                "parameter_declaration" | "optional_parameter_declaration" => {
                    let spec = self.specifiers(child, src);
                    let ty = match child.child_by_field_name("declarator") {
                        Some(d) => combine(&spec.base, &self.render(d, None, src)),
                        None => spec.base,
                    };
                    params.types.push(ty);
                }
                "..." | "variadic_parameter" | "variadic_parameter_declaration" => {
                    params.variadic = true
                }
                _ => {}
            }
        }
        // `(void)` declares no parameters.
        if params.types.len() == 1 && params.types[0] == "void" {
            params.types.clear();
        }
        params
    }

    /// Spelling of a `type_descriptor`, as in casts and `sizeof`.
    pub(super) fn type_descriptor(&self, node: TsNode<'_>, src: &str) -> String {
        let spec = self.specifiers(node, src);
        match node.child_by_field_name("declarator") {
            Some(d) => combine(&spec.base, &self.render(d, None, src)),
            None => spec.base,
        }
    }

    // ── Declarations ──────────────────────────────────────────────────────

    pub(super) fn decl_container(
        &mut self,
        ctx: &FileCtx<'_>,
        node: TsNode<'_>,
        parent: NodeId,
        context: Context,
    ) -> NodeId {
        if context == Context::Block {
            self.add(ctx, Entity::DeclStmt, node, parent)
        } else {
            parent
        }
    }

    pub(super) fn lower_declaration(
        &mut self,
        ctx: &FileCtx<'_>,
        node: TsNode<'_>,
        parent: NodeId,
        context: Context,
    ) {
        let spec = self.specifiers(node, ctx.src);
        let container = self.decl_container(ctx, node, parent, context);
        let record = self.lower_embedded_record(ctx, &spec, container);

        let declarators: Vec<TsNode> = node
            .children_by_field_name("declarator", &mut node.walk())
            .collect();
        for d in declarators {
            let declarator = self.analyze(d, ctx.src);
            if declarator.function.is_some() {
                self.lower_function(ctx, node, &spec, &declarator, None, container, context);
            } else {
                self.lower_variable(ctx, node, &spec, &declarator, record, container, context);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_variable(
        &mut self,
        ctx: &FileCtx<'_>,
        decl: TsNode<'_>,
        spec: &Specifiers<'_>,
        d: &Declarator<'_>,
        record: Option<NodeId>,
        parent: NodeId,
        context: Context,
    ) {
        let Some(name_node) = d.name else {
            return;
        };
        let name = text(name_node, ctx.src).to_string();
        let ty = combine(&spec.base, &d.suffix);
        let in_function = context == Context::Block && self.function.is_some();
        let is_local = in_function && spec.storage != StorageClass::Extern;
        let info = VarInfo {
            name: name.clone(),
            ty: ty.clone(),
            storage: spec.storage,
            has_init: d.init.is_some(),
            is_local,
        };

        let span = (decl.start_byte() as u32, extent(d.node, ctx.src).1);
        let location = name_node.start_byte() as u32;
        let id = self.add_span(ctx, Entity::VarDecl(info), span, location, parent);
        let usr = match (&self.function, spec.storage) {
            (Some(function), _) if is_local => format!(
                "c:{}@{}@F@{}@{}",
                ctx.usr_name, location, function.name, name
            ),
            (_, StorageClass::Static) => format!("c:{}@{}", ctx.usr_name, name),
            _ => format!("c:{}@{}", self.usr_prefix(), name),
        };
        self.nodes[id as usize].usr = Some(usr);
        self.nodes[id as usize].brief_comment = self.brief_comment(decl, ctx.src);
        self.declare(&name, id);
        self.add_type_ref(ctx, spec.type_node, record, id);

        if let Some(init) = d.init {
            let location = self.location(ctx.id, init.start_byte() as u32);
            let initializer = classify_initializer(init, ctx.src);
            if let Some(diagnostic) =
                checks::initializer_conversion(self.language, &ty, initializer, location)
            {
                self.pending.push(diagnostic);
            }
            self.lower_expr(ctx, init, id);
        }

        if is_local && spec.storage != StorageClass::Static {
            if let Some(function) = self.function.as_mut() {
                function.locals.push(id);
            }
        }
    }

    fn lower_embedded_record(
        &mut self,
        ctx: &FileCtx<'_>,
        spec: &Specifiers<'_>,
        parent: NodeId,
    ) -> Option<NodeId> {
        let type_node = spec.type_node?;
        let embedded = RECORD_KINDS.contains(&type_node.kind())
            && type_node.child_by_field_name("body").is_some();
        if embedded {
            self.lower_record(ctx, type_node, parent)
        } else {
            None
        }
    }

    /// Reference from a declaration to the named type it uses.
    pub(super) fn add_type_ref(
        &mut self,
        ctx: &FileCtx<'_>,
        type_node: Option<TsNode<'_>>,
        record: Option<NodeId>,
        parent: NodeId,
    ) {
        let Some(type_node) = type_node else {
            return;
        };
        let (name, target, anchor) = match type_node.kind() {
            "type_identifier" => {
                let name = text(type_node, ctx.src);
                let target = self.lookup(name).or_else(|| self.lookup_tag(name));
                (name.to_string(), target, type_node)
            }
            "qualified_identifier" | "template_type" => {
                let name = last_segment(type_node, ctx.src);
                let target = self.lookup(&name);
                (squash(text(type_node, ctx.src)), target, type_node)
            }
            kind if RECORD_KINDS.contains(&kind) => {
                let Some(name_node) = type_node.child_by_field_name("name") else {
                    return;
                };
                let target = record.or_else(|| self.lookup_tag(text(name_node, ctx.src)));
                (self.type_name(type_node, ctx.src), target, name_node)
            }
            _ => return,
        };
        let id = self.add(ctx, Entity::TypeRef { name }, anchor, parent);
        self.link(id, target);
    }

    // ── Functions ─────────────────────────────────────────────────────────

    pub(super) fn lower_function_definition(
        &mut self,
        ctx: &FileCtx<'_>,
        node: TsNode<'_>,
        parent: NodeId,
        context: Context,
    ) {
        let spec = self.specifiers(node, ctx.src);
        let Some(declarator_node) = node.child_by_field_name("declarator") else {
            return;
        };
        let declarator = self.analyze(declarator_node, ctx.src);
        if declarator.function.is_none() {
            return;
        }
        let body = node.child_by_field_name("body");
        self.lower_function(ctx, node, &spec, &declarator, body, parent, context);
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_function(
        &mut self,
        ctx: &FileCtx<'_>,
        node: TsNode<'_>,
        spec: &Specifiers<'_>,
        d: &Declarator<'_>,
        body: Option<TsNode<'_>>,
        parent: NodeId,
        context: Context,
    ) {
        let (Some(name_node), Some(core)) = (d.name, d.function) else {
            return;
        };
        let src = ctx.src;
        let qualified = name_node.kind() == "qualified_identifier";
        let name = if qualified {
            last_segment(name_node, src)
        } else {
            text(name_node, src).to_string()
        };
        let params_node = core.child_by_field_name("parameters");
        let params = params_node
            .map(|p| self.parameters(p, src))
            .unwrap_or_default();
        let return_type = combine(&spec.base, &d.suffix);
        let info = FunctionInfo {
            name: name.clone(),
            return_type: return_type.clone(),
            params: params.types,
            variadic: params.variadic,
            storage: spec.storage,
            is_definition: body.is_some(),
        };

        let is_method = context == Context::Fields || qualified;
        let entity = if is_method {
            Entity::CxxMethod(info)
        } else {
            Entity::FunctionDecl(info)
        };
        let end = match body {
            Some(_) => extent(node, src).1,
            None => extent(d.node, src).1,
        };
        let location = name_node.start_byte() as u32;
        let id = self.add_span(ctx, entity, (node.start_byte() as u32, end), location, parent);

        let owner = qualified
            .then(|| name_node.child_by_field_name("scope"))
            .flatten()
            .map(|scope| text(scope, src).to_string());
        let usr = match &owner {
            Some(owner) => format!("c:{}@S@{}@F@{}", self.usr_prefix(), owner, name),
            None if spec.storage == StorageClass::Static && !is_method => {
                format!("c:{}@F@{}", ctx.usr_name, name)
            }
            None => format!("c:{}@F@{}", self.usr_prefix(), name),
        };
        let semantic_parent = owner.as_deref().and_then(|o| self.lookup(o));
        let brief = self.brief_comment(node, src);
        let slot = &mut self.nodes[id as usize];
        slot.usr = Some(usr);
        slot.semantic_parent = semantic_parent;
        slot.brief_comment = brief;
        if !qualified {
            self.declare(&name, id);
        }

        let file_scope_main = name == "main"
            && !is_method
            && context == Context::File
            && self.usr_scope.is_empty();
        if let (true, Some(type_node)) = (file_scope_main, spec.type_node) {
            let location = self.location(ctx.id, type_node.start_byte() as u32);
            if let Some(diagnostic) = checks::main_return_type(
                self.language,
                &return_type,
                location,
                type_node.end_byte() as u32,
            ) {
                self.pending.push(diagnostic);
            }
        }
        self.add_type_ref(ctx, spec.type_node, None, id);

        self.push_scope();
        if let Some(list) = params_node {
            self.lower_parameters(ctx, list, id, &name);
        }
        if let Some(body) = body.filter(|_| !self.flags.skip_function_bodies) {
            let outer = self.function.replace(FunctionScope {
                name,
                returns_void: return_type == "void",
                locals: Vec::new(),
            });
            self.lower_statement(ctx, body, id);
            if let Some(finished) = std::mem::replace(&mut self.function, outer) {
                self.report_unused(finished);
            }
        }
        self.pop_scope();
    }

    fn lower_parameters(&mut self, ctx: &FileCtx<'_>, list: TsNode<'_>, function: NodeId, function_name: &str) {
        let src = ctx.src;
        let params: Vec<TsNode> = list
            .named_children(&mut list.walk())
            .filter(|c| matches!(c.kind(), "parameter_declaration" | "optional_parameter_declaration"))
            .collect();

        for param in params {
            let spec = self.specifiers(param, src);
            let declarator = param
                .child_by_field_name("declarator")
                .map(|d| self.analyze(d, src));
            let name_node = declarator.as_ref().and_then(|d| d.name);
            let name = name_node.map(|n| text(n, src).to_string()).unwrap_or_default();
            let suffix = declarator.as_ref().map(|d| d.suffix.as_str()).unwrap_or_default();
            let ty = combine(&spec.base, suffix);
            if ty == "void" && name.is_empty() {
                continue;
            }

            let location = name_node.map_or(param.start_byte(), |n| n.start_byte()) as u32;
            let info = VarInfo {
                name: name.clone(),
                ty,
                storage: spec.storage,
                has_init: param.child_by_field_name("default_value").is_some(),
                is_local: false,
            };
            let id = self.add_at(ctx, Entity::ParmDecl(info), param, location, function);
            if !name.is_empty() {
                self.nodes[id as usize].usr = Some(format!(
                    "c:{}@{}@F@{}@{}",
                    ctx.usr_name, location, function_name, name
                ));
                self.declare(&name, id);
            }
            self.add_type_ref(ctx, spec.type_node, None, id);
        }
    }

    /// Queue `unused variable` warnings for locals nothing referenced.
    fn report_unused(&mut self, function: FunctionScope) {
        if !self.args.warnings.unused_variable {
            return;
        }
        for local in function.locals {
            let node = &self.nodes[local as usize];
            let Entity::VarDecl(info) = &node.entity else {
                continue;
            };
            if node.references > 0 || info.name.is_empty() {
                continue;
            }
            let name = info.name.clone();
            let location = self.location(node.file, node.location);
            self.deferred.push(checks::unused_variable(&name, location));
        }
    }

    // ── Records, enums and typedefs ───────────────────────────────────────

    pub(super) fn lower_record(
        &mut self,
        ctx: &FileCtx<'_>,
        node: TsNode<'_>,
        parent: NodeId,
    ) -> Option<NodeId> {
        let src = ctx.src;
        let name_node = node.child_by_field_name("name");
        let name = name_node.map(|n| squash(text(n, src)));
        let body = node.child_by_field_name("body");
        let info = RecordInfo {
            name: name.clone(),
            is_definition: body.is_some(),
        };
        let (entity, tag) = match node.kind() {
            "struct_specifier" => (Entity::StructDecl(info), "S"),
            "union_specifier" => (Entity::UnionDecl(info), "U"),
            "enum_specifier" => (Entity::EnumDecl(info), "E"),
            "class_specifier" => (Entity::ClassDecl(info), "S"),
            _ => return None,
        };

        let location = name_node.map_or(node.start_byte(), |n| n.start_byte()) as u32;
        let id = self.add_at(ctx, entity, node, location, parent);
        let component = match &name {
            Some(name) => format!("@{tag}@{name}"),
            None => format!("@{tag}a@{}@{}", ctx.usr_name, location),
        };
        let anchor = node
            .parent()
            .filter(|p| matches!(p.kind(), "declaration" | "type_definition" | "field_declaration"))
            .unwrap_or(node);
        let brief = self.brief_comment(anchor, src);
        let slot = &mut self.nodes[id as usize];
        slot.usr = Some(format!("c:{}{}", self.usr_scope.concat(), component));
        slot.brief_comment = brief;

        if let Some(name) = &name {
            // A definition takes over lookups from earlier forward declarations.
            if body.is_some() || self.lookup_tag(name).is_none() {
                self.declare_tag(name, id);
            }
        }

        if let Some(body) = body {
            self.usr_scope.push(component);
            if tag == "E" {
                let outer = std::mem::replace(&mut self.next_enum_value, 0);
                self.lower_items(ctx, body, id, Context::Enumerators);
                self.next_enum_value = outer;
            } else {
                self.push_scope();
                self.lower_items(ctx, body, id, Context::Fields);
                self.pop_scope();
            }
            self.usr_scope.pop();
        }
        Some(id)
    }

    pub(super) fn lower_enumerator(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        if node.kind() != "enumerator" {
            return;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, ctx.src).to_string();
        let value_node = node.child_by_field_name("value");
        let value = match value_node {
            Some(v) => self.eval_constant(v, ctx.src),
            None => self.next_enum_value,
        };
        self.next_enum_value = value.wrapping_add(1);
        self.enum_values.insert(name.clone(), value);

        let entity = Entity::EnumConstantDecl {
            name: name.clone(),
            value,
        };
        let id = self.add_at(ctx, entity, node, name_node.start_byte() as u32, parent);
        let brief = self.brief_comment(node, ctx.src);
        let slot = &mut self.nodes[id as usize];
        slot.usr = Some(format!("c:{}@{}", self.usr_scope.concat(), name));
        slot.brief_comment = brief;
        // Enumerators are visible in the scope around the enum.
        self.declare(&name, id);
        if let Some(v) = value_node {
            self.lower_expr(ctx, v, id);
        }
    }

    pub(super) fn lower_member(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        match node.kind() {
            "field_declaration" => self.lower_field_declaration(ctx, node, parent),
            "function_definition" => {
                self.lower_function_definition(ctx, node, parent, Context::Fields)
            }
            "declaration" => self.lower_declaration(ctx, node, parent, Context::Fields),
            "template_declaration" => self.lower_template(ctx, node, parent, Context::Fields),
            kind if RECORD_KINDS.contains(&kind) => {
                self.lower_record(ctx, node, parent);
            }
            _ => {}
        }
    }

    fn lower_field_declaration(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let src = ctx.src;
        let spec = self.specifiers(node, src);
        let record = self.lower_embedded_record(ctx, &spec, parent);

        let declarators: Vec<TsNode> = node
            .children_by_field_name("declarator", &mut node.walk())
            .collect();
        for d in declarators {
            let declarator = self.analyze(d, src);
            if declarator.function.is_some() {
                self.lower_function(ctx, node, &spec, &declarator, None, parent, Context::Fields);
                continue;
            }
            let Some(name_node) = declarator.name else {
                continue;
            };
            let name = text(name_node, src).to_string();
            let entity = Entity::FieldDecl {
                name: name.clone(),
                ty: combine(&spec.base, &declarator.suffix),
            };
            let span = (node.start_byte() as u32, extent(d, src).1);
            let id = self.add_span(ctx, entity, span, name_node.start_byte() as u32, parent);
            let brief = self.brief_comment(node, src);
            let slot = &mut self.nodes[id as usize];
            slot.usr = Some(format!("c:{}@FI@{}", self.usr_scope.concat(), name));
            slot.brief_comment = brief;
            self.declare(&name, id);
            self.add_type_ref(ctx, spec.type_node, record, id);
        }
        if let Some(default) = node.child_by_field_name("default_value") {
            if let Some(&field) = self.nodes[parent as usize].children.last() {
                self.lower_expr(ctx, default, field);
            }
        }
    }

    pub(super) fn lower_typedef(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let src = ctx.src;
        let spec = self.specifiers(node, src);
        let record = self.lower_embedded_record(ctx, &spec, parent);

        let declarators: Vec<TsNode> = node
            .children_by_field_name("declarator", &mut node.walk())
            .collect();
        for d in declarators {
            let Some(name_node) = declared_name(d) else {
                continue;
            };
            let name = text(name_node, src).to_string();
            // Function typedefs keep their parameter list.
            let underlying = combine(&spec.base, &self.render(d, None, src));
            let entity = Entity::TypedefDecl {
                name: name.clone(),
                underlying,
            };
            let span = (node.start_byte() as u32, extent(d, src).1);
            let id = self.add_span(ctx, entity, span, name_node.start_byte() as u32, parent);
            let brief = self.brief_comment(node, src);
            let slot = &mut self.nodes[id as usize];
            slot.usr = Some(format!("c:{}@T@{}", self.usr_scope.concat(), name));
            slot.brief_comment = brief;
            self.declare(&name, id);
            self.add_type_ref(ctx, spec.type_node, record, id);
        }
    }

    // ── C++ wrappers ──────────────────────────────────────────────────────

    pub(super) fn lower_namespace(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let name_node = node.child_by_field_name("name");
        let name = name_node.map(|n| text(n, ctx.src).to_string());
        let location = name_node.map_or(node.start_byte(), |n| n.start_byte()) as u32;
        let entity = Entity::Namespace { name: name.clone() };
        let id = self.add_at(ctx, entity, node, location, parent);
        let component = match &name {
            Some(name) => format!("@N@{name}"),
            None => "@aN".to_string(),
        };
        self.nodes[id as usize].usr = Some(format!("c:{}{}", self.usr_prefix(), component));
        if let Some(name) = &name {
            self.declare(name, id);
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.usr_scope.push(component);
            self.push_scope();
            self.lower_items(ctx, body, id, Context::File);
            self.pop_scope();
            self.usr_scope.pop();
        }
    }

    /// `extern "C"` blocks.
    pub(super) fn lower_linkage(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let id = self.add(ctx, Entity::UnexposedDecl, node, parent);
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        if body.kind() == "declaration_list" {
            self.lower_items(ctx, body, id, Context::File);
        } else {
            self.lower_decl_or_stmt(ctx, body, id, Context::File);
        }
    }

    pub(super) fn lower_template(
        &mut self,
        ctx: &FileCtx<'_>,
        node: TsNode<'_>,
        parent: NodeId,
        context: Context,
    ) {
        let inner: Vec<TsNode> = node
            .named_children(&mut node.walk())
            .filter(|c| !matches!(c.kind(), "template_parameter_list" | "comment"))
            .collect();
        for child in inner {
            match context {
                Context::Fields => self.lower_member(ctx, child, parent),
                _ => self.lower_decl_or_stmt(ctx, child, parent, context),
            }
        }
    }

    // ── Comments ──────────────────────────────────────────────────────────

    /// First paragraph of the documentation comments directly above `item`.
    fn brief_comment(&self, item: TsNode<'_>, src: &str) -> Option<String> {
        if !self.flags.include_brief_comments {
            return None;
        }
        let mut comments = Vec::new();
        let mut row = item.start_position().row;
        let mut sibling = item.prev_sibling();
        while let Some(node) = sibling {
            let raw = text(node, src);
            if node.kind() != "comment" || node.end_position().row + 1 < row || !is_doc_comment(raw) {
                break;
            }
            comments.push(raw);
            row = node.start_position().row;
            sibling = node.prev_sibling();
        }
        comments.reverse();

        let lines: Vec<String> = comments.into_iter().flat_map(comment_lines).collect();
        first_paragraph(&lines)
    }
}

/// Join a base type and a name-less declarator.
fn combine(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        base.to_string()
    } else if suffix.starts_with('[') {
        format!("{base}{suffix}")
    } else {
        format!("{base} {suffix}")
    }
}

fn is_declarator_kind(kind: &str) -> bool {
    kind.ends_with("declarator") || NAME_KINDS.contains(&kind)
}

fn inner_declarator(node: TsNode<'_>) -> Option<TsNode<'_>> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    match node.kind() {
        "parenthesized_declarator"
        | "abstract_parenthesized_declarator"
        | "attributed_declarator"
        | "reference_declarator"
        | "abstract_reference_declarator" => node
            .named_children(&mut node.walk())
            .find(|c| is_declarator_kind(c.kind())),
        _ => None,
    }
}

fn declared_name(node: TsNode<'_>) -> Option<TsNode<'_>> {
    let mut current = node;
    loop {
        if NAME_KINDS.contains(&current.kind()) {
            return Some(current);
        }
        current = inner_declarator(current)?;
    }
}

/// The `function_declarator` whose declarator is the name itself.
fn function_core(node: TsNode<'_>) -> Option<TsNode<'_>> {
    let mut current = node;
    loop {
        if current.kind() == "function_declarator"
            && current
                .child_by_field_name("declarator")
                .is_some_and(|inner| NAME_KINDS.contains(&inner.kind()))
        {
            return Some(current);
        }
        current = inner_declarator(current)?;
    }
}

/// Unqualified name of `a::b::c`.
pub(super) fn last_segment(node: TsNode<'_>, src: &str) -> String {
    let mut current = node;
    while let Some(name) = current.child_by_field_name("name") {
        current = name;
    }
    text(current, src).to_string()
}

fn classify_initializer(node: TsNode<'_>, src: &str) -> Initializer {
    match node.kind() {
        "string_literal" => Initializer::String(literal_length(text(node, src)) + 1),
        "concatenated_string" => {
            let len = node
                .named_children(&mut node.walk())
                .filter(|c| c.kind() == "string_literal")
                .map(|c| literal_length(text(c, src)))
                .sum::<usize>();
            Initializer::String(len + 1)
        }
        "number_literal" => {
            let literal = text(node, src);
            if is_floating(literal) {
                Initializer::Other
            } else {
                parse_integer(literal).map_or(Initializer::Other, Initializer::Integer)
            }
        }
        _ => Initializer::Other,
    }
}

/// Characters a string literal stores, without the terminator.
fn literal_length(literal: &str) -> usize {
    let (Some(open), Some(close)) = (literal.find('"'), literal.rfind('"')) else {
        return 0;
    };
    if close <= open {
        return 0;
    }
    let inner = literal[open + 1..close].as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == b'\\' && i + 1 < inner.len() {
            i += 2;
            match inner[i - 1] {
                b'x' => {
                    while i < inner.len() && inner[i].is_ascii_hexdigit() {
                        i += 1;
                    }
                }
                b'0'..=b'7' => {
                    let mut digits = 1;
                    while digits < 3 && i < inner.len() && (b'0'..=b'7').contains(&inner[i]) {
                        i += 1;
                        digits += 1;
                    }
                }
                _ => {}
            }
        } else {
            i += 1;
        }
        count += 1;
    }
    count
}

pub(super) fn is_floating(literal: &str) -> bool {
    let lower = literal.to_ascii_lowercase();
    if lower.starts_with("0x") {
        lower.contains('p')
    } else {
        lower.contains('.') || lower.contains('e')
    }
}

fn is_doc_comment(raw: &str) -> bool {
    ["///", "//!", "/**", "/*!"].iter().any(|m| raw.starts_with(m)) && !raw.starts_with("/**/")
}

fn comment_lines(raw: &str) -> Vec<String> {
    let body = raw.strip_suffix("*/").unwrap_or(raw);
    body.lines()
        .map(|line| {
            let line = line.trim();
            let line = ["///", "//!", "/**", "/*!"]
                .iter()
                .find_map(|marker| line.strip_prefix(marker))
                .unwrap_or(line);
            line.trim_start_matches(['*', '<']).trim().to_string()
        })
        .collect()
}

fn first_paragraph(lines: &[String]) -> Option<String> {
    let paragraph: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .skip_while(|l| l.is_empty())
        .take_while(|l| !l.is_empty())
        .collect();
    let joined = paragraph.join(" ");
    let brief = joined
        .strip_prefix("\\brief ")
        .or_else(|| joined.strip_prefix("@brief "))
        .unwrap_or(&joined)
        .trim();
    (!brief.is_empty()).then(|| brief.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine() {
        assert_eq!(combine("int", ""), "int");
        assert_eq!(combine("char", "[4]"), "char[4]");
        assert_eq!(combine("const char", "*"), "const char *");
        assert_eq!(combine("int", "(*)(int)"), "int (*)(int)");
    }

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length("\"\""), 0);
        assert_eq!(literal_length("\"abc\""), 3);
        assert_eq!(literal_length("\"a\\nb\""), 3);
        assert_eq!(literal_length("\"\\x41\\101\""), 2);
        assert_eq!(literal_length("L\"wide\""), 4);
    }

    #[test]
    fn test_is_floating() {
        assert!(is_floating("1.5"));
        assert!(is_floating("1e3"));
        assert!(is_floating("0x1p4"));
        assert!(!is_floating("0xE"));
        assert!(!is_floating("42"));
    }

    #[test]
    fn test_brief_from_comment_lines() {
        let lines = comment_lines("/**\n * \\brief Adds two numbers.\n *\n * Details.\n */");
        assert_eq!(first_paragraph(&lines).as_deref(), Some("Adds two numbers."));

        let lines: Vec<String> = ["/// First line", "/// continues."]
            .into_iter()
            .flat_map(comment_lines)
            .collect();
        assert_eq!(
            first_paragraph(&lines).as_deref(),
            Some("First line continues.")
        );
        assert!(!is_doc_comment("// plain"));
        assert!(!is_doc_comment("/**/"));
    }
}
