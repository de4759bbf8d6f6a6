//! Lowering of tree-sitter syntax trees into the arena AST.
//!
//! Files are lowered in source order. An `#include` enters the included file
//! on the spot, so its declarations land where the directive was, and each
//! file is entered at most once per unit. Preprocessor conditionals are
//! evaluated against the macro table as it stands at that point.

mod decl;
mod eval;
mod stmt;

use crate::args::Args;
use crate::ast::{Ast, Entity, FileId, IncludeSite, Node, NodeId, ParseFlags, SourceFile, MAIN_FILE, ROOT};
use crate::checks;
use crate::diagnostic::{Diagnostic, DiagnosticLocation, DiagnosticSink, Severity};
use crate::lexer;
use crate::{EngineError, Language};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use tree_sitter::{Node as TsNode, Parser, Tree};

/// Everything the builder needs for one unit.
pub(crate) struct BuildInput<'a> {
    pub main_path: PathBuf,
    pub main_contents: String,
    pub main_modified: Option<i64>,
    pub language: Language,
    pub raw_args: Vec<String>,
    pub args: &'a Args,
    /// Keyed by normalized path
    pub overlays: &'a HashMap<PathBuf, String>,
    pub system_include_dirs: &'a [PathBuf],
    pub flags: ParseFlags,
}

/// Build the AST of one unit.
pub(crate) fn build(parser: &mut Parser, input: &BuildInput<'_>) -> Result<Ast, EngineError> {
    let mut builder = Builder::new(parser, input);
    builder.run(input)?;
    let (files, nodes, diagnostics) = builder.finish();

    Ok(Ast {
        language: input.language,
        args: input.raw_args.clone(),
        flags: input.flags,
        files,
        nodes,
        diagnostics,
    })
}

/// Per-file state while its tree is lowered.
struct FileCtx<'s> {
    id: FileId,
    src: &'s str,
    dir: PathBuf,
    /// File name used in USRs of file-local entities
    usr_name: String,
}

/// Where a list of items sits, which decides how each item lowers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    File,
    Block,
    Fields,
    Enumerators,
}

#[derive(Debug, Default)]
struct Scope {
    ordinary: HashMap<String, NodeId>,
    tags: HashMap<String, NodeId>,
}

/// The function whose body is being lowered.
struct FunctionScope {
    name: String,
    returns_void: bool,
    locals: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Macro {
    value: String,
}

/// A resolved include.
struct Found {
    path: PathBuf,
    contents: String,
    modified: Option<i64>,
}

struct Builder<'a> {
    parser: &'a mut Parser,
    language: Language,
    args: &'a Args,
    overlays: &'a HashMap<PathBuf, String>,
    system_include_dirs: &'a [PathBuf],
    flags: ParseFlags,

    files: Vec<SourceFile>,
    nodes: Vec<Node>,
    entered: HashMap<PathBuf, FileId>,

    sink: DiagnosticSink,
    /// Diagnostics of the current top-level item, emitted sorted by offset
    pending: Vec<Diagnostic>,
    /// Diagnostics emitted after the current item's, at function end
    deferred: Vec<Diagnostic>,

    macros: HashMap<String, Macro>,
    scopes: Vec<Scope>,
    /// USR components of enclosing namespaces and records
    usr_scope: Vec<String>,
    function: Option<FunctionScope>,
    enum_values: HashMap<String, i64>,
    /// Value of the next enumerator without an explicit value
    next_enum_value: i64,
}

impl<'a> Builder<'a> {
    fn new(parser: &'a mut Parser, input: &BuildInput<'a>) -> Self {
        let warnings = input.args.warnings;
        Self {
            parser,
            language: input.language,
            args: input.args,
            overlays: input.overlays,
            system_include_dirs: input.system_include_dirs,
            flags: input.flags,
            files: Vec::new(),
            nodes: Vec::new(),
            entered: HashMap::new(),
            sink: DiagnosticSink::new(
                input.flags.keep_going,
                warnings.errors,
                warnings.suppress_all,
            ),
            pending: Vec::new(),
            deferred: Vec::new(),
            macros: HashMap::new(),
            scopes: Vec::new(),
            usr_scope: Vec::new(),
            function: None,
            enum_values: HashMap::new(),
            next_enum_value: 0,
        }
    }

    fn run(&mut self, input: &BuildInput<'_>) -> Result<(), EngineError> {
        let args = self.args;
        for (name, value) in &args.defines {
            self.macros.insert(
                name.clone(),
                Macro {
                    value: value.clone(),
                },
            );
        }
        for name in &args.undefines {
            self.macros.remove(name);
        }

        let main = SourceFile::new(
            MAIN_FILE,
            input.main_path.clone(),
            input.main_contents.clone(),
            input.main_modified,
        );
        let len = main.len();
        self.entered.insert(input.main_path.clone(), MAIN_FILE);
        self.files.push(main);
        self.nodes.push(Node {
            entity: Entity::TranslationUnit {
                name: input.main_path.display().to_string(),
            },
            file: MAIN_FILE,
            start: 0,
            end: len,
            location: 0,
            parent: None,
            semantic_parent: None,
            children: Vec::new(),
            referenced: None,
            references: 0,
            usr: None,
            brief_comment: None,
        });
        self.scopes.push(Scope::default());

        let tree = self
            .parser
            .parse(&input.main_contents, None)
            .ok_or_else(|| EngineError::parse(&input.main_path, "no syntax tree produced"))?;

        for forced in &args.forced_includes {
            self.enter_forced_include(forced);
        }
        self.process_file(MAIN_FILE, &tree, &input.main_contents, ROOT);
        Ok(())
    }

    fn finish(mut self) -> (Vec<SourceFile>, Vec<Node>, Vec<Diagnostic>) {
        self.flush();
        (self.files, self.nodes, self.sink.finish())
    }

    // ── Files ─────────────────────────────────────────────────────────────

    fn process_file(&mut self, id: FileId, tree: &Tree, src: &str, parent: NodeId) {
        let root = tree.root_node();
        let file = &mut self.files[id as usize];
        file.tokens = lexer::collect_tokens(root, src);
        file.guarded = detect_guard(root, src);

        let ctx = FileCtx {
            id,
            src,
            dir: parent_dir(&file.path),
            usr_name: file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let items: Vec<TsNode> = root.named_children(&mut root.walk()).collect();
        for item in items {
            self.lower_item(&ctx, item, parent, Context::File, false);
        }
        self.flush();
    }

    fn enter_file(&mut self, found: Found, site: IncludeSite, preamble: bool, parent: NodeId) -> FileId {
        let id = self.files.len() as FileId;
        let mut file = SourceFile::new(id, found.path.clone(), found.contents, found.modified);
        file.included_from = Some(site);
        file.preamble = preamble;
        let text = file.contents.clone();
        self.files.push(file);
        self.entered.insert(found.path.clone(), id);

        match self.parser.parse(&text, None) {
            Some(tree) => self.process_file(id, &tree, &text, parent),
            None => {
                let location = self.location(site.file, site.offset);
                self.pending.push(checks::syntax_error(
                    format!("could not parse '{}'", found.path.display()),
                    location,
                ));
                self.flush();
            }
        }
        id
    }

    fn enter_forced_include(&mut self, requested: &Path) {
        let found = self
            .lookup_file(requested)
            .or_else(|| self.resolve_include(&requested.to_string_lossy(), false, Path::new(".")));
        match found {
            Some(found) if !self.entered.contains_key(&found.path) => {
                let site = IncludeSite {
                    file: MAIN_FILE,
                    offset: 0,
                };
                self.enter_file(found, site, true, ROOT);
            }
            Some(_) => {}
            None => {
                let location = self.location(MAIN_FILE, 0);
                self.pending
                    .push(checks::file_not_found(&requested.display().to_string(), location));
                self.flush();
            }
        }
    }

    fn resolve_include(&self, name: &str, angled: bool, includer_dir: &Path) -> Option<Found> {
        let requested = Path::new(name);
        if requested.is_absolute() {
            return self.lookup_file(requested);
        }
        let quoted_dir = (!angled).then(|| includer_dir.to_path_buf());
        quoted_dir
            .into_iter()
            .chain(self.args.include_dirs.iter().cloned())
            .chain(self.system_include_dirs.iter().cloned())
            .find_map(|dir| self.lookup_file(&dir.join(requested)))
    }

    /// Overlay contents win over the disk.
    fn lookup_file(&self, candidate: &Path) -> Option<Found> {
        let path = normalize_path(candidate);
        if let Some(contents) = self.overlays.get(&path) {
            return Some(Found {
                path,
                contents: contents.clone(),
                modified: None,
            });
        }
        if !path.is_file() {
            return None;
        }
        let bytes = std::fs::read(&path).ok()?;
        let modified = modified_time(&path);
        Some(Found {
            path,
            contents: String::from_utf8_lossy(&bytes).into_owned(),
            modified,
        })
    }

    // ── Items and preprocessing ───────────────────────────────────────────

    fn lower_item(
        &mut self,
        ctx: &FileCtx<'_>,
        item: TsNode<'_>,
        parent: NodeId,
        context: Context,
        from_conditional: bool,
    ) {
        match item.kind() {
            "comment" => return,
            "preproc_if" | "preproc_ifdef" => {
                self.lower_conditional(ctx, item, parent, context);
                return;
            }
            "preproc_include" => {
                self.flush();
                self.lower_include(ctx, item, parent);
                return;
            }
            "preproc_def" | "preproc_function_def" => {
                self.define_macro(ctx, item, parent);
                return;
            }
            "preproc_call" => {
                self.lower_directive(ctx, item, parent);
                return;
            }
            _ => {}
        }

        let top_level = context == Context::File;
        if top_level || from_conditional {
            self.collect_syntax(ctx, item);
        }
        match context {
            Context::File | Context::Block => self.lower_decl_or_stmt(ctx, item, parent, context),
            Context::Fields => self.lower_member(ctx, item, parent),
            Context::Enumerators => self.lower_enumerator(ctx, item, parent),
        }
        if top_level {
            self.flush();
        }
    }

    fn lower_items(&mut self, ctx: &FileCtx<'_>, container: TsNode<'_>, parent: NodeId, context: Context) {
        let items: Vec<TsNode> = container.named_children(&mut container.walk()).collect();
        for item in items {
            self.lower_item(ctx, item, parent, context, false);
        }
    }

    fn lower_conditional(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId, context: Context) {
        let mut branch = Some(node);
        while let Some(current) = branch {
            if current.kind() == "preproc_else" || self.condition_holds(ctx, current) {
                for item in branch_items(current) {
                    self.lower_item(ctx, item, parent, context, true);
                }
                return;
            }
            branch = current.child_by_field_name("alternative");
        }
    }

    fn condition_holds(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>) -> bool {
        match node.kind() {
            "preproc_ifdef" | "preproc_elifdef" => {
                let negated = node.child(0).is_some_and(|c| c.kind().ends_with("ndef"));
                let defined = node
                    .child_by_field_name("name")
                    .is_some_and(|name| self.macros.contains_key(text(name, ctx.src)));
                defined != negated
            }
            "preproc_if" | "preproc_elif" => node
                .child_by_field_name("condition")
                .is_some_and(|cond| self.eval_preprocessor(cond, ctx.src, 0) != 0),
            _ => false,
        }
    }

    fn define_macro(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, ctx.src).to_string();
        let value = node
            .child_by_field_name("value")
            .map(|v| text(v, ctx.src).trim().to_string())
            .unwrap_or_default();

        if self.flags.detailed_preprocessing_record {
            let entity = Entity::MacroDefinition {
                name: name.clone(),
                function_like: node.kind() == "preproc_function_def",
            };
            let id = self.add_at(ctx, entity, node, name_node.start_byte() as u32, parent);
            self.nodes[id as usize].usr = Some(format!(
                "c:{}@{}@macro@{}",
                ctx.usr_name,
                name_node.start_byte(),
                name
            ));
        }
        self.macros.insert(name, Macro { value });
    }

    /// `#undef`, `#import`, `#error`, `#warning` and `#pragma`.
    fn lower_directive(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let argument = node
            .child_by_field_name("argument")
            .map(|a| text(a, ctx.src).trim())
            .unwrap_or_default();
        let offset = node.start_byte() as u32;

        match directive_name(node, ctx.src).as_str() {
            "undef" => {
                if let Some(name) = argument.split_whitespace().next() {
                    self.macros.remove(name);
                }
            }
            "import" | "include_next" => {
                if let Some((name, angled)) = parse_include_spec(argument) {
                    let name_offset = node
                        .child_by_field_name("argument")
                        .map_or(offset, |a| a.start_byte() as u32);
                    self.flush();
                    self.include(ctx, node, name_offset, &name, angled, parent);
                }
            }
            "error" => {
                let location = self.location(ctx.id, offset);
                self.pending
                    .push(checks::user_directive(Severity::Error, argument, location));
            }
            "warning" => {
                let location = self.location(ctx.id, offset);
                self.pending
                    .push(checks::user_directive(Severity::Warning, argument, location));
            }
            _ => {}
        }
    }

    fn lower_include(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let Some(path_node) = node.child_by_field_name("path") else {
            return;
        };
        let raw = text(path_node, ctx.src);
        let spec = match path_node.kind() {
            "identifier" => self.macros.get(raw).map(|m| m.value.clone()),
            _ => Some(raw.to_string()),
        };
        let Some((name, angled)) = spec.as_deref().and_then(parse_include_spec) else {
            return;
        };
        self.include(ctx, node, path_node.start_byte() as u32, &name, angled, parent);
    }

    fn include(
        &mut self,
        ctx: &FileCtx<'_>,
        directive: TsNode<'_>,
        name_offset: u32,
        name: &str,
        angled: bool,
        parent: NodeId,
    ) {
        let record = self.flags.detailed_preprocessing_record.then(|| {
            let entity = Entity::InclusionDirective {
                path: name.to_string(),
                angled,
                resolved: None,
            };
            self.add(ctx, entity, directive, parent)
        });

        if self.flags.single_file_parse {
            return;
        }

        let resolved = match self.resolve_include(name, angled, &ctx.dir) {
            Some(found) => match self.entered.get(&found.path).copied() {
                Some(id) => Some(id),
                None => {
                    let site = IncludeSite {
                        file: ctx.id,
                        offset: directive.start_byte() as u32,
                    };
                    Some(self.enter_file(found, site, false, parent))
                }
            },
            None => {
                let location = self.location(ctx.id, name_offset);
                self.pending.push(checks::file_not_found(name, location));
                self.flush();
                None
            }
        };

        if let Some(id) = record {
            if let Entity::InclusionDirective { resolved: slot, .. } = &mut self.nodes[id as usize].entity {
                *slot = resolved;
            }
        }
    }

    // ── Diagnostics ───────────────────────────────────────────────────────

    /// Report missing tokens and malformed fragments under `item`.
    fn collect_syntax(&mut self, ctx: &FileCtx<'_>, item: TsNode<'_>) {
        if !item.has_error() {
            return;
        }
        let mut stack = vec![item];
        while let Some(node) = stack.pop() {
            if node.is_missing() {
                let (message, insertion) = checks::missing_token(node);
                let location = self.location(ctx.id, node.start_byte() as u32);
                self.pending
                    .push(checks::missing_token_error(message, insertion, location));
                continue;
            }
            if node.is_error() {
                let objc_construct = matches!(self.language, Language::ObjectiveC | Language::ObjectiveCpp)
                    && text(node, ctx.src).trim_start().starts_with('@');
                if !objc_construct {
                    let message = checks::unexpected_fragment(node, ctx.src);
                    let location = self.location(ctx.id, node.start_byte() as u32);
                    self.pending.push(checks::syntax_error(message, location));
                }
                continue;
            }
            if node != item && is_conditional(node.kind()) {
                continue;
            }
            let children: Vec<TsNode> = node.children(&mut node.walk()).collect();
            stack.extend(children.into_iter().rev().filter(|c| c.has_error()));
        }
    }

    fn location(&self, file: FileId, offset: u32) -> DiagnosticLocation {
        let source = &self.files[file as usize];
        let (line, column) = source.line_column(offset);
        DiagnosticLocation {
            path: source.path.clone(),
            line,
            column,
            offset: offset.min(source.len()),
        }
    }

    fn flush(&mut self) {
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by_key(|d| d.location.offset);
        let deferred = std::mem::take(&mut self.deferred);
        for diagnostic in pending.into_iter().chain(deferred) {
            self.sink.emit(diagnostic);
        }
    }

    // ── Arena ─────────────────────────────────────────────────────────────

    fn add(&mut self, ctx: &FileCtx<'_>, entity: Entity, ts: TsNode<'_>, parent: NodeId) -> NodeId {
        self.add_at(ctx, entity, ts, ts.start_byte() as u32, parent)
    }

    fn add_at(
        &mut self,
        ctx: &FileCtx<'_>,
        entity: Entity,
        ts: TsNode<'_>,
        location: u32,
        parent: NodeId,
    ) -> NodeId {
        let (start, end) = extent(ts, ctx.src);
        self.add_span(ctx, entity, (start, end), location, parent)
    }

    fn add_span(
        &mut self,
        ctx: &FileCtx<'_>,
        entity: Entity,
        (start, end): (u32, u32),
        location: u32,
        parent: NodeId,
    ) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            entity,
            file: ctx.id,
            start,
            end,
            location,
            parent: Some(parent),
            semantic_parent: None,
            children: Vec::new(),
            referenced: None,
            references: 0,
            usr: None,
            brief_comment: None,
        });
        self.nodes[parent as usize].children.push(id);
        id
    }

    /// Link `node` to the declaration it refers to.
    fn link(&mut self, node: NodeId, target: Option<NodeId>) {
        if let Some(target) = target {
            self.nodes[node as usize].referenced = Some(target);
            self.nodes[target as usize].references += 1;
        }
    }

    // ── Scopes ────────────────────────────────────────────────────────────

    fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, id: NodeId) {
        if name.is_empty() {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.ordinary.insert(name.to_string(), id);
        }
    }

    /// Tag names also live in the ordinary namespace in C++.
    fn declare_tag(&mut self, name: &str, id: NodeId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.tags.insert(name.to_string(), id);
            if self.language.is_cxx() {
                scope.ordinary.insert(name.to_string(), id);
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.ordinary.get(name).copied())
    }

    fn lookup_tag(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.tags.get(name).copied())
    }

    fn usr_prefix(&self) -> String {
        self.usr_scope.concat()
    }
}

fn is_conditional(kind: &str) -> bool {
    matches!(
        kind,
        "preproc_if" | "preproc_ifdef" | "preproc_elif" | "preproc_elifdef" | "preproc_else"
    )
}

/// Items of one conditional branch, without its condition and alternative.
fn branch_items(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    let mut items = Vec::new();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            let field = cursor.field_name();
            if child.is_named() && !matches!(field, Some("condition" | "name" | "alternative")) {
                items.push(child);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    items
}

/// `#ifndef X` / `#define X` around the whole file, or `#pragma once`.
fn detect_guard(root: TsNode<'_>, src: &str) -> bool {
    let items: Vec<TsNode> = root
        .named_children(&mut root.walk())
        .filter(|n| n.kind() != "comment")
        .collect();

    let pragma_once = items.iter().any(|n| {
        n.kind() == "preproc_call"
            && directive_name(*n, src) == "pragma"
            && n
                .child_by_field_name("argument")
                .is_some_and(|a| text(a, src).trim() == "once")
    });
    if pragma_once {
        return true;
    }

    let [guard_block] = items.as_slice() else {
        return false;
    };
    if guard_block.kind() != "preproc_ifdef" || guard_block.child_by_field_name("alternative").is_some() {
        return false;
    }
    let is_ifndef = guard_block.child(0).is_some_and(|c| c.kind().ends_with("ifndef"));
    let Some(guard) = guard_block.child_by_field_name("name") else {
        return false;
    };
    let guard = text(guard, src);

    is_ifndef
        && branch_items(*guard_block)
            .into_iter()
            .find(|n| n.kind() != "comment")
            .is_some_and(|first| {
                first.kind() == "preproc_def"
                    && first
                        .child_by_field_name("name")
                        .is_some_and(|n| text(n, src) == guard)
            })
}

fn directive_name(node: TsNode<'_>, src: &str) -> String {
    node.child_by_field_name("directive")
        .map(|d| text(d, src).trim_start_matches('#').trim().to_string())
        .unwrap_or_default()
}

/// `<name>` or `"name"`.
fn parse_include_spec(spec: &str) -> Option<(String, bool)> {
    let spec = spec.trim();
    if let Some(inner) = spec.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return Some((inner.to_string(), true));
    }
    spec.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(|inner| (inner.to_string(), false))
}

fn text<'s>(node: TsNode<'_>, src: &'s str) -> &'s str {
    src.get(node.start_byte()..node.end_byte()).unwrap_or_default()
}

/// Byte extent with trailing whitespace (directive newlines) trimmed.
fn extent(node: TsNode<'_>, src: &str) -> (u32, u32) {
    let start = node.start_byte() as u32;
    let trimmed = text(node, src).trim_end().len() as u32;
    (start, start + trimmed)
}

/// Collapse runs of whitespace to one space.
fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// File modification time in seconds since the epoch.
pub(crate) fn modified_time(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    i64::try_from(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("./a/b/../c.h")), PathBuf::from("a/c.h"));
        assert_eq!(normalize_path(Path::new("/usr/include/./stdio.h")), PathBuf::from("/usr/include/stdio.h"));
        assert_eq!(normalize_path(Path::new("../x.h")), PathBuf::from("../x.h"));
        assert_eq!(normalize_path(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_include_spec() {
        assert_eq!(parse_include_spec("<stdio.h>"), Some(("stdio.h".to_string(), true)));
        assert_eq!(parse_include_spec("\"local.h\""), Some(("local.h".to_string(), false)));
        assert_eq!(parse_include_spec("HEADER"), None);
    }

    #[test]
    fn test_squash() {
        assert_eq!(squash("unsigned   long\n int"), "unsigned long int");
    }

    fn parse(source: &str) -> Tree {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_c::LANGUAGE.into()).unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn test_detect_include_guard() {
        let source = "// header\n#ifndef UTIL_H\n#define UTIL_H\nint util(void);\n#endif\n";
        let tree = parse(source);
        assert!(detect_guard(tree.root_node(), source));

        let source = "#pragma once\nint util(void);\n";
        let tree = parse(source);
        assert!(detect_guard(tree.root_node(), source));

        let source = "#ifndef UTIL_H\n#define OTHER\n#endif\n";
        let tree = parse(source);
        assert!(!detect_guard(tree.root_node(), source));

        let source = "#ifndef UTIL_H\n#define UTIL_H\n#endif\nint after;\n";
        let tree = parse(source);
        assert!(!detect_guard(tree.root_node(), source));
    }
}
