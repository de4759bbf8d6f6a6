//! Statements and expressions inside function bodies.

use super::decl::{is_floating, last_segment};
use super::{text, Builder, Context, FileCtx};
use crate::ast::{Entity, NodeId};
use crate::checks;
use tree_sitter::Node as TsNode;

/// Children of expressions that are names or types rather than operands.
const SKIPPED_OPERANDS: &[&str] = &[
    "comment",
    "field_identifier",
    "type_descriptor",
    "primitive_type",
    "type_identifier",
    "field_designator",
    "subscript_designator",
    "template_argument_list",
];

impl Builder<'_> {
    pub(super) fn lower_decl_or_stmt(
        &mut self,
        ctx: &FileCtx<'_>,
        node: TsNode<'_>,
        parent: NodeId,
        context: Context,
    ) {
        match node.kind() {
            "function_definition" => self.lower_function_definition(ctx, node, parent, context),
            "declaration" => self.lower_declaration(ctx, node, parent, context),
            "type_definition" => {
                let container = self.decl_container(ctx, node, parent, context);
                self.lower_typedef(ctx, node, container);
            }
            "struct_specifier" | "union_specifier" | "enum_specifier" | "class_specifier" => {
                let container = self.decl_container(ctx, node, parent, context);
                self.lower_record(ctx, node, container);
            }
            "namespace_definition" => self.lower_namespace(ctx, node, parent),
            "linkage_specification" => self.lower_linkage(ctx, node, parent),
            "template_declaration" => self.lower_template(ctx, node, parent, context),
            "alias_declaration"
            | "using_declaration"
            | "static_assert_declaration"
            | "namespace_alias_definition"
            | "concept_definition" => {
                self.add(ctx, Entity::UnexposedDecl, node, parent);
            }
            "ERROR" | "comment" => {}
            _ if context == Context::Block => self.lower_statement(ctx, node, parent),
            // Stray top-level statements, usually macro invocations.
            _ => {}
        }
    }

    pub(super) fn lower_statement(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let src = ctx.src;
        let entity = match node.kind() {
            "compound_statement" => {
                let id = self.add(ctx, Entity::CompoundStmt, node, parent);
                self.push_scope();
                self.lower_items(ctx, node, id, Context::Block);
                self.pop_scope();
                return;
            }
            "expression_statement" => {
                match first_operand(node) {
                    Some(expr) => {
                        self.lower_expr(ctx, expr, parent);
                    }
                    None => {
                        self.add(ctx, Entity::NullStmt, node, parent);
                    }
                }
                return;
            }
            "declaration" | "type_definition" | "function_definition" | "struct_specifier"
            | "union_specifier" | "enum_specifier" | "class_specifier" => {
                self.lower_decl_or_stmt(ctx, node, parent, Context::Block);
                return;
            }
            "return_statement" => {
                self.lower_return(ctx, node, parent);
                return;
            }
            "attributed_statement" => {
                let inner: Vec<TsNode> = node
                    .named_children(&mut node.walk())
                    .filter(|c| c.kind() != "attribute_declaration")
                    .collect();
                for child in inner {
                    self.lower_statement(ctx, child, parent);
                }
                return;
            }
            "ERROR" | "comment" => return,
            "if_statement" => Entity::IfStmt,
            "while_statement" => Entity::WhileStmt,
            "do_statement" => Entity::DoStmt,
            "for_statement" => Entity::ForStmt,
            "switch_statement" => Entity::SwitchStmt,
            "case_statement" => {
                if node.child(0).is_some_and(|c| c.kind() == "default") {
                    Entity::DefaultStmt
                } else {
                    Entity::CaseStmt
                }
            }
            "break_statement" => Entity::BreakStmt,
            "continue_statement" => Entity::ContinueStmt,
            "goto_statement" => Entity::GotoStmt {
                label: field_text(node, "label", src),
            },
            "labeled_statement" => Entity::LabelStmt {
                label: field_text(node, "label", src),
            },
            _ => Entity::UnexposedStmt,
        };

        let scoped = matches!(
            node.kind(),
            "if_statement" | "while_statement" | "for_statement" | "for_range_loop" | "switch_statement"
        );
        let id = self.add(ctx, entity, node, parent);
        if scoped {
            self.push_scope();
        }
        self.lower_statement_children(ctx, node, id);
        if scoped {
            self.pop_scope();
        }
    }

    fn lower_statement_children(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let mut children = Vec::new();
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                if child.is_named() {
                    children.push((cursor.field_name(), child));
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }

        for (field, child) in children {
            match child.kind() {
                "comment" | "statement_identifier" | "attribute_declaration" => {}
                // Conditions print without their parentheses.
                "parenthesized_expression" if field == Some("condition") => {
                    if let Some(inner) = first_operand(child) {
                        self.lower_expr(ctx, inner, parent);
                    }
                }
                "condition_clause" | "else_clause" => {
                    let inner: Vec<TsNode> = child.named_children(&mut child.walk()).collect();
                    for item in inner {
                        self.lower_block_item(ctx, item, parent);
                    }
                }
                _ => self.lower_block_item(ctx, child, parent),
            }
        }
    }

    fn lower_block_item(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        match node.kind() {
            "comment" => {}
            "declaration" | "type_definition" => {
                self.lower_decl_or_stmt(ctx, node, parent, Context::Block)
            }
            kind if kind.ends_with("_statement") || kind == "for_range_loop" => {
                self.lower_statement(ctx, node, parent)
            }
            _ => {
                self.lower_expr(ctx, node, parent);
            }
        }
    }

    fn lower_return(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let id = self.add(ctx, Entity::ReturnStmt, node, parent);
        let value = first_operand(node);
        let diagnostic = self.function.as_ref().and_then(|function| {
            checks::return_mismatch(
                &function.name,
                function.returns_void,
                value.is_some(),
                self.location(ctx.id, node.start_byte() as u32),
            )
        });
        if let Some(diagnostic) = diagnostic {
            self.pending.push(diagnostic);
        }
        if let Some(value) = value {
            self.lower_expr(ctx, value, id);
        }
    }

    pub(super) fn lower_expr(
        &mut self,
        ctx: &FileCtx<'_>,
        node: TsNode<'_>,
        parent: NodeId,
    ) -> Option<NodeId> {
        let src = ctx.src;
        let entity = match node.kind() {
            "identifier" => {
                let name = text(node, src).to_string();
                let target = self.lookup(&name);
                let id = self.add(ctx, Entity::DeclRefExpr { name }, node, parent);
                self.link(id, target);
                return Some(id);
            }
            "qualified_identifier" => {
                let name = last_segment(node, src);
                let target = self.lookup(&name);
                let id = self.add(ctx, Entity::DeclRefExpr { name }, node, parent);
                self.link(id, target);
                return Some(id);
            }
            "call_expression" => {
                let function = node.child_by_field_name("function");
                let callee = function.map(|f| callee_name(f, src)).unwrap_or_default();
                let id = self.add(ctx, Entity::CallExpr { callee: callee.clone() }, node, parent);
                if let Some(f) = function {
                    // The callee's own reference is counted through its DeclRefExpr.
                    if matches!(f.kind(), "identifier" | "qualified_identifier") {
                        self.nodes[id as usize].referenced = self.lookup(&callee);
                    }
                    self.lower_expr(ctx, f, id);
                }
                if let Some(args) = node.child_by_field_name("arguments") {
                    self.lower_operands(ctx, args, id);
                }
                return Some(id);
            }
            "field_expression" => {
                let field = node.child_by_field_name("field");
                let member = field.map(|f| text(f, src).to_string()).unwrap_or_default();
                let arrow = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| text(op, src) == "->");
                let location = field.map_or(node.start_byte(), |f| f.start_byte()) as u32;
                let entity = Entity::MemberRefExpr { member, arrow };
                let id = self.add_at(ctx, entity, node, location, parent);
                if let Some(argument) = node.child_by_field_name("argument") {
                    self.lower_expr(ctx, argument, id);
                }
                return Some(id);
            }
            "cast_expression" => {
                let type_node = node.child_by_field_name("type");
                let ty = type_node
                    .map(|t| self.type_descriptor(t, src))
                    .unwrap_or_default();
                let id = self.add(ctx, Entity::CStyleCastExpr { ty }, node, parent);
                if let Some(t) = type_node {
                    self.add_type_ref(ctx, t.child_by_field_name("type"), None, id);
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.lower_expr(ctx, value, id);
                }
                return Some(id);
            }
            "initializer_pair" => {
                return node
                    .child_by_field_name("value")
                    .and_then(|value| self.lower_expr(ctx, value, parent));
            }
            "argument_list" => {
                self.lower_operands(ctx, node, parent);
                return None;
            }
            "compound_statement" => {
                self.lower_statement(ctx, node, parent);
                return None;
            }
            "ERROR" | "comment" => return None,

            "number_literal" => {
                let literal = text(node, src).to_string();
                if is_floating(&literal) {
                    Entity::FloatingLiteral { text: literal }
                } else {
                    Entity::IntegerLiteral { text: literal }
                }
            }
            "string_literal" | "concatenated_string" | "raw_string_literal" => {
                Entity::StringLiteral {
                    text: text(node, src).to_string(),
                }
            }
            "char_literal" => Entity::CharacterLiteral {
                text: text(node, src).to_string(),
            },
            "binary_expression" | "assignment_expression" => Entity::BinaryOperator {
                op: field_text(node, "operator", src),
            },
            "comma_expression" => Entity::BinaryOperator { op: ",".to_string() },
            "unary_expression" | "pointer_expression" => Entity::UnaryOperator {
                op: field_text(node, "operator", src),
                prefix: true,
            },
            "update_expression" => {
                let operator = node.child_by_field_name("operator");
                let argument = node.child_by_field_name("argument");
                let prefix = match (operator, argument) {
                    (Some(op), Some(arg)) => op.start_byte() < arg.start_byte(),
                    _ => true,
                };
                Entity::UnaryOperator {
                    op: field_text(node, "operator", src),
                    prefix,
                }
            }
            "parenthesized_expression" => Entity::ParenExpr,
            "conditional_expression" => Entity::ConditionalOperator,
            "subscript_expression" => Entity::ArraySubscriptExpr,
            "initializer_list" => Entity::InitListExpr,
            _ => Entity::UnexposedExpr,
        };

        let is_literal = matches!(
            entity,
            Entity::IntegerLiteral { .. }
                | Entity::FloatingLiteral { .. }
                | Entity::StringLiteral { .. }
                | Entity::CharacterLiteral { .. }
        );
        let id = self.add(ctx, entity, node, parent);
        if !is_literal {
            self.lower_operands(ctx, node, id);
        }
        Some(id)
    }

    fn lower_operands(&mut self, ctx: &FileCtx<'_>, node: TsNode<'_>, parent: NodeId) {
        let operands: Vec<TsNode> = node
            .named_children(&mut node.walk())
            .filter(|c| !SKIPPED_OPERANDS.contains(&c.kind()))
            .collect();
        for operand in operands {
            match operand.kind() {
                "subscript_argument_list" => self.lower_operands(ctx, operand, parent),
                _ => {
                    self.lower_expr(ctx, operand, parent);
                }
            }
        }
    }
}

/// First named child that is not a comment.
fn first_operand(node: TsNode<'_>) -> Option<TsNode<'_>> {
    node.named_children(&mut node.walk())
        .find(|c| c.kind() != "comment")
}

fn field_text(node: TsNode<'_>, field: &str, src: &str) -> String {
    node.child_by_field_name(field)
        .map(|n| text(n, src).to_string())
        .unwrap_or_default()
}

fn callee_name(function: TsNode<'_>, src: &str) -> String {
    match function.kind() {
        "identifier" => text(function, src).to_string(),
        "qualified_identifier" => last_segment(function, src),
        "field_expression" => field_text(function, "field", src),
        _ => super::squash(text(function, src)),
    }
}
