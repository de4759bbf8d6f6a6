//! Syntax and semantic checks.
//!
//! The builder calls into these while it lowers a file. Each check returns
//! the diagnostic it would emit; the builder decides ordering.

use crate::diagnostic::{
    Diagnostic, DiagnosticLocation, FixIt, Severity, PARSE_ISSUE, PREPROCESSOR_ISSUE,
    SEMANTIC_ISSUE,
};
use crate::Language;
use tree_sitter::Node as TsNode;

/// Node kinds under which a malformed fragment is an expression.
const EXPRESSION_CONTEXTS: &[&str] = &[
    "compound_statement",
    "expression_statement",
    "return_statement",
    "parenthesized_expression",
    "argument_list",
    "initializer_list",
    "init_declarator",
    "binary_expression",
    "condition_clause",
];

/// Message and fix-it text for a missing token.
pub(crate) fn missing_token(node: TsNode<'_>) -> (String, Option<String>) {
    let kind = node.kind();
    if kind == ";" {
        let context = match node.parent().map(|p| p.kind()) {
            Some("return_statement") => " after return statement",
            Some("expression_statement") => " after expression",
            Some("break_statement") => " after break statement",
            Some("continue_statement") => " after continue statement",
            Some("goto_statement") => " after goto statement",
            Some("do_statement") => " after do/while statement",
            Some("declaration" | "field_declaration" | "type_definition") => {
                " at end of declaration"
            }
            _ => "",
        };
        return (format!("expected ';'{context}"), Some(";".to_string()));
    }
    if !node.is_named() {
        return (format!("expected '{kind}'"), Some(kind.to_string()));
    }
    let message = match kind {
        "identifier" | "field_identifier" | "type_identifier" => "expected identifier",
        "primitive_type" => "expected a type",
        _ => "expected expression",
    };
    (message.to_string(), None)
}

/// Message for an ERROR node.
pub(crate) fn unexpected_fragment(node: TsNode<'_>, src: &str) -> String {
    let mut ancestor = node.parent();
    while let Some(current) = ancestor {
        if EXPRESSION_CONTEXTS.contains(&current.kind()) {
            return "expected expression".to_string();
        }
        ancestor = current.parent();
    }

    match first_leaf(node) {
        Some(leaf) if leaf.kind().ends_with("identifier") => {
            let name = src.get(leaf.start_byte()..leaf.end_byte()).unwrap_or_default();
            format!("unknown type name '{name}'")
        }
        _ => "expected identifier or '('".to_string(),
    }
}

fn first_leaf(node: TsNode<'_>) -> Option<TsNode<'_>> {
    let mut current = node;
    while let Some(child) = current.child(0) {
        current = child;
    }
    (current != node || node.child_count() == 0).then_some(current)
}

pub(crate) fn syntax_error(message: String, location: DiagnosticLocation) -> Diagnostic {
    Diagnostic::new(Severity::Error, PARSE_ISSUE, message, location)
}

pub(crate) fn missing_token_error(
    message: String,
    insertion: Option<String>,
    location: DiagnosticLocation,
) -> Diagnostic {
    let diagnostic = syntax_error(message, location.clone());
    match insertion {
        Some(replacement) => diagnostic.with_fix_it(FixIt {
            path: location.path,
            start: location.offset,
            end: location.offset,
            replacement,
        }),
        None => diagnostic,
    }
}

pub(crate) fn file_not_found(name: &str, location: DiagnosticLocation) -> Diagnostic {
    Diagnostic::new(
        Severity::Fatal,
        PREPROCESSOR_ISSUE,
        format!("'{name}' file not found"),
        location,
    )
}

/// `#error` and `#warning` directives.
pub(crate) fn user_directive(
    severity: Severity,
    message: &str,
    location: DiagnosticLocation,
) -> Diagnostic {
    let diagnostic = Diagnostic::new(severity, PREPROCESSOR_ISSUE, message.trim(), location);
    if severity == Severity::Warning {
        diagnostic.with_option("-W#warnings")
    } else {
        diagnostic
    }
}

/// `main` declared with a return type other than `int`.
pub(crate) fn main_return_type(
    language: Language,
    return_type: &str,
    type_start: DiagnosticLocation,
    type_end: u32,
) -> Option<Diagnostic> {
    if return_type == "int" || return_type == "signed int" || return_type == "signed" {
        return None;
    }
    let fix_it = FixIt {
        path: type_start.path.clone(),
        start: type_start.offset,
        end: type_end,
        replacement: "int".to_string(),
    };

    if language.is_cxx() {
        return Some(
            Diagnostic::new(
                Severity::Error,
                SEMANTIC_ISSUE,
                "'main' must return 'int'",
                type_start,
            )
            .with_fix_it(fix_it),
        );
    }

    let note = Diagnostic::new(
        Severity::Note,
        SEMANTIC_ISSUE,
        "change return type to 'int'",
        type_start.clone(),
    )
    .with_fix_it(fix_it);
    Some(
        Diagnostic::new(
            Severity::Warning,
            SEMANTIC_ISSUE,
            "return type of 'main' is not 'int'",
            type_start,
        )
        .with_option("-Wmain-return-type")
        .with_note(note),
    )
}

/// `return` statements that disagree with the function's return type.
pub(crate) fn return_mismatch(
    function: &str,
    returns_void: bool,
    has_value: bool,
    location: DiagnosticLocation,
) -> Option<Diagnostic> {
    let message = match (returns_void, has_value) {
        (true, true) => format!("void function '{function}' should not return a value"),
        (false, false) => format!("non-void function '{function}' should return a value"),
        _ => return None,
    };
    Some(
        Diagnostic::new(Severity::Error, SEMANTIC_ISSUE, message, location)
            .with_option("-Wreturn-type"),
    )
}

/// Initializer shapes the conversion checks recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Initializer {
    /// A string literal with its array length, terminator included
    String(usize),
    /// An integer literal with its value
    Integer(i64),
    Other,
}

/// String literals initializing arithmetic variables and integers initializing pointers.
pub(crate) fn initializer_conversion(
    language: Language,
    var_type: &str,
    init: Initializer,
    location: DiagnosticLocation,
) -> Option<Diagnostic> {
    match init {
        Initializer::String(len) if is_arithmetic(var_type) => Some(if language.is_cxx() {
            Diagnostic::new(
                Severity::Error,
                SEMANTIC_ISSUE,
                format!(
                    "cannot initialize a variable of type '{var_type}' with an lvalue of type 'const char[{len}]'"
                ),
                location,
            )
        } else {
            Diagnostic::new(
                Severity::Warning,
                SEMANTIC_ISSUE,
                format!(
                    "incompatible pointer to integer conversion initializing '{var_type}' with an expression of type 'char[{len}]'"
                ),
                location,
            )
            .with_option("-Wint-conversion")
        }),
        Initializer::Integer(value) if value != 0 && is_object_pointer(var_type) => {
            Some(if language.is_cxx() {
                Diagnostic::new(
                    Severity::Error,
                    SEMANTIC_ISSUE,
                    format!(
                        "cannot initialize a variable of type '{var_type}' with an rvalue of type 'int'"
                    ),
                    location,
                )
            } else {
                Diagnostic::new(
                    Severity::Warning,
                    SEMANTIC_ISSUE,
                    format!(
                        "incompatible integer to pointer conversion initializing '{var_type}' with an expression of type 'int'"
                    ),
                    location,
                )
                .with_option("-Wint-conversion")
            })
        }
        _ => None,
    }
}

pub(crate) fn unused_variable(name: &str, location: DiagnosticLocation) -> Diagnostic {
    Diagnostic::new(
        Severity::Warning,
        SEMANTIC_ISSUE,
        format!("unused variable '{name}'"),
        location,
    )
    .with_option("-Wunused-variable")
}

fn is_arithmetic(ty: &str) -> bool {
    const WORDS: &[&str] = &[
        "int", "char", "short", "long", "signed", "unsigned", "float", "double", "_Bool", "bool",
        "const", "volatile",
    ];
    !ty.contains(['*', '[', '(', '&'])
        && ty.split_whitespace().all(|word| WORDS.contains(&word))
        && ty.split_whitespace().any(|word| word != "const" && word != "volatile")
}

fn is_object_pointer(ty: &str) -> bool {
    let unqualified = ty.strip_suffix("const").unwrap_or(ty).trim_end();
    unqualified.ends_with('*') && !ty.contains(['(', '['])
}
