//! Token tables.
//!
//! Tokens come from the leaves of the tree-sitter syntax tree. Raw
//! preprocessor text, which the grammars keep as a single leaf, goes through
//! a small fragment lexer instead.

use crate::ast::{RawToken, TokenKind};
use tree_sitter::Node;

/// Leaves that are a single token even when the grammar gives them children.
const ATOMIC_KINDS: &[&str] = &[
    "string_literal",
    "char_literal",
    "number_literal",
    "system_lib_string",
    "raw_string_literal",
    "user_defined_literal",
    "comment",
];

/// Leaves whose text is unstructured and must be lexed again.
const RAW_TEXT_KINDS: &[&str] = &["preproc_arg"];

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Bool", "_Complex", "_Alignas",
    "_Alignof", "_Atomic", "_Generic", "_Noreturn", "_Static_assert", "_Thread_local", "bool",
    "class", "namespace", "template", "typename", "public", "private", "protected", "virtual",
    "new", "delete", "this", "operator", "friend", "using", "try", "catch", "throw", "true",
    "false", "nullptr", "constexpr", "decltype", "explicit", "mutable", "noexcept",
    "static_assert", "static_cast", "dynamic_cast", "const_cast", "reinterpret_cast",
    "alignas", "alignof", "thread_local", "wchar_t", "char16_t", "char32_t", "char8_t",
];

/// Multi-character punctuators, longest first.
const PUNCTUATORS: &[&str] = &[
    "<<=", ">>=", "...", "->*", "<=>", "##", "->", "++", "--", "<<", ">>", "<=", ">=", "==",
    "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "::", ".*",
];

/// Collect the token table of a syntax tree, in source order.
pub(crate) fn collect_tokens(root: Node<'_>, source: &str) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let mut cursor = root.walk();
    let mut descend = true;

    loop {
        let node = cursor.node();
        if descend {
            let kind = node.kind();
            if ATOMIC_KINDS.contains(&kind) {
                push_node(&mut tokens, node, source, classify_atomic(kind));
            } else if RAW_TEXT_KINDS.contains(&kind) || (node.is_error() && node.child_count() == 0)
            {
                lex_fragment(
                    &source[node.start_byte()..node.end_byte()],
                    node.start_byte() as u32,
                    &mut tokens,
                );
            } else if node.child_count() > 0 {
                if cursor.goto_first_child() {
                    continue;
                }
            } else {
                push_leaf(&mut tokens, node, source);
            }
        }

        if cursor.goto_next_sibling() {
            descend = true;
        } else if cursor.goto_parent() {
            descend = false;
        } else {
            break;
        }
    }

    tokens
}

fn classify_atomic(kind: &str) -> TokenKind {
    if kind == "comment" {
        TokenKind::Comment
    } else {
        TokenKind::Literal
    }
}

fn push_node(tokens: &mut Vec<RawToken>, node: Node<'_>, source: &str, kind: TokenKind) {
    let (start, end) = (node.start_byte(), node.end_byte());
    if start == end || source[start..end].trim().is_empty() {
        return;
    }
    tokens.push(RawToken {
        kind,
        start: start as u32,
        end: end as u32,
    });
}

fn push_leaf(tokens: &mut Vec<RawToken>, node: Node<'_>, source: &str) {
    if node.is_missing() {
        return;
    }
    let (start, end) = (node.start_byte(), node.end_byte());
    let text = &source[start..end];
    if text.trim().is_empty() {
        return;
    }

    // `#include`, `# define` and friends are `#` followed by the directive name.
    if text.starts_with('#') && text.len() > 1 {
        tokens.push(RawToken {
            kind: TokenKind::Punctuation,
            start: start as u32,
            end: start as u32 + 1,
        });
        let rest = &text[1..];
        let skipped = rest.len() - rest.trim_start().len();
        let name_start = start + 1 + skipped;
        if name_start < end {
            tokens.push(RawToken {
                kind: TokenKind::Keyword,
                start: name_start as u32,
                end: end as u32,
            });
        }
        return;
    }

    let kind = classify_leaf(node.kind(), text);
    tokens.push(RawToken {
        kind,
        start: start as u32,
        end: end as u32,
    });
}

fn classify_leaf(kind: &str, text: &str) -> TokenKind {
    if kind.ends_with("identifier") {
        return TokenKind::Identifier;
    }
    match kind {
        "primitive_type" | "true" | "false" | "this" | "auto" => TokenKind::Keyword,
        "null" if text == "NULL" => TokenKind::Identifier,
        "null" => TokenKind::Keyword,
        _ => classify_word(text),
    }
}

fn classify_word(text: &str) -> TokenKind {
    let first = text.chars().next().unwrap_or(' ');
    if first.is_ascii_alphabetic() || first == '_' {
        if KEYWORDS.contains(&text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        }
    } else if first.is_ascii_digit() {
        TokenKind::Literal
    } else {
        TokenKind::Punctuation
    }
}

/// Lex raw text starting at `base` into `tokens`.
pub(crate) fn lex_fragment(text: &str, base: u32, tokens: &mut Vec<RawToken>) {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let start = i;

        let kind = if b.is_ascii_whitespace() {
            i += 1;
            continue;
        } else if b == b'\\' && matches!(bytes.get(i + 1), Some(b'\n') | Some(b'\r')) {
            // Line continuation.
            i += 2;
            continue;
        } else if text[i..].starts_with("//") {
            i = text[i..].find('\n').map_or(bytes.len(), |n| i + n);
            TokenKind::Comment
        } else if text[i..].starts_with("/*") {
            i = text[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
            TokenKind::Comment
        } else if b == b'"' || b == b'\'' {
            i = skip_quoted(bytes, i);
            TokenKind::Literal
        } else if b.is_ascii_alphabetic() || b == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            // Prefixed literals: L"..", u8'x'.
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                i = skip_quoted(bytes, i);
                TokenKind::Literal
            } else {
                classify_word(&text[start..i])
            }
        } else if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
        {
            i += 1;
            while i < bytes.len() {
                let c = bytes[i];
                let exponent_sign = (c == b'+' || c == b'-')
                    && matches!(bytes[i - 1], b'e' | b'E' | b'p' | b'P');
                if c.is_ascii_alphanumeric() || c == b'.' || c == b'\'' || exponent_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            TokenKind::Literal
        } else {
            let rest = &text[i..];
            let width = PUNCTUATORS
                .iter()
                .find(|p| rest.starts_with(**p))
                .map_or_else(|| rest.chars().next().map_or(1, char::len_utf8), |p| p.len());
            i += width;
            TokenKind::Punctuation
        };

        tokens.push(RawToken {
            kind,
            start: base + start as u32,
            end: base + i as u32,
        });
    }
}

fn skip_quoted(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spellings(source: &str) -> Vec<(TokenKind, String)> {
        let mut tokens = Vec::new();
        lex_fragment(source, 0, &mut tokens);
        tokens
            .into_iter()
            .map(|t| (t.kind, source[t.start as usize..t.end as usize].to_string()))
            .collect()
    }

    fn parse_c(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn test_fragment_lexer() {
        let tokens = spellings("MAX(a, b) ((a) > (b) ? (a) : (b))");
        assert_eq!(tokens[0], (TokenKind::Identifier, "MAX".to_string()));
        assert_eq!(tokens[1], (TokenKind::Punctuation, "(".to_string()));
        assert_eq!(tokens.len(), 23);
    }

    #[test]
    fn test_fragment_literals_and_comments() {
        let tokens = spellings("1.5e+3 \"a\\\"b\" 'c' /* note */ x");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Literal, "1.5e+3".to_string()),
                (TokenKind::Literal, "\"a\\\"b\"".to_string()),
                (TokenKind::Literal, "'c'".to_string()),
                (TokenKind::Comment, "/* note */".to_string()),
                (TokenKind::Identifier, "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_fragment_punctuators() {
        let tokens = spellings("a->b <<= 2");
        let texts: Vec<_> = tokens.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(texts, vec!["a", "->", "b", "<<=", "2"]);
    }

    #[test]
    fn test_collect_simple_function() {
        let source = "int main() {}";
        let tree = parse_c(source);
        let tokens = collect_tokens(tree.root_node(), source);
        let texts: Vec<_> = tokens
            .iter()
            .map(|t| &source[t.start as usize..t.end as usize])
            .collect();
        assert_eq!(texts, vec!["int", "main", "(", ")", "{", "}"]);
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::Punctuation);
    }

    #[test]
    fn test_collect_directives() {
        let source = "#include <stdio.h>\n#define LIMIT (4 + 1)\n";
        let tree = parse_c(source);
        let tokens = collect_tokens(tree.root_node(), source);
        let texts: Vec<_> = tokens
            .iter()
            .map(|t| &source[t.start as usize..t.end as usize])
            .collect();
        assert_eq!(
            texts,
            vec!["#", "include", "<stdio.h>", "#", "define", "LIMIT", "(", "4", "+", "1", ")"]
        );
    }

    #[test]
    fn test_collect_keeps_comments_and_literals() {
        let source = "// lead\nchar *s = \"hi\";";
        let tree = parse_c(source);
        let tokens = collect_tokens(tree.root_node(), source);
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        let literal = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Literal)
            .unwrap();
        assert_eq!(&source[literal.start as usize..literal.end as usize], "\"hi\"");
    }
}
