//! Integer constant evaluation for `#if` conditions and enumerator values.

use super::{text, Builder};
use tree_sitter::Node as TsNode;

/// Bound on macro-to-macro indirection in `#if` conditions.
const MAX_MACRO_DEPTH: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Identifiers are macros and `defined` is available
    Preprocessor,
    /// Identifiers are enumerators seen so far
    Constant,
}

impl Builder<'_> {
    pub(super) fn eval_preprocessor(&mut self, node: TsNode<'_>, src: &str, depth: u32) -> i64 {
        self.eval(node, src, Mode::Preprocessor, depth)
    }

    pub(super) fn eval_constant(&mut self, node: TsNode<'_>, src: &str) -> i64 {
        self.eval(node, src, Mode::Constant, 0)
    }

    fn eval(&mut self, node: TsNode<'_>, src: &str, mode: Mode, depth: u32) -> i64 {
        match node.kind() {
            "number_literal" => parse_integer(text(node, src)).unwrap_or(0),
            "char_literal" => parse_char(text(node, src)),
            "true" => 1,
            "identifier" => {
                let name = text(node, src);
                match mode {
                    Mode::Preprocessor => self.macro_value(name, depth),
                    Mode::Constant => self.enum_values.get(name).copied().unwrap_or(0),
                }
            }
            "preproc_defined" => node
                .named_child(0)
                .map_or(0, |name| i64::from(self.macros.contains_key(text(name, src)))),
            "parenthesized_expression" => node
                .named_child(0)
                .map_or(0, |inner| self.eval(inner, src, mode, depth)),
            "unary_expression" => {
                let operand = node
                    .child_by_field_name("argument")
                    .map_or(0, |arg| self.eval(arg, src, mode, depth));
                match node.child_by_field_name("operator").map(|op| text(op, src)) {
                    Some("!") => i64::from(operand == 0),
                    Some("-") => operand.wrapping_neg(),
                    Some("~") => !operand,
                    _ => operand,
                }
            }
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|op| text(op, src))
                    .unwrap_or_default();
                let left = node
                    .child_by_field_name("left")
                    .map_or(0, |l| self.eval(l, src, mode, depth));
                let right_node = node.child_by_field_name("right");
                match op {
                    "&&" if left == 0 => 0,
                    "||" if left != 0 => 1,
                    _ => {
                        let right = right_node.map_or(0, |r| self.eval(r, src, mode, depth));
                        binary(op, left, right)
                    }
                }
            }
            "conditional_expression" => {
                let condition = node
                    .child_by_field_name("condition")
                    .map_or(0, |c| self.eval(c, src, mode, depth));
                let branch = if condition != 0 {
                    node.child_by_field_name("consequence")
                } else {
                    node.child_by_field_name("alternative")
                };
                branch.map_or(0, |b| self.eval(b, src, mode, depth))
            }
            "cast_expression" => node
                .child_by_field_name("value")
                .map_or(0, |v| self.eval(v, src, mode, depth)),
            _ => 0,
        }
    }

    /// Value of a macro used in `#if`. Undefined names are 0.
    fn macro_value(&mut self, name: &str, depth: u32) -> i64 {
        let Some(value) = self.macros.get(name).map(|m| m.value.clone()) else {
            return 0;
        };
        if let Some(number) = parse_integer(&value) {
            return number;
        }
        if value.is_empty() || depth >= MAX_MACRO_DEPTH {
            return 0;
        }

        // Parse the replacement text as a condition of its own.
        let probe = format!("#if {value}\n#endif\n");
        let Some(tree) = self.parser.parse(&probe, None) else {
            return 0;
        };
        let condition = tree
            .root_node()
            .named_child(0)
            .and_then(|directive| directive.child_by_field_name("condition"));
        condition.map_or(0, |c| self.eval(c, &probe, Mode::Preprocessor, depth + 1))
    }
}

fn binary(op: &str, left: i64, right: i64) -> i64 {
    match op {
        "+" => left.wrapping_add(right),
        "-" => left.wrapping_sub(right),
        "*" => left.wrapping_mul(right),
        "/" => left.checked_div(right).unwrap_or(0),
        "%" => left.checked_rem(right).unwrap_or(0),
        "<<" => left.wrapping_shl(right as u32),
        ">>" => left.wrapping_shr(right as u32),
        "&" => left & right,
        "|" => left | right,
        "^" => left ^ right,
        "<" => i64::from(left < right),
        ">" => i64::from(left > right),
        "<=" => i64::from(left <= right),
        ">=" => i64::from(left >= right),
        "==" => i64::from(left == right),
        "!=" => i64::from(left != right),
        "&&" => i64::from(left != 0 && right != 0),
        "||" => i64::from(left != 0 || right != 0),
        _ => 0,
    }
}

/// Value of an integer literal, suffixes and digit separators allowed.
pub(crate) fn parse_integer(literal: &str) -> Option<i64> {
    let lower = literal.trim().to_ascii_lowercase().replace('\'', "");
    let digits = lower.trim_end_matches(['u', 'l', 'z']);
    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x") {
        (16, hex)
    } else if let Some(bin) = digits.strip_prefix("0b") {
        (2, bin)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    u64::from_str_radix(body, radix).ok().map(|v| v as i64)
}

fn parse_char(literal: &str) -> i64 {
    let Some(start) = literal.find('\'') else {
        return 0;
    };
    let inner = literal[start + 1..].trim_end_matches('\'');
    let mut chars = inner.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            Some('n') => 10,
            Some('t') => 9,
            Some('r') => 13,
            Some('0') if inner.len() == 2 => 0,
            Some('a') => 7,
            Some('b') => 8,
            Some('f') => 12,
            Some('v') => 11,
            Some('x') => i64::from_str_radix(&inner[2..], 16).unwrap_or(0),
            Some(c) if c.is_digit(8) => i64::from_str_radix(&inner[1..], 8).unwrap_or(0),
            Some(c) => c as i64,
            None => 0,
        },
        Some(c) => c as i64,
        None => 0,
    }
}
