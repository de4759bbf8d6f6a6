//! Lexical tokens of a unit.

use crate::location::{SourceLocation, SourceRange};
use crate::unit::UnitRef;
use crate::{Result, TranslationUnit};
use cinspect_engine::{Ast, FileId, RawToken};

pub use cinspect_engine::TokenKind;

/// A token and the range it covers.
///
/// The spelling is not stored; it is read back from the unit that produced
/// the token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    kind: TokenKind,
    range: SourceRange,
}

impl Token {
    pub(crate) fn new(unit: &UnitRef, ast: &Ast, file: FileId, raw: RawToken) -> Self {
        Self {
            kind: raw.kind,
            range: SourceRange::from_offsets(unit, ast, file, raw.start, raw.end),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn range(&self) -> &SourceRange {
        &self.range
    }

    pub fn location(&self) -> &SourceLocation {
        self.range.start()
    }

    /// Text of the token. `unit` must be the unit, at the generation, that
    /// produced it.
    pub fn spelling(&self, unit: &TranslationUnit) -> Result<String> {
        let start = self.range.start();
        let ast = start.unit_ref().ast_in(unit)?;
        let file = &ast.files[start.file_id() as usize];
        Ok(file.text(start.offset(), self.range.end().offset()).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Language};

    fn spellings(unit: &TranslationUnit) -> Vec<String> {
        let range = unit.cursor().unwrap().range().unwrap();
        unit.tokens(&range)
            .unwrap()
            .iter()
            .map(|t| t.spelling(unit).unwrap())
            .collect()
    }

    #[test]
    fn test_tokens_of_root_range() {
        let unit = TranslationUnit::from_source("int main() {}", Language::C, &[] as &[&str]).unwrap();
        assert_eq!(spellings(&unit), vec!["int", "main", "(", ")", "{", "}"]);
    }

    #[test]
    fn test_comments_are_skipped() {
        let unit = TranslationUnit::from_source(
            "/* lead */ int x = 42; // trailing\n",
            Language::C,
            &[] as &[&str],
        )
        .unwrap();
        let range = unit.cursor().unwrap().range().unwrap();
        let tokens = unit.tokens(&range).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(Token::kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword,
                TokenKind::Identifier,
                TokenKind::Punctuation,
                TokenKind::Literal,
                TokenKind::Punctuation,
            ]
        );
        assert_eq!(tokens[1].location().column(), 16);
    }

    #[test]
    fn test_spelling_needs_owning_unit() {
        let first = TranslationUnit::from_source("int a;", Language::C, &[] as &[&str]).unwrap();
        let second = TranslationUnit::from_source("int b;", Language::C, &[] as &[&str]).unwrap();
        let range = first.cursor().unwrap().range().unwrap();
        let token = first.tokens(&range).unwrap().remove(0);
        assert!(matches!(
            token.spelling(&second).unwrap_err(),
            Error::ForeignHandle
        ));
        assert!(matches!(
            second.tokens(&range).unwrap_err(),
            Error::ForeignHandle
        ));
    }
}
