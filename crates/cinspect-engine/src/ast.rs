//! Arena representation of an analyzed translation unit.
//!
//! Nodes, files and tokens live in flat vectors and refer to each other by
//! index. Node 0 is always the translation-unit root and file 0 is always
//! the main file.

use crate::{Diagnostic, Language};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Index of a node in [`Ast::nodes`].
pub type NodeId = u32;

/// Index of a file in [`Ast::files`].
pub type FileId = u32;

/// The root node of every AST.
pub const ROOT: NodeId = 0;

/// The main file of every AST.
pub const MAIN_FILE: FileId = 0;

/// Options that shaped an AST, persisted with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFlags {
    pub detailed_preprocessing_record: bool,
    pub skip_function_bodies: bool,
    pub single_file_parse: bool,
    pub keep_going: bool,
    pub include_brief_comments: bool,
}

/// Everything the engine produced for one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ast {
    pub language: Language,
    /// Arguments as given by the client
    pub args: Vec<String>,
    pub flags: ParseFlags,
    pub files: Vec<SourceFile>,
    pub nodes: Vec<Node>,
    /// In emission order
    pub diagnostics: Vec<Diagnostic>,
}

/// Where a file was included from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeSite {
    pub file: FileId,
    /// Offset of the `#include` directive in the including file
    pub offset: u32,
}

/// A file entered while building the unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub contents: String,
    /// Offset of the first byte of each line
    pub line_starts: Vec<u32>,
    pub tokens: Vec<RawToken>,
    pub included_from: Option<IncludeSite>,
    /// Entered through `-include`
    pub preamble: bool,
    /// Wrapped in an include guard or marked `#pragma once`
    pub guarded: bool,
    /// Modification time in seconds since the epoch, for files read from disk
    pub modified: Option<i64>,
}

impl SourceFile {
    pub(crate) fn new(id: FileId, path: PathBuf, contents: String, modified: Option<i64>) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            contents
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i as u32 + 1),
        );
        Self {
            id,
            path,
            contents,
            line_starts,
            tokens: Vec::new(),
            included_from: None,
            preamble: false,
            guarded: false,
            modified,
        }
    }

    pub fn len(&self) -> u32 {
        self.contents.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// 1-based line and column of an offset. Offsets past the end resolve to EOF.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        (line as u32 + 1, offset - self.line_starts[line] + 1)
    }

    /// Offset of a 1-based line and column, clamped into the file.
    ///
    /// Line or column 0 count as 1, a line past the end is the last line and
    /// a column past the end of its line lands on the line terminator (or EOF).
    pub fn offset_of(&self, line: u32, column: u32) -> u32 {
        let line_index = (line.max(1) as usize - 1).min(self.line_starts.len() - 1);
        let start = self.line_starts[line_index];
        let line_end = match self.line_starts.get(line_index + 1) {
            Some(next) => next - 1,
            None => self.len(),
        };
        start.saturating_add(column.max(1) - 1).min(line_end)
    }

    pub fn text(&self, start: u32, end: u32) -> &str {
        self.contents
            .get(start as usize..end as usize)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &Path {
        &self.path
    }
}

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Punctuation,
    Keyword,
    Identifier,
    Literal,
    Comment,
}

/// A token as a byte range of its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawToken {
    pub kind: TokenKind,
    pub start: u32,
    pub end: u32,
}

/// Storage class written on a declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    #[default]
    None,
    Static,
    Extern,
    Register,
    Auto,
}

/// Data of a function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub return_type: String,
    pub params: Vec<String>,
    pub variadic: bool,
    pub storage: StorageClass,
    pub is_definition: bool,
}

impl FunctionInfo {
    /// Type spelled the way declarations print it, e.g. `int (int, char *)`.
    pub fn type_spelling(&self) -> String {
        let mut params = self.params.join(", ");
        if self.variadic {
            if !params.is_empty() {
                params.push_str(", ");
            }
            params.push_str("...");
        } else if params.is_empty() {
            params.push_str("void");
        }
        format!("{} ({})", self.return_type, params)
    }
}

/// Data of a variable or parameter declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarInfo {
    pub name: String,
    pub ty: String,
    pub storage: StorageClass,
    pub has_init: bool,
    /// Declared inside a function
    pub is_local: bool,
}

/// Data of a struct, union, class or enum declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInfo {
    pub name: Option<String>,
    pub is_definition: bool,
}

/// AST node payload. Each variant carries only what is meaningful for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    TranslationUnit { name: String },

    FunctionDecl(FunctionInfo),
    CxxMethod(FunctionInfo),
    VarDecl(VarInfo),
    ParmDecl(VarInfo),
    FieldDecl { name: String, ty: String },
    StructDecl(RecordInfo),
    UnionDecl(RecordInfo),
    ClassDecl(RecordInfo),
    EnumDecl(RecordInfo),
    EnumConstantDecl { name: String, value: i64 },
    TypedefDecl { name: String, underlying: String },
    Namespace { name: Option<String> },

    CompoundStmt,
    DeclStmt,
    ReturnStmt,
    IfStmt,
    WhileStmt,
    DoStmt,
    ForStmt,
    SwitchStmt,
    CaseStmt,
    DefaultStmt,
    BreakStmt,
    ContinueStmt,
    GotoStmt { label: String },
    LabelStmt { label: String },
    NullStmt,

    CallExpr { callee: String },
    DeclRefExpr { name: String },
    MemberRefExpr { member: String, arrow: bool },
    IntegerLiteral { text: String },
    FloatingLiteral { text: String },
    StringLiteral { text: String },
    CharacterLiteral { text: String },
    BinaryOperator { op: String },
    UnaryOperator { op: String, prefix: bool },
    ParenExpr,
    ConditionalOperator,
    ArraySubscriptExpr,
    CStyleCastExpr { ty: String },
    InitListExpr,

    TypeRef { name: String },

    InclusionDirective {
        path: String,
        angled: bool,
        resolved: Option<FileId>,
    },
    MacroDefinition { name: String, function_like: bool },

    UnexposedDecl,
    UnexposedStmt,
    UnexposedExpr,
}

/// Closed set of node kinds, the tag of [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorKind {
    TranslationUnit,
    FunctionDecl,
    CxxMethod,
    VarDecl,
    ParmDecl,
    FieldDecl,
    StructDecl,
    UnionDecl,
    ClassDecl,
    EnumDecl,
    EnumConstantDecl,
    TypedefDecl,
    Namespace,
    CompoundStmt,
    DeclStmt,
    ReturnStmt,
    IfStmt,
    WhileStmt,
    DoStmt,
    ForStmt,
    SwitchStmt,
    CaseStmt,
    DefaultStmt,
    BreakStmt,
    ContinueStmt,
    GotoStmt,
    LabelStmt,
    NullStmt,
    CallExpr,
    DeclRefExpr,
    MemberRefExpr,
    IntegerLiteral,
    FloatingLiteral,
    StringLiteral,
    CharacterLiteral,
    BinaryOperator,
    UnaryOperator,
    ParenExpr,
    ConditionalOperator,
    ArraySubscriptExpr,
    CStyleCastExpr,
    InitListExpr,
    TypeRef,
    InclusionDirective,
    MacroDefinition,
    UnexposedDecl,
    UnexposedStmt,
    UnexposedExpr,
}

impl CursorKind {
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            CursorKind::FunctionDecl
                | CursorKind::CxxMethod
                | CursorKind::VarDecl
                | CursorKind::ParmDecl
                | CursorKind::FieldDecl
                | CursorKind::StructDecl
                | CursorKind::UnionDecl
                | CursorKind::ClassDecl
                | CursorKind::EnumDecl
                | CursorKind::EnumConstantDecl
                | CursorKind::TypedefDecl
                | CursorKind::Namespace
                | CursorKind::UnexposedDecl
        )
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            CursorKind::CompoundStmt
                | CursorKind::DeclStmt
                | CursorKind::ReturnStmt
                | CursorKind::IfStmt
                | CursorKind::WhileStmt
                | CursorKind::DoStmt
                | CursorKind::ForStmt
                | CursorKind::SwitchStmt
                | CursorKind::CaseStmt
                | CursorKind::DefaultStmt
                | CursorKind::BreakStmt
                | CursorKind::ContinueStmt
                | CursorKind::GotoStmt
                | CursorKind::LabelStmt
                | CursorKind::NullStmt
                | CursorKind::UnexposedStmt
        )
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            CursorKind::CallExpr
                | CursorKind::DeclRefExpr
                | CursorKind::MemberRefExpr
                | CursorKind::IntegerLiteral
                | CursorKind::FloatingLiteral
                | CursorKind::StringLiteral
                | CursorKind::CharacterLiteral
                | CursorKind::BinaryOperator
                | CursorKind::UnaryOperator
                | CursorKind::ParenExpr
                | CursorKind::ConditionalOperator
                | CursorKind::ArraySubscriptExpr
                | CursorKind::CStyleCastExpr
                | CursorKind::InitListExpr
                | CursorKind::UnexposedExpr
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, CursorKind::TypeRef)
    }

    pub fn is_preprocessing(&self) -> bool {
        matches!(
            self,
            CursorKind::InclusionDirective | CursorKind::MacroDefinition
        )
    }

    pub fn is_unexposed(&self) -> bool {
        matches!(
            self,
            CursorKind::UnexposedDecl | CursorKind::UnexposedStmt | CursorKind::UnexposedExpr
        )
    }
}

impl Entity {
    pub fn kind(&self) -> CursorKind {
        match self {
            Entity::TranslationUnit { .. } => CursorKind::TranslationUnit,
            Entity::FunctionDecl(_) => CursorKind::FunctionDecl,
            Entity::CxxMethod(_) => CursorKind::CxxMethod,
            Entity::VarDecl(_) => CursorKind::VarDecl,
            Entity::ParmDecl(_) => CursorKind::ParmDecl,
            Entity::FieldDecl { .. } => CursorKind::FieldDecl,
            Entity::StructDecl(_) => CursorKind::StructDecl,
            Entity::UnionDecl(_) => CursorKind::UnionDecl,
            Entity::ClassDecl(_) => CursorKind::ClassDecl,
            Entity::EnumDecl(_) => CursorKind::EnumDecl,
            Entity::EnumConstantDecl { .. } => CursorKind::EnumConstantDecl,
            Entity::TypedefDecl { .. } => CursorKind::TypedefDecl,
            Entity::Namespace { .. } => CursorKind::Namespace,
            Entity::CompoundStmt => CursorKind::CompoundStmt,
            Entity::DeclStmt => CursorKind::DeclStmt,
            Entity::ReturnStmt => CursorKind::ReturnStmt,
            Entity::IfStmt => CursorKind::IfStmt,
            Entity::WhileStmt => CursorKind::WhileStmt,
            Entity::DoStmt => CursorKind::DoStmt,
            Entity::ForStmt => CursorKind::ForStmt,
            Entity::SwitchStmt => CursorKind::SwitchStmt,
            Entity::CaseStmt => CursorKind::CaseStmt,
            Entity::DefaultStmt => CursorKind::DefaultStmt,
            Entity::BreakStmt => CursorKind::BreakStmt,
            Entity::ContinueStmt => CursorKind::ContinueStmt,
            Entity::GotoStmt { .. } => CursorKind::GotoStmt,
            Entity::LabelStmt { .. } => CursorKind::LabelStmt,
            Entity::NullStmt => CursorKind::NullStmt,
            Entity::CallExpr { .. } => CursorKind::CallExpr,
            Entity::DeclRefExpr { .. } => CursorKind::DeclRefExpr,
            Entity::MemberRefExpr { .. } => CursorKind::MemberRefExpr,
            Entity::IntegerLiteral { .. } => CursorKind::IntegerLiteral,
            Entity::FloatingLiteral { .. } => CursorKind::FloatingLiteral,
            Entity::StringLiteral { .. } => CursorKind::StringLiteral,
            Entity::CharacterLiteral { .. } => CursorKind::CharacterLiteral,
            Entity::BinaryOperator { .. } => CursorKind::BinaryOperator,
            Entity::UnaryOperator { .. } => CursorKind::UnaryOperator,
            Entity::ParenExpr => CursorKind::ParenExpr,
            Entity::ConditionalOperator => CursorKind::ConditionalOperator,
            Entity::ArraySubscriptExpr => CursorKind::ArraySubscriptExpr,
            Entity::CStyleCastExpr { .. } => CursorKind::CStyleCastExpr,
            Entity::InitListExpr => CursorKind::InitListExpr,
            Entity::TypeRef { .. } => CursorKind::TypeRef,
            Entity::InclusionDirective { .. } => CursorKind::InclusionDirective,
            Entity::MacroDefinition { .. } => CursorKind::MacroDefinition,
            Entity::UnexposedDecl => CursorKind::UnexposedDecl,
            Entity::UnexposedStmt => CursorKind::UnexposedStmt,
            Entity::UnexposedExpr => CursorKind::UnexposedExpr,
        }
    }

    /// The name this entity is spelled with, if it has one.
    pub fn spelling(&self) -> Option<&str> {
        match self {
            Entity::TranslationUnit { name } => Some(name),
            Entity::FunctionDecl(info) | Entity::CxxMethod(info) => Some(&info.name),
            Entity::VarDecl(info) | Entity::ParmDecl(info) => Some(&info.name),
            Entity::FieldDecl { name, .. }
            | Entity::EnumConstantDecl { name, .. }
            | Entity::TypedefDecl { name, .. }
            | Entity::DeclRefExpr { name }
            | Entity::TypeRef { name }
            | Entity::MacroDefinition { name, .. } => Some(name),
            Entity::StructDecl(info)
            | Entity::UnionDecl(info)
            | Entity::ClassDecl(info)
            | Entity::EnumDecl(info) => info.name.as_deref(),
            Entity::Namespace { name } => name.as_deref(),
            Entity::GotoStmt { label } | Entity::LabelStmt { label } => Some(label),
            Entity::CallExpr { callee } => Some(callee),
            Entity::MemberRefExpr { member, .. } => Some(member),
            Entity::IntegerLiteral { text }
            | Entity::FloatingLiteral { text }
            | Entity::StringLiteral { text }
            | Entity::CharacterLiteral { text } => Some(text),
            Entity::BinaryOperator { op } | Entity::UnaryOperator { op, .. } => Some(op),
            Entity::InclusionDirective { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether this declaration is also a definition.
    pub fn is_definition(&self) -> bool {
        match self {
            Entity::FunctionDecl(info) | Entity::CxxMethod(info) => info.is_definition,
            Entity::VarDecl(info) => info.storage != StorageClass::Extern || info.has_init,
            Entity::StructDecl(info)
            | Entity::UnionDecl(info)
            | Entity::ClassDecl(info)
            | Entity::EnumDecl(info) => info.is_definition,
            Entity::ParmDecl(_)
            | Entity::FieldDecl { .. }
            | Entity::EnumConstantDecl { .. }
            | Entity::TypedefDecl { .. }
            | Entity::Namespace { .. } => true,
            _ => false,
        }
    }

    /// Declared type, for entities that have one.
    pub fn type_spelling(&self) -> Option<String> {
        match self {
            Entity::FunctionDecl(info) | Entity::CxxMethod(info) => Some(info.type_spelling()),
            Entity::VarDecl(info) | Entity::ParmDecl(info) => Some(info.ty.clone()),
            Entity::FieldDecl { ty, .. } => Some(ty.clone()),
            Entity::TypedefDecl { underlying, .. } => Some(underlying.clone()),
            Entity::CStyleCastExpr { ty } => Some(ty.clone()),
            _ => None,
        }
    }
}

/// One node of the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub entity: Entity,
    pub file: FileId,
    /// Byte extent, half-open
    pub start: u32,
    pub end: u32,
    /// Offset of the spelling location (the name, for declarations)
    pub location: u32,
    pub parent: Option<NodeId>,
    /// Set when it differs from `parent`, e.g. out-of-line method definitions
    pub semantic_parent: Option<NodeId>,
    /// In source order
    pub children: Vec<NodeId>,
    /// Declaration this node refers to
    pub referenced: Option<NodeId>,
    /// Number of references resolved to this declaration
    pub references: u32,
    pub usr: Option<String>,
    pub brief_comment: Option<String>,
}

impl Node {
    pub fn kind(&self) -> CursorKind {
        self.entity.kind()
    }
}

impl Ast {
    pub fn root(&self) -> &Node {
        &self.nodes[ROOT as usize]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id as usize)
    }

    pub fn main_file(&self) -> &SourceFile {
        &self.files[MAIN_FILE as usize]
    }

    /// Find a file by path, as given or after lexical normalization.
    pub fn find_file(&self, path: &Path) -> Option<FileId> {
        let normalized = crate::builder::normalize_path(path);
        self.files
            .iter()
            .find(|f| f.path == path || f.path == normalized)
            .map(|f| f.id)
    }

    /// Tokens of `file` starting in `[start, end)`, comments excluded.
    pub fn tokens_in(&self, file: FileId, start: u32, end: u32) -> Vec<RawToken> {
        let Some(file) = self.file(file) else {
            return Vec::new();
        };
        let first = file.tokens.partition_point(|t| t.start < start);
        file.tokens[first..]
            .iter()
            .take_while(|t| t.start < end)
            .filter(|t| t.kind != TokenKind::Comment)
            .copied()
            .collect()
    }

    /// Innermost node of `file` whose extent contains `offset`.
    pub fn node_at(&self, file: FileId, offset: u32) -> Option<NodeId> {
        let mut current = ROOT;
        'descend: loop {
            for &child in &self.nodes[current as usize].children {
                let node = &self.nodes[child as usize];
                if node.file == file && node.start <= offset && offset < node.end {
                    current = child;
                    continue 'descend;
                }
            }
            break;
        }
        (current != ROOT).then_some(current)
    }

    /// Chain of include sites from the main file down to `file`, outermost first.
    pub fn include_stack(&self, file: FileId) -> Vec<IncludeSite> {
        let mut stack = Vec::new();
        let mut current = self.file(file).and_then(|f| f.included_from);
        while let Some(site) = current {
            stack.push(site);
            current = self.file(site.file).and_then(|f| f.included_from);
        }
        stack.reverse();
        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(contents: &str) -> SourceFile {
        SourceFile::new(0, PathBuf::from("main.c"), contents.to_string(), None)
    }

    #[test]
    fn test_line_starts() {
        let f = file("int a;\nint b;\n\nint c;");
        assert_eq!(f.line_starts, vec![0, 7, 14, 15]);
    }

    #[test]
    fn test_line_column_roundtrip() {
        let f = file("int main(void) {\n  int a = 1;\n}\n");
        assert_eq!(f.line_column(19), (2, 3));
        assert_eq!(f.offset_of(2, 3), 19);
        assert_eq!(f.line_column(0), (1, 1));
    }

    #[test]
    fn test_offset_clamping() {
        let f = file("ab\ncd");
        // Column past the end of line 1 lands on its newline.
        assert_eq!(f.offset_of(1, 40), 2);
        // Line past the end is the last line.
        assert_eq!(f.offset_of(9, 1), 3);
        // Zero coordinates count as 1.
        assert_eq!(f.offset_of(0, 0), 0);
        // Offsets past EOF resolve to EOF.
        assert_eq!(f.line_column(100), (2, 3));
    }

    #[test]
    fn test_offset_clamping_at_u32_limits() {
        let f = file("ab\ncd");
        assert_eq!(f.offset_of(1, u32::MAX), 2);
        assert_eq!(f.offset_of(u32::MAX, u32::MAX), 5);
        assert_eq!(f.offset_of(u32::MAX, 1), 3);
    }

    #[test]
    fn test_function_type_spelling() {
        let info = FunctionInfo {
            name: "add".to_string(),
            return_type: "int".to_string(),
            params: vec!["int".to_string(), "int".to_string()],
            variadic: false,
            storage: StorageClass::None,
            is_definition: false,
        };
        assert_eq!(info.type_spelling(), "int (int, int)");

        let info = FunctionInfo {
            params: vec!["const char *".to_string()],
            variadic: true,
            ..info
        };
        assert_eq!(info.type_spelling(), "int (const char *, ...)");
    }

    #[test]
    fn test_kind_categories() {
        assert!(CursorKind::FunctionDecl.is_declaration());
        assert!(CursorKind::ReturnStmt.is_statement());
        assert!(CursorKind::CallExpr.is_expression());
        assert!(CursorKind::TypeRef.is_reference());
        assert!(CursorKind::InclusionDirective.is_preprocessing());
        assert!(!CursorKind::TranslationUnit.is_declaration());
    }

    #[test]
    fn test_extern_variable_is_not_definition() {
        let var = Entity::VarDecl(VarInfo {
            name: "counter".to_string(),
            ty: "int".to_string(),
            storage: StorageClass::Extern,
            has_init: false,
            is_local: false,
        });
        assert!(!var.is_definition());
        assert_eq!(var.spelling(), Some("counter"));
        assert_eq!(var.kind(), CursorKind::VarDecl);
    }
}
