//! cinspect Analysis Engine
//!
//! This crate turns C-family source plus command-line arguments into an
//! arena AST and diagnostics:
//! - Argument interpretation (`-I`, `-D`, `-include`, `-x`, warnings)
//! - Parsing via tree-sitter for C and C++
//! - Include resolution with in-memory overlays and `#if` evaluation
//! - Lowering into a closed set of entities with name resolution
//! - A small diagnostics pass
//! - Persistence of analyzed units

pub mod args;
pub mod ast;
mod builder;
mod checks;
pub mod diagnostic;
mod engine;
mod error;
mod language;
mod lexer;
pub mod persist;

pub use args::{Args, WarningFlags};
pub use ast::{
    Ast, CursorKind, Entity, FileId, FunctionInfo, IncludeSite, Node, NodeId, ParseFlags,
    RawToken, RecordInfo, SourceFile, StorageClass, TokenKind, VarInfo, MAIN_FILE, ROOT,
};
pub use builder::normalize_path;
pub use diagnostic::{Diagnostic, DiagnosticLocation, FixIt, Severity};
pub use engine::{Engine, EngineSettings, ParseRequest};
pub use error::EngineError;
pub use language::{detect_language, Language};
