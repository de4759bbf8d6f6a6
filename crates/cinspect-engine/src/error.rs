//! Engine error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while the engine parses, saves or loads a unit.
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file is neither on disk nor shadowed by an overlay
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// No AST could be produced for the input
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Serialized AST is malformed or incompatible
    #[error("Cannot load AST file {path}: {message}")]
    Deserialization { path: PathBuf, message: String },

    /// Serialized AST could not be written
    #[error("Cannot save AST file {path}: {message}")]
    Serialization { path: PathBuf, message: String },

    /// `-x` named a language the engine does not know
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Malformed command-line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A grammar could not be loaded into the parser
    #[error("Grammar error: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
}

impl EngineError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        EngineError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
