//! Error types for translation units and their handles.

use cinspect_engine::EngineError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a handle no longer refers to live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The unit was reparsed after the handle was issued
    Reparsed,
    /// The unit or its index was disposed
    Disposed,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Reparsed => f.write_str("translation unit was reparsed"),
            StaleReason::Disposed => f.write_str("translation unit was disposed"),
        }
    }
}

/// Errors that can occur while creating, querying or mutating a unit
#[derive(Debug, Error)]
pub enum Error {
    /// No AST could be produced
    #[error("Parse error: {0}")]
    Parse(String),

    /// Main file is neither on disk nor shadowed by an unsaved file
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Serialized AST is absent, malformed or incompatible
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Reparse failed; the unit keeps its previous state
    #[error("Reparse failed: {0}")]
    Reparse(#[source] EngineError),

    /// Unit could not be saved
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File is not part of the unit
    #[error("File does not belong to this translation unit: {0}")]
    InvalidFile(PathBuf),

    /// Invalid coordinates or an inverted range
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Handle used after its unit was reparsed or disposed
    #[error("Stale handle: {0}")]
    StaleHandle(StaleReason),

    /// Handle belongs to a different unit
    #[error("Handle belongs to another translation unit")]
    ForeignHandle,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be used
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Construction failures. Loading and saving remap these on their own.
impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::FileNotFound(path) => Error::FileNotFound(path),
            EngineError::Io(e) => Error::Io(e),
            EngineError::Deserialization { .. } => Error::Deserialization(err.to_string()),
            EngineError::Serialization { .. } => Error::Serialization(err.to_string()),
            other => Error::Parse(other.to_string()),
        }
    }
}

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_mapping() {
        let err: Error = EngineError::FileNotFound(PathBuf::from("/src/missing.c")).into();
        assert!(matches!(err, Error::FileNotFound(p) if p == PathBuf::from("/src/missing.c")));

        let err: Error = EngineError::UnsupportedLanguage("fortran".to_string()).into();
        assert!(matches!(err, Error::Parse(msg) if msg.contains("fortran")));
    }

    #[test]
    fn test_stale_display() {
        let err = Error::StaleHandle(StaleReason::Reparsed);
        assert_eq!(
            err.to_string(),
            "Stale handle: translation unit was reparsed"
        );
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<Vec<u32>>("{not: [a list").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
