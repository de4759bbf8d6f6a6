//! Serialized AST files.
//!
//! A file is a MessagePack envelope around the MessagePack-encoded [`Ast`].
//! The envelope carries a magic string, the format version and a SHA-256
//! checksum of the payload, so a truncated or foreign file is rejected
//! before the payload is decoded.

use crate::{Ast, EngineError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

const MAGIC: &str = "CINSPAST";

/// Version of the payload layout. Bumped whenever [`Ast`] changes shape.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    magic: String,
    format_version: u32,
    engine_version: String,
    /// Hex SHA-256 of `payload`
    checksum: String,
    #[serde(with = "serde_bytes")]
    payload: Vec<u8>,
}

/// Write `ast` to `path`, replacing any existing file.
pub fn save(ast: &Ast, path: &Path) -> Result<(), EngineError> {
    let failure = |message: String| EngineError::Serialization {
        path: path.to_path_buf(),
        message,
    };

    let payload = rmp_serde::to_vec(ast).map_err(|e| failure(e.to_string()))?;
    let envelope = Envelope {
        magic: MAGIC.to_string(),
        format_version: FORMAT_VERSION,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        checksum: checksum(&payload),
        payload,
    };
    let data = rmp_serde::to_vec(&envelope).map_err(|e| failure(e.to_string()))?;

    // Atomic write: write to temp file, then rename
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| failure("path has no file name".to_string()))?;
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&temp_path, &data).map_err(|e| failure(e.to_string()))?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(failure(e.to_string()));
    }

    info!(path = ?path, size = data.len(), nodes = ast.nodes.len(), "Saved AST");
    Ok(())
}

/// Read an AST written by [`save`].
pub fn load(path: &Path) -> Result<Ast, EngineError> {
    if !path.is_file() {
        return Err(EngineError::FileNotFound(path.to_path_buf()));
    }
    let failure = |message: String| EngineError::Deserialization {
        path: path.to_path_buf(),
        message,
    };

    let data = std::fs::read(path)?;
    let envelope: Envelope =
        rmp_serde::from_slice(&data).map_err(|e| failure(format!("not an AST file: {e}")))?;

    if envelope.magic != MAGIC {
        return Err(failure("not an AST file: bad magic".to_string()));
    }
    if envelope.format_version != FORMAT_VERSION {
        return Err(failure(format!(
            "unsupported AST format version {} (expected {})",
            envelope.format_version, FORMAT_VERSION
        )));
    }
    if checksum(&envelope.payload) != envelope.checksum {
        return Err(failure("checksum mismatch".to_string()));
    }

    let ast: Ast = rmp_serde::from_slice(&envelope.payload)
        .map_err(|e| failure(format!("corrupt payload: {e}")))?;
    debug!(
        path = ?path,
        engine_version = %envelope.engine_version,
        nodes = ast.nodes.len(),
        "Loaded AST"
    );
    Ok(ast)
}

fn checksum(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Entity, Node, ParseFlags, SourceFile};
    use crate::Language;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample() -> Ast {
        let file = SourceFile::new(0, PathBuf::from("input.c"), "int x;".to_string(), None);
        Ast {
            language: Language::C,
            args: vec!["-Wall".to_string()],
            flags: ParseFlags::default(),
            files: vec![file],
            nodes: vec![Node {
                entity: Entity::TranslationUnit {
                    name: "input.c".to_string(),
                },
                file: 0,
                start: 0,
                end: 6,
                location: 0,
                parent: None,
                semantic_parent: None,
                children: Vec::new(),
                referenced: None,
                references: 0,
                usr: None,
                brief_comment: None,
            }],
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unit.ast");
        save(&sample(), &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.args, vec!["-Wall".to_string()]);
        assert_eq!(loaded.main_file().contents, "int x;");
        assert!(!dir.path().join(".unit.ast.tmp").exists());
    }

    #[test]
    fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("absent.ast")).unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));
    }

    #[test]
    fn test_version_mismatch_is_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.ast");
        let payload = rmp_serde::to_vec(&sample()).unwrap();
        let envelope = Envelope {
            magic: MAGIC.to_string(),
            format_version: 7,
            engine_version: "0.0.0".to_string(),
            checksum: checksum(&payload),
            payload,
        };
        std::fs::write(&path, rmp_serde::to_vec(&envelope).unwrap()).unwrap();

        match load(&path).unwrap_err() {
            EngineError::Deserialization { message, .. } => {
                assert_eq!(message, "unsupported AST format version 7 (expected 1)")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_corruption_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unit.ast");
        std::fs::write(&path, b"definitely not msgpack").unwrap();
        assert!(matches!(
            load(&path).unwrap_err(),
            EngineError::Deserialization { .. }
        ));
    }
}
