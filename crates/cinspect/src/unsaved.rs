//! In-memory file contents that shadow the disk during parse and reparse.

use std::path::{Path, PathBuf};

/// A filename and the contents to use for it instead of what is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsavedFile {
    filename: PathBuf,
    contents: String,
}

impl UnsavedFile {
    pub fn new(filename: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn set_filename(&mut self, filename: impl Into<PathBuf>) {
        self.filename = filename.into();
    }

    pub fn set_contents(&mut self, contents: impl Into<String>) {
        self.contents = contents.into();
    }

    /// Length of the contents in bytes
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub(crate) fn overlay(&self) -> (PathBuf, String) {
        (self.filename.clone(), self.contents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_follows_contents() {
        let mut file = UnsavedFile::new("main.c", "int x;");
        assert_eq!(file.len(), 6);

        file.set_contents("/* \u{e9} */");
        assert_eq!(file.len(), 8);
        assert!(!file.is_empty());

        file.set_filename("other.c");
        assert_eq!(file.filename(), Path::new("other.c"));
    }
}
