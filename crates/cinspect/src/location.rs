//! Files, source locations and ranges of a translation unit.

use crate::unit::UnitRef;
use crate::{Error, Result, TranslationUnit};
use chrono::{DateTime, Utc};
use cinspect_engine::{Ast, FileId, MAIN_FILE};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// A file as known to one generation of a unit.
///
/// Two files are equal when they are the same entry of the same unit
/// generation, whatever their paths look like.
#[derive(Clone)]
pub struct File {
    unit: UnitRef,
    id: FileId,
    name: PathBuf,
}

/// Identity of a [`File`] that can be stored and compared without the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileUniqueId {
    pub unit: u64,
    pub generation: u64,
    pub file: u32,
}

impl File {
    pub(crate) fn new(unit: UnitRef, ast: &Ast, id: FileId) -> Self {
        let name = ast
            .file(id)
            .map(|f| f.path.clone())
            .unwrap_or_default();
        Self { unit, id, name }
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Contents the unit was analyzed with, which may come from an unsaved file.
    pub fn contents(&self) -> Result<String> {
        let ast = self.unit.ast()?;
        Ok(ast.files[self.id as usize].contents.clone())
    }

    /// Modification time, for files read from disk.
    pub fn modified(&self) -> Result<Option<DateTime<Utc>>> {
        let ast = self.unit.ast()?;
        Ok(ast.files[self.id as usize]
            .modified
            .and_then(|secs| DateTime::from_timestamp(secs, 0)))
    }

    pub fn unique_id(&self) -> FileUniqueId {
        FileUniqueId {
            unit: self.unit.id(),
            generation: self.unit.generation(),
            file: self.id,
        }
    }

    pub fn is_main_file(&self) -> bool {
        self.id == MAIN_FILE
    }

    pub(crate) fn id(&self) -> FileId {
        self.id
    }

    pub(crate) fn unit_ref(&self) -> &UnitRef {
        &self.unit
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.id == other.id
    }
}

impl Eq for File {}

impl Hash for File {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_id().hash(state);
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("unit", &self.unit)
            .finish()
    }
}

/// A point in a file of a unit, resolved to line, column and offset.
#[derive(Clone)]
pub struct SourceLocation {
    unit: UnitRef,
    file: FileId,
    offset: u32,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Resolve a 1-based line and column. Coordinates outside the file are
    /// clamped: a line past the end goes to the last line, a column past the
    /// end of its line goes to the line end, and 0 counts as 1.
    pub fn from_line_column(
        unit: &TranslationUnit,
        file: &File,
        line: u32,
        column: u32,
    ) -> Result<Self> {
        let ast = unit.checked_file(file)?;
        let offset = ast.files[file.id as usize].offset_of(line, column);
        Ok(Self::resolved(file.unit.clone(), &ast, file.id, offset))
    }

    /// Resolve a byte offset. Offsets past the end of the file go to EOF.
    pub fn from_offset(unit: &TranslationUnit, file: &File, offset: u32) -> Result<Self> {
        let ast = unit.checked_file(file)?;
        Ok(Self::resolved(file.unit.clone(), &ast, file.id, offset))
    }

    pub(crate) fn resolved(unit: UnitRef, ast: &Ast, file: FileId, offset: u32) -> Self {
        let source = ast.file(file);
        let offset = offset.min(source.map_or(0, |f| f.len()));
        let (line, column) = source.map_or((1, 1), |f| f.line_column(offset));
        Self {
            unit,
            file,
            offset,
            line,
            column,
        }
    }

    /// 1-based line
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based byte column
    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn file(&self) -> Result<File> {
        let ast = self.unit.ast()?;
        Ok(File::new(self.unit.clone(), &ast, self.file))
    }

    /// Whether the location lies in the unit's main file rather than a header.
    pub fn is_from_main_file(&self) -> bool {
        self.file == MAIN_FILE
    }

    pub(crate) fn file_id(&self) -> FileId {
        self.file
    }

    pub(crate) fn unit_ref(&self) -> &UnitRef {
        &self.unit
    }
}

impl PartialEq for SourceLocation {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.file == other.file && self.offset == other.offset
    }
}

/// Locations are ordered only within one file of one unit.
impl PartialOrd for SourceLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.unit != other.unit || self.file != other.file {
            return None;
        }
        Some(self.offset.cmp(&other.offset))
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SourceLocation({:?} file {} {}:{} @{})",
            self.unit, self.file, self.line, self.column, self.offset
        )
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open byte range between two locations of one unit.
///
/// The ends may lie in different files. When they share a file, the start
/// must not come after the end.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRange {
    start: SourceLocation,
    end: SourceLocation,
}

impl SourceRange {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Result<Self> {
        if !start.unit.same_unit(&end.unit) {
            return Err(Error::ForeignHandle);
        }
        if start.file == end.file && start.offset > end.offset {
            return Err(Error::OutOfRange(format!(
                "range start {} is after its end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub(crate) fn from_offsets(unit: &UnitRef, ast: &Ast, file: FileId, start: u32, end: u32) -> Self {
        Self {
            start: SourceLocation::resolved(unit.clone(), ast, file, start),
            end: SourceLocation::resolved(unit.clone(), ast, file, end),
        }
    }

    pub fn start(&self) -> &SourceLocation {
        &self.start
    }

    pub fn end(&self) -> &SourceLocation {
        &self.end
    }

    /// Whether `location` lies in `[start, end)` of the same file.
    pub fn contains(&self, location: &SourceLocation) -> bool {
        matches!(
            (self.start.partial_cmp(location), location.partial_cmp(&self.end)),
            (Some(Ordering::Less | Ordering::Equal), Some(Ordering::Less))
        )
    }
}
