//! Translation units and the generation-checked references handles hold to them.

use crate::cursor::Cursor;
use crate::index::{Index, IndexShared};
use crate::location::{File, SourceLocation, SourceRange};
use crate::token::Token;
use crate::{Diagnostic, Error, Result, StaleReason, UnsavedFile};
use cinspect_engine::{
    persist, Ast, EngineError, Language, ParseFlags, ParseRequest, MAIN_FILE, ROOT,
};
use parking_lot::RwLock;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

option_set! {
    /// Options for creating a unit.
    ParseOptions {
        /// Keep `#include` and `#define` directives as cursors
        DETAILED_PREPROCESSING_RECORD = 0x01;
        /// Drop function bodies from the AST
        SKIP_FUNCTION_BODIES = 0x40;
        /// Attach doc comments to declarations
        INCLUDE_BRIEF_COMMENTS_IN_CODE_COMPLETION = 0x80;
        /// Keep reporting diagnostics after a fatal one
        KEEP_GOING = 0x200;
        /// Do not enter included files
        SINGLE_FILE_PARSE = 0x400;
    }
}

option_set! {
    /// Options for reparsing a unit.
    ReparseOptions {}
}

option_set! {
    /// Options for saving a unit.
    SaveOptions {}
}

impl ParseOptions {
    fn flags(self) -> ParseFlags {
        ParseFlags {
            detailed_preprocessing_record: self.contains(Self::DETAILED_PREPROCESSING_RECORD),
            skip_function_bodies: self.contains(Self::SKIP_FUNCTION_BODIES),
            single_file_parse: self.contains(Self::SINGLE_FILE_PARSE),
            keep_going: self.contains(Self::KEEP_GOING),
            include_brief_comments: self.contains(Self::INCLUDE_BRIEF_COMMENTS_IN_CODE_COMPLETION),
        }
    }

    fn from_flags(flags: ParseFlags) -> Self {
        let mut options = Self::NONE;
        let pairs = [
            (flags.detailed_preprocessing_record, Self::DETAILED_PREPROCESSING_RECORD),
            (flags.skip_function_bodies, Self::SKIP_FUNCTION_BODIES),
            (flags.single_file_parse, Self::SINGLE_FILE_PARSE),
            (flags.keep_going, Self::KEEP_GOING),
            (flags.include_brief_comments, Self::INCLUDE_BRIEF_COMMENTS_IN_CODE_COMPLETION),
        ];
        for (set, option) in pairs {
            if set {
                options |= option;
            }
        }
        options
    }
}

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

/// Where the main file comes from on every (re)parse.
enum Origin {
    Disk(PathBuf),
    Memory { filename: PathBuf, source: String },
}

impl Origin {
    fn request(
        &self,
        language: Option<Language>,
        args: Vec<String>,
        unsaved: &[UnsavedFile],
        flags: ParseFlags,
    ) -> ParseRequest {
        let (filename, contents) = match self {
            Origin::Disk(path) => (path.clone(), None),
            Origin::Memory { filename, source } => (filename.clone(), Some(source.clone())),
        };
        ParseRequest {
            filename,
            contents,
            language,
            args,
            overlays: unsaved.iter().map(UnsavedFile::overlay).collect(),
            flags,
        }
    }
}

/// Units created by the convenience constructors own a private index.
enum IndexLink {
    Owned(Index),
    Shared(Weak<IndexShared>),
}

impl IndexLink {
    fn get(&self) -> Option<Arc<IndexShared>> {
        match self {
            IndexLink::Owned(index) => Some(index.shared().clone()),
            IndexLink::Shared(weak) => weak.upgrade(),
        }
    }
}

struct UnitState {
    /// Bumped by every successful reparse
    generation: u64,
    disposed: bool,
    ast: Arc<Ast>,
    origin: Origin,
    options: ParseOptions,
}

pub(crate) struct UnitCell {
    id: u64,
    index: IndexLink,
    hide_preamble: bool,
    state: RwLock<UnitState>,
}

impl UnitCell {
    fn ast_at(&self, generation: u64) -> Result<Arc<Ast>> {
        let state = self.state.read();
        if state.disposed {
            Err(Error::StaleHandle(StaleReason::Disposed))
        } else if state.generation != generation {
            Err(Error::StaleHandle(StaleReason::Reparsed))
        } else {
            Ok(state.ast.clone())
        }
    }

    pub(crate) fn invalidate(&self) {
        self.state.write().disposed = true;
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.state.read().disposed
    }
}

/// A handle's link to the unit and generation it was issued for.
#[derive(Clone)]
pub(crate) struct UnitRef {
    cell: Weak<UnitCell>,
    id: u64,
    generation: u64,
    hide_preamble: bool,
}

impl UnitRef {
    /// The AST this handle was issued against, if it is still current.
    pub(crate) fn ast(&self) -> Result<Arc<Ast>> {
        self.cell
            .upgrade()
            .ok_or(Error::StaleHandle(StaleReason::Disposed))?
            .ast_at(self.generation)
    }

    /// Like [`UnitRef::ast`], but also requires the handle to come from `unit`.
    pub(crate) fn ast_in(&self, unit: &TranslationUnit) -> Result<Arc<Ast>> {
        if self.id != unit.cell.id {
            return Err(Error::ForeignHandle);
        }
        unit.cell.ast_at(self.generation)
    }

    pub(crate) fn unit(&self) -> Result<TranslationUnit> {
        let cell = self
            .cell
            .upgrade()
            .ok_or(Error::StaleHandle(StaleReason::Disposed))?;
        cell.ast_at(self.generation)?;
        Ok(TranslationUnit { cell })
    }

    pub(crate) fn same_unit(&self, other: &UnitRef) -> bool {
        self.id == other.id
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn hide_preamble(&self) -> bool {
        self.hide_preamble
    }
}

impl PartialEq for UnitRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.generation == other.generation
    }
}

impl Eq for UnitRef {}

impl fmt::Debug for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}@{}", self.id, self.generation)
    }
}

/// One analyzed main file plus everything it includes.
///
/// Cloning yields another handle to the same unit.
#[derive(Clone)]
pub struct TranslationUnit {
    cell: Arc<UnitCell>,
}

impl TranslationUnit {
    /// Parse in-memory source under a synthetic file name such as `input.c`.
    pub fn from_source<S: AsRef<str>>(source: &str, language: Language, args: &[S]) -> Result<Self> {
        let origin = Origin::Memory {
            filename: PathBuf::from(language.synthetic_filename()),
            source: source.to_string(),
        };
        Self::create(
            &Index::new(false, false),
            true,
            origin,
            Some(language),
            args,
            &[],
            ParseOptions::NONE,
        )
    }

    /// Parse a file from disk. Unsaved files shadow their on-disk contents,
    /// including the main file's.
    pub fn parse<S: AsRef<str>>(
        index: &Index,
        filename: impl AsRef<Path>,
        args: &[S],
        unsaved: &[UnsavedFile],
        options: ParseOptions,
    ) -> Result<Self> {
        let origin = Origin::Disk(filename.as_ref().to_path_buf());
        Self::create(index, false, origin, None, args, unsaved, options)
    }

    /// Parse a file from disk with a private index and no arguments.
    pub fn from_file(filename: impl AsRef<Path>) -> Result<Self> {
        let origin = Origin::Disk(filename.as_ref().to_path_buf());
        Self::create(
            &Index::new(false, false),
            true,
            origin,
            None,
            &[] as &[&str],
            &[],
            ParseOptions::NONE,
        )
    }

    /// Load a unit written by [`TranslationUnit::save`].
    pub fn load(index: &Index, ast_path: impl AsRef<Path>) -> Result<Self> {
        if index.shared().is_disposed() {
            return Err(Error::StaleHandle(StaleReason::Disposed));
        }
        let ast = persist::load(ast_path.as_ref()).map_err(|e| match e {
            EngineError::Deserialization { message, .. } => Error::Deserialization(message),
            EngineError::FileNotFound(path) => {
                Error::Deserialization(format!("AST file not found: {}", path.display()))
            }
            other => Error::Deserialization(other.to_string()),
        })?;

        let main = ast.main_file();
        let origin = if main.modified.is_some() {
            Origin::Disk(main.path.clone())
        } else {
            Origin::Memory {
                filename: main.path.clone(),
                source: main.contents.clone(),
            }
        };
        let options = ParseOptions::from_flags(ast.flags);
        Ok(Self::register(index, false, origin, ast, options))
    }

    fn create<S: AsRef<str>>(
        index: &Index,
        owned: bool,
        origin: Origin,
        language: Option<Language>,
        args: &[S],
        unsaved: &[UnsavedFile],
        options: ParseOptions,
    ) -> Result<Self> {
        let shared = index.shared();
        if shared.is_disposed() {
            return Err(Error::StaleHandle(StaleReason::Disposed));
        }
        let args = args.iter().map(|a| a.as_ref().to_string()).collect();
        let request = origin.request(language, args, unsaved, options.flags());
        let ast = shared.parse(&request)?;
        Ok(Self::register(index, owned, origin, ast, options))
    }

    fn register(
        index: &Index,
        owned: bool,
        origin: Origin,
        ast: Ast,
        options: ParseOptions,
    ) -> Self {
        let link = if owned {
            IndexLink::Owned(index.clone())
        } else {
            IndexLink::Shared(Arc::downgrade(index.shared()))
        };
        let cell = Arc::new(UnitCell {
            id: NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed),
            index: link,
            hide_preamble: index.shared().exclude_declarations_from_pch(),
            state: RwLock::new(UnitState {
                generation: 1,
                disposed: false,
                ast: Arc::new(ast),
                origin,
                options,
            }),
        });
        index.shared().register(&cell);
        Self { cell }
    }

    /// Handle link and AST of the current generation.
    pub(crate) fn current(&self) -> Result<(UnitRef, Arc<Ast>)> {
        let state = self.cell.state.read();
        if state.disposed {
            return Err(Error::StaleHandle(StaleReason::Disposed));
        }
        Ok((self.unit_ref(state.generation), state.ast.clone()))
    }

    fn unit_ref(&self, generation: u64) -> UnitRef {
        UnitRef {
            cell: Arc::downgrade(&self.cell),
            id: self.cell.id,
            generation,
            hide_preamble: self.cell.hide_preamble,
        }
    }

    /// Analyze again with the stored arguments and the given unsaved files.
    ///
    /// On success every handle issued before becomes stale. On failure the
    /// unit keeps its previous AST and diagnostics.
    pub fn reparse(&self, unsaved: &[UnsavedFile], options: ReparseOptions) -> Result<()> {
        let shared = self
            .cell
            .index
            .get()
            .ok_or(Error::StaleHandle(StaleReason::Disposed))?;
        let request = {
            let state = self.cell.state.read();
            if state.disposed {
                return Err(Error::StaleHandle(StaleReason::Disposed));
            }
            state.origin.request(
                Some(state.ast.language),
                state.ast.args.clone(),
                unsaved,
                state.options.flags(),
            )
        };
        let ast = shared.parse(&request).map_err(Error::Reparse)?;

        let mut state = self.cell.state.write();
        if state.disposed {
            return Err(Error::StaleHandle(StaleReason::Disposed));
        }
        state.ast = Arc::new(ast);
        state.generation += 1;
        debug!(
            unit = self.cell.id,
            generation = state.generation,
            options = options.bits(),
            overlays = unsaved.len(),
            "Reparsed unit"
        );
        Ok(())
    }

    /// Write the unit to `path` so that [`TranslationUnit::load`] can restore it.
    pub fn save(&self, path: impl AsRef<Path>, options: SaveOptions) -> Result<()> {
        let (_, ast) = self.current()?;
        let path = path.as_ref();
        persist::save(&ast, path).map_err(|e| match e {
            EngineError::Serialization { message, .. } => {
                Error::Serialization(format!("{}: {message}", path.display()))
            }
            other => Error::Serialization(other.to_string()),
        })?;
        debug!(unit = self.cell.id, options = options.bits(), "Saved unit");
        Ok(())
    }

    /// Tokens of the range's start file that begin inside the range, comments
    /// excluded. A range that crosses into another file stops at the end of
    /// its start file.
    pub fn tokens(&self, range: &SourceRange) -> Result<Vec<Token>> {
        let start = range.start();
        let end = range.end();
        let ast = start.unit_ref().ast_in(self)?;
        end.unit_ref().ast_in(self)?;

        let file = start.file_id();
        let end_offset = if end.file_id() == file {
            end.offset()
        } else {
            ast.files[file as usize].len()
        };
        Ok(ast
            .tokens_in(file, start.offset(), end_offset)
            .into_iter()
            .map(|raw| Token::new(start.unit_ref(), &ast, file, raw))
            .collect())
    }

    /// Look up a file of this unit by path. Unknown paths yield `None`.
    pub fn get_file(&self, path: impl AsRef<Path>) -> Option<File> {
        let (unit, ast) = self.current().ok()?;
        let path = path.as_ref();
        let id = ast.find_file(path).or_else(|| {
            let wanted = std::fs::canonicalize(path).ok()?;
            ast.files
                .iter()
                .find(|f| std::fs::canonicalize(&f.path).ok().as_ref() == Some(&wanted))
                .map(|f| f.id)
        })?;
        Some(File::new(unit, &ast, id))
    }

    /// The root cursor, of kind `TranslationUnit`.
    pub fn cursor(&self) -> Result<Cursor> {
        let (unit, ast) = self.current()?;
        Ok(Cursor::from_node(&unit, &ast, ROOT))
    }

    /// The innermost cursor whose extent contains `location`.
    pub fn cursor_at(&self, location: &SourceLocation) -> Result<Option<Cursor>> {
        let ast = location.unit_ref().ast_in(self)?;
        Ok(ast
            .node_at(location.file_id(), location.offset())
            .map(|id| Cursor::from_node(location.unit_ref(), &ast, id)))
    }

    /// Visit the descendants of the root cursor. See [`Cursor::visit_children`].
    pub fn visit_children<F>(&self, visitor: F) -> Result<()>
    where
        F: FnMut(&Cursor) -> crate::ChildVisit,
    {
        self.cursor()?.visit_children(visitor)
    }

    /// Visit the descendants of the root cursor, stopping at the first error.
    pub fn try_visit_children<E, F>(&self, visitor: F) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&Cursor) -> std::result::Result<crate::ChildVisit, E>,
    {
        self.cursor()?.try_visit_children(visitor)
    }

    /// Report every file of the unit once, in file-table order, with the
    /// chain of `#include` directives that brought it in (outermost first).
    /// The main file comes first with an empty chain.
    pub fn visit_inclusion<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(&File, &[(File, SourceLocation)]),
    {
        self.try_visit_inclusion(|file, stack| {
            callback(file, stack);
            Ok::<(), Error>(())
        })
    }

    pub fn try_visit_inclusion<E, F>(&self, mut callback: F) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&File, &[(File, SourceLocation)]) -> std::result::Result<(), E>,
    {
        let (unit, ast) = self.current()?;
        for file in &ast.files {
            let stack: Vec<(File, SourceLocation)> = ast
                .include_stack(file.id)
                .into_iter()
                .map(|site| {
                    (
                        File::new(unit.clone(), &ast, site.file),
                        SourceLocation::resolved(unit.clone(), &ast, site.file, site.offset),
                    )
                })
                .collect();
            callback(&File::new(unit.clone(), &ast, file.id), &stack)?;
        }
        Ok(())
    }

    /// Diagnostics of the last parse, in emission order.
    pub fn diagnostics(&self) -> Result<Vec<Diagnostic>> {
        Ok(self.current()?.1.diagnostics.clone())
    }

    /// Name of the main file.
    pub fn spelling(&self) -> Result<String> {
        Ok(self.current()?.1.main_file().path.display().to_string())
    }

    pub fn language(&self) -> Result<Language> {
        Ok(self.current()?.1.language)
    }

    /// Arguments the unit was parsed with, as given.
    pub fn command_line_args(&self) -> Result<Vec<String>> {
        Ok(self.current()?.1.args.clone())
    }

    pub fn parse_options(&self) -> Result<ParseOptions> {
        let state = self.cell.state.read();
        if state.disposed {
            return Err(Error::StaleHandle(StaleReason::Disposed));
        }
        Ok(state.options)
    }

    pub fn default_reparse_options(&self) -> ReparseOptions {
        ReparseOptions::NONE
    }

    pub fn default_save_options(&self) -> SaveOptions {
        SaveOptions::NONE
    }

    pub fn main_file(&self) -> Result<File> {
        let (unit, ast) = self.current()?;
        Ok(File::new(unit, &ast, MAIN_FILE))
    }

    /// All files of the unit in file-table order.
    pub fn files(&self) -> Result<Vec<File>> {
        let (unit, ast) = self.current()?;
        Ok(ast
            .files
            .iter()
            .map(|f| File::new(unit.clone(), &ast, f.id))
            .collect())
    }

    /// Whether `file` is wrapped in an include guard or marked `#pragma once`.
    pub fn is_file_multiple_include_guarded(&self, file: &File) -> Result<bool> {
        let ast = self.checked_file(file)?;
        Ok(ast.files[file.id() as usize].guarded)
    }

    /// Current generation; starts at 1 and grows with every reparse.
    pub fn generation(&self) -> u64 {
        self.cell.state.read().generation
    }

    /// Invalidate the unit and every handle issued from it.
    pub fn dispose(self) {
        self.cell.invalidate();
        debug!(unit = self.cell.id, "Disposed unit");
    }

    /// AST of the current generation, if `file` was issued by it.
    pub(crate) fn checked_file(&self, file: &File) -> Result<Arc<Ast>> {
        file.unit_ref()
            .ast_in(self)
            .map_err(|e| match e {
                Error::ForeignHandle => Error::InvalidFile(file.name().to_path_buf()),
                other => other,
            })
    }

    pub(crate) fn id(&self) -> u64 {
        self.cell.id
    }
}

impl PartialEq for TranslationUnit {
    fn eq(&self, other: &Self) -> bool {
        self.cell.id == other.cell.id
    }
}

impl Eq for TranslationUnit {}

impl fmt::Debug for TranslationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.cell.state.read();
        f.debug_struct("TranslationUnit")
            .field("id", &self.cell.id)
            .field("spelling", &state.ast.main_file().path)
            .field("generation", &state.generation)
            .field("disposed", &state.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChildVisit, CursorKind};
    use tempfile::TempDir;

    fn no_args() -> &'static [&'static str] {
        &[]
    }

    #[test]
    fn test_parse_options_flags() {
        let options = ParseOptions::SKIP_FUNCTION_BODIES | ParseOptions::KEEP_GOING;
        let flags = options.flags();
        assert!(flags.skip_function_bodies);
        assert!(flags.keep_going);
        assert!(!flags.detailed_preprocessing_record);
        assert_eq!(ParseOptions::from_flags(flags), options);
        assert_eq!(options.bits(), 0x240);
    }

    #[test]
    fn test_from_source_uses_synthetic_name() {
        let unit = TranslationUnit::from_source("int x;", Language::Cpp, no_args()).unwrap();
        assert_eq!(unit.spelling().unwrap(), "input.cpp");
        assert_eq!(unit.language().unwrap(), Language::Cpp);
        assert_eq!(unit.generation(), 1);
        assert_eq!(unit.cursor().unwrap().kind(), CursorKind::TranslationUnit);
    }

    #[test]
    fn test_reparse_bumps_generation_and_stales_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.c");
        std::fs::write(&path, "int a;").unwrap();
        let unit = TranslationUnit::from_file(&path).unwrap();
        let cursor = unit.cursor().unwrap();

        unit.reparse(&[], unit.default_reparse_options()).unwrap();
        assert_eq!(unit.generation(), 2);
        assert!(matches!(
            cursor.children().unwrap_err(),
            Error::StaleHandle(StaleReason::Reparsed)
        ));
        assert!(unit.cursor().unwrap().children().is_ok());
    }

    #[test]
    fn test_failed_reparse_keeps_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.c");
        std::fs::write(&path, "int kept;").unwrap();
        let unit = TranslationUnit::from_file(&path).unwrap();
        let cursor = unit.cursor().unwrap();

        std::fs::remove_file(&path).unwrap();
        let err = unit.reparse(&[], ReparseOptions::NONE).unwrap_err();
        assert!(matches!(err, Error::Reparse(EngineError::FileNotFound(_))));
        assert_eq!(unit.generation(), 1);
        assert_eq!(cursor.children().unwrap()[0].spelling().unwrap(), "kept");
    }

    #[test]
    fn test_disposed_unit_rejects_queries() {
        let unit = TranslationUnit::from_source("int x;", Language::C, no_args()).unwrap();
        let handle = unit.clone();
        let cursor = unit.cursor().unwrap();
        unit.dispose();
        assert!(matches!(
            handle.diagnostics().unwrap_err(),
            Error::StaleHandle(StaleReason::Disposed)
        ));
        assert_eq!(cursor.kind(), CursorKind::TranslationUnit);
        assert!(cursor.spelling().is_err());
    }

    #[test]
    fn test_handle_outlives_unit() {
        let cursor = {
            let unit = TranslationUnit::from_source("int x;", Language::C, no_args()).unwrap();
            unit.cursor().unwrap()
        };
        assert!(matches!(
            cursor.translation_unit().unwrap_err(),
            Error::StaleHandle(StaleReason::Disposed)
        ));
    }

    #[test]
    fn test_preamble_declarations_hidden() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("prefix.h");
        std::fs::write(&prefix, "int from_prefix;\n").unwrap();
        let main = dir.path().join("main.c");
        std::fs::write(&main, "int from_main;\n").unwrap();
        let args = ["-include", prefix.to_str().unwrap()];

        let names = |index: &Index| {
            let unit =
                TranslationUnit::parse(index, &main, &args, &[], ParseOptions::NONE).unwrap();
            let mut names = Vec::new();
            unit.visit_children(|c| {
                names.push(c.spelling().unwrap());
                ChildVisit::Continue
            })
            .unwrap();
            names
        };

        assert_eq!(names(&Index::new(false, false)), vec!["from_prefix", "from_main"]);
        assert_eq!(names(&Index::new(true, false)), vec!["from_main"]);
    }

    #[test]
    fn test_load_missing_file_is_deserialization_error() {
        let dir = TempDir::new().unwrap();
        let index = Index::new(false, false);
        let err = TranslationUnit::load(&index, dir.path().join("absent.ast")).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }
}
