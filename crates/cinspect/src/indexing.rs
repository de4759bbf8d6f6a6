//! Declaration and reference indexing.
//!
//! [`TranslationUnit::index_translation_unit`] walks a unit once and reports
//! declarations and resolved references to an [`IndexerCallbacks`]
//! implementation. It does not hand out the full tree: parameters and
//! function locals are skipped unless asked for, and so are references to
//! them.

use crate::cursor::Cursor;
use crate::location::{File, SourceLocation};
use crate::unit::UnitRef;
use crate::{Diagnostic, Error, Index, Severity, TranslationUnit};
use cinspect_engine::{Ast, CursorKind, Entity, NodeId, ROOT};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

option_set! {
    /// Options for one indexing pass.
    IndexingOptions {
        /// Report a reference to an entity only once per container
        SUPPRESS_REDUNDANT_REFS = 0x1;
        /// Also report parameters, function locals and references to them
        INDEX_FUNCTION_LOCAL_SYMBOLS = 0x2;
        /// Drop warnings from the diagnostics delivered to the callbacks
        SUPPRESS_WARNINGS = 0x8;
        /// Skip function bodies in files an earlier pass of the same action indexed
        SKIP_PARSED_BODIES_IN_SESSION = 0x10;
    }
}

/// An indexing session.
///
/// Remembers which files earlier passes indexed, for
/// [`IndexingOptions::SKIP_PARSED_BODIES_IN_SESSION`].
#[derive(Debug)]
pub struct IndexAction {
    index: Index,
    indexed_files: Mutex<HashSet<PathBuf>>,
}

impl IndexAction {
    pub fn new(index: &Index) -> Self {
        Self {
            index: index.clone(),
            indexed_files: Mutex::new(HashSet::new()),
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Files indexed by passes of this action so far
    pub fn indexed_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = self.indexed_files.lock().iter().cloned().collect();
        files.sort();
        files
    }
}

/// A file entered through `#include` or `-include`.
#[derive(Debug, Clone)]
pub struct IncludedFileInfo {
    pub file: File,
    /// The directive that included the file
    pub hash_location: SourceLocation,
}

/// A declaration found by the indexer.
#[derive(Debug, Clone)]
pub struct DeclInfo {
    pub cursor: Cursor,
    pub kind: CursorKind,
    pub name: String,
    pub usr: Option<String>,
    pub location: SourceLocation,
    pub is_definition: bool,
    /// An earlier declaration of the same entity was reported in this pass
    pub is_redeclaration: bool,
    /// Enclosing declaration, or the translation unit
    pub container: Cursor,
}

/// A resolved reference found by the indexer.
#[derive(Debug, Clone)]
pub struct EntityRefInfo {
    /// The referencing expression or type reference
    pub cursor: Cursor,
    pub referenced: Cursor,
    pub referenced_kind: CursorKind,
    pub location: SourceLocation,
    /// Declaration the reference occurs in, or the translation unit
    pub container: Cursor,
}

/// Client hooks for one indexing pass. Every hook defaults to doing nothing.
///
/// A hook that fails ends the pass with its error.
pub trait IndexerCallbacks {
    type Error: From<Error>;

    /// Polled before every other hook; `true` ends the pass without error
    fn abort_query(&mut self) -> bool {
        false
    }

    fn started_translation_unit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn entered_main_file(&mut self, _file: &File) -> Result<(), Self::Error> {
        Ok(())
    }

    fn pp_included_file(&mut self, _info: &IncludedFileInfo) -> Result<(), Self::Error> {
        Ok(())
    }

    fn diagnostic(&mut self, _diagnostics: &[Diagnostic]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn index_declaration(&mut self, _info: &DeclInfo) -> Result<(), Self::Error> {
        Ok(())
    }

    fn index_entity_reference(&mut self, _info: &EntityRefInfo) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Declarations whose children report it as their container.
fn is_container(kind: CursorKind) -> bool {
    matches!(
        kind,
        CursorKind::FunctionDecl
            | CursorKind::CxxMethod
            | CursorKind::StructDecl
            | CursorKind::UnionDecl
            | CursorKind::ClassDecl
            | CursorKind::EnumDecl
            | CursorKind::Namespace
    )
}

/// Parameters and variables declared inside a function.
fn is_function_local(entity: &Entity) -> bool {
    match entity {
        Entity::ParmDecl(_) => true,
        Entity::VarDecl(info) => info.is_local,
        _ => false,
    }
}

enum Step {
    Continue,
    Abort,
}

struct Pass<'a, C: IndexerCallbacks> {
    unit: UnitRef,
    ast: &'a Ast,
    callbacks: &'a mut C,
    options: IndexingOptions,
    /// Files whose bodies an earlier pass of the session indexed
    skip_bodies_in: HashSet<PathBuf>,
    seen_usrs: HashSet<String>,
    seen_refs: HashSet<(NodeId, NodeId)>,
    declarations: usize,
    references: usize,
}

impl<C: IndexerCallbacks> Pass<'_, C> {
    fn cursor(&self, id: NodeId) -> Cursor {
        Cursor::from_node(&self.unit, self.ast, id)
    }

    fn location(&self, id: NodeId) -> SourceLocation {
        let node = &self.ast.nodes[id as usize];
        SourceLocation::resolved(self.unit.clone(), self.ast, node.file, node.location)
    }

    fn local_symbols(&self) -> bool {
        self.options.contains(IndexingOptions::INDEX_FUNCTION_LOCAL_SYMBOLS)
    }

    /// Walk every node with an explicit stack of `(node, container)` pairs.
    fn walk(&mut self, root_children: Vec<NodeId>) -> Result<Step, C::Error> {
        let mut stack: Vec<(NodeId, NodeId)> =
            root_children.into_iter().rev().map(|id| (id, ROOT)).collect();

        let ast = self.ast;
        while let Some((id, container)) = stack.pop() {
            let node = &ast.nodes[id as usize];
            let kind = node.kind();

            if kind.is_declaration() && kind != CursorKind::UnexposedDecl {
                if matches!(self.declaration(id, container)?, Step::Abort) {
                    return Ok(Step::Abort);
                }
            } else if node.referenced.is_some()
                && matches!(self.reference(id, container)?, Step::Abort)
            {
                return Ok(Step::Abort);
            }

            if self.skips_body(id) {
                continue;
            }
            let inner = if is_container(kind) { id } else { container };
            stack.extend(node.children.iter().rev().map(|&child| (child, inner)));
        }
        Ok(Step::Continue)
    }

    fn skips_body(&self, id: NodeId) -> bool {
        let node = &self.ast.nodes[id as usize];
        if !matches!(node.kind(), CursorKind::FunctionDecl | CursorKind::CxxMethod)
            || !node.entity.is_definition()
        {
            return false;
        }
        self.ast
            .file(node.file)
            .is_some_and(|f| self.skip_bodies_in.contains(&f.path))
    }

    fn declaration(&mut self, id: NodeId, container: NodeId) -> Result<Step, C::Error> {
        let ast = self.ast;
        let node = &ast.nodes[id as usize];
        if is_function_local(&node.entity) && !self.local_symbols() {
            return Ok(Step::Continue);
        }
        if self.callbacks.abort_query() {
            return Ok(Step::Abort);
        }

        let is_redeclaration = match &node.usr {
            Some(usr) => !self.seen_usrs.insert(usr.clone()),
            None => false,
        };
        let info = DeclInfo {
            cursor: self.cursor(id),
            kind: node.kind(),
            name: node.entity.spelling().unwrap_or_default().to_string(),
            usr: node.usr.clone(),
            location: self.location(id),
            is_definition: node.entity.is_definition(),
            is_redeclaration,
            container: self.cursor(container),
        };
        self.callbacks.index_declaration(&info)?;
        self.declarations += 1;
        Ok(Step::Continue)
    }

    fn reference(&mut self, id: NodeId, container: NodeId) -> Result<Step, C::Error> {
        let ast = self.ast;
        let node = &ast.nodes[id as usize];
        let Some(target) = node.referenced else {
            return Ok(Step::Continue);
        };
        let referenced = &ast.nodes[target as usize];
        if is_function_local(&referenced.entity) && !self.local_symbols() {
            return Ok(Step::Continue);
        }
        if self.options.contains(IndexingOptions::SUPPRESS_REDUNDANT_REFS)
            && !self.seen_refs.insert((container, target))
        {
            return Ok(Step::Continue);
        }
        if self.callbacks.abort_query() {
            return Ok(Step::Abort);
        }

        let info = EntityRefInfo {
            cursor: self.cursor(id),
            referenced: self.cursor(target),
            referenced_kind: referenced.kind(),
            location: self.location(id),
            container: self.cursor(container),
        };
        self.callbacks.index_entity_reference(&info)?;
        self.references += 1;
        Ok(Step::Continue)
    }
}

impl TranslationUnit {
    /// Report the unit's files, diagnostics, declarations and references to
    /// `callbacks`, in source order.
    pub fn index_translation_unit<C: IndexerCallbacks>(
        &self,
        action: &IndexAction,
        callbacks: &mut C,
        options: IndexingOptions,
    ) -> Result<(), C::Error> {
        let (unit, ast) = self.current()?;

        macro_rules! hook {
            ($call:expr) => {
                if callbacks.abort_query() {
                    return Ok(());
                }
                $call?;
            };
        }

        hook!(callbacks.started_translation_unit());
        hook!(callbacks.entered_main_file(&File::new(unit.clone(), &ast, ast.main_file().id)));
        for file in ast.files.iter().skip(1) {
            let Some(site) = file.included_from else {
                continue;
            };
            let info = IncludedFileInfo {
                file: File::new(unit.clone(), &ast, file.id),
                hash_location: SourceLocation::resolved(unit.clone(), &ast, site.file, site.offset),
            };
            hook!(callbacks.pp_included_file(&info));
        }

        let diagnostics: Vec<Diagnostic> = ast
            .diagnostics
            .iter()
            .filter(|d| {
                !(options.contains(IndexingOptions::SUPPRESS_WARNINGS)
                    && d.severity == Severity::Warning)
            })
            .cloned()
            .collect();
        if !diagnostics.is_empty() {
            hook!(callbacks.diagnostic(&diagnostics));
        }

        let skip_bodies_in = if options.contains(IndexingOptions::SKIP_PARSED_BODIES_IN_SESSION) {
            action.indexed_files.lock().clone()
        } else {
            HashSet::new()
        };
        let root_children = Cursor::from_node(&unit, &ast, ROOT).children()?;
        let mut pass = Pass {
            unit,
            ast: &ast,
            callbacks,
            options,
            skip_bodies_in,
            seen_usrs: HashSet::new(),
            seen_refs: HashSet::new(),
            declarations: 0,
            references: 0,
        };
        let step = pass.walk(root_children.iter().map(Cursor::node_id).collect())?;

        debug!(
            unit = self.id(),
            declarations = pass.declarations,
            references = pass.references,
            aborted = matches!(step, Step::Abort),
            "Indexed unit"
        );
        if matches!(step, Step::Continue) {
            action
                .indexed_files
                .lock()
                .extend(ast.files.iter().map(|f| f.path.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Language;

    #[derive(Default)]
    struct Recorder {
        declarations: Vec<(CursorKind, String)>,
        references: Vec<String>,
        diagnostics: usize,
    }

    impl IndexerCallbacks for Recorder {
        type Error = Error;

        fn diagnostic(&mut self, diagnostics: &[Diagnostic]) -> Result<(), Error> {
            self.diagnostics += diagnostics.len();
            Ok(())
        }

        fn index_declaration(&mut self, info: &DeclInfo) -> Result<(), Error> {
            self.declarations.push((info.kind, info.name.clone()));
            Ok(())
        }

        fn index_entity_reference(&mut self, info: &EntityRefInfo) -> Result<(), Error> {
            self.references.push(info.referenced.spelling()?);
            Ok(())
        }
    }

    fn run(source: &str, args: &[&str], options: IndexingOptions) -> Recorder {
        let unit = TranslationUnit::from_source(source, Language::C, args).unwrap();
        let action = IndexAction::new(&Index::new(false, false));
        let mut recorder = Recorder::default();
        unit.index_translation_unit(&action, &mut recorder, options)
            .unwrap();
        recorder
    }

    const SOURCE: &str = "struct pair { int a; int b; };\nint total;\nint sum(int x) { int y = x; total = total + y; return y; }\n";

    #[test]
    fn test_locals_skipped_by_default() {
        let recorder = run(SOURCE, &[], IndexingOptions::NONE);
        assert_eq!(
            recorder.declarations,
            vec![
                (CursorKind::StructDecl, "pair".to_string()),
                (CursorKind::FieldDecl, "a".to_string()),
                (CursorKind::FieldDecl, "b".to_string()),
                (CursorKind::VarDecl, "total".to_string()),
                (CursorKind::FunctionDecl, "sum".to_string()),
            ]
        );
        assert_eq!(recorder.references, vec!["total", "total"]);
    }

    #[test]
    fn test_function_local_symbols() {
        let recorder = run(SOURCE, &[], IndexingOptions::INDEX_FUNCTION_LOCAL_SYMBOLS);
        let names: Vec<&str> = recorder.declarations.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, vec!["pair", "a", "b", "total", "sum", "x", "y"]);
        assert_eq!(recorder.references, vec!["x", "total", "total", "y", "y"]);
    }

    #[test]
    fn test_suppress_redundant_refs() {
        let recorder = run(SOURCE, &[], IndexingOptions::SUPPRESS_REDUNDANT_REFS);
        assert_eq!(recorder.references, vec!["total"]);
    }

    #[test]
    fn test_suppress_warnings() {
        let source = "int main(void) { int unused; return 0; }";
        assert_eq!(run(source, &["-Wall"], IndexingOptions::NONE).diagnostics, 1);
        assert_eq!(
            run(source, &["-Wall"], IndexingOptions::SUPPRESS_WARNINGS).diagnostics,
            0
        );
    }

    #[test]
    fn test_abort_query_stops_quietly() {
        struct StopAfter(usize, Vec<String>);
        impl IndexerCallbacks for StopAfter {
            type Error = Error;
            fn abort_query(&mut self) -> bool {
                self.1.len() >= self.0
            }
            fn index_declaration(&mut self, info: &DeclInfo) -> Result<(), Error> {
                self.1.push(info.name.clone());
                Ok(())
            }
        }

        let unit = TranslationUnit::from_source("int a; int b; int c;", Language::C, &[] as &[&str])
            .unwrap();
        let action = IndexAction::new(&Index::new(false, false));
        let mut callbacks = StopAfter(2, Vec::new());
        unit.index_translation_unit(&action, &mut callbacks, IndexingOptions::NONE)
            .unwrap();
        assert_eq!(callbacks.1, vec!["a", "b"]);
        assert!(action.indexed_files().is_empty());
    }

    #[test]
    fn test_skip_parsed_bodies_in_session() {
        let unit = TranslationUnit::from_source(SOURCE, Language::C, &[] as &[&str]).unwrap();
        let action = IndexAction::new(&Index::new(false, false));
        let options =
            IndexingOptions::SKIP_PARSED_BODIES_IN_SESSION | IndexingOptions::INDEX_FUNCTION_LOCAL_SYMBOLS;

        let mut first = Recorder::default();
        unit.index_translation_unit(&action, &mut first, options).unwrap();
        assert_eq!(action.indexed_files(), vec![PathBuf::from("input.c")]);

        let mut second = Recorder::default();
        unit.index_translation_unit(&action, &mut second, options).unwrap();
        assert!(second.references.is_empty());
        assert_eq!(second.declarations.len(), 5);
        assert!(first.declarations.len() > second.declarations.len());
    }
}
