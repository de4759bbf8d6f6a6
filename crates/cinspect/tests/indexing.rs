//! Integration tests for indexing passes over units read from disk.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use cinspect::{
    CursorKind, DeclInfo, Diagnostic, EntityRefInfo, Error, File, IncludedFileInfo, Index,
    IndexAction, IndexerCallbacks, IndexingOptions, ParseOptions, TranslationUnit,
};

/// Helper to write a header with a prototype and a main file defining it
fn create_project(base: &Path) -> PathBuf {
    fs::write(
        base.join("index-action.h"),
        "#pragma once\nint helper(int x);\nextern int calls;\n",
    )
    .unwrap();
    let main = base.join("index-action.c");
    fs::write(
        &main,
        r#"#include "index-action.h"

int calls;

int helper(int x) {
    calls = calls + 1;
    return x * 2;
}

int main(void) {
    return helper(21);
}
"#,
    )
    .unwrap();
    main
}

fn parse(index: &Index, path: &Path) -> TranslationUnit {
    TranslationUnit::parse(index, path, &[] as &[&str], &[], ParseOptions::NONE).unwrap()
}

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    declarations: Vec<DeclInfo>,
    references: Vec<(String, CursorKind, String)>,
}

impl IndexerCallbacks for Recorder {
    type Error = Error;

    fn started_translation_unit(&mut self) -> Result<(), Error> {
        self.events.push("started".to_string());
        Ok(())
    }

    fn entered_main_file(&mut self, file: &File) -> Result<(), Error> {
        assert!(file.is_main_file());
        self.events.push(format!("main {}", file.name().display()));
        Ok(())
    }

    fn pp_included_file(&mut self, info: &IncludedFileInfo) -> Result<(), Error> {
        self.events.push(format!(
            "include {} at {}",
            info.file.name().display(),
            info.hash_location
        ));
        Ok(())
    }

    fn diagnostic(&mut self, diagnostics: &[Diagnostic]) -> Result<(), Error> {
        self.events.push(format!("diagnostics {}", diagnostics.len()));
        Ok(())
    }

    fn index_declaration(&mut self, info: &DeclInfo) -> Result<(), Error> {
        self.declarations.push(info.clone());
        Ok(())
    }

    fn index_entity_reference(&mut self, info: &EntityRefInfo) -> Result<(), Error> {
        self.references.push((
            info.referenced.spelling()?,
            info.referenced_kind,
            info.container.spelling()?,
        ));
        Ok(())
    }
}

#[test]
fn test_index_project() {
    let dir = tempdir().unwrap();
    let main = create_project(dir.path());
    let index = Index::new(false, false);
    let unit = parse(&index, &main);
    let action = IndexAction::new(&index);

    let mut recorder = Recorder::default();
    unit.index_translation_unit(&action, &mut recorder, IndexingOptions::NONE)
        .unwrap();

    assert_eq!(recorder.events.len(), 3);
    assert_eq!(recorder.events[0], "started");
    assert!(recorder.events[1].starts_with("main ") && recorder.events[1].ends_with("index-action.c"));
    assert!(recorder.events[2].starts_with("include "));
    assert!(recorder.events[2].ends_with("index-action.h at 1:1"));

    let names: Vec<(&str, bool)> = recorder
        .declarations
        .iter()
        .map(|d| (d.name.as_str(), d.location.is_from_main_file()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("helper", false),
            ("calls", false),
            ("calls", true),
            ("helper", true),
            ("main", true),
        ]
    );

    let prototype = &recorder.declarations[0];
    let definition = &recorder.declarations[3];
    assert_eq!(prototype.usr.as_deref(), Some("c:@F@helper"));
    assert_eq!(definition.usr, prototype.usr);
    assert!(!prototype.is_definition && !prototype.is_redeclaration);
    assert!(definition.is_definition && definition.is_redeclaration);
    assert_eq!(definition.container.kind(), CursorKind::TranslationUnit);

    // Parameters are locals and stay out of the pass
    assert!(recorder
        .references
        .iter()
        .all(|(name, kind, _)| name != "x" && *kind != CursorKind::ParmDecl));
    assert!(recorder
        .references
        .iter()
        .any(|(name, kind, container)| name == "calls"
            && *kind == CursorKind::VarDecl
            && container == "helper"));
    assert!(recorder
        .references
        .iter()
        .any(|(name, kind, container)| name == "helper"
            && *kind == CursorKind::FunctionDecl
            && container == "main"));

    let indexed = action.indexed_files();
    assert_eq!(indexed.len(), 2);
}

#[test]
fn test_redundant_references_collapse_per_container() {
    let dir = tempdir().unwrap();
    let main = create_project(dir.path());
    let index = Index::new(false, false);
    let unit = parse(&index, &main);
    let action = IndexAction::new(&index);

    let mut all = Recorder::default();
    unit.index_translation_unit(&action, &mut all, IndexingOptions::NONE)
        .unwrap();
    let mut collapsed = Recorder::default();
    unit.index_translation_unit(&action, &mut collapsed, IndexingOptions::SUPPRESS_REDUNDANT_REFS)
        .unwrap();

    let calls_in_helper = |r: &Recorder| {
        r.references
            .iter()
            .filter(|(name, _, container)| name == "calls" && container == "helper")
            .count()
    };
    assert_eq!(calls_in_helper(&all), 2);
    assert_eq!(calls_in_helper(&collapsed), 1);
}

#[derive(Debug)]
enum IndexerError {
    Cinspect(Error),
    Rejected(String),
}

impl From<Error> for IndexerError {
    fn from(e: Error) -> Self {
        IndexerError::Cinspect(e)
    }
}

struct RejectMain {
    seen: Vec<String>,
}

impl IndexerCallbacks for RejectMain {
    type Error = IndexerError;

    fn index_declaration(&mut self, info: &DeclInfo) -> Result<(), IndexerError> {
        if info.name == "main" {
            return Err(IndexerError::Rejected(info.name.clone()));
        }
        self.seen.push(info.name.clone());
        Ok(())
    }
}

#[test]
fn test_callback_error_propagates() {
    let dir = tempdir().unwrap();
    let main = create_project(dir.path());
    let index = Index::new(false, false);
    let unit = parse(&index, &main);
    let action = IndexAction::new(&index);

    let mut callbacks = RejectMain { seen: Vec::new() };
    let err = unit
        .index_translation_unit(&action, &mut callbacks, IndexingOptions::NONE)
        .unwrap_err();
    assert!(matches!(err, IndexerError::Rejected(ref name) if name == "main"));
    assert_eq!(callbacks.seen, vec!["helper", "calls", "calls", "helper"]);
    assert!(action.indexed_files().is_empty());
}

#[test]
fn test_stale_unit_error_converts() {
    let dir = tempdir().unwrap();
    let main = create_project(dir.path());
    let index = Index::new(false, false);
    let unit = parse(&index, &main);
    let action = IndexAction::new(&index);
    let handle = unit.clone();
    unit.dispose();

    let mut callbacks = RejectMain { seen: Vec::new() };
    let err = handle
        .index_translation_unit(&action, &mut callbacks, IndexingOptions::NONE)
        .unwrap_err();
    assert!(matches!(err, IndexerError::Cinspect(Error::StaleHandle(_))));
    assert!(callbacks.seen.is_empty());
}
