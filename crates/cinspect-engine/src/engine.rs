//! The engine entry point.

use crate::args::Args;
use crate::ast::{Ast, ParseFlags};
use crate::builder::{self, modified_time, normalize_path, BuildInput};
use crate::language::Grammar;
use crate::{detect_language, EngineError, Language};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::Parser;

/// Settings applied to every parse.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    /// Searched after the `-I` directories of each request
    pub include_dirs: Vec<PathBuf>,
    /// Searched last, for both quoted and angled includes
    pub system_include_dirs: Vec<PathBuf>,
    /// Appended to the arguments of each request
    pub default_args: Vec<String>,
}

/// One unit to analyze.
#[derive(Debug, Clone, Default)]
pub struct ParseRequest {
    pub filename: PathBuf,
    /// Main file contents; read from disk when absent
    pub contents: Option<String>,
    /// Detected from `-x` or the extension when absent
    pub language: Option<Language>,
    pub args: Vec<String>,
    /// In-memory contents that shadow files on disk
    pub overlays: Vec<(PathBuf, String)>,
    pub flags: ParseFlags,
}

/// Parsers for each grammar plus the settings shared by all parses.
pub struct Engine {
    c_parser: Parser,
    cpp_parser: Parser,
    settings: EngineSettings,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let mut c_parser = Parser::new();
        c_parser.set_language(&tree_sitter_c::LANGUAGE.into())?;
        let mut cpp_parser = Parser::new();
        cpp_parser.set_language(&tree_sitter_cpp::LANGUAGE.into())?;

        Ok(Self {
            c_parser,
            cpp_parser,
            settings,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Analyze one unit. Diagnostics are part of a successful result; only
    /// unreadable input or unusable arguments fail.
    pub fn parse(&mut self, request: &ParseRequest) -> Result<Ast, EngineError> {
        let combined: Vec<&str> = request
            .args
            .iter()
            .chain(&self.settings.default_args)
            .map(String::as_str)
            .collect();
        let mut args = Args::parse(&combined)?;
        args.include_dirs
            .extend(self.settings.include_dirs.iter().cloned());

        let main_path = normalize_path(&request.filename);
        let language = request
            .language
            .or(args.language)
            .or_else(|| detect_language(&main_path))
            .unwrap_or(Language::C);

        let overlays: HashMap<PathBuf, String> = request
            .overlays
            .iter()
            .map(|(path, contents)| (normalize_path(path), contents.clone()))
            .collect();
        let (main_contents, main_modified) =
            read_main(&main_path, &request.filename, request.contents.as_deref(), &overlays)?;

        let parser = match language.grammar() {
            Grammar::C => &mut self.c_parser,
            Grammar::Cpp => &mut self.cpp_parser,
        };
        let input = BuildInput {
            main_path: main_path.clone(),
            main_contents,
            main_modified,
            language,
            raw_args: request.args.clone(),
            args: &args,
            overlays: &overlays,
            system_include_dirs: &self.settings.system_include_dirs,
            flags: request.flags,
        };
        let ast = builder::build(parser, &input)?;

        debug!(
            path = ?main_path,
            language = language.name(),
            files = ast.files.len(),
            nodes = ast.nodes.len(),
            diagnostics = ast.diagnostics.len(),
            "Parsed unit"
        );
        Ok(ast)
    }
}

/// An overlay for the main file wins over in-memory contents, which win over the disk.
fn read_main(
    main_path: &Path,
    requested: &Path,
    contents: Option<&str>,
    overlays: &HashMap<PathBuf, String>,
) -> Result<(String, Option<i64>), EngineError> {
    if let Some(overlay) = overlays.get(main_path) {
        return Ok((overlay.clone(), None));
    }
    if let Some(contents) = contents {
        return Ok((contents.to_string(), None));
    }
    if !main_path.is_file() {
        return Err(EngineError::FileNotFound(requested.to_path_buf()));
    }
    let bytes = std::fs::read(main_path)?;
    Ok((
        String::from_utf8_lossy(&bytes).into_owned(),
        modified_time(main_path),
    ))
}
