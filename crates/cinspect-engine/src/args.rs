//! Command-line argument interpretation.
//!
//! Only the arguments that change what the engine produces are interpreted.
//! Everything else is accepted and ignored, consuming its value when the
//! flag is known to take one.

use crate::{EngineError, Language};
use std::path::PathBuf;

/// Flags that take their value as the next argument.
const SEPARATE_VALUE_FLAGS: &[&str] = &[
    "-isysroot",
    "-idirafter",
    "-imacros",
    "-iprefix",
    "-target",
    "-arch",
    "-o",
    "-MF",
    "-MT",
    "-MQ",
    "-Xclang",
    "-Xpreprocessor",
    "-F",
    "-framework",
    "-include-pch",
];

/// Warning configuration derived from `-W` flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarningFlags {
    /// `-Wunused-variable`, enabled by `-Wall` and `-Wunused`
    pub unused_variable: bool,
    /// `-Werror`
    pub errors: bool,
    /// `-w`
    pub suppress_all: bool,
}

/// Interpreted command line.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// `-I`, `-iquote` and `-isystem` search directories, in order
    pub include_dirs: Vec<PathBuf>,
    /// `-D` definitions, name and replacement text
    pub defines: Vec<(String, String)>,
    /// `-U` names
    pub undefines: Vec<String>,
    /// `-include` files entered before the main file
    pub forced_includes: Vec<PathBuf>,
    /// Language from `-x`
    pub language: Option<Language>,
    /// `-std=` value
    pub standard: Option<String>,
    pub warnings: WarningFlags,
}

impl Args {
    /// Interpret an argument list.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Args, EngineError> {
        let mut parsed = Args::default();
        let mut iter = args.iter().map(AsRef::as_ref);

        while let Some(arg) = iter.next() {
            match arg {
                "-I" | "-iquote" | "-isystem" => {
                    let dir = value_of(arg, iter.next())?;
                    parsed.include_dirs.push(PathBuf::from(dir));
                }
                "-D" => {
                    let def = value_of(arg, iter.next())?;
                    parsed.defines.push(split_define(def));
                }
                "-U" => {
                    let name = value_of(arg, iter.next())?;
                    parsed.undefines.push(name.to_string());
                }
                "-include" => {
                    let file = value_of(arg, iter.next())?;
                    parsed.forced_includes.push(PathBuf::from(file));
                }
                "-x" => {
                    let lang = value_of(arg, iter.next())?;
                    let language = Language::from_x_arg(lang)
                        .ok_or_else(|| EngineError::UnsupportedLanguage(lang.to_string()))?;
                    parsed.language = Some(language);
                }
                "-w" => parsed.warnings.suppress_all = true,
                "-Wall" | "-Wunused" | "-Wunused-variable" => {
                    parsed.warnings.unused_variable = true
                }
                "-Wno-unused" | "-Wno-unused-variable" => parsed.warnings.unused_variable = false,
                "-Werror" => parsed.warnings.errors = true,
                "-Wno-error" => parsed.warnings.errors = false,
                flag if SEPARATE_VALUE_FLAGS.contains(&flag) => {
                    value_of(flag, iter.next())?;
                }
                other => {
                    if let Some(dir) = other.strip_prefix("-I") {
                        parsed.include_dirs.push(PathBuf::from(dir));
                    } else if let Some(def) = other.strip_prefix("-D") {
                        parsed.defines.push(split_define(def));
                    } else if let Some(name) = other.strip_prefix("-U") {
                        parsed.undefines.push(name.to_string());
                    } else if let Some(std) = other.strip_prefix("-std=") {
                        parsed.standard = Some(std.to_string());
                    } else if let Some(dir) = other.strip_prefix("-isystem") {
                        parsed.include_dirs.push(PathBuf::from(dir));
                    }
                }
            }
        }

        Ok(parsed)
    }
}

fn value_of<'a>(flag: &str, value: Option<&'a str>) -> Result<&'a str, EngineError> {
    value.ok_or_else(|| EngineError::InvalidArgument(format!("missing value after '{flag}'")))
}

/// `NAME=VALUE` or `NAME`, the latter defining `NAME` as `1`.
fn split_define(def: &str) -> (String, String) {
    match def.split_once('=') {
        Some((name, value)) => (name.to_string(), value.to_string()),
        None => (def.to_string(), "1".to_string()),
    }
}
