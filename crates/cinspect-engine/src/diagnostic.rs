//! Diagnostic records produced while building a unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Severity of a diagnostic, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ignored,
    Note,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ignored => "ignored",
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal error",
        }
    }
}

/// Resolved position of a diagnostic. Independent of the unit that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLocation {
    pub path: PathBuf,
    /// 1-based line
    pub line: u32,
    /// 1-based byte column
    pub column: u32,
    pub offset: u32,
}

/// Suggested edit attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixIt {
    pub path: PathBuf,
    /// Byte range replaced, half-open
    pub start: u32,
    pub end: u32,
    pub replacement: String,
}

/// A structured compiler message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub category: String,
    /// Warning option that controls this diagnostic, e.g. `-Wunused-variable`
    pub option: Option<String>,
    pub location: DiagnosticLocation,
    pub notes: Vec<Diagnostic>,
    pub fix_its: Vec<FixIt>,
}

pub(crate) const PARSE_ISSUE: &str = "Parse Issue";
pub(crate) const SEMANTIC_ISSUE: &str = "Semantic Issue";
pub(crate) const PREPROCESSOR_ISSUE: &str = "Lexical or Preprocessor Issue";

impl Diagnostic {
    pub(crate) fn new(
        severity: Severity,
        category: &str,
        message: impl Into<String>,
        location: DiagnosticLocation,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            category: category.to_string(),
            option: None,
            location,
            notes: Vec::new(),
            fix_its: Vec::new(),
        }
    }

    pub(crate) fn with_option(mut self, option: &str) -> Self {
        self.option = Some(option.to_string());
        self
    }

    pub(crate) fn with_note(mut self, note: Diagnostic) -> Self {
        self.notes.push(note);
        self
    }

    pub(crate) fn with_fix_it(mut self, fix_it: FixIt) -> Self {
        self.fix_its.push(fix_it);
        self
    }

    /// The human-readable message, without location or severity.
    pub fn description(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.location.path.display(),
            self.location.line,
            self.location.column,
            self.severity.as_str(),
            self.message
        )?;
        if let Some(option) = &self.option {
            write!(f, " [{option}]")?;
        }
        Ok(())
    }
}

/// Collects diagnostics and applies the warning policy of the command line.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    fatal_seen: bool,
    keep_going: bool,
    warnings_as_errors: bool,
    suppress_warnings: bool,
}

impl DiagnosticSink {
    pub(crate) fn new(keep_going: bool, warnings_as_errors: bool, suppress_warnings: bool) -> Self {
        Self {
            keep_going,
            warnings_as_errors,
            suppress_warnings,
            ..Default::default()
        }
    }

    pub(crate) fn emit(&mut self, mut diagnostic: Diagnostic) {
        // Once a fatal error is reported, later diagnostics are noise.
        if self.fatal_seen && !self.keep_going {
            return;
        }
        if diagnostic.severity == Severity::Warning {
            if self.suppress_warnings {
                return;
            }
            if self.warnings_as_errors {
                diagnostic.severity = Severity::Error;
            }
        }
        if diagnostic.severity == Severity::Fatal {
            self.fatal_seen = true;
        }
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> DiagnosticLocation {
        DiagnosticLocation {
            path: PathBuf::from("main.c"),
            line: 3,
            column: 7,
            offset: 40,
        }
    }

    fn warning() -> Diagnostic {
        Diagnostic::new(
            Severity::Warning,
            SEMANTIC_ISSUE,
            "unused variable 'a'",
            location(),
        )
        .with_option("-Wunused-variable")
    }

    #[test]
    fn test_display_format() {
        assert_eq!(
            warning().to_string(),
            "main.c:3:7: warning: unused variable 'a' [-Wunused-variable]"
        );
        assert_eq!(warning().description(), "unused variable 'a'");
    }

    #[test]
    fn test_sink_promotes_warnings() {
        let mut sink = DiagnosticSink::new(false, true, false);
        sink.emit(warning());
        let diags = sink.finish();
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn test_sink_suppresses_warnings() {
        let mut sink = DiagnosticSink::new(false, false, true);
        sink.emit(warning());
        assert!(sink.finish().is_empty());
    }

    #[test]
    fn test_sink_stops_after_fatal() {
        let mut sink = DiagnosticSink::new(false, false, false);
        sink.emit(Diagnostic::new(
            Severity::Fatal,
            PREPROCESSOR_ISSUE,
            "'missing.h' file not found",
            location(),
        ));
        sink.emit(warning());
        assert_eq!(sink.finish().len(), 1);

        let mut sink = DiagnosticSink::new(true, false, false);
        sink.emit(Diagnostic::new(
            Severity::Fatal,
            PREPROCESSOR_ISSUE,
            "'missing.h' file not found",
            location(),
        ));
        sink.emit(warning());
        assert_eq!(sink.finish().len(), 2);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Note < Severity::Warning);
    }
}
