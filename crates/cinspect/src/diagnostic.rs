//! Diagnostic snapshots.
//!
//! Diagnostics are copied out of the unit, so they stay readable after the
//! unit is reparsed or disposed.

pub use cinspect_engine::{Diagnostic, DiagnosticLocation, FixIt, Severity};

/// Render a diagnostic with its notes and fix-its, one per line.
pub fn render(diagnostic: &Diagnostic) -> String {
    let mut out = diagnostic.to_string();
    for note in &diagnostic.notes {
        out.push('\n');
        out.push_str(&note.to_string());
    }
    for fix_it in &diagnostic.fix_its {
        out.push_str(&format!(
            "\n  fix-it: {}:{}-{}: \"{}\"",
            fix_it.path.display(),
            fix_it.start,
            fix_it.end,
            fix_it.replacement
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Language, TranslationUnit};

    #[test]
    fn test_render_includes_notes_and_fix_its() {
        let unit = TranslationUnit::from_source(
            "void main() { return 0 }",
            Language::C,
            &[] as &[&str],
        )
        .unwrap();
        let diagnostics = unit.diagnostics().unwrap();
        let rendered: Vec<String> = diagnostics.iter().map(render).collect();

        assert!(rendered[0].starts_with("input.c:1:1: warning: return type of 'main' is not 'int'"));
        assert!(rendered[0].contains("note: change return type to 'int'"));
        assert!(rendered
            .iter()
            .any(|r| r.contains("expected ';' after return statement") && r.contains("fix-it")));
    }
}
