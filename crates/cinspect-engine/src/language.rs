//! Source language selection for translation units.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Languages the engine can analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    C,
    Cpp,
    ObjectiveC,
    ObjectiveCpp,
}

/// The tree-sitter grammar used for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Grammar {
    C,
    Cpp,
}

impl Language {
    /// Get the display name for this language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cpp => "C++",
            Language::ObjectiveC => "Objective-C",
            Language::ObjectiveCpp => "Objective-C++",
        }
    }

    /// Map a `-x` argument value to a language.
    pub fn from_x_arg(value: &str) -> Option<Language> {
        match value {
            "c" | "c-header" => Some(Language::C),
            "c++" | "c++-header" => Some(Language::Cpp),
            "objective-c" | "objective-c-header" => Some(Language::ObjectiveC),
            "objective-c++" | "objective-c++-header" => Some(Language::ObjectiveCpp),
            _ => None,
        }
    }

    /// File name used for in-memory sources of this language.
    pub fn synthetic_filename(&self) -> &'static str {
        match self {
            Language::C => "input.c",
            Language::Cpp => "input.cpp",
            Language::ObjectiveC => "input.m",
            Language::ObjectiveCpp => "input.mm",
        }
    }

    /// Whether the language follows C++ rules (`main` must return `int`, class names
    /// live in the ordinary namespace).
    pub fn is_cxx(&self) -> bool {
        matches!(self, Language::Cpp | Language::ObjectiveCpp)
    }

    pub(crate) fn grammar(&self) -> Grammar {
        if self.is_cxx() {
            Grammar::Cpp
        } else {
            Grammar::C
        }
    }
}

/// Detect the language of a file based on its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;

    match ext {
        "c" | "h" => Some(Language::C),
        "cc" | "cp" | "cpp" | "cxx" | "c++" | "C" | "hh" | "hpp" | "hxx" | "h++" | "H" => {
            Some(Language::Cpp)
        }
        "m" => Some(Language::ObjectiveC),
        "mm" | "M" => Some(Language::ObjectiveCpp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_c() {
        assert_eq!(detect_language(&PathBuf::from("main.c")), Some(Language::C));
        assert_eq!(detect_language(&PathBuf::from("util.h")), Some(Language::C));
    }

    #[test]
    fn test_detect_cpp() {
        assert_eq!(detect_language(&PathBuf::from("main.cpp")), Some(Language::Cpp));
        assert_eq!(detect_language(&PathBuf::from("vec.hpp")), Some(Language::Cpp));
        assert_eq!(detect_language(&PathBuf::from("a.cc")), Some(Language::Cpp));
    }

    #[test]
    fn test_detect_objc() {
        assert_eq!(
            detect_language(&PathBuf::from("AppDelegate.m")),
            Some(Language::ObjectiveC)
        );
        assert_eq!(
            detect_language(&PathBuf::from("Bridge.mm")),
            Some(Language::ObjectiveCpp)
        );
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_language(&PathBuf::from("file.rs")), None);
        assert_eq!(detect_language(&PathBuf::from("noextension")), None);
    }

    #[test]
    fn test_x_arg() {
        assert_eq!(Language::from_x_arg("c"), Some(Language::C));
        assert_eq!(Language::from_x_arg("c++"), Some(Language::Cpp));
        assert_eq!(
            Language::from_x_arg("objective-c"),
            Some(Language::ObjectiveC)
        );
        assert_eq!(Language::from_x_arg("fortran"), None);
    }

    #[test]
    fn test_grammar_selection() {
        assert_eq!(Language::C.grammar(), Grammar::C);
        assert_eq!(Language::ObjectiveC.grammar(), Grammar::C);
        assert_eq!(Language::Cpp.grammar(), Grammar::Cpp);
        assert_eq!(Language::ObjectiveCpp.grammar(), Grammar::Cpp);
    }

    #[test]
    fn test_language_name() {
        assert_eq!(Language::Cpp.name(), "C++");
        assert_eq!(Language::C.synthetic_filename(), "input.c");
    }
}
