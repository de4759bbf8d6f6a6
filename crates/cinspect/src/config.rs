//! Configuration for an [`Index`](crate::Index).

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file to use instead of the default one
pub const CONFIG_ENV: &str = "CINSPECT_CONFIG";

/// Index configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Hide declarations that come from `-include` preamble files
    #[serde(default)]
    pub exclude_declarations_from_pch: bool,

    /// Print diagnostics to stderr after every parse and reparse
    #[serde(default)]
    pub display_diagnostics: bool,

    /// Arguments appended to every parse
    #[serde(default)]
    pub default_args: Vec<String>,

    /// Extra `-I` directories
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,

    /// Searched last for both quoted and angled includes
    #[serde(default = "default_system_include_dirs")]
    pub system_include_dirs: Vec<PathBuf>,
}

fn default_system_include_dirs() -> Vec<PathBuf> {
    ["/usr/local/include", "/usr/include"]
        .iter()
        .map(PathBuf::from)
        .filter(|dir| dir.is_dir())
        .collect()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            exclude_declarations_from_pch: false,
            display_diagnostics: false,
            default_args: Vec::new(),
            include_dirs: Vec::new(),
            system_include_dirs: default_system_include_dirs(),
        }
    }
}

impl IndexConfig {
    /// Default location: `<config dir>/cinspect/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cinspect").join("config.yaml"))
    }

    /// Load configuration from `$CINSPECT_CONFIG` or the default location,
    /// falling back to defaults
    pub fn load() -> Self {
        let config_path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(Self::default_path);

        if let Some(config_path) = config_path.filter(|p| p.exists()) {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_yaml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = ?config_path, "Failed to parse config file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!(path = ?config_path, "Failed to read config file: {}", e);
                }
            }
        }

        Self::default()
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write configuration as YAML
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert!(!config.exclude_declarations_from_pch);
        assert!(!config.display_diagnostics);
        assert!(config.default_args.is_empty());
        assert!(config.system_include_dirs.iter().all(|d| d.is_dir()));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = IndexConfig {
            exclude_declarations_from_pch: true,
            default_args: vec!["-Wall".to_string(), "-DDEBUG=1".to_string()],
            include_dirs: vec![PathBuf::from("/opt/include")],
            ..IndexConfig::default()
        };
        config.save_to(&path).unwrap();

        let loaded = IndexConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "display_diagnostics: true\n").unwrap();

        let config = IndexConfig::load_from(&path).unwrap();
        assert!(config.display_diagnostics);
        assert!(!config.exclude_declarations_from_pch);
        assert_eq!(config.system_include_dirs, default_system_include_dirs());
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "default_args: {unclosed").unwrap();
        assert!(matches!(
            IndexConfig::load_from(&path).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn test_load_honors_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::env::set_var(CONFIG_ENV, &path);

        std::fs::write(&path, "default_args: [-Wall\n").unwrap();
        assert_eq!(IndexConfig::load(), IndexConfig::default());

        std::fs::write(&path, "default_args:\n  - -Wall\n").unwrap();
        assert_eq!(IndexConfig::load().default_args, vec!["-Wall".to_string()]);

        std::env::remove_var(CONFIG_ENV);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            IndexConfig::load_from(&dir.path().join("absent.yaml")).unwrap_err(),
            Error::Io(_)
        ));
    }
}
