//! Loader configuration, read from an optional `snapseed.toml`.

use std::path::Path;

use fs_err as fs;
use serde::{Deserialize, Serialize};

use crate::decode::{DecodeOptions, DEFAULT_MAX_DEPTH, MAX_SUPPORTED_DEPTH};
use crate::error::SnapError;

/// Name of the optional loader configuration file.
pub const CONFIG_FILE_NAME: &str = "snapseed.toml";

/// Fixture loader settings, usually left at their defaults or read from a
/// `snapseed.toml` next to the fixtures.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Keep decoded documents (per request spec and per file) for the life
    /// of the loader.
    pub cache_documents: bool,
    /// Maximum nesting depth accepted when decoding a fixture.
    pub max_depth: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_documents: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl LoaderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, SnapError> {
        let config: LoaderConfig =
            toml::from_str(content).map_err(|e| SnapError::config(e.to_string()))?;
        if config.max_depth == 0 {
            return Err(SnapError::config("max_depth must be at least 1"));
        }
        if config.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(SnapError::config(format!(
                "max_depth must be at most {}, got {}",
                MAX_SUPPORTED_DEPTH, config.max_depth
            )));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SnapError::io(path, &e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            SnapError::Config { message } => {
                SnapError::config(format!("Failed to parse {}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Look for `snapseed.toml` in `directory` and its ancestors.
    pub fn find(directory: impl AsRef<Path>) -> Option<Result<Self, SnapError>> {
        for dir in directory.as_ref().ancestors() {
            let config_path = dir.join(CONFIG_FILE_NAME);
            log::debug!("Looking for config at {}", config_path.display());
            if config_path.is_file() {
                return Some(Self::load(&config_path));
            }
        }
        log::debug!("No {} found", CONFIG_FILE_NAME);
        None
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_keys_missing() {
        let config = LoaderConfig::from_toml_str("").unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert!(!config.cache_documents);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_parses_all_keys() {
        let config =
            LoaderConfig::from_toml_str("cache_documents = true\nmax_depth = 16\n").unwrap();
        assert!(config.cache_documents);
        assert_eq!(config.decode_options().max_depth, 16);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = LoaderConfig::from_toml_str("cache_documents = \"yes\"").unwrap_err();
        assert_eq!(err.error_type(), "config_error");

        let err = LoaderConfig::from_toml_str("max_depth = 0").unwrap_err();
        assert!(err.to_string().contains("max_depth"));
    }

    #[test]
    fn test_max_depth_is_capped() {
        let config = LoaderConfig::from_toml_str(&format!("max_depth = {}", MAX_SUPPORTED_DEPTH));
        assert_eq!(config.unwrap().max_depth, MAX_SUPPORTED_DEPTH);

        let err = LoaderConfig::from_toml_str("max_depth = 300").unwrap_err();
        assert_eq!(err.error_type(), "config_error");
        assert!(err.to_string().contains("at most 100"));
    }

    #[test]
    fn test_find_walks_up_to_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("fixtures").join("users");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "cache_documents = true").unwrap();

        let config = LoaderConfig::find(&nested).unwrap().unwrap();
        assert!(config.cache_documents);
    }

    #[test]
    fn test_find_returns_none_without_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(LoaderConfig::find(tmp.path()).is_none());
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "max_depth = [").unwrap();

        let err = LoaderConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }
}
