//! Configuration for the royalty ledger

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants;

// =============================================================================
// File-based Configuration (config.toml)
// =============================================================================

/// Configuration loaded from config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Storage section
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the ledger database
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Database filename inside `data_dir`
    #[serde(default)]
    pub database_file: Option<String>,
}

/// CSS selectors used by the extractor
///
/// Every field falls back to the constant of the same name, so a config file
/// only needs to list the selectors that changed on the dashboard.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    pub royalty_rows: String,
    pub royalty_image: String,
    pub royalty_title: String,
    pub royalty_values: String,
    pub portfolio_name: String,
    pub portfolio_spend: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            royalty_rows: constants::ROYALTY_ROWS_SELECTOR.to_string(),
            royalty_image: constants::ROYALTY_IMAGE_SELECTOR.to_string(),
            royalty_title: constants::ROYALTY_TITLE_SELECTOR.to_string(),
            royalty_values: constants::ROYALTY_VALUES_SELECTOR.to_string(),
            portfolio_name: constants::PORTFOLIO_NAME_SELECTOR.to_string(),
            portfolio_spend: constants::PORTFOLIO_SPEND_SELECTOR.to_string(),
        }
    }
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| {
            "Failed to parse config.toml. Check for:\n\
             - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
             - Unknown sections or misspelled keys\n\n\
             See config.toml.example for the expected format."
        })
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Main configuration struct, passed explicitly to the ledger and the store
#[derive(Debug, Clone)]
pub struct Config {
    /// Full path of the SQLite database
    pub database_path: PathBuf,
    /// Extractor selectors
    pub selectors: SelectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(&FileConfig::default(), None)
    }
}

impl Config {
    /// Create config from file config and optional data directory override
    pub fn from_file(file_config: &FileConfig, data_dir: Option<PathBuf>) -> Self {
        let storage = &file_config.storage;

        // CLI flag wins over the config file, which wins over the default
        let data_dir = data_dir
            .or_else(|| storage.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from("./data"));

        let database_file = storage
            .database_file
            .clone()
            .unwrap_or_else(|| constants::DATABASE_FILENAME.to_string());

        Self {
            database_path: data_dir.join(database_file),
            selectors: file_config.selectors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = FileConfig::parse("").unwrap();
        assert_eq!(file.selectors, SelectorConfig::default());

        let config = Config::from_file(&file, None);
        assert_eq!(config.database_path, PathBuf::from("./data").join(constants::DATABASE_FILENAME));
    }

    #[test]
    fn test_partial_selector_override() {
        let file = FileConfig::parse(
            r#"
            [selectors]
            royalty_title = ".book-title"
            "#,
        )
        .unwrap();

        assert_eq!(file.selectors.royalty_title, ".book-title");
        assert_eq!(file.selectors.royalty_rows, constants::ROYALTY_ROWS_SELECTOR);
        assert_eq!(file.selectors.portfolio_spend, constants::PORTFOLIO_SPEND_SELECTOR);
    }

    #[test]
    fn test_data_dir_precedence() {
        let file = FileConfig::parse(
            r#"
            [storage]
            data_dir = "/var/lib/kdp"
            database_file = "royalties.db"
            "#,
        )
        .unwrap();

        let from_file = Config::from_file(&file, None);
        assert_eq!(from_file.database_path, PathBuf::from("/var/lib/kdp/royalties.db"));

        let overridden = Config::from_file(&file, Some(PathBuf::from("/tmp/ledger")));
        assert_eq!(overridden.database_path, PathBuf::from("/tmp/ledger/royalties.db"));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let file = FileConfig::parse(include_str!("../config.toml.example")).unwrap();
        assert_eq!(file.selectors, SelectorConfig::default());
        assert_eq!(file.storage.database_file.as_deref(), Some(constants::DATABASE_FILENAME));
    }

    #[test]
    fn test_misspelled_keys_are_rejected() {
        assert!(FileConfig::parse("[selectors]\nroyalty_row = \"div.item\"").is_err());
        assert!(FileConfig::parse("[storage]\ndatadir = \"/tmp\"").is_err());
        assert!(FileConfig::parse("[selector]\nroyalty_rows = \"div.item\"").is_err());
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(FileConfig::parse("[selectors\nroyalty_rows = 1").is_err());
    }
}
