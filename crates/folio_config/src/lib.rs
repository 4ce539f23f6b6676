//! Configuration management for Folio
//!
//! This crate handles loading and validating `.folio/config.toml`

use folio_common::{FolioError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location of the config file, relative to the workspace root
pub const CONFIG_FILE: &str = ".folio/config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace root path (set programmatically, not in TOML)
    #[serde(skip)]
    pub root: PathBuf,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// MCP settings
    #[serde(default)]
    pub mcp: McpConfig,

    /// Passage index settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration ([storage])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where `save_document` writes when no directory is given.
    /// Relative paths resolve against the workspace root.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Wrap width used for saved markdown
    #[serde(default = "default_text_width")]
    pub markdown_text_width: usize,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".folio/cache")
}
fn default_text_width() -> usize {
    72
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            markdown_text_width: default_text_width(),
        }
    }
}

/// MCP configuration ([mcp])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

fn default_server_name() -> String {
    "folio".to_string()
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
        }
    }
}

/// Passage index configuration ([rag])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Exposes `export_document_to_vector_db` and `search_documents`
    #[serde(default)]
    pub enabled: bool,

    /// Maximum passage length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Passages returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_chunk_size() -> usize {
    800
}
fn default_top_k() -> usize {
    3
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_size: default_chunk_size(),
            top_k: default_top_k(),
        }
    }
}

/// Logging configuration ([logging])
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Emit JSON log lines on stderr
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Default configuration rooted at `workspace_root`
    pub fn with_root(workspace_root: &Path) -> Self {
        Self {
            root: workspace_root.to_path_buf(),
            storage: StorageConfig::default(),
            mcp: McpConfig::default(),
            rag: RagConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from workspace root
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let config_path = workspace_root.join(CONFIG_FILE);

        if !config_path.exists() {
            tracing::debug!("No config at {:?}, using defaults", config_path);
            return Ok(Self::with_root(workspace_root));
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| FolioError::ConfigError(format!("Failed to read config: {}", e)))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| FolioError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.root = workspace_root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.markdown_text_width == 0 {
            return Err(FolioError::ConfigError(
                "storage.markdown_text_width must be greater than zero".to_string(),
            ));
        }
        if self.rag.chunk_size == 0 || self.rag.top_k == 0 {
            return Err(FolioError::ConfigError(
                "rag.chunk_size and rag.top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache directory resolved against the workspace root
    pub fn cache_dir(&self) -> PathBuf {
        if self.storage.cache_dir.is_absolute() {
            self.storage.cache_dir.clone()
        } else {
            self.root.join(&self.storage.cache_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.storage.markdown_text_width, 72);
        assert!(!config.rag.enabled);
        assert_eq!(config.cache_dir(), temp.path().join(".folio/cache"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(CONFIG_FILE)
            .write_str("[rag]\nenabled = true\n\n[storage]\ncache_dir = \"/tmp/folio-out\"\n")
            .unwrap();

        let config = Config::load(temp.path()).unwrap();
        assert!(config.rag.enabled);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/folio-out"));
        assert_eq!(config.mcp.server_name, "folio");
    }

    #[test]
    fn test_zero_width_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(CONFIG_FILE)
            .write_str("[storage]\nmarkdown_text_width = 0\n")
            .unwrap();

        let err = Config::load(temp.path()).unwrap_err();
        assert!(matches!(err, FolioError::ConfigError(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(CONFIG_FILE).write_str("[storage\n").unwrap();
        assert!(matches!(
            Config::load(temp.path()),
            Err(FolioError::ConfigError(_))
        ));
    }
}
