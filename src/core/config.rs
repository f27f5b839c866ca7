//! Configuration management

use crate::core::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Namespace carrying the CMS bookkeeping attributes (rid, status, markers)
pub const CMS_NAMESPACE: &str = "http://xmldex.dev/ns/cms";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub reuse: ReuseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Tantivy writer heap (bytes)
    pub writer_heap_bytes: usize,
    /// Flush a batch once its estimated content size crosses this (bytes)
    pub batch_max_bytes: usize,
    /// Flush a batch once it holds this many records
    pub batch_max_records: usize,
    /// Files larger than this are skipped by the CLI walker (bytes)
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReuseConfig {
    /// Namespace URI of rid / rlogicalid / tsuppress / tvalidate / status
    pub cms_namespace: String,
    /// Document statuses that make content ready for reuse
    pub released_statuses: Vec<String>,
    /// Base record field holding the document status
    pub status_field: String,
    /// Base record field holding a Translation's Release logical id
    pub translation_source_field: String,
    /// Inline elements whose content is excluded from the reuse checksum
    pub placeholder_elements: Vec<String>,
    /// Processing instruction targets kept as checksum markers
    pub marker_pis: Vec<String>,
    /// Deepest element indexed for Translations
    pub translation_depth_limit: Option<u32>,
    /// Release checksum maps kept in memory across documents
    pub release_cache_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            writer_heap_bytes: 50_000_000, // 50MB
            batch_max_bytes: 4_000_000,
            batch_max_records: 10_000,
            max_file_size: 16_777_216,
        }
    }
}

impl Default for ReuseConfig {
    fn default() -> Self {
        Self {
            cms_namespace: CMS_NAMESPACE.to_string(),
            released_statuses: vec!["Released".to_string()],
            status_field: "prop_cms.status".to_string(),
            translation_source_field: "prop_abx.TranslationMaster".to_string(),
            placeholder_elements: vec!["ph".to_string()],
            marker_pis: Vec::new(),
            translation_depth_limit: Some(3),
            release_cache_size: 64,
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.index.batch_max_records == 0 {
            return Err(Error::ConfigError {
                message: "index.batch_max_records must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::xmldex_home()?.join("config.toml"))
    }

    /// Get the xmldex home directory
    pub fn xmldex_home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var("XMLDEX_HOME") {
            return Ok(PathBuf::from(home));
        }

        ProjectDirs::from("dev", "xmldex", "xmldex")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine xmldex home directory".to_string(),
            })
    }

    /// Get the directory of a named index
    pub fn index_dir(name: &str) -> Result<PathBuf> {
        let hash = xxhash_rust::xxh3::xxh3_64(name.as_bytes());
        Ok(Self::xmldex_home()?
            .join("indexes")
            .join(format!("{:016x}", hash)))
    }
}
