//! YAML configuration file support for vectorguard.
//!
//! One file configures index construction, the classifier and logging. Every
//! section and every field is optional; missing values take the defaults
//! shown below.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "sqli-xss"
//!
//! index:
//!   strategy: exact          # exact | hnsw
//!   compression: zstd        # zstd | none
//!   compression_level: 3
//!   hnsw:
//!     m: 16
//!     ef_construction: 200
//!     ef_search: 50
//!     min_vectors_for_ann: 1000
//!
//! classifier:
//!   k: 2
//!   tie_policy: favor_legal  # favor_legal | favor_illegal
//!
//! logging:
//!   level: info              # any tracing EnvFilter directive
//!   format: compact          # compact | json
//! ```

use std::fs;
use std::path::Path;

use classifier::ClassifierConfig;
use index::{AnnConfig, CompressionCodec, CompressionConfig, IndexConfig, SearchStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct VectorGuardConfig {
    /// Configuration format version
    #[serde(default = "default_config_version")]
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub index: IndexYamlConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VectorGuardConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: VectorGuardConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.index.validate()?;
        self.classifier
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("classifier: {e}")))?;
        self.logging.validate()?;
        Ok(())
    }

    /// Index build/load settings described by the `index` section.
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig::new()
            .with_strategy(self.index.strategy)
            .with_ann(self.index.hnsw)
            .with_compression(CompressionConfig::new(
                self.index.compression,
                self.index.compression_level,
            ))
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        self.classifier
    }
}

impl Default for VectorGuardConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            name: None,
            index: IndexYamlConfig::default(),
            classifier: ClassifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Index YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexYamlConfig {
    #[serde(default)]
    pub strategy: SearchStrategy,

    #[serde(default)]
    pub compression: CompressionCodec,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,

    #[serde(default)]
    pub hnsw: AnnConfig,
}

impl IndexYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.compression == CompressionCodec::Zstd && !(1..=22).contains(&self.compression_level) {
            return Err(ConfigLoadError::Validation(format!(
                "index.compression_level must be between 1 and 22, got {}",
                self.compression_level
            )));
        }
        if self.hnsw.m == 0 || self.hnsw.ef_construction == 0 || self.hnsw.ef_search == 0 {
            return Err(ConfigLoadError::Validation(
                "index.hnsw m, ef_construction and ef_search must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IndexYamlConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::default(),
            compression: CompressionCodec::default(),
            compression_level: default_compression_level(),
            hnsw: AnnConfig::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Logging YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Filter directive used when `VECTORGUARD_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        EnvFilter::try_new(&self.level).map_err(|e| {
            ConfigLoadError::Validation(format!("logging.level '{}': {e}", self.level))
        })?;
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// Helper functions for serde defaults
fn default_config_version() -> String {
    "1.0".to_string()
}
fn default_compression_level() -> i32 {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}
