//! Application configuration loaded from YAML.
//!
//! `${VAR_NAME}` references are replaced with environment variables before
//! parsing, so secrets and per-host paths stay out of the file:
//!
//! ```yaml
//! watermark:
//!   logo_source: "${BRAND_LOGO_URL}"
//!   fallback_logo_source: "/srv/assets/default-logo.png"
//!   opacity: 0.15
//! logo_cache:
//!   ttl_seconds: 1800
//!   fetch_timeout_ms: 10000
//!   max_logo_bytes: 5242880
//! processing:
//!   max_width: 1600
//!   max_file_size_bytes: 20971520
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::image_optimizer::SecurityConfig;
use crate::watermark::{LogoCacheConfig, WatermarkConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{0}' is referenced but not set")]
    MissingEnvVar(String),

    #[error("Invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_ttl_seconds() -> u64 {
    30 * 60
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_max_logo_bytes() -> usize {
    LogoCacheConfig::default_limits().max_source_file_size
}

fn default_max_logo_pixels() -> u64 {
    LogoCacheConfig::default_limits().max_source_pixels
}

/// Logo cache tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoCacheSettings {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_max_logo_bytes")]
    pub max_logo_bytes: usize,
    #[serde(default = "default_max_logo_pixels")]
    pub max_logo_pixels: u64,
}

impl Default for LogoCacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            max_logo_bytes: default_max_logo_bytes(),
            max_logo_pixels: default_max_logo_pixels(),
        }
    }
}

impl LogoCacheSettings {
    pub fn to_cache_config(&self) -> LogoCacheConfig {
        LogoCacheConfig {
            ttl: Duration::from_secs(self.ttl_seconds),
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            limits: SecurityConfig {
                max_source_pixels: self.max_logo_pixels,
                max_source_file_size: self.max_logo_bytes,
                ..LogoCacheConfig::default_limits()
            },
        }
    }
}

fn default_max_file_size_bytes() -> usize {
    SecurityConfig::default().max_source_file_size
}

fn default_max_pixels() -> u64 {
    SecurityConfig::default().max_source_pixels
}

/// Output bounds overrides and upload limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Replaces the tier's maximum output width when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,

    /// Replaces the tier's maximum output height when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,

    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: usize,

    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_width: None,
            max_height: None,
            max_file_size_bytes: default_max_file_size_bytes(),
            max_pixels: default_max_pixels(),
        }
    }
}

impl ProcessingConfig {
    /// Upload limits with the configured size and pixel caps
    pub fn security_config(&self) -> SecurityConfig {
        SecurityConfig {
            max_source_file_size: self.max_file_size_bytes,
            max_source_pixels: self.max_pixels,
            ..SecurityConfig::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub logo_cache: LogoCacheSettings,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Parse YAML after replacing every `${VAR_NAME}` with its environment value.
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        // Check that all referenced environment variables exist first
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            if std::env::var(var_name).is_err() {
                return Err(ConfigError::MissingEnvVar(var_name.to_string()));
            }
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        let config: AppConfig = serde_yaml::from_str(&substituted)?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watermark
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.logo_cache.ttl_seconds == 0 {
            return Err(ConfigError::Invalid(
                "logo_cache.ttl_seconds must be greater than 0".to_string(),
            ));
        }
        if self.logo_cache.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "logo_cache.fetch_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.logo_cache.max_logo_bytes == 0 || self.logo_cache.max_logo_pixels == 0 {
            return Err(ConfigError::Invalid(
                "logo_cache limits must be greater than 0".to_string(),
            ));
        }

        if self.processing.max_width == Some(0) || self.processing.max_height == Some(0) {
            return Err(ConfigError::Invalid(
                "processing.max_width and max_height must be greater than 0".to_string(),
            ));
        }
        if self.processing.max_file_size_bytes == 0 || self.processing.max_pixels == 0 {
            return Err(ConfigError::Invalid(
                "processing limits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
