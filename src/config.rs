//! Configuration management for bluedetect
//!
//! All configuration is loaded from `./config/bluedetect.toml`. No hardcoded
//! defaults exist in source code - all defaults live in the embedded template.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/bluedetect.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/bluedetect.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Unsupported scheme '{scheme}' (expected \"https\" or \"http\")")]
    InvalidScheme { scheme: String },

    #[error("http.timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub runner: RunnerConfig,
}

/// HTTP probing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum 301/302 redirects followed per attempt
    pub max_redirects: u32,
    /// Path probed on every candidate domain
    pub probe_path: String,
    /// Schemes tried in order; the first positive verdict wins
    pub schemes: Vec<String>,
    /// User-Agent header sent with every probe
    pub user_agent: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Job runner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Fixed pause between domains in milliseconds
    pub request_delay_ms: u64,
    /// Jobs and stale files older than this are swept
    pub retention_hours: u64,
    /// Interval between retention sweeps in seconds
    pub sweep_interval_secs: u64,
}

impl RunnerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl AppConfig {
    /// Load configuration from `./config/bluedetect.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    /// Load configuration from an explicit path (used by tests).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the embedded default template. The template ships with the
    /// binary and is validated by a unit test.
    pub fn embedded_default() -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration template to `./config/bluedetect.toml`.
    /// Fails if a file already exists there.
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = PathBuf::from(CONFIG_PATH);
        if path.exists() {
            return Err(ConfigError::IoError(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, DEFAULT_CONFIG)?;
        Ok(path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.probe_path.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.probe_path".to_string(),
            });
        }
        if self.http.schemes.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.schemes".to_string(),
            });
        }
        for scheme in &self.http.schemes {
            if scheme != "https" && scheme != "http" {
                return Err(ConfigError::InvalidScheme {
                    scheme: scheme.clone(),
                });
            }
        }
        Ok(())
    }
}
