//! Runtime configuration for the `ea-tool` binary.
//!
//! Settings come from an optional TOML file, then from `EA_*` environment
//! variables. The assessment core reads none of this; it only receives the
//! estimator suite and observer built from it.

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Smallest upload limit accepted.
pub const MIN_UPLOAD_BYTES: u64 = 1024;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid server port (must be 1-65535)")]
    InvalidPort,
    #[error("invalid server host: {0}")]
    InvalidHost(String),
    #[error("max upload size too small: {0} (must be at least 1024 bytes)")]
    UploadLimitTooSmall(u64),
    #[error("timeout must be at least one second")]
    InvalidTimeout,
    #[error("invalid log level: {0} (must be trace, debug, info, warn, or error)")]
    InvalidLogLevel(String),
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// HTTP service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Expose `/metrics`.
    pub metrics_enabled: bool,
    /// Largest accepted request body.
    pub max_upload_bytes: u64,
    /// How long a request waits for its assessment.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9091,
            metrics_enabled: true,
            max_upload_bytes: 100 * 1024 * 1024, // 100 MiB
            timeout_secs: 300,
        }
    }
}

impl ServerConfig {
    /// Validates the server parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.max_upload_bytes < MIN_UPLOAD_BYTES {
            return Err(ConfigError::UploadLimitTooSmall(self.max_upload_bytes));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        self.bind_addr().map(|_| ())
    }

    /// Socket address built from `host` and `port`.
    ///
    /// `host` may be an IP literal or a resolvable hostname; the first
    /// resolved address is used.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::InvalidHost(self.host.clone()))
    }

    /// Request deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Estimator suite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Shared library exporting the estimator ABI.
    pub library: Option<PathBuf>,
    /// Verbosity forwarded to the library (0=quiet ... 3=very verbose).
    pub verbose: u8,
    /// Sample count below which results are flagged as unreliable.
    pub min_recommended_samples: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            library: None,
            verbose: 1,
            min_recommended_samples: 1_000_000,
        }
    }
}

impl EstimatorConfig {
    /// Verbosity clamped to 0-3.
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Validates the level name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub estimators: EstimatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FileConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Loads the optional file, applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`FileConfig::load`], reading variables through `lookup`.
    ///
    /// Validation runs once, after the overrides, so the environment can
    /// correct a value from the file.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::parse_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides_from(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.logging.validate()
    }

    /// Applies `EA_*` overrides using `lookup` to read variables.
    ///
    /// Empty values are ignored. Unparsable values are errors.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("EA_SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("EA_SERVER_PORT") {
            self.server.port = parse_env("EA_SERVER_PORT", &v)?;
        }
        if let Some(v) = get("EA_METRICS_ENABLED") {
            self.server.metrics_enabled = parse_env("EA_METRICS_ENABLED", &v)?;
        }
        if let Some(v) = get("EA_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = parse_env("EA_MAX_UPLOAD_BYTES", &v)?;
        }
        if let Some(v) = get("EA_TIMEOUT_SECS") {
            self.server.timeout_secs = parse_env("EA_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("EA_ESTIMATOR_LIBRARY") {
            self.estimators.library = Some(PathBuf::from(v));
        }
        if let Some(v) = get("EA_VERBOSE") {
            self.estimators.verbose = parse_env("EA_VERBOSE", &v)?;
        }
        if let Some(v) = get("EA_LOG_LEVEL") {
            self.logging.level = v.to_ascii_lowercase();
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}
