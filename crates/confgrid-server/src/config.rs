//! Server configuration
//!
//! Priority: environment variables > TOML config file > defaults.
//!
//! ## Environment Variables
//!
//! - `CONFGRID_CONFIG`: config file path, when `--config` is not given
//! - `PORT`: listen port
//! - `CONFGRID_BIND`: listen address
//! - `FRONTEND_URL`: origin allowed by CORS
//! - `CONFGRID_DATA_FILE`: JSON collection file; unset keeps data in memory
//! - `CONFGRID_LOG_LEVEL`: tracing filter directive
//! - `CONFGRID_LOG_FORMAT`: `pretty` or `json`

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use warp::http::uri::Authority;

/// Config file path
pub const ENV_CONFIG_PATH: &str = "CONFGRID_CONFIG";
/// Listen port
pub const ENV_PORT: &str = "PORT";
/// Listen address
pub const ENV_BIND: &str = "CONFGRID_BIND";
/// CORS origin
pub const ENV_FRONTEND_URL: &str = "FRONTEND_URL";
/// Collection file
pub const ENV_DATA_FILE: &str = "CONFGRID_DATA_FILE";
/// Filter directive
pub const ENV_LOG_LEVEL: &str = "CONFGRID_LOG_LEVEL";
/// Output format
pub const ENV_LOG_FORMAT: &str = "CONFGRID_LOG_FORMAT";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, multi-line
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid(format!(
                "log format must be 'pretty' or 'json', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Runtime settings for the server and maintenance commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// Listen port
    pub port: u16,
    /// Origin allowed by CORS, as `scheme://host[:port]`
    pub frontend_origin: String,
    /// JSON collection file; `None` keeps the collection in memory
    pub data_file: Option<PathBuf>,
    /// Tracing filter directive, e.g. `info` or `confgrid_core=debug`
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            frontend_origin: "http://localhost:5173".to_string(),
            data_file: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment and an optional config file
    ///
    /// # Errors
    /// `ConfigError` if the file cannot be read or parsed, an override
    /// cannot be parsed, or the result fails validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Load using `env` as the variable source
    ///
    /// # Errors
    /// Same as [`ServerConfig::load`]
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| env(ENV_CONFIG_PATH).map(PathBuf::from));

        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file; missing keys take their defaults
    ///
    /// # Errors
    /// `ConfigError::Io` or `ConfigError::Parse`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply environment overrides from `env`
    ///
    /// # Errors
    /// `ConfigError::Invalid` if `PORT` or the log format cannot be parsed
    pub fn apply_overrides<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = env(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_PORT} must be a port number, got '{port}'"))
            })?;
        }
        if let Some(bind) = env(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(origin) = env(ENV_FRONTEND_URL) {
            self.frontend_origin = origin;
        }
        if let Some(data_file) = env(ENV_DATA_FILE) {
            self.data_file = if data_file.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(data_file))
            };
        }
        if let Some(level) = env(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(format) = env(ENV_LOG_FORMAT) {
            self.log_format = format.parse()?;
        }
        Ok(())
    }

    /// Check values the server would otherwise fail on at startup
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the offending setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        self.socket_addr()?;
        validate_origin(&self.frontend_origin)?;
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Address to listen on
    ///
    /// # Errors
    /// `ConfigError::Invalid` if `bind` is not an IP address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::Invalid(format!("bind address '{}' is not an IP address", self.bind))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// CORS origins are `scheme://authority` with no path.
fn validate_origin(origin: &str) -> Result<(), ConfigError> {
    let invalid = || {
        ConfigError::Invalid(format!(
            "frontend origin '{origin}' must look like http://host:port"
        ))
    };
    let (scheme, rest) = origin.split_once("://").ok_or_else(invalid)?;
    if !matches!(scheme, "http" | "https") || rest.is_empty() || rest.contains('/') {
        return Err(invalid());
    }
    rest.parse::<Authority>().map_err(|_| invalid())?;
    Ok(())
}
