/// Application configuration for portero
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main portero configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Web pool target (HTTP servers behind the web backend)
    pub web: PoolTarget,
    /// Database pool target (MySQL instances behind the DB backend)
    pub db: PoolTarget,
    /// Optional HTTP control API, tried before the raw admin socket
    pub api: Option<ApiConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// One managed HAProxy pool: where its config file lives and how to reach
/// the running instance that serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolTarget {
    /// Backend section name inside the HAProxy config file
    pub backend: String,
    /// Candidate config file paths, first existing one wins
    pub config_paths: Vec<PathBuf>,
    /// Runtime admin endpoint ("tcp://host:port" or "unix:///path.sock")
    pub runtime_endpoint: String,
    /// Reload flag file watched by the external supervisor
    pub reload_flag: PathBuf,
}

/// HTTP control API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the runtime API (e.g. "http://haproxy-api:8000")
    pub base_url: String,
    /// Optional shared token sent with every request
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_sec: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

impl PoolTarget {
    /// Resolve the first existing config path from the candidate list.
    pub fn resolve_config_path(&self) -> Option<PathBuf> {
        self.config_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: PoolTarget {
                backend: "web_back".to_string(),
                config_paths: vec![
                    PathBuf::from("/data/haproxy-web/haproxy.cfg"),
                    PathBuf::from("haproxy-web/haproxy.cfg"),
                ],
                runtime_endpoint: "tcp://haproxy-web:9999".to_string(),
                reload_flag: PathBuf::from("/haproxy-runtime/reload.flag"),
            },
            db: PoolTarget {
                backend: "mysql_back".to_string(),
                config_paths: vec![
                    PathBuf::from("/data/haproxy-db/haproxy.cfg"),
                    PathBuf::from("haproxy-db/haproxy.cfg"),
                ],
                runtime_endpoint: "tcp://haproxy-db:10000".to_string(),
                reload_flag: PathBuf::from("/haproxy-db-runtime/reload.flag"),
            },
            api: None,
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, pool) in [("web", &self.web), ("db", &self.db)] {
            if pool.backend.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{label}: backend name cannot be empty"
                )));
            }
            if pool.config_paths.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{label}: at least one config path is required"
                )));
            }
            if pool.runtime_endpoint.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{label}: runtime_endpoint cannot be empty"
                )));
            }
        }

        if let Some(api) = &self.api {
            if api.base_url.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "api.base_url cannot be empty".to_string(),
                ));
            }
            if api.timeout_sec == 0 {
                return Err(ConfigError::ValidationError(
                    "api.timeout_sec must be greater than 0".to_string(),
                ));
            }
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}",
                    self.logging.level
                )))
            }
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let config = Config {
            api: Some(ApiConfig {
                base_url: "http://haproxy-api:8000".to_string(),
                token: Some("change-me".to_string()),
                timeout_sec: 3,
            }),
            ..Default::default()
        };

        config.save_to_file(path)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.web.backend, "web_back");
        assert_eq!(config.db.backend, "mysql_back");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.web.backend = String::new();
        assert!(config.validate().is_err());

        config.web.backend = "web_back".to_string();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_validation() {
        let mut config = Config::default();
        config.api = Some(ApiConfig {
            base_url: "http://haproxy-api:8000".to_string(),
            token: None,
            timeout_sec: 0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed_config: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed_config.validate().is_ok());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_file = NamedTempFile::new().unwrap();

        Config::create_example_config(temp_file.path()).unwrap();
        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert!(loaded_config.api.is_some());
    }

    #[test]
    fn test_resolve_config_path() {
        let temp_file = NamedTempFile::new().unwrap();
        let pool = PoolTarget {
            backend: "web_back".to_string(),
            config_paths: vec![
                PathBuf::from("/nonexistent/haproxy.cfg"),
                temp_file.path().to_path_buf(),
            ],
            runtime_endpoint: "tcp://localhost:9999".to_string(),
            reload_flag: PathBuf::from("/tmp/reload.flag"),
        };

        assert_eq!(pool.resolve_config_path(), Some(temp_file.path().to_path_buf()));
    }
}
