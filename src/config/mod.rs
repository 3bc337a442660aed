//! Configuration management for the AI server
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. The loaded [`Config`] is built once at start-up
//! and handed to each collaborator.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::error::{ErrorCategory, ErrorInfo};
use crate::llm::{OllamaConfig, OpenAiConfig};

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ErrorInfo for ConfigError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Read { path, .. } => format!("설정 파일을 읽을 수 없습니다: {}", path.display()),
            Self::Parse { path, .. } => format!("설정 파일 형식 오류: {}", path.display()),
            Self::Invalid(msg) => format!("잘못된 설정: {msg}"),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Config
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Local text model (intent extraction, insights)
    pub ollama: OllamaConfig,

    /// Vision/chat model (receipt OCR, approval review)
    pub openai: OpenAiConfig,

    /// Internal attendance API
    pub backend: BackendConfig,

    /// Performance database
    pub database: DatabaseConfig,

    /// Generated artefacts and auxiliary files
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8000,
            cors_origins: vec![String::from("http://localhost:3000")],
        }
    }
}

/// Internal attendance API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the attendance service
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8080"),
            timeout_secs: 10,
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,

    /// Maximum pool size
    pub pool_size: usize,

    /// Connect and query timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::from("postgresql://localhost/team1db"),
            pool_size: 8,
            timeout_secs: 10,
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Generated files and auxiliary inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for generated spreadsheets
    pub generated_dir: PathBuf,

    /// TrueType font with Hangul glyphs used for chart text
    pub chart_font: Option<PathBuf>,

    /// Expense policy document fed to the approval reviewer
    pub approval_policy: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            generated_dir: PathBuf::from("generated"),
            chart_font: None,
            approval_policy: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Crate settings use the `SMARTSPEND_` prefix; the model and database
    /// settings also honour `OLLAMA_*`, `OPENAI_*` and `DATABASE_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("SMARTSPEND_CORS_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.server.cors_origins);

        let database_url = std::env::var("SMARTSPEND_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .unwrap_or(defaults.database.url);

        Self {
            server: ServerConfig {
                host: env_or("SMARTSPEND_HOST", defaults.server.host),
                port: env_parse("SMARTSPEND_PORT", defaults.server.port),
                cors_origins,
            },
            ollama: OllamaConfig::from_env(),
            openai: OpenAiConfig::from_env(),
            backend: BackendConfig {
                base_url: env_or("SMARTSPEND_BACKEND_URL", defaults.backend.base_url),
                timeout_secs: env_parse("SMARTSPEND_BACKEND_TIMEOUT", defaults.backend.timeout_secs),
            },
            database: DatabaseConfig {
                url: database_url,
                pool_size: env_parse("SMARTSPEND_DB_POOL_SIZE", defaults.database.pool_size),
                timeout_secs: env_parse("SMARTSPEND_DB_TIMEOUT", defaults.database.timeout_secs),
            },
            output: OutputConfig {
                generated_dir: std::env::var("SMARTSPEND_GENERATED_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.output.generated_dir),
                chart_font: std::env::var("SMARTSPEND_CHART_FONT").ok().map(PathBuf::from),
                approval_policy: std::env::var("SMARTSPEND_APPROVAL_POLICY")
                    .ok()
                    .map(PathBuf::from),
            },
            logging: LoggingConfig {
                level: env_or("SMARTSPEND_LOG_LEVEL", defaults.logging.level),
                format: env_or("SMARTSPEND_LOG_FORMAT", defaults.logging.format),
            },
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be greater than 0".into()));
        }

        let timeouts = [
            ("ollama.timeout_secs", self.ollama.timeout_secs),
            ("openai.timeout_secs", self.openai.timeout_secs),
            ("backend.timeout_secs", self.backend.timeout_secs),
            ("database.timeout_secs", self.database.timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
        }

        if self.ollama.model.trim().is_empty() {
            return Err(ConfigError::Invalid("ollama.model must not be empty".into()));
        }

        if self.openai.model.trim().is_empty() {
            return Err(ConfigError::Invalid("openai.model must not be empty".into()));
        }

        if self.database.pool_size == 0 {
            return Err(ConfigError::Invalid("database.pool_size must be greater than 0".into()));
        }

        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend.timeout_secs"));
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let mut config = Config::default();
        config.ollama.model = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[ollama]
endpoint = "http://ollama:11434"
model = "qwen2.5:7b"
timeout_secs = 30
temperature = 0.2

[output]
generated_dir = "/tmp/generated"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ollama.model, "qwen2.5:7b");
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert_eq!(config.output.generated_dir, PathBuf::from("/tmp/generated"));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = Config::from_file(Path::new("/nonexistent/smartspend.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
