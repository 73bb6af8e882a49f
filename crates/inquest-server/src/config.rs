use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use inquest_core::config::EngineConfig;

const DEFAULT_MAX_SESSIONS: usize = 1024;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30 * 60;

/// Root server configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Catalog file served and, when persistence is on, written back.
    pub catalog: PathBuf,
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Write confirmed learner updates back to the catalog file.
    #[serde(default = "default_persist")]
    pub persist: bool,
    /// Fallback tracing filter when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "EngineConfig::from_env")]
    pub engine: EngineConfig,
    #[serde(default)]
    pub sessions: SessionLimits,
}

impl ServerConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: ServerConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        if self.catalog.as_os_str().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "catalog".to_string(),
                message: "catalog path must not be empty".to_string(),
            });
        }
        if self.log_filter.trim().is_empty() {
            self.log_filter = default_log_filter();
        }
        self.engine.validate()?;
        self.sessions.validate()?;
        Ok(())
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_persist() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Bounds on the in-memory session registry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionLimits {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Sessions idle longer than this are swept when a new one is created.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl SessionLimits {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_sessions == 0 {
            return Err(ValidationError::InvalidField {
                field: "sessions.max_sessions".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.idle_timeout_secs == 0 {
            return Err(ValidationError::InvalidField {
                field: "sessions.idle_timeout_secs".to_string(),
                message: "must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
    #[error("engine: {0}")]
    Engine(#[from] inquest_core::config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
catalog: "data/catalog.json"
bind: "127.0.0.1:9200"
engine:
  confidence_threshold: 0.9
sessions:
  max_sessions: 64
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: ServerConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.catalog, PathBuf::from("data/catalog.json"));
        assert_eq!(cfg.bind, "127.0.0.1:9200".parse().unwrap());
        assert!(cfg.persist);
        assert_eq!(cfg.log_filter, "info");
        assert!((cfg.engine.confidence_threshold - 0.9).abs() < 1e-12);
        assert_eq!(cfg.engine.max_questions, 20);
        assert_eq!(cfg.sessions.max_sessions, 64);
        assert_eq!(cfg.sessions.idle_timeout_secs, 1800);
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let mut cfg: ServerConfig =
            serde_yaml::from_str("catalog: \"data/catalog.json\"\n").expect("parse");
        cfg.validate().expect("validate");

        assert_eq!(cfg.bind, default_bind());
        assert_eq!(cfg.sessions, SessionLimits::default());
        assert_eq!(
            cfg.sessions.idle_timeout(),
            Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)
        );
    }

    #[test]
    fn rejects_empty_catalog_path() {
        let mut cfg: ServerConfig = serde_yaml::from_str("catalog: \"\"\n").expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "catalog"
        ));
    }

    #[test]
    fn rejects_zero_session_cap() {
        let yaml = BASIC_YAML.replace("max_sessions: 64", "max_sessions: 0");
        let mut cfg: ServerConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "sessions.max_sessions"
        ));
    }

    #[test]
    fn engine_block_is_validated_too() {
        let yaml = BASIC_YAML.replace("confidence_threshold: 0.9", "confidence_threshold: 1.5");
        let mut cfg: ServerConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(err, ValidationError::Engine(_)));
    }

    #[test]
    fn blank_log_filter_normalizes_to_info() {
        let yaml = format!("{BASIC_YAML}log_filter: \"  \"\n");
        let mut cfg: ServerConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("validate");
        assert_eq!(cfg.log_filter, "info");
    }
}
