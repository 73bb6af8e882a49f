use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

use inquest_core::config::EngineConfig;
use inquest_core::model::SyntheticSpec;

const DEFAULT_UNKNOWN_RATE: f64 = 0.1;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root evaluation configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EvalConfig {
    pub run_id: String,
    pub catalog: CatalogSource,
    pub games: GamesConfig,
    pub agents: Vec<AgentConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default = "EngineConfig::from_env")]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EvalConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: EvalConfig =
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
        validate_run_id(&self.run_id)?;
        self.catalog.validate()?;
        self.games.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.oracle.validate()?;
        self.metrics.validate(&self.agents)?;
        self.engine.validate()?;
        self.logging.normalize();
        validate_agents(&self.agents)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
            kb_out: self
                .outputs
                .kb_out
                .as_ref()
                .map(|template| template.replace("{run_id}", &self.run_id)),
        }
    }
}

/// Where the catalog under evaluation comes from: a JSON file or a seeded
/// synthetic build. Exactly one must be given.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CatalogSource {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub synthetic: Option<SyntheticSpec>,
}

impl CatalogSource {
    fn validate(&self) -> Result<(), ValidationError> {
        match (&self.path, &self.synthetic) {
            (Some(_), Some(_)) => Err(ValidationError::InvalidField {
                field: "catalog".to_string(),
                message: "give either a path or a synthetic spec, not both".to_string(),
            }),
            (None, None) => Err(ValidationError::InvalidField {
                field: "catalog".to_string(),
                message: "either a path or a synthetic spec is required".to_string(),
            }),
            (Some(path), None) if path.as_os_str().is_empty() => {
                Err(ValidationError::InvalidField {
                    field: "catalog.path".to_string(),
                    message: "path must not be empty".to_string(),
                })
            }
            (None, Some(spec)) if spec.characters < 2 || spec.traits == 0 => {
                Err(ValidationError::InvalidField {
                    field: "catalog.synthetic".to_string(),
                    message: "needs at least 2 characters and 1 trait".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Game sampling configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GamesConfig {
    pub seed: Option<u64>,
    pub count: usize,
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.count".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Definition of an evaluated playing strategy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub selector: SelectorKind,
    #[serde(default)]
    pub learning: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Entropy,
    Uniform,
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
    /// Template for learned catalogs, one file per learning agent;
    /// `{agent}` is substituted at write time.
    #[serde(default)]
    pub kb_out: Option<String>,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }

        if let Some(kb_out) = self.kb_out.as_ref()
            && kb_out.trim().is_empty()
        {
            return Err(ValidationError::InvalidField {
                field: "outputs.kb_out".to_string(),
                message: "path template must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Answer-noise configuration for the scripted oracle.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct OracleConfig {
    /// Chance a question is shrugged off with `unknown`.
    #[serde(default = "default_unknown_rate")]
    pub unknown_rate: f64,
    /// Chance the oracle answers as if the trait were inverted.
    #[serde(default)]
    pub lie_rate: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            unknown_rate: DEFAULT_UNKNOWN_RATE,
            lie_rate: 0.0,
        }
    }
}

impl OracleConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (label, value) in [
            ("oracle.unknown_rate", self.unknown_rate),
            ("oracle.lie_rate", self.lie_rate),
        ] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "rate must lie in [0, 1]".to_string(),
                });
            }
        }
        if self.unknown_rate + self.lie_rate > 1.0 {
            return Err(ValidationError::InvalidField {
                field: "oracle".to_string(),
                message: "unknown_rate and lie_rate must sum to at most 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_unknown_rate() -> f64 {
    DEFAULT_UNKNOWN_RATE
}

/// Metrics configuration block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default)]
    pub baseline: Option<String>,
}

impl MetricsConfig {
    fn validate(&self, agents: &[AgentConfig]) -> Result<(), ValidationError> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: "baseline agent must be specified".to_string(),
            });
        };

        if !agents.iter().any(|a| &a.name == baseline) {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: format!("baseline agent '{baseline}' is not defined in agents list"),
            });
        }

        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_agents(agents: &[AgentConfig]) -> Result<(), ValidationError> {
    if agents.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "agents".to_string(),
            message: "at least one agent must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for agent in agents {
        if agent.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "agents.name".to_string(),
                message: "agent name must not be empty".to_string(),
            });
        }

        if !agent.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].name", agent.name),
                message: "agent name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(agent.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "agents".to_string(),
                message: format!("agent name '{}' defined more than once", agent.name),
            });
        }
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths. `kb_out` stays a string because the
/// `{agent}` placeholder resolves per learning agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
    pub kb_out: Option<String>,
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

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
    #[error(transparent)]
    Engine(#[from] inquest_core::config::ConfigError),
}
