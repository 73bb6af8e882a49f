//! Tunable engine parameters shared by the server and the simulation harness.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;
pub const DEFAULT_MAX_QUESTIONS: u32 = 20;
pub const DEFAULT_LIKELIHOOD_FLOOR: f64 = 0.01;
pub const DEFAULT_SUPPRESSION_CAP: f64 = 0.01;
pub const DEFAULT_LEARN_RATE: f64 = 0.5;
pub const DEFAULT_TOP_CANDIDATES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Posterior mass at which asking stops and a guess goes out.
    pub confidence_threshold: f64,
    /// Hard cap on asked questions before a guess is forced.
    pub max_questions: u32,
    /// Lower bound on any single answer likelihood.
    pub likelihood_floor: f64,
    /// Ceiling kept on a rejected character's posterior from then on.
    pub suppression_cap: f64,
    /// Scale on Beta increments when a confirmed game feeds the catalog.
    pub learn_rate: f64,
    /// Leading candidates carried in reports.
    pub top_candidates: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_questions: DEFAULT_MAX_QUESTIONS,
            likelihood_floor: DEFAULT_LIKELIHOOD_FLOOR,
            suppression_cap: DEFAULT_SUPPRESSION_CAP,
            learn_rate: DEFAULT_LEARN_RATE,
            top_candidates: DEFAULT_TOP_CANDIDATES,
        }
    }
}

impl EngineConfig {
    /// Environment overrides under `INQ_`, each clamped to a workable band.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            confidence_threshold: parse_env_f64("INQ_CONFIDENCE", base.confidence_threshold)
                .clamp(0.5, 0.999),
            max_questions: parse_env_u32("INQ_MAX_QUESTIONS", base.max_questions).clamp(1, 200),
            likelihood_floor: parse_env_f64("INQ_LIKELIHOOD_FLOOR", base.likelihood_floor)
                .clamp(1e-6, 0.5),
            suppression_cap: parse_env_f64("INQ_SUPPRESSION_CAP", base.suppression_cap)
                .clamp(1e-6, 0.25),
            learn_rate: parse_env_f64("INQ_LEARN_RATE", base.learn_rate).clamp(0.0, 5.0),
            top_candidates: parse_env_usize("INQ_TOP_CANDIDATES", base.top_candidates)
                .clamp(1, 64),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold < 1.0) {
            return Err(ConfigError::new(
                "confidence_threshold",
                "must lie strictly between 0 and 1",
            ));
        }
        if self.max_questions == 0 {
            return Err(ConfigError::new("max_questions", "must be at least 1"));
        }
        if !(self.likelihood_floor > 0.0 && self.likelihood_floor <= 0.5) {
            return Err(ConfigError::new(
                "likelihood_floor",
                "must lie in (0, 0.5]",
            ));
        }
        if !(self.suppression_cap > 0.0 && self.suppression_cap < 0.5) {
            return Err(ConfigError::new(
                "suppression_cap",
                "must lie in (0, 0.5)",
            ));
        }
        if !(self.learn_rate.is_finite() && self.learn_rate >= 0.0) {
            return Err(ConfigError::new("learn_rate", "must be finite and >= 0"));
        }
        if self.top_candidates == 0 {
            return Err(ConfigError::new("top_candidates", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_env_f64(key: &str, fallback: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(fallback)
}

fn parse_env_u32(key: &str, fallback: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(fallback)
}

fn parse_env_usize(key: &str, fallback: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(fallback)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    field: &'static str,
    detail: &'static str,
}

impl ConfigError {
    fn new(field: &'static str, detail: &'static str) -> Self {
        Self { field, detail }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.detail)
    }
}

impl std::error::Error for ConfigError {}
