use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a yes/no trait such as `flies` or `is_fictional`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitId(String);

impl TraitId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TraitId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Beta(alpha, beta) evidence that a character holds a trait.
///
/// The mean stays strictly inside (0, 1) as long as both parameters are
/// positive, which the catalog validator guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitBelief {
    pub alpha: f64,
    pub beta: f64,
}

impl TraitBelief {
    /// The closed-world default for traits a character was never scored on.
    pub const UNINFORMATIVE: TraitBelief = TraitBelief {
        alpha: 1.0,
        beta: 1.0,
    };

    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Total pseudo-observations backing the mean.
    pub fn strength(&self) -> f64 {
        self.alpha + self.beta
    }

    /// Folds one graded observation in, scaled by the learning rate.
    pub fn observe(&mut self, agreement: f64, rate: f64) {
        self.alpha += rate * agreement;
        self.beta += rate * (1.0 - agreement);
    }

    pub fn is_valid(&self) -> bool {
        self.alpha.is_finite() && self.beta.is_finite() && self.alpha > 0.0 && self.beta > 0.0
    }
}

impl Default for TraitBelief {
    fn default() -> Self {
        Self::UNINFORMATIVE
    }
}

#[cfg(test)]
mod tests {
    use super::TraitBelief;

    #[test]
    fn uninformative_mean_is_half() {
        assert_eq!(TraitBelief::UNINFORMATIVE.mean(), 0.5);
    }

    #[test]
    fn mean_reflects_parameters() {
        let belief = TraitBelief::new(9.0, 1.0);
        assert!((belief.mean() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn observe_moves_mean_toward_agreement() {
        let mut belief = TraitBelief::UNINFORMATIVE;
        belief.observe(1.0, 0.5);
        assert!(belief.mean() > 0.5);
        assert!((belief.alpha - 1.5).abs() < 1e-12);
        assert!((belief.beta - 1.0).abs() < 1e-12);

        let mut belief = TraitBelief::UNINFORMATIVE;
        belief.observe(0.25, 0.5);
        assert!(belief.mean() < 0.5);
        assert!((belief.alpha - 1.125).abs() < 1e-12);
        assert!((belief.beta - 1.375).abs() < 1e-12);
    }

    #[test]
    fn validity_rejects_non_positive_parameters() {
        assert!(TraitBelief::new(1.0, 1.0).is_valid());
        assert!(!TraitBelief::new(0.0, 1.0).is_valid());
        assert!(!TraitBelief::new(1.0, -2.0).is_valid());
        assert!(!TraitBelief::new(f64::NAN, 1.0).is_valid());
    }
}
