//! Normalized posterior over catalog characters.

use std::cmp::Ordering;

/// Uniform mass mixed back in when an update underflows to zero.
const DEGENERATE_FLOOR: f64 = 1e-4;

/// How a reweight round landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReweightOutcome {
    Applied,
    /// The unnormalized mass underflowed or went non-finite; the previous
    /// posterior was re-mixed with a uniform floor instead of propagating a
    /// degenerate vector.
    RecoveredDegenerate,
}

/// Probability vector over characters, kept normalized after every change.
///
/// Rejected guesses are suppressed rather than removed: a suppressed entry is
/// clamped to the cap after every renormalization, so it can never climb back
/// into proposal range however the later evidence falls.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    weights: Vec<f64>,
    suppressed: Vec<bool>,
    suppression_cap: f64,
}

impl Posterior {
    pub fn from_priors(priors: &[f64], suppression_cap: f64) -> Self {
        let mut weights: Vec<f64> = priors.to_vec();
        normalize(&mut weights);
        Self {
            suppressed: vec![false; weights.len()],
            weights,
            suppression_cap: suppression_cap.clamp(1e-6, 0.5),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn probability(&self, idx: usize) -> f64 {
        self.weights[idx]
    }

    pub fn is_suppressed(&self, idx: usize) -> bool {
        self.suppressed[idx]
    }

    pub fn all_suppressed(&self) -> bool {
        self.suppressed.iter().all(|s| *s)
    }

    /// Multiplies each weight by its likelihood and renormalizes.
    ///
    /// A zero or non-finite total never escapes: the previous posterior is
    /// re-mixed with a uniform floor and the caller learns about it through
    /// the outcome.
    pub fn reweight(&mut self, likelihoods: &[f64]) -> ReweightOutcome {
        debug_assert_eq!(likelihoods.len(), self.weights.len());

        let mut next: Vec<f64> = self
            .weights
            .iter()
            .zip(likelihoods)
            .map(|(weight, likelihood)| weight * likelihood)
            .collect();
        let mass: f64 = next.iter().sum();

        let outcome = if mass.is_finite() && mass > f64::MIN_POSITIVE {
            for slot in &mut next {
                *slot /= mass;
            }
            ReweightOutcome::Applied
        } else {
            next.clone_from(&self.weights);
            for slot in &mut next {
                *slot += DEGENERATE_FLOOR;
            }
            normalize(&mut next);
            ReweightOutcome::RecoveredDegenerate
        };

        self.weights = next;
        self.enforce_suppression();
        outcome
    }

    /// Marks a character as rejected and clamps it under the cap.
    pub fn suppress(&mut self, idx: usize) {
        self.suppressed[idx] = true;
        self.enforce_suppression();
    }

    /// Highest-probability character that has not been suppressed.
    pub fn best_live(&self) -> Option<(usize, f64)> {
        self.weights
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.suppressed[*idx])
            .max_by(|a, b| {
                a.1.partial_cmp(b.1)
                    .unwrap_or(Ordering::Equal)
                    .then(b.0.cmp(&a.0))
            })
            .map(|(idx, weight)| (idx, *weight))
    }

    /// Top `k` characters by probability, ties broken by index.
    pub fn top(&self, k: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = self.weights.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked
    }

    /// Shannon entropy of the vector, in bits.
    pub fn entropy_bits(&self) -> f64 {
        entropy_bits(&self.weights)
    }

    /// Clamps suppressed entries to the cap and hands the clipped mass to the
    /// live ones. With no live entry left the vector is only renormalized;
    /// callers treat that state as terminal.
    fn enforce_suppression(&mut self) {
        if !self.suppressed.iter().any(|s| *s) {
            return;
        }

        let cap = self.suppression_cap;
        let mut clipped = 0.0;
        let mut live_mass = 0.0;
        for (idx, weight) in self.weights.iter_mut().enumerate() {
            if self.suppressed[idx] {
                if *weight > cap {
                    clipped += *weight - cap;
                    *weight = cap;
                }
            } else {
                live_mass += *weight;
            }
        }

        if self.suppressed.iter().all(|s| *s) {
            normalize(&mut self.weights);
            return;
        }

        if live_mass > 0.0 {
            let scale = (live_mass + clipped) / live_mass;
            for (idx, weight) in self.weights.iter_mut().enumerate() {
                if !self.suppressed[idx] {
                    *weight *= scale;
                }
            }
        } else {
            // Live entries carry no mass at all; spread the clipped mass
            // evenly across them instead of losing it.
            let live = self.suppressed.iter().filter(|s| !**s).count();
            let suppressed_mass: f64 = self
                .weights
                .iter()
                .enumerate()
                .filter(|(idx, _)| self.suppressed[*idx])
                .map(|(_, w)| *w)
                .sum();
            let share = (1.0 - suppressed_mass).max(0.0) / live as f64;
            for (idx, weight) in self.weights.iter_mut().enumerate() {
                if !self.suppressed[idx] {
                    *weight = share;
                }
            }
        }
    }
}

/// Shannon entropy in bits of an arbitrary weight slice.
pub fn entropy_bits(weights: &[f64]) -> f64 {
    -weights
        .iter()
        .filter(|w| **w > 0.0)
        .map(|w| w * w.log2())
        .sum::<f64>()
}

fn normalize(weights: &mut [f64]) {
    let mass: f64 = weights.iter().sum();
    if mass.is_finite() && mass > f64::MIN_POSITIVE {
        for weight in weights.iter_mut() {
            *weight /= mass;
        }
    } else if !weights.is_empty() {
        let uniform = 1.0 / weights.len() as f64;
        for weight in weights.iter_mut() {
            *weight = uniform;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Posterior, ReweightOutcome, entropy_bits};

    fn assert_normalized(posterior: &Posterior) {
        let sum: f64 = posterior.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "weights sum to {sum}");
        assert!(posterior.weights().iter().all(|w| w.is_finite() && *w >= 0.0));
    }

    #[test]
    fn priors_are_normalized() {
        let posterior = Posterior::from_priors(&[2.0, 1.0, 1.0], 0.01);
        assert_normalized(&posterior);
        assert!((posterior.probability(0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_prior_mass_falls_back_to_uniform() {
        let posterior = Posterior::from_priors(&[0.0, 0.0], 0.01);
        assert_normalized(&posterior);
        assert!((posterior.probability(0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn reweight_keeps_normalization() {
        let mut posterior = Posterior::from_priors(&[1.0, 1.0, 1.0], 0.01);
        let outcome = posterior.reweight(&[0.9, 0.5, 0.1]);
        assert_eq!(outcome, ReweightOutcome::Applied);
        assert_normalized(&posterior);
        assert!(posterior.probability(0) > posterior.probability(2));
    }

    #[test]
    fn full_agreement_never_decreases_a_character() {
        let mut posterior = Posterior::from_priors(&[1.0, 1.0], 0.01);
        let before = posterior.probability(0);
        // Likelihood 1.0 for the agreeing character, lower for the other.
        posterior.reweight(&[1.0, 0.3]);
        assert!(posterior.probability(0) >= before);
    }

    #[test]
    fn repeating_an_update_sharpens_further() {
        let mut posterior = Posterior::from_priors(&[1.0, 1.0], 0.01);
        posterior.reweight(&[0.9, 0.2]);
        let once = posterior.probability(0);
        posterior.reweight(&[0.9, 0.2]);
        let twice = posterior.probability(0);
        assert!(twice > once);
    }

    #[test]
    fn degenerate_mass_recovers_from_previous_vector() {
        let mut posterior = Posterior::from_priors(&[3.0, 1.0], 0.01);
        let before = posterior.weights().to_vec();
        let outcome = posterior.reweight(&[0.0, 0.0]);
        assert_eq!(outcome, ReweightOutcome::RecoveredDegenerate);
        assert_normalized(&posterior);
        // The re-mix keeps the previous ordering, only flattened a little.
        assert!(posterior.probability(0) > posterior.probability(1));
        assert!(posterior.probability(0) <= before[0]);
    }

    #[test]
    fn non_finite_likelihoods_do_not_escape() {
        let mut posterior = Posterior::from_priors(&[1.0, 1.0], 0.01);
        let outcome = posterior.reweight(&[f64::NAN, 1.0]);
        assert_eq!(outcome, ReweightOutcome::RecoveredDegenerate);
        assert_normalized(&posterior);
    }

    #[test]
    fn suppression_clamps_even_a_leader() {
        let mut posterior = Posterior::from_priors(&[1.0, 1.0], 0.01);
        posterior.reweight(&[1.0, 0.01]);
        assert!(posterior.probability(0) > 0.9);

        posterior.suppress(0);
        assert_normalized(&posterior);
        assert!(posterior.probability(0) <= 0.01 + 1e-12);
        assert!(posterior.probability(1) > 0.9);
    }

    #[test]
    fn suppression_survives_later_updates() {
        let mut posterior = Posterior::from_priors(&[1.0, 1.0, 1.0], 0.01);
        posterior.suppress(0);
        // Evidence that would otherwise pull the rejected character back up.
        posterior.reweight(&[1.0, 0.05, 0.05]);
        assert_normalized(&posterior);
        assert!(posterior.probability(0) <= 0.01 + 1e-12);
    }

    #[test]
    fn best_live_skips_suppressed() {
        let mut posterior = Posterior::from_priors(&[4.0, 2.0, 1.0], 0.01);
        posterior.suppress(0);
        let (idx, _) = posterior.best_live().unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn all_suppressed_is_detected_and_stays_normalized() {
        let mut posterior = Posterior::from_priors(&[1.0, 1.0], 0.01);
        posterior.suppress(0);
        assert!(!posterior.all_suppressed());
        posterior.suppress(1);
        assert!(posterior.all_suppressed());
        assert!(posterior.best_live().is_none());
        assert_normalized(&posterior);
    }

    #[test]
    fn top_is_sorted_and_deterministic() {
        let posterior = Posterior::from_priors(&[1.0, 3.0, 1.0, 2.0], 0.01);
        let top = posterior.top(3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].0, 1);
        assert_eq!(top[1].0, 3);
        // Equal weights fall back to index order.
        assert_eq!(top[2].0, 0);
    }

    #[test]
    fn entropy_matches_known_values() {
        assert!((entropy_bits(&[0.25, 0.25, 0.25, 0.25]) - 2.0).abs() < 1e-12);
        assert!(entropy_bits(&[1.0, 0.0]) < 1e-12);
        let posterior = Posterior::from_priors(&[1.0; 8], 0.01);
        assert!((posterior.entropy_bits() - 3.0).abs() < 1e-12);
    }
}
