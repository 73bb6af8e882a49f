//! Probabilistic belief over which catalog character the player holds.
//!
//! This module is composed of:
//! - `likelihood`: graded-answer likelihoods against trait means.
//! - `posterior`: the normalized weight vector, entropy, and suppression.

pub mod likelihood;
pub mod posterior;

pub use likelihood::LikelihoodModel;
pub use posterior::{Posterior, ReweightOutcome};
