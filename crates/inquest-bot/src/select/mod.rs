mod entropy;
mod uniform;

pub use entropy::EntropySelector;
pub use uniform::UniformSelector;

use inquest_core::belief::LikelihoodModel;
use inquest_core::game::GameSession;
use inquest_core::model::Catalog;

/// Context provided to selectors for ranking the unasked questions.
pub struct SelectContext<'a> {
    pub catalog: &'a Catalog,
    pub session: &'a GameSession,
    pub model: &'a LikelihoodModel,
}

/// A ranked question pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    /// Catalog index of the chosen question.
    pub question: usize,
    /// Posterior entropy expected after the answer, in bits.
    pub expected_entropy_bits: f64,
    /// Entropy removed relative to the current posterior, in bits.
    pub gain_bits: f64,
}

/// Unified interface for question-selection strategies.
pub trait QuestionSelector: Send {
    /// Ranks the unasked questions and returns the best one, or `None` once
    /// every question has been asked.
    fn choose(&mut self, ctx: &SelectContext) -> Option<Choice>;
}
