use inquest_core::config::EngineConfig;
use inquest_core::game::GameSession;

/// Why a guess went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposeReason {
    /// The leader cleared the confidence threshold.
    Confident,
    /// The question cap was reached.
    QuestionCap,
    /// No unasked question is left.
    Exhausted,
}

/// What the policy wants the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessDecision {
    AskMore,
    Propose {
        candidate: usize,
        reason: ProposeReason,
    },
}

/// Decides when asking stops and a guess goes on the table.
#[derive(Debug, Clone, Copy)]
pub struct GuessPolicy {
    threshold: f64,
    max_questions: u32,
}

impl GuessPolicy {
    pub fn new(threshold: f64, max_questions: u32) -> Self {
        Self {
            threshold,
            max_questions,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.confidence_threshold, config.max_questions)
    }

    /// The candidate is always the strongest unsuppressed character; the
    /// trigger is confidence, the question cap, or selector exhaustion, in
    /// that order of precedence.
    pub fn decide(&self, session: &GameSession, selector_exhausted: bool) -> GuessDecision {
        let Some((candidate, probability)) = session.posterior().best_live() else {
            // Nothing left to propose; rejection handling already turned
            // this state terminal.
            return GuessDecision::AskMore;
        };

        if probability >= self.threshold {
            return GuessDecision::Propose {
                candidate,
                reason: ProposeReason::Confident,
            };
        }
        if session.questions_taken() >= self.max_questions as usize {
            return GuessDecision::Propose {
                candidate,
                reason: ProposeReason::QuestionCap,
            };
        }
        if selector_exhausted {
            return GuessDecision::Propose {
                candidate,
                reason: ProposeReason::Exhausted,
            };
        }
        GuessDecision::AskMore
    }
}
