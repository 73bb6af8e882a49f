use crate::belief::likelihood::LikelihoodModel;
use crate::belief::posterior::{Posterior, ReweightOutcome};
use crate::config::EngineConfig;
use crate::model::catalog::Catalog;
use crate::model::grade::AnswerGrade;
use std::collections::HashSet;
use std::fmt;

/// Where a session sits in the ask/guess loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Ready to take the next graded answer.
    Asking,
    /// A guess is on the table, waiting for feedback.
    Proposing { candidate: usize },
    /// Feedback confirmed the guess.
    Confirmed { candidate: usize },
    /// Every candidate was proposed and rejected.
    NoMatch,
}

impl GamePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::Confirmed { .. } | GamePhase::NoMatch)
    }
}

/// One recorded question/answer exchange, by catalog index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerEvent {
    pub question: usize,
    pub grade: AnswerGrade,
}

/// What a rejection left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectOutcome {
    /// Unsuppressed candidates remain; the session asks on.
    Continue,
    /// Every candidate has now been rejected.
    Exhausted,
}

/// One game: posterior, asked-question bookkeeping, and the phase machine.
///
/// Transitions are the only way to move between phases, and each one checks
/// the phase it starts from, so an out-of-order call can never corrupt the
/// posterior or the asked sequence.
#[derive(Debug)]
pub struct GameSession {
    posterior: Posterior,
    phase: GamePhase,
    asked: Vec<usize>,
    asked_set: HashSet<usize>,
    log: Vec<AnswerEvent>,
}

impl GameSession {
    pub fn new(catalog: &Catalog, config: &EngineConfig) -> Self {
        Self {
            posterior: Posterior::from_priors(&catalog.prior_weights(), config.suppression_cap),
            phase: GamePhase::Asking,
            asked: Vec::new(),
            asked_set: HashSet::new(),
            log: Vec::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn posterior(&self) -> &Posterior {
        &self.posterior
    }

    /// Asked questions in order, without repeats.
    pub fn asked(&self) -> &[usize] {
        &self.asked
    }

    pub fn has_asked(&self, question: usize) -> bool {
        self.asked_set.contains(&question)
    }

    pub fn questions_taken(&self) -> usize {
        self.asked.len()
    }

    /// Every exchange in arrival order, repeats included.
    pub fn log(&self) -> &[AnswerEvent] {
        &self.log
    }

    /// Applies one graded answer to the posterior.
    ///
    /// Re-answering an already-asked question is allowed and compounds the
    /// update; the asked sequence records the question only once.
    pub fn record_answer(
        &mut self,
        catalog: &Catalog,
        model: &LikelihoodModel,
        question: usize,
        grade: AnswerGrade,
    ) -> Result<ReweightOutcome, SessionError> {
        self.require_asking()?;
        if question >= catalog.question_count() {
            return Err(SessionError::UnknownQuestion(question));
        }

        let likelihoods: Vec<f64> = (0..catalog.character_count())
            .map(|character| model.answer_weight(grade, catalog.question_mean(character, question)))
            .collect();
        let outcome = self.posterior.reweight(&likelihoods);

        if self.asked_set.insert(question) {
            self.asked.push(question);
        }
        self.log.push(AnswerEvent { question, grade });
        Ok(outcome)
    }

    /// Puts a candidate guess on the table.
    pub fn propose(&mut self, candidate: usize) -> Result<(), SessionError> {
        self.require_asking()?;
        debug_assert!(!self.posterior.is_suppressed(candidate));
        self.phase = GamePhase::Proposing { candidate };
        Ok(())
    }

    pub fn pending_guess(&self) -> Option<usize> {
        match self.phase {
            GamePhase::Proposing { candidate } => Some(candidate),
            _ => None,
        }
    }

    /// Positive feedback: the pending guess was right.
    pub fn confirm(&mut self) -> Result<usize, SessionError> {
        let candidate = self.require_pending_guess()?;
        self.phase = GamePhase::Confirmed { candidate };
        Ok(candidate)
    }

    /// Negative feedback: suppress the candidate and either resume asking or
    /// end with no match when nobody is left.
    pub fn reject(&mut self) -> Result<RejectOutcome, SessionError> {
        let candidate = self.require_pending_guess()?;
        self.posterior.suppress(candidate);

        if self.posterior.all_suppressed() {
            self.phase = GamePhase::NoMatch;
            Ok(RejectOutcome::Exhausted)
        } else {
            self.phase = GamePhase::Asking;
            Ok(RejectOutcome::Continue)
        }
    }

    fn require_asking(&self) -> Result<(), SessionError> {
        match self.phase {
            GamePhase::Asking => Ok(()),
            GamePhase::Proposing { .. } => Err(SessionError::AwaitingFeedback),
            _ => Err(SessionError::Finished),
        }
    }

    fn require_pending_guess(&self) -> Result<usize, SessionError> {
        match self.phase {
            GamePhase::Proposing { candidate } => Ok(candidate),
            GamePhase::Asking => Err(SessionError::NoPendingGuess),
            _ => Err(SessionError::Finished),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// An answer arrived while a guess was waiting for feedback.
    AwaitingFeedback,
    /// Feedback arrived with no guess on the table.
    NoPendingGuess,
    /// The game already reached a terminal phase.
    Finished,
    /// The question index does not exist in the catalog.
    UnknownQuestion(usize),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AwaitingFeedback => write!(f, "a guess is awaiting feedback"),
            SessionError::NoPendingGuess => write!(f, "no guess is awaiting feedback"),
            SessionError::Finished => write!(f, "the game is already finished"),
            SessionError::UnknownQuestion(idx) => write!(f, "unknown question index {idx}"),
        }
    }
}

impl std::error::Error for SessionError {}
