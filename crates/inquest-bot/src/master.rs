use crate::learner::{CharacterUpdate, OnlineLearner};
use crate::policy::{GuessDecision, GuessPolicy, ProposeReason};
use crate::select::{Choice, EntropySelector, QuestionSelector, SelectContext};
use inquest_core::belief::{LikelihoodModel, ReweightOutcome};
use inquest_core::config::EngineConfig;
use inquest_core::game::{GamePhase, GameSession, RejectOutcome, SessionError};
use inquest_core::model::{AnswerGrade, Catalog, CharacterId, QuestionId};
use tracing::{Level, event};

/// Question payload of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRef {
    pub id: QuestionId,
    pub text: String,
}

/// Candidate payload of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CharacterId,
    pub name: String,
    pub probability: f64,
}

/// What one turn leaves on the table: either a question to ask or a guess
/// awaiting feedback, plus the belief summary.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub question: Option<QuestionRef>,
    /// Asked count plus one while a question is pending.
    pub question_number: usize,
    pub entropy_bits: f64,
    pub top: Vec<Candidate>,
    pub guess: Option<Candidate>,
}

/// How guess feedback resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    /// The guess was right; `update` carries catalog evidence when learning
    /// is on and at least one question was answered.
    Confirmed {
        character: usize,
        update: Option<CharacterUpdate>,
    },
    /// The guess was wrong and candidates remain.
    RejectedContinue,
    /// The guess was wrong and nobody is left to propose.
    NoMatch,
}

/// Drives one session through ask, guess, and feedback turns.
///
/// The selector strategy is pluggable; everything else flows from the engine
/// configuration.
pub struct Quizmaster {
    config: EngineConfig,
    model: LikelihoodModel,
    policy: GuessPolicy,
    learner: OnlineLearner,
    selector: Box<dyn QuestionSelector>,
}

impl Quizmaster {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_selector(config, Box::new(EntropySelector::new()))
    }

    pub fn with_selector(config: EngineConfig, selector: Box<dyn QuestionSelector>) -> Self {
        Self {
            model: LikelihoodModel::new(config.likelihood_floor),
            policy: GuessPolicy::from_config(&config),
            learner: OnlineLearner::from_config(&config),
            config,
            selector,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Opens a session. The opening turn always asks rather than guessing,
    /// however concentrated the priors are; the one exception is a catalog
    /// with no questions at all, which proposes immediately instead of
    /// dealing a dead session.
    pub fn begin(&mut self, catalog: &Catalog) -> (GameSession, TurnReport) {
        let mut session = GameSession::new(catalog, &self.config);
        let report = if catalog.question_count() == 0 {
            self.advance(catalog, &mut session)
        } else {
            let choice = self.selector.choose(&SelectContext {
                catalog,
                session: &session,
                model: &self.model,
            });
            self.report(catalog, &session, choice)
        };
        (session, report)
    }

    /// Applies one graded answer, then either lines up the next question or
    /// puts a guess on the table.
    pub fn answer(
        &mut self,
        catalog: &Catalog,
        session: &mut GameSession,
        question: usize,
        grade: AnswerGrade,
    ) -> Result<TurnReport, SessionError> {
        let outcome = session.record_answer(catalog, &self.model, question, grade)?;
        if outcome == ReweightOutcome::RecoveredDegenerate {
            event!(
                target: "inquest_bot::update",
                Level::WARN,
                question = %catalog.question(question).id,
                grade = %grade,
                "posterior mass underflowed; re-mixed with uniform floor",
            );
        }
        Ok(self.advance(catalog, session))
    }

    /// Recomputes the current turn: the next question while asking, the
    /// pending guess while proposing, a bare summary once terminal. Also the
    /// re-entry point after a rejected guess.
    pub fn resume(&mut self, catalog: &Catalog, session: &mut GameSession) -> TurnReport {
        self.advance(catalog, session)
    }

    /// Resolves guess feedback. A confirmed guess yields the learner's
    /// catalog update for the caller to apply and persist.
    pub fn feedback(
        &mut self,
        catalog: &Catalog,
        session: &mut GameSession,
        correct: bool,
    ) -> Result<FeedbackOutcome, SessionError> {
        if correct {
            let character = session.confirm()?;
            let update = self.learner.update_for(catalog, character, session.log());
            if tracing::enabled!(Level::INFO) {
                event!(
                    target: "inquest_bot::policy",
                    Level::INFO,
                    character = %catalog.character(character).id,
                    questions = session.questions_taken(),
                    learned = update.is_some(),
                    "guess confirmed",
                );
            }
            Ok(FeedbackOutcome::Confirmed { character, update })
        } else {
            let rejected = session.pending_guess();
            match session.reject()? {
                RejectOutcome::Continue => {
                    if let Some(idx) = rejected {
                        log_rejection(catalog, session, idx, false);
                    }
                    Ok(FeedbackOutcome::RejectedContinue)
                }
                RejectOutcome::Exhausted => {
                    if let Some(idx) = rejected {
                        log_rejection(catalog, session, idx, true);
                    }
                    Ok(FeedbackOutcome::NoMatch)
                }
            }
        }
    }

    /// Runs the stop-or-ask decision while the session is asking, then
    /// snapshots the turn.
    fn advance(&mut self, catalog: &Catalog, session: &mut GameSession) -> TurnReport {
        let mut next_question: Option<Choice> = None;

        if session.phase() == GamePhase::Asking {
            let choice = self.selector.choose(&SelectContext {
                catalog,
                session,
                model: &self.model,
            });
            match self.policy.decide(session, choice.is_none()) {
                GuessDecision::Propose { candidate, reason } => {
                    // Cannot fail: this branch only runs while asking.
                    let _ = session.propose(candidate);
                    log_proposal(catalog, session, candidate, reason);
                }
                GuessDecision::AskMore => next_question = choice,
            }
        }

        self.report(catalog, session, next_question)
    }

    fn report(
        &self,
        catalog: &Catalog,
        session: &GameSession,
        next: Option<Choice>,
    ) -> TurnReport {
        let posterior = session.posterior();
        let question = next.map(|choice| {
            let q = catalog.question(choice.question);
            QuestionRef {
                id: q.id.clone(),
                text: q.text.clone(),
            }
        });
        let guess = session.pending_guess().map(|idx| Candidate {
            id: catalog.character(idx).id.clone(),
            name: catalog.character(idx).name.clone(),
            probability: posterior.probability(idx),
        });
        let top = posterior
            .top(self.config.top_candidates)
            .into_iter()
            .map(|(idx, probability)| Candidate {
                id: catalog.character(idx).id.clone(),
                name: catalog.character(idx).name.clone(),
                probability,
            })
            .collect();

        let question_number = session.questions_taken() + usize::from(question.is_some());
        TurnReport {
            question,
            question_number,
            entropy_bits: posterior.entropy_bits(),
            top,
            guess,
        }
    }
}

fn log_proposal(catalog: &Catalog, session: &GameSession, candidate: usize, reason: ProposeReason) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    event!(
        target: "inquest_bot::policy",
        Level::INFO,
        character = %catalog.character(candidate).id,
        probability = session.posterior().probability(candidate),
        questions = session.questions_taken(),
        reason = ?reason,
        "proposing guess",
    );
}

fn log_rejection(catalog: &Catalog, session: &GameSession, rejected: usize, exhausted: bool) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    event!(
        target: "inquest_bot::policy",
        Level::INFO,
        character = %catalog.character(rejected).id,
        questions = session.questions_taken(),
        exhausted,
        "guess rejected",
    );
}
