pub mod learner;
pub mod master;
pub mod policy;
pub mod select;

pub use learner::{CharacterUpdate, OnlineLearner, TraitAdjustment};
pub use master::{Candidate, FeedbackOutcome, QuestionRef, Quizmaster, TurnReport};
pub use policy::{GuessDecision, GuessPolicy, ProposeReason};
pub use select::{Choice, EntropySelector, QuestionSelector, SelectContext, UniformSelector};
