//! Session state: one running game against one player.

pub mod session;

pub use session::{AnswerEvent, GamePhase, GameSession, RejectOutcome, SessionError};
