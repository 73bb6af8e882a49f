//! HTTP boundary: four POST endpoints over the session store and shared KB.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Level, event};
use uuid::Uuid;

use inquest_bot::{CharacterUpdate, FeedbackOutcome, Quizmaster, TurnReport};
use inquest_core::config::EngineConfig;
use inquest_core::game::SessionError;
use inquest_core::model::{AnswerGrade, QuestionId};

use crate::kb::SharedKb;
use crate::sessions::{SessionEntry, SessionStore};

/// Header carrying the session id on every call after `/start`.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AppState {
    pub kb: Arc<SharedKb>,
    pub sessions: Arc<SessionStore>,
    pub engine: EngineConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start", post(start))
        .route("/answer", post(answer))
        .route("/next-question", post(next_question))
        .route("/guess-feedback", post(guess_feedback))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Turn payload shared by `/start`, `/answer`, and `/next-question`.
/// `question` and `guess` are mutually exclusive; both may be absent once a
/// session is terminal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnBody {
    question: Option<QuestionBody>,
    question_number: usize,
    /// Posterior Shannon entropy in bits.
    entropy: f64,
    top_candidates: Vec<CandidateBody>,
    guess: Option<CandidateBody>,
}

#[derive(Debug, Serialize)]
struct QuestionBody {
    id: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct CandidateBody {
    name: String,
    probability: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartBody {
    session_id: Uuid,
    #[serde(flatten)]
    turn: TurnBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerBody {
    question_id: String,
    answer: String,
}

#[derive(Debug, Deserialize)]
struct FeedbackBody {
    correct: bool,
}

#[derive(Debug, Serialize)]
struct FeedbackAck {
    ok: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl From<TurnReport> for TurnBody {
    fn from(report: TurnReport) -> Self {
        Self {
            question: report.question.map(|q| QuestionBody {
                id: q.id.to_string(),
                text: q.text,
            }),
            question_number: report.question_number,
            entropy: report.entropy_bits,
            top_candidates: report
                .top
                .into_iter()
                .map(|c| CandidateBody {
                    name: c.name,
                    probability: c.probability,
                })
                .collect(),
            guess: report.guess.map(|c| CandidateBody {
                name: c.name,
                probability: c.probability,
            }),
        }
    }
}

async fn start(State(state): State<AppState>) -> Result<Json<StartBody>, ApiError> {
    let catalog = state.kb.snapshot();
    let mut master = Quizmaster::new(state.engine);
    let (session, report) = master.begin(&catalog);
    let session_id = state
        .sessions
        .insert(SessionEntry::new(catalog, master, session));

    event!(
        target: "inquest_server::api",
        Level::INFO,
        session = %session_id,
        live = state.sessions.len(),
        "session started",
    );
    Ok(Json(StartBody {
        session_id,
        turn: report.into(),
    }))
}

async fn answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AnswerBody>, JsonRejection>,
) -> Result<Json<TurnBody>, ApiError> {
    let Json(body) = body?;
    let session_id = require_session(&headers)?;
    let cell = state
        .sessions
        .get(&session_id)
        .ok_or(ApiError::UnknownSession)?;

    let mut guard = cell.lock();
    let entry = &mut *guard;
    entry.touch();

    let grade = AnswerGrade::from_label(&body.answer)
        .ok_or_else(|| ApiError::UnknownAnswer(body.answer.clone()))?;
    let question = entry
        .catalog
        .index_of_question(&QuestionId::from(body.question_id.as_str()))
        .ok_or_else(|| ApiError::UnknownQuestion(body.question_id.clone()))?;

    let report = entry
        .master
        .answer(&entry.catalog, &mut entry.session, question, grade)?;
    Ok(Json(report.into()))
}

async fn next_question(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TurnBody>, ApiError> {
    let session_id = require_session(&headers)?;
    let cell = state
        .sessions
        .get(&session_id)
        .ok_or(ApiError::UnknownSession)?;

    let mut guard = cell.lock();
    let entry = &mut *guard;
    entry.touch();
    let report = entry.master.resume(&entry.catalog, &mut entry.session);
    Ok(Json(report.into()))
}

async fn guess_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<FeedbackBody>, JsonRejection>,
) -> Result<Json<FeedbackAck>, ApiError> {
    let Json(body) = body?;
    let session_id = require_session(&headers)?;
    let cell = state
        .sessions
        .get(&session_id)
        .ok_or(ApiError::UnknownSession)?;

    let resolution = {
        let mut guard = cell.lock();
        let entry = &mut *guard;
        entry.touch();
        let outcome = entry
            .master
            .feedback(&entry.catalog, &mut entry.session, body.correct)?;
        resolve_feedback(entry, outcome)
    };

    // The confirmation already went out; a failed write-back never takes
    // the in-memory outcome back.
    if let Some(update) = resolution.update.as_ref() {
        match state.kb.apply(update) {
            Ok(()) => {
                if let Err(err) = state.kb.persist() {
                    event!(
                        target: "inquest_server::kb",
                        Level::WARN,
                        session = %session_id,
                        error = %err,
                        "confirmed update could not be persisted",
                    );
                }
            }
            Err(err) => {
                event!(
                    target: "inquest_server::kb",
                    Level::WARN,
                    session = %session_id,
                    error = %err,
                    "confirmed update could not be applied",
                );
            }
        }
    }

    if resolution.terminal {
        state.sessions.remove(&session_id);
    }

    Ok(Json(FeedbackAck {
        ok: true,
        message: resolution.message,
    }))
}

struct Resolution {
    message: String,
    update: Option<CharacterUpdate>,
    terminal: bool,
}

fn resolve_feedback(entry: &SessionEntry, outcome: FeedbackOutcome) -> Resolution {
    match outcome {
        FeedbackOutcome::Confirmed { character, update } => Resolution {
            message: format!("Confirmed: {}.", entry.catalog.character(character).name),
            update,
            terminal: true,
        },
        FeedbackOutcome::RejectedContinue => Resolution {
            message: "Guess rejected; ask for the next question to continue.".to_string(),
            update: None,
            terminal: false,
        },
        FeedbackOutcome::NoMatch => Resolution {
            message: "No remaining candidate matches.".to_string(),
            update: None,
            terminal: true,
        },
    }
}

fn require_session(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get(SESSION_HEADER)
        .ok_or(ApiError::MissingSession)?;
    value
        .to_str()
        .ok()
        .and_then(|text| Uuid::parse_str(text.trim()).ok())
        .ok_or(ApiError::InvalidSession)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed request body: {0}")]
    Malformed(String),
    #[error("unknown answer label `{0}`")]
    UnknownAnswer(String),
    #[error("unknown question id `{0}`")]
    UnknownQuestion(String),
    #[error("missing x-session-id header")]
    MissingSession,
    #[error("x-session-id header is not a UUID")]
    InvalidSession,
    #[error("unknown or expired session")]
    UnknownSession,
    #[error("{0}")]
    Phase(SessionError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Malformed(_)
            | ApiError::UnknownAnswer(_)
            | ApiError::UnknownQuestion(_)
            | ApiError::MissingSession
            | ApiError::InvalidSession => StatusCode::BAD_REQUEST,
            ApiError::UnknownSession => StatusCode::NOT_FOUND,
            ApiError::Phase(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            // Question ids resolve against the catalog before touching the
            // session, so an index failure here is a server bug.
            SessionError::UnknownQuestion(_) => ApiError::Internal(err.to_string()),
            other => ApiError::Phase(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            event!(
                target: "inquest_server::api",
                Level::ERROR,
                %status,
                error = %self,
                "request failed",
            );
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
