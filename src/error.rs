//! Crate-wide error type.
//!
//! Mirrors the three-way response taxonomy of `spec.md` §7
//! (`OK` / `ERR` / `LOCKED`) the upstream Python `Response`/`RESPONSE_TYPE`
//! pair encoded, but as a real error type instead of a result-object with a
//! status field, in the idiom of `rvoip-call-engine`'s
//! `database::DatabaseError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub type Result<T> = std::result::Result<T, AcdError>;

#[derive(thiserror::Error, Debug)]
pub enum AcdError {
    #[error("{kind} {key} does not exist")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("{key} already in state {state}")]
    AlreadyInState { key: String, state: &'static str },

    #[error("invalid {kind} state: {detail}")]
    InvalidState { kind: &'static str, detail: String },

    #[error("agent {0} does not have skill {1}")]
    SkillAbsent(String, String),

    #[error("{0} must be a non-empty skill set")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),
}

impl AcdError {
    /// `spec.md` §7: every operation failure is `ERR`, mapped to HTTP 400,
    /// except lock contention, mapped to HTTP 409 (`LOCKED`).
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// The per-agent advisory lock's acquire-timeout fired. Kept distinct from
/// [`AcdError`] because `LOCKED` is not a validation failure: the caller
/// made no mistake, a concurrent holder simply won the race
/// (`spec.md` §4.2, §7).
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("resource locked")]
pub struct Locked;

/// The outcome of an agent-mutating operation: exactly the `{OK | ERR |
/// LOCKED}` variants `spec.md` §4.2 specifies, collapsed from two Rust
/// types (`Result<T, AcdError>` for ERR, [`Locked`] as a sibling) into one
/// enum so callers (REST handlers, the dispatcher) can match on it directly.
#[derive(Debug)]
pub enum Outcome<T> {
    Ok(T),
    Err(AcdError),
    Locked,
}

impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }
}

impl IntoResponse for AcdError {
    fn into_response(self) -> Response {
        (self.status_code(), axum::Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl IntoResponse for Locked {
    fn into_response(self) -> Response {
        (StatusCode::CONFLICT, axum::Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
