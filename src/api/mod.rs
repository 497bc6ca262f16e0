//! # REST surface
//!
//! `spec.md` §6's route table, mapped straight onto [`crate::operations`]:
//! every handler here does argument extraction and response-envelope
//! shaping and nothing else. Modeled on `rvoip-call-engine::api`'s
//! Axum router-building style (one `fn routes(state) -> Router`, handlers
//! as free functions taking `State<...>` + extractors).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{Locked, Outcome};
use crate::operations::Operations;
use crate::states::{AcdState, AgentState};

/// Build the full router. Handlers reach [`Operations`] through Axum's
/// `State` extractor, wrapped in an `Arc` so cloning it per-request is
/// just a refcount bump. Every request is traced (`tracing`-backed
/// `TraceLayer`, consistent with `SPEC_FULL.md §10`'s structured-logging
/// ambient stack) and CORS is left permissive — this surface has no
/// authentication boundary to protect (`spec.md` §1 lists agent
/// authentication as a Non-goal).
pub fn routes(ops: Operations) -> Router {
    Router::new()
        .route("/acd", post(set_acd_state))
        .route("/contact", post(create_contact))
        .route("/contact/:key", get(get_contact).patch(complete_contact))
        .route("/agent/:key", post(create_agent).delete(delete_agent).patch(change_agent_info))
        .route("/agent/:key/state", patch(set_agent_state))
        .route("/agent/:key/skill", patch(add_agent_skill))
        .route("/agent/:key/skill/:skill", delete(delete_agent_skill))
        .route("/skill/:skill", delete(delete_skill))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(Arc::new(ops))
}

type AppState = State<Arc<Operations>>;

/// Turn an [`Outcome`] into an HTTP response: `ERR -> 400`, `LOCKED ->
/// 409` (`spec.md` §7), `OK -> ok_status` with the caller-supplied
/// `{<resource>_key: value}` envelope.
fn respond<T>(outcome: Outcome<T>, ok_status: StatusCode, envelope: impl FnOnce(T) -> serde_json::Value) -> Response {
    match outcome {
        Outcome::Ok(value) => (ok_status, Json(envelope(value))).into_response(),
        Outcome::Err(err) => err.into_response(),
        Outcome::Locked => Locked.into_response(),
    }
}

#[derive(Deserialize)]
struct AcdStateBody {
    state: AcdState,
}

async fn set_acd_state(State(ops): AppState, Json(body): Json<AcdStateBody>) -> Response {
    let outcome = ops.set_acd_state(body.state).await;
    respond(outcome, StatusCode::CREATED, |state| json!({ "acd_state": state }))
}

#[derive(Deserialize)]
struct CreateContactBody {
    skills: Vec<String>,
}

async fn create_contact(State(ops): AppState, Json(body): Json<CreateContactBody>) -> Response {
    let outcome = ops.create_contact(body.skills).await;
    respond(outcome, StatusCode::CREATED, |key| json!({ "contact_key": key }))
}

async fn complete_contact(State(ops): AppState, Path(key): Path<String>) -> Response {
    let outcome = ops.complete_contact(&key).await;
    respond(outcome, StatusCode::OK, |key| json!({ "contact_key": key }))
}

async fn get_contact(State(ops): AppState, Path(key): Path<String>) -> Response {
    let outcome = ops.get_contact(&key).await;
    respond(outcome, StatusCode::OK, |contact| serde_json::to_value(contact).expect("contact serializes"))
}

#[derive(Deserialize)]
struct CreateAgentBody {
    fname: String,
    lname: String,
    skills: Vec<String>,
}

async fn create_agent(State(ops): AppState, Path(key): Path<String>, Json(body): Json<CreateAgentBody>) -> Response {
    let outcome = ops.create_agent(&key, body.fname, body.lname, body.skills).await;
    respond(outcome, StatusCode::CREATED, |key| json!({ "agent_key": key }))
}

async fn delete_agent(State(ops): AppState, Path(key): Path<String>) -> Response {
    let outcome = ops.delete_agent(&key).await;
    respond(outcome, StatusCode::OK, |key| json!({ "agent_key": key }))
}

#[derive(Deserialize)]
struct AgentStateBody {
    state: AgentState,
}

async fn set_agent_state(State(ops): AppState, Path(key): Path<String>, Json(body): Json<AgentStateBody>) -> Response {
    let outcome = ops.set_agent_state(&key, body.state).await;
    respond(outcome, StatusCode::OK, |key| json!({ "agent_key": key }))
}

#[derive(Deserialize)]
struct ChangeAgentInfoBody {
    fname: String,
    lname: String,
}

async fn change_agent_info(State(ops): AppState, Path(key): Path<String>, Json(body): Json<ChangeAgentInfoBody>) -> Response {
    let outcome = ops.change_agent_info(&key, body.fname, body.lname).await;
    respond(outcome, StatusCode::OK, |key| json!({ "agent_key": key }))
}

#[derive(Deserialize)]
struct AddSkillBody {
    skill: String,
}

async fn add_agent_skill(State(ops): AppState, Path(key): Path<String>, Json(body): Json<AddSkillBody>) -> Response {
    let outcome = ops.add_agent_skill(&key, &body.skill).await;
    respond(outcome, StatusCode::OK, |key| json!({ "agent_key": key }))
}

async fn delete_agent_skill(State(ops): AppState, Path((key, skill)): Path<(String, String)>) -> Response {
    let outcome = ops.delete_agent_skill(&key, &skill).await;
    respond(outcome, StatusCode::OK, |key| json!({ "agent_key": key }))
}

async fn delete_skill(State(ops): AppState, Path(skill): Path<String>) -> Response {
    let outcome = ops.delete_skill(&skill).await;
    respond(outcome, StatusCode::OK, |skill| json!({ "skill": skill }))
}
