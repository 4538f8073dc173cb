//! Registration session handlers.
//!
//! ```text
//! POST   /api/registration                 → 201, session id + greeting
//! GET    /api/registration/{id}            → current prompt and record
//! POST   /api/registration/{id}/messages   {"text": "..."}
//! POST   /api/registration/{id}/document   {"text": "<model extraction output>"}
//! DELETE /api/registration/{id}            → 204
//! ```

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::registration::{FlowEvent, FlowReply};

#[derive(Debug, Deserialize)]
pub struct TextInput {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub reply: FlowReply,
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn session_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("registration session not found".to_string()))
}

fn text(
    body: Result<Json<TextInput>, JsonRejection>,
    max_chars: usize,
) -> Result<String, ApiError> {
    let Json(input) = body.map_err(|e| {
        ApiError::BadRequest(format!("Expected a JSON body with a 'text' field: {}", e))
    })?;
    if input.text.chars().count() > max_chars {
        return Err(ApiError::PayloadTooLarge(format!(
            "Text is longer than {} characters",
            max_chars
        )));
    }
    Ok(input.text)
}

pub async fn create_session(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let (session_id, reply) = state.sessions.create()?;
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id, reply })))
}

pub async fn get_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<FlowReply>, ApiError> {
    let id = session_id(path)?;
    Ok(Json(state.sessions.snapshot(id)?))
}

pub async fn post_message(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<TextInput>, JsonRejection>,
) -> Result<Json<FlowReply>, ApiError> {
    let id = session_id(path)?;
    let text = text(body, state.config.registration.max_text_chars)?;
    Ok(Json(state.sessions.apply(id, FlowEvent::Message(text), today())?))
}

pub async fn post_document(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<TextInput>, JsonRejection>,
) -> Result<Json<FlowReply>, ApiError> {
    let id = session_id(path)?;
    let text = text(body, state.config.registration.max_text_chars)?;
    Ok(Json(state.sessions.apply(
        id,
        FlowEvent::DocumentExtracted(text),
        today(),
    )?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = session_id(path)?;
    if state.sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("registration session not found".to_string()))
    }
}
