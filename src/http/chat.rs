//! Health and chat relay handlers.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::http::request::request_id;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::upstream::{system_message, Completion};

/// `GET /api/health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /api/chat`
///
/// The body is read leniently: anything that is not a JSON object is treated
/// as an empty payload and fails the `messages` check.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Completion>, ApiError> {
    let start = Instant::now();
    let request_id = request_id(&headers).to_string();

    let result = relay(&state, &body).await;

    let status = match &result {
        Ok(_) => 200,
        Err(ApiError::Upstream(e)) => e.status_code().as_u16(),
        Err(ApiError::BadRequest(_)) => 400,
        Err(_) => 500,
    };
    metrics::record_chat(status, start);

    match &result {
        Ok(completion) => tracing::info!(
            request_id = %request_id,
            reply_chars = completion.reply.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Chat turn relayed"
        ),
        Err(e) => tracing::warn!(request_id = %request_id, status, error = ?e, "Chat turn failed"),
    }

    result.map(Json)
}

async fn relay(state: &AppState, body: &[u8]) -> Result<Completion, ApiError> {
    if !state.llm.has_api_key() {
        tracing::error!("No upstream API key configured");
        return Err(crate::upstream::UpstreamError::MissingApiKey.into());
    }

    let payload = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };

    let client_messages = payload
        .get("messages")
        .and_then(Value::as_array)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("Request must include a non-empty 'messages' list".to_string())
        })?;

    if !client_messages.iter().all(Value::is_object) {
        return Err(ApiError::BadRequest(
            "Each message must be a JSON object".to_string(),
        ));
    }

    let upstream = &state.config.upstream;
    let model = payload
        .get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(upstream.default_model.as_str());
    // Forwarded as sent; the upstream validates the value.
    let temperature = payload
        .get("temperature")
        .cloned()
        .unwrap_or_else(|| json!(upstream.default_temperature));

    let messages = assemble_messages(&upstream.system_prompt, &state.context.current(), client_messages);

    tracing::debug!(
        model,
        temperature = %temperature,
        messages = messages.len(),
        "Forwarding chat turn upstream"
    );

    Ok(state.llm.complete(&messages, model, &temperature).await?)
}

/// System prompt, then the document context (when there is any), then the
/// client's turns.
pub fn assemble_messages(
    system_prompt: &str,
    context: &str,
    client_messages: &[Value],
) -> Vec<Value> {
    let mut messages = Vec::with_capacity(client_messages.len() + 2);
    messages.push(system_message(system_prompt));
    if !context.is_empty() {
        messages.push(system_message(format!("Source documents:\n\n{}", context)));
    }
    messages.extend(client_messages.iter().cloned());
    messages
}
