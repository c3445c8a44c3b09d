//! Request rewriting into the upstream "responses" shape.
//!
//! Two inbound dialects are accepted:
//!
//! - **Responses**: already upstream-shaped (`input`), only `model` is translated.
//! - **Chat completions**: carries `messages`, which is renamed to `input`
//!   without touching the array.
//!
//! Everything else is passed through unexamined. No schema validation is
//! performed beyond "the body is a JSON object", so client extensions keep
//! working.

use crate::core::error::AppError;
use crate::core::model_map::ModelMapper;
use serde_json::{Map, Value};

/// Inbound request dialect, selected by the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDialect {
    /// `/v1/responses`: body carries `input`
    Responses,
    /// `/v1/chat/completions`: body carries `messages`
    ChatCompletions,
}

impl RequestDialect {
    /// Rewrite a body of this dialect into the upstream shape.
    pub fn rewrite(self, body: &Map<String, Value>, mapper: &ModelMapper) -> Map<String, Value> {
        match self {
            RequestDialect::Responses => rewrite_direct(body, mapper),
            RequestDialect::ChatCompletions => rewrite_from_chat_shape(body, mapper),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestDialect::Responses => "responses",
            RequestDialect::ChatCompletions => "chat_completions",
        }
    }
}

/// Parse an inbound body, requiring a JSON object.
pub fn parse_request_body(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::BadRequest(format!("Invalid JSON body: {}", e))),
    }
}

fn model_name(body: &Map<String, Value>) -> Option<&str> {
    body.get("model").and_then(Value::as_str)
}

/// Rewrite a body that is already upstream-shaped: clone it and translate `model`.
pub fn rewrite_direct(body: &Map<String, Value>, mapper: &ModelMapper) -> Map<String, Value> {
    let mut rewritten = body.clone();
    let model = mapper.map(model_name(body));
    rewritten.insert("model".to_string(), Value::String(model));
    rewritten
}

/// Rewrite a chat-shaped body: rename `messages` to `input` and translate `model`.
///
/// A `messages` value that is not an array is dropped, leaving `input` unset.
pub fn rewrite_from_chat_shape(
    body: &Map<String, Value>,
    mapper: &ModelMapper,
) -> Map<String, Value> {
    let mut rewritten: Map<String, Value> = body
        .iter()
        .filter(|(key, _)| key.as_str() != "messages")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    rewritten.insert(
        "model".to_string(),
        Value::String(mapper.map(model_name(body))),
    );

    // `messages` wins over any `input` the caller also sent
    if let Some(Value::Array(messages)) = body.get("messages") {
        rewritten.insert("input".to_string(), Value::Array(messages.clone()));
    }
    rewritten
}

/// Whether the (rewritten) payload asks for a streamed response.
pub fn is_streaming(payload: &Map<String, Value>) -> bool {
    payload
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
