//! HTTP request handlers for the gateway API.
//!
//! Both completion routes share one path: parse the body, rewrite it for the
//! route's dialect, then hand it to the [`ForwardEngine`]. The handler never
//! inspects the upstream answer.

use crate::api::forward::{ForwardContext, ForwardEngine};
use crate::api::models::{HealthResponse, ModelList};
use crate::core::{get_request_id, request_id_middleware, CallerCancel, ModelMapper, Result};
use crate::transformer::{parse_request_body, RequestDialect};
use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ForwardEngine>,
    pub mapper: Arc<ModelMapper>,
    /// Parent of every per-request cancellation token
    pub shutdown: CancellationToken,
    /// Unix timestamp reported as `created` in the model listing
    pub started_at: i64,
}

impl AppState {
    pub fn new(engine: ForwardEngine, mapper: ModelMapper, shutdown: CancellationToken) -> Self {
        Self {
            engine: Arc::new(engine),
            mapper: Arc::new(mapper),
            shutdown,
            started_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Build the gateway router with all endpoints and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/responses", post(responses))
        .route("/responses", post(responses))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .route("/models", get(list_models))
        .route("/health", get(health))
        .with_state(state)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Handle requests already in the upstream "responses" shape.
pub async fn responses(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    forward_dialect(&state, RequestDialect::Responses, &body).await
}

/// Handle chat-completions shaped requests (`messages` instead of `input`).
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response> {
    forward_dialect(&state, RequestDialect::ChatCompletions, &body).await
}

async fn forward_dialect(
    state: &AppState,
    dialect: RequestDialect,
    body: &[u8],
) -> Result<Response> {
    // Scoped by the request-id middleware; empty when the handler runs without it
    let request_id = Some(get_request_id()).filter(|id| !id.is_empty());

    let inbound = parse_request_body(body).inspect_err(|e| {
        tracing::warn!(
            request_id = request_id.as_deref().unwrap_or(""),
            dialect = dialect.as_str(),
            error = %e,
            "Rejected inbound request"
        );
    })?;
    let payload = dialect.rewrite(&inbound, &state.mapper);

    let caller = CallerCancel::new(state.shutdown.child_token());
    let ctx = ForwardContext::new(request_id, &payload, caller);

    let client_model = model_field(&inbound);
    let upstream_model = model_field(&payload);
    tracing::info!(
        request_id = %ctx.request_id,
        dialect = dialect.as_str(),
        client_model,
        upstream_model,
        stream = ctx.streaming,
        "Forwarding request"
    );

    Ok(state.engine.forward(ctx, payload).await)
}

fn model_field(body: &Map<String, Value>) -> &str {
    body.get("model").and_then(Value::as_str).unwrap_or("")
}

/// List the model names clients may use.
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(ModelList::from_mapper(&state.mapper, state.started_at))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}
