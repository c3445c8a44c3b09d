//! API layer for the gateway.
//!
//! This module contains the HTTP handlers and router, the forwarding engine
//! that talks to the upstream, and the streaming relay.

pub mod disconnect;
pub mod forward;
pub mod handlers;
pub mod models;
pub mod streaming;
pub mod upstream;

// Re-export commonly used types
pub use forward::{ForwardContext, ForwardEngine, ForwardStage};
pub use handlers::{chat_completions, health, list_models, responses, router, AppState};
pub use models::{HealthResponse, ModelInfo, ModelList};
pub use streaming::{relay_stream, RELAY_CHUNK_SIZE};
