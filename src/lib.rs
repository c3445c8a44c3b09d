//! Codex Gateway - an OpenAI-compatible front door for a single "responses" upstream
//!
//! The gateway accepts requests in two dialects, rewrites them into the
//! upstream's shape, and forwards them with a bearer credential resolved once
//! at startup:
//!
//! - **Credential Resolution**: direct token, or a depth-first search of a JSON
//!   credential document
//! - **Model Name Mapping**: ASCII case-insensitive table with pass-through for unknown names
//! - **Request Rewriting**: `messages` becomes `input`; everything else is untouched
//! - **Streaming Support**: Server-Sent Events relayed byte for byte with backpressure
//! - **Cancellation**: caller disconnects abort the upstream request
//!
//! # Architecture
//!
//! - [`core`]: Startup components and shared primitives (config, credential,
//!   model mapping, errors, cancellation, request ids)
//! - [`transformer`]: Inbound body rewriting
//! - [`api`]: HTTP handlers, the forwarding engine and the streaming relay
//!
//! # Configuration
//!
//! Optional environment variables:
//! - `GATEWAY_CONFIG`: YAML/TOML/JSON configuration file
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 18000)
//! - `UPSTREAM_BASE_URL`: Upstream base URL
//! - `UPSTREAM_BEARER_TOKEN`: Bearer token, bypassing the credential file
//! - `CREDENTIAL_FILE`: Credential document (default: ~/.codex/auth.json)
//! - `REQUEST_TIMEOUT_SECS`: Non-streaming deadline in seconds (default: 120)
//! - `VERIFY_SSL`: Verify SSL certificates for upstream (default: true)

pub mod api;
pub mod core;
pub mod transformer;

// Re-export commonly used types for convenience
pub use api::{router, AppState, ForwardContext, ForwardEngine};
pub use core::{AppConfig, AppError, Credential, CredentialSource, ModelMapper, Result};
pub use transformer::RequestDialect;
