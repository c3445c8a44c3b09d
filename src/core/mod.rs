//! Core functionality for the gateway.
//!
//! This module contains the components established once at startup and the
//! primitives shared by the request path:
//! - Configuration management
//! - Credential resolution and model mapping
//! - Error handling
//! - Cancellation and request correlation

pub mod cancel;
pub mod config;
pub mod credential;
pub mod error;
pub mod error_types;
pub mod logging;
pub mod middleware;
pub mod model_map;

// Re-export commonly used types
pub use cancel::{CallerCancel, CancelReason, DisconnectGuard, ForwardSignal};
pub use config::{AppConfig, ServerConfig};
pub use credential::{Credential, CredentialError, CredentialSource};
pub use error::{AppError, Result};
pub use logging::{generate_request_id, get_request_id, REQUEST_ID};
pub use middleware::request_id_middleware;
pub use model_map::ModelMapper;
