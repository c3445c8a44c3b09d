//! API response models.
//!
//! Request bodies are deliberately untyped (`serde_json::Map`) so unknown
//! fields pass through; only the gateway's own responses are modelled here.

use crate::core::model_map::ModelMapper;
use serde::{Deserialize, Serialize};

/// Model information in list responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// List of available models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelList {
    /// Advertise every external name the mapper knows.
    pub fn from_mapper(mapper: &ModelMapper, created: i64) -> Self {
        Self {
            object: "list".to_string(),
            data: mapper
                .external_names()
                .into_iter()
                .map(|name| ModelInfo {
                    id: name.to_string(),
                    object: "model".to_string(),
                    created,
                    owned_by: "codex-gateway".to_string(),
                })
                .collect(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
