//! Configuration management for the gateway.
//!
//! Configuration is layered: built-in defaults, then an optional file (YAML,
//! TOML or JSON, picked by extension) read through the `config` crate, then
//! environment variable overrides.

use crate::core::credential::{mask_secret, CredentialSource};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Base URL of the upstream service; requests go to `{base}/responses`
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Bearer token supplied directly; skips the credential file when set
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// JSON credential document searched for a token
    #[serde(default)]
    pub credential_file: Option<PathBuf>,

    /// Deadline in seconds for non-streaming upstream requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Whether to verify SSL certificates for upstream requests
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Extra model name mappings (client model -> upstream model)
    #[serde(default)]
    pub model_mapping: HashMap<String, String>,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Parse the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let raw = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        raw.parse()
            .with_context(|| format!("Invalid listen address: {}", raw))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    18000
}

fn default_upstream_base_url() -> String {
    "https://chatgpt.com/backend-api/codex".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_verify_ssl() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream_base_url: default_upstream_base_url(),
            bearer_token: None,
            credential_file: None,
            request_timeout_secs: default_request_timeout(),
            verify_ssl: default_verify_ssl(),
            model_mapping: HashMap::new(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("server", &self.server)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("bearer_token", &self.bearer_token.as_deref().map(mask_secret))
            .field("credential_file", &self.credential_file)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("verify_ssl", &self.verify_ssl)
            .field("model_mapping", &self.model_mapping)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from an optional file, then apply environment overrides.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codex_gateway::core::config::AppConfig;
    ///
    /// let config = AppConfig::load(Some("gateway.yaml".as_ref())).expect("Failed to load config");
    /// ```
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from the file named by `GATEWAY_CONFIG`, if any.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("GATEWAY_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        Self::load(path.as_deref())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .build()
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Environment variables take precedence over the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }

        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(base_url) = std::env::var("UPSTREAM_BASE_URL") {
            if !base_url.trim().is_empty() {
                self.upstream_base_url = base_url;
            }
        }

        if let Ok(token) = std::env::var("UPSTREAM_BEARER_TOKEN") {
            if !token.trim().is_empty() {
                self.bearer_token = Some(token);
            }
        }

        if let Ok(file) = std::env::var("CREDENTIAL_FILE") {
            if !file.trim().is_empty() {
                self.credential_file = Some(PathBuf::from(file));
            }
        }

        if let Ok(verify_ssl_str) = std::env::var("VERIFY_SSL") {
            self.verify_ssl = str_to_bool(&verify_ssl_str);
        }

        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                self.request_timeout_secs = timeout;
            }
        }
    }

    /// Deadline applied to non-streaming upstream requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full upstream endpoint URL.
    pub fn upstream_url(&self) -> String {
        format!("{}/responses", self.upstream_base_url.trim_end_matches('/'))
    }

    /// Where the bearer credential comes from.
    ///
    /// A non-empty direct token wins; otherwise the configured credential
    /// file, falling back to `~/.codex/auth.json`.
    pub fn credential_source(&self) -> CredentialSource {
        if let Some(token) = self.bearer_token.as_ref().filter(|t| !t.trim().is_empty()) {
            let origin = if std::env::var("UPSTREAM_BEARER_TOKEN").is_ok_and(|t| t == *token) {
                "env:UPSTREAM_BEARER_TOKEN"
            } else {
                "config:bearer_token"
            };
            return CredentialSource::Token {
                token: token.clone(),
                origin: origin.to_string(),
            };
        }

        let path = self.credential_file.clone().unwrap_or_else(default_credential_file);
        CredentialSource::File(path)
    }
}

fn default_credential_file() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".codex").join("auth.json"))
        .unwrap_or_else(|| PathBuf::from("auth.json"))
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
