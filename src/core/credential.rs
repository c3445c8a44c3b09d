//! Upstream bearer credential resolution.
//!
//! A credential is either supplied directly (config or environment) or found
//! by a depth-first search of a JSON credential document such as
//! `~/.codex/auth.json`. Only the locator of the token is ever logged.

use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Candidate key names, in priority order, checked at every object level.
pub const TOKEN_KEYS: &[&str] = &["token", "api_key", "apiKey", "access_token"];

/// Maximum nesting depth explored in a credential document.
pub const MAX_SEARCH_DEPTH: usize = 32;

/// A resolved upstream bearer token.
#[derive(Clone)]
pub struct Credential {
    token: String,
    locator: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            locator: locator.into(),
        }
    }

    /// The raw token. Only the upstream request builder should call this.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Where the token was found, e.g. `$.tokens.access_token`.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Masked form safe for diagnostics.
    pub fn masked(&self) -> String {
        mask_secret(&self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.masked())
            .field("locator", &self.locator)
            .finish()
    }
}

/// Where to obtain the credential from.
#[derive(Clone)]
pub enum CredentialSource {
    /// A token supplied directly, with a label naming its origin.
    Token { token: String, origin: String },
    /// A JSON document to search.
    File(PathBuf),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Token { origin, .. } => {
                f.debug_struct("Token").field("origin", origin).finish()
            }
            CredentialSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read credential file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credential file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No credential found (looked for keys: {})", attempted.join(", "))]
    NotFound { attempted: Vec<String> },
}

/// Resolve the credential from its source.
pub fn resolve(source: &CredentialSource) -> Result<Credential, CredentialError> {
    match source {
        CredentialSource::Token { token, origin } if !token.trim().is_empty() => {
            Ok(Credential::new(token.trim(), origin.clone()))
        }
        CredentialSource::Token { .. } => Err(not_found()),
        CredentialSource::File(path) => resolve_file(path),
    }
}

fn resolve_file(path: &Path) -> Result<Credential, CredentialError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CredentialError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            CredentialError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let document: Value =
        serde_json::from_str(&content).map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let (token, locator) = find_token(&document).ok_or_else(not_found)?;
    Ok(Credential::new(token, locator))
}

fn not_found() -> CredentialError {
    CredentialError::NotFound {
        attempted: TOKEN_KEYS.iter().map(|k| k.to_string()).collect(),
    }
}

/// Depth-first search for the first token field in document order.
///
/// Returns the token and its locator (`$.a.b[2].api_key`).
pub fn find_token(document: &Value) -> Option<(String, String)> {
    search(document, "$".to_string(), 0)
}

fn search(node: &Value, locator: String, depth: usize) -> Option<(String, String)> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }

    match node {
        Value::Object(map) => {
            for key in TOKEN_KEYS {
                if let Some(Value::String(token)) = map.get(*key) {
                    if !token.is_empty() {
                        return Some((token.clone(), format!("{}.{}", locator, key)));
                    }
                }
            }
            map.iter().find_map(|(key, value)| {
                search(value, format!("{}.{}", locator, key), depth + 1)
            })
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, value)| search(value, format!("{}[{}]", locator, index), depth + 1)),
        _ => None,
    }
}

/// Mask a secret for diagnostics: first and last four characters only.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
