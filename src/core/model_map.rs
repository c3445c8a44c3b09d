//! Model name translation between the public dialect and the upstream.
//!
//! Unknown names pass through unchanged so that newer upstream models are
//! never blocked by a stale table.

use std::collections::HashMap;

/// Upstream model used when a request carries no model name.
pub const DEFAULT_UPSTREAM_MODEL: &str = "codex-gpt-4.1";

/// Built-in mapping table (external name, upstream name).
pub const DEFAULT_MODEL_TABLE: &[(&str, &str)] = &[
    ("gpt-4.1", "codex-gpt-4.1"),
    ("gpt-4.1-mini", "codex-gpt-4.1-mini"),
    ("gpt-4o", "codex-gpt-4o"),
    ("o3", "codex-o3"),
    ("o4-mini", "codex-o4-mini"),
    ("gpt-5", "codex-gpt-5"),
];

/// Ordered model mapping table, matched ASCII case-insensitively.
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct ModelMapper {
    entries: Vec<(String, String)>,
    default_model: String,
}

impl ModelMapper {
    pub fn new<I, K, V>(entries: I, default_model: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapper = Self {
            entries: Vec::new(),
            default_model: default_model.into(),
        };
        for (external, upstream) in entries {
            mapper.insert(external.into(), upstream.into());
        }
        mapper
    }

    /// The built-in table extended with configured overrides.
    ///
    /// Overrides replace built-in entries with the same (ASCII case-insensitive)
    /// name and are appended otherwise, in sorted order for determinism.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut mapper = Self::default();
        let mut extra: Vec<_> = overrides.iter().collect();
        extra.sort();
        for (external, upstream) in extra {
            mapper.insert(external.clone(), upstream.clone());
        }
        mapper
    }

    fn insert(&mut self, external: String, upstream: String) {
        match self
            .entries
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&external))
        {
            Some(entry) => entry.1 = upstream,
            None => self.entries.push((external, upstream)),
        }
    }

    /// Translate an external model name to the upstream one, ignoring ASCII case.
    pub fn map(&self, external: Option<&str>) -> String {
        let Some(name) = external.filter(|name| !name.trim().is_empty()) else {
            return self.default_model.clone();
        };

        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, upstream)| upstream.clone())
            .unwrap_or_else(|| name.to_string())
    }

    /// External names for the model discovery listing.
    pub fn external_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Default for ModelMapper {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_TABLE.iter().copied(), DEFAULT_UPSTREAM_MODEL)
    }
}
