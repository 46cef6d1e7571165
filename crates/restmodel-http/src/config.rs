//! Client configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::DEFAULT_SUCCESS;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Settings for one client.
///
/// Deserializable from JSON (camelCase keys), or built in code:
///
/// ```
/// use restmodel_http::ClientConfig;
///
/// let config = ClientConfig::new("people", "https://api.example.com/v1")
///     .timeout_ms(5_000)
///     .header("Accept", "application/json");
/// assert_eq!(config.success_codes, vec![200, 201, 202]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Client type name, part of the registry key
    pub name: String,
    /// Base URI stamped on every request
    pub uri: String,
    /// Statuses treated as success
    pub success_codes: Vec<u16>,
    pub timeout_ms: u64,
    pub user_agent: Option<String>,
    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            uri: String::new(),
            success_codes: DEFAULT_SUCCESS.to_vec(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: None,
            headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON document.
    pub fn from_json(text: &str) -> restmodel_core::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn success_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_success(&self, status: u16) -> bool {
        self.success_codes.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.is_success(202));
        assert!(!config.is_success(204));
    }

    #[test]
    fn loads_from_json_with_defaults() {
        let config = ClientConfig::from_json(
            r#"{"name":"people","uri":"http://api.test","successCodes":[200,204],"userAgent":"x"}"#,
        )
        .unwrap();
        assert_eq!(config.name, "people");
        assert!(config.is_success(204));
        assert!(!config.is_success(201));
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.user_agent.as_deref(), Some("x"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ClientConfig::from_json("{\"timeoutMs\":\"soon\"}").is_err());
    }
}
