//! The JSON wire envelope: `{contentType, payload, metadata}`.

use serde::{Deserialize, Serialize};

use restmodel_core::error::{ParserError, Result};
use restmodel_core::{Value, Values};

/// Response body shape shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub content_type: Option<String>,
    pub payload: Value,
    pub metadata: Values,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
}

impl Envelope {
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            content_type: Some("json".to_string()),
            payload: payload.into(),
            metadata: Values::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    /// Decode a body. A missing or null payload is a decode failure.
    pub fn decode(content: &str) -> std::result::Result<Self, ParserError> {
        let wire: WireEnvelope = serde_json::from_str(content).map_err(|e| {
            let mut err = ParserError::decode(
                format!("unable to decode json successfully : {}", content),
                content,
            );
            err.source = Some(Box::new(e));
            err
        })?;

        let Some(payload) = wire.payload.filter(|p| !p.is_null()) else {
            return Err(ParserError::decode(
                format!("unable to decode json successfully : {}", content),
                content,
            ));
        };

        let metadata = match wire.metadata {
            Some(Value::Object(map)) => map,
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Values::new(),
        };

        Ok(Self {
            content_type: wire.content_type,
            payload,
            metadata,
        })
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
