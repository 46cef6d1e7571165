//! The boundary between a gateway and whatever performs HTTP calls.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use restmodel_core::error::{GatewayError, GatewayErrorKind};

use crate::request::Method;

/// A file sent as a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name
    pub name: String,
    pub path: PathBuf,
}

/// Encoded request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `multipart/form-data`
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

impl Body {
    /// Text value of a form field.
    pub fn field(&self, name: &str) -> Option<&str> {
        let fields = match self {
            Body::Form(fields) | Body::Multipart { fields, .. } => fields,
        };
        fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn files(&self) -> &[FilePart] {
        match self {
            Body::Form(_) => &[],
            Body::Multipart { files, .. } => files,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Body::Multipart { .. })
    }
}

/// One call as handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl TransportRequest {
    /// Value for a single `Cookie` header, pairs joined with `; `.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// What a transport hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Header lines as received, e.g. `Content-Type: application/json`
    pub raw_headers: Vec<String>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            raw_headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, line: impl Into<String>) -> Self {
        self.raw_headers.push(line.into());
        self
    }
}

/// Performs HTTP calls for a gateway.
pub trait Transport: Send + fmt::Debug {
    fn name(&self) -> &str;

    /// Perform one call. Only failures below HTTP are errors; any status is
    /// a response.
    fn send(&mut self, call: &TransportRequest) -> Result<TransportResponse, GatewayError>;
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<TransportResponse, String>>,
    calls: Vec<TransportRequest>,
}

/// Replays canned responses and records every call it receives.
///
/// Clones share the same script, so a test can keep a handle after moving
/// a clone into a gateway.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a response.
    pub fn push(&self, response: TransportResponse) -> &Self {
        self.script().replies.push_back(Ok(response));
        self
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.script().replies.push_back(Err(message.into()));
        self
    }

    /// Builder-style [`push`](Self::push).
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.push(TransportResponse::new(status, body));
        self
    }

    /// Builder-style [`push_failure`](Self::push_failure).
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push_failure(message);
        self
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<TransportRequest> {
        self.script().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script().calls.len()
    }

    pub fn last_call(&self) -> Option<TransportRequest> {
        self.script().calls.last().cloned()
    }

    /// Queued replies not yet consumed.
    pub fn pending(&self) -> usize {
        self.script().replies.len()
    }
}

impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    fn send(&mut self, call: &TransportRequest) -> Result<TransportResponse, GatewayError> {
        let mut script = self.script();
        script.calls.push(call.clone());
        match script.replies.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(GatewayError::new(GatewayErrorKind::Transport, message)),
            None => Err(GatewayError::new(
                GatewayErrorKind::Transport,
                format!("no scripted response left for {} {}", call.method, call.url),
            )),
        }
    }
}
