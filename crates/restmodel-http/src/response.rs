//! Read-only view of a completed exchange.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::Request;
use crate::status;

/// Status, headers and body returned for a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    status: u16,
    headers: BTreeMap<String, String>,
    request: Request,
    content: String,
}

impl Response {
    pub fn new(
        status: u16,
        headers: BTreeMap<String, String>,
        request: Request,
        content: impl Into<String>,
    ) -> Self {
        Self {
            status,
            headers,
            request,
            content: content.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase for the status, `"Unknown"` when unrecognized.
    pub fn status_text(&self) -> &'static str {
        status::reason(self.status).unwrap_or("Unknown")
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Header lookup ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The request this response answers.
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> Response {
        let headers = [("Content-Type".to_string(), "application/json".to_string())]
            .into_iter()
            .collect();
        Response::new(status, headers, Request::delete(), "{}")
    }

    #[test]
    fn headers_are_case_insensitive() {
        let r = response(200);
        assert_eq!(r.header("content-type"), Some("application/json"));
        assert_eq!(r.header("X-Missing"), None);
    }

    #[test]
    fn status_text_and_success() {
        assert_eq!(response(201).status_text(), "Created");
        assert!(response(204).is_success());
        assert!(!response(404).is_success());
        assert_eq!(response(599).status_text(), "Unknown");
    }

    #[test]
    fn keeps_the_originating_request() {
        assert_eq!(response(200).request().method(), crate::request::Method::Delete);
    }
}
