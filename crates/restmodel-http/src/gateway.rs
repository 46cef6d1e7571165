//! Executes one request at a time through a [`Transport`].
//!
//! A gateway is either idle or executed. `exec` on an executed gateway does
//! nothing; `reset` returns it to idle. Gateways own their transport handle
//! and cannot be cloned.

use std::collections::BTreeMap;
use std::path::PathBuf;

use restmodel_core::error::{GatewayError, GatewayErrorKind};
use restmodel_core::validate::compiled;
use restmodel_core::{Value, Values};

use crate::request::Request;
use crate::response::Response;
use crate::transport::{Body, FilePart, Transport, TransportRequest};

/// Form field carrying the JSON-encoded body parameters.
pub const PAYLOAD_FIELD: &str = "payload";

const HEADER_PATTERN: &str = r"(\w[^\s:]*):[ ]*([^\r\n]*)";

#[derive(Debug)]
pub struct Gateway {
    transport: Box<dyn Transport>,
    request: Option<Request>,
    response: Option<Response>,
    headers: BTreeMap<String, String>,
    default_headers: Vec<(String, String)>,
    executed: bool,
    multipart: bool,
}

impl Gateway {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_boxed(Box::new(transport))
    }

    pub fn from_boxed(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            request: None,
            response: None,
            headers: BTreeMap::new(),
            default_headers: Vec::new(),
            executed: false,
            multipart: false,
        }
    }

    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    pub fn set_request(&mut self, request: Request) -> &mut Self {
        self.request = Some(request);
        self
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// The response, once executed.
    pub fn response(&self) -> Option<&Response> {
        if self.executed {
            self.response.as_ref()
        } else {
            None
        }
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Headers parsed from the last response.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Force multipart bodies even without file parameters.
    pub fn set_multipart(&mut self, multipart: bool) -> &mut Self {
        self.multipart = multipart;
        self
    }

    pub fn with_multipart(mut self, multipart: bool) -> Self {
        self.multipart = multipart;
        self
    }

    pub fn multipart(&self) -> bool {
        self.multipart
    }

    /// Headers sent with every call.
    pub fn set_default_headers(&mut self, headers: Vec<(String, String)>) -> &mut Self {
        self.default_headers = headers;
        self
    }

    /// Back to idle: request, response and headers are discarded.
    pub fn reset(&mut self) {
        self.request = None;
        self.response = None;
        self.headers.clear();
        self.executed = false;
    }

    /// Execute the pending request.
    ///
    /// Does nothing when already executed or when no request is set.
    #[tracing::instrument(level = "debug", skip(self), fields(transport = self.transport.name()))]
    pub fn exec(&mut self) -> Result<&mut Self, GatewayError> {
        if self.executed {
            return Ok(self);
        }
        let Some(request) = self.request.as_ref() else {
            tracing::debug!("No request set, nothing to execute");
            return Ok(self);
        };

        let call = TransportRequest {
            method: request.method(),
            url: request.url()?,
            headers: self.default_headers.clone(),
            cookies: request
                .cookies()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body: if request.method().has_body() {
                Some(encode_body(request.post_params(), self.multipart)?)
            } else {
                None
            },
        };
        tracing::debug!(method = %call.method, url = %call.url, "Dispatching request");

        let reply = self.transport.send(&call)?;
        let headers = parse_headers(&reply.raw_headers)?;
        tracing::debug!(status = reply.status, "Received response");

        self.response = Some(Response::new(
            reply.status,
            headers.clone(),
            request.clone(),
            reply.body,
        ));
        self.headers = headers;
        self.executed = true;
        Ok(self)
    }
}

/// Split body parameters into the `payload` field and lifted file parts.
///
/// Text values of the form `@/path` become file parts named after their key.
pub fn encode_body(params: &Values, force_multipart: bool) -> Result<Body, GatewayError> {
    let mut payload = Values::new();
    let mut files = Vec::new();
    for (key, value) in params {
        match file_reference(value) {
            Some(path) => files.push(FilePart {
                name: key.clone(),
                path,
            }),
            None => {
                payload.insert(key.clone(), value.clone());
            }
        }
    }

    let encoded = serde_json::to_string(&payload).map_err(|e| GatewayError {
        kind: GatewayErrorKind::Transport,
        message: format!("unable to encode request payload: {}", e),
        source: Some(Box::new(e)),
    })?;
    let fields = vec![(PAYLOAD_FIELD.to_string(), encoded)];

    if files.is_empty() && !force_multipart {
        Ok(Body::Form(fields))
    } else {
        Ok(Body::Multipart { fields, files })
    }
}

fn file_reference(value: &Value) -> Option<PathBuf> {
    let text = value.as_str()?;
    let path = text.trim_start_matches('@');
    if text.starts_with('@') && path.starts_with('/') {
        Some(PathBuf::from(path))
    } else {
        None
    }
}

/// Collect `Name: value` pairs from raw header lines; later duplicates win.
pub fn parse_headers(lines: &[String]) -> Result<BTreeMap<String, String>, GatewayError> {
    let pattern = compiled(HEADER_PATTERN).map_err(|e| GatewayError {
        kind: GatewayErrorKind::Transport,
        message: format!("header pattern failed to compile: {}", e),
        source: Some(Box::new(e)),
    })?;

    let mut headers = BTreeMap::new();
    for line in lines {
        for caps in pattern.captures_iter(line) {
            headers.insert(caps[1].to_string(), caps[2].trim_end().to_string());
        }
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ScriptedTransport, TransportResponse};

    fn request() -> Request {
        Request::get().with_path("http://api.test").with_url_param("person")
    }

    #[test]
    fn exec_without_request_is_a_no_op() {
        let transport = ScriptedTransport::new();
        let mut gateway = Gateway::new(transport.clone());
        gateway.exec().unwrap();
        assert!(!gateway.is_executed());
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn exec_builds_a_response_once() {
        let transport = ScriptedTransport::new();
        transport.push(
            TransportResponse::new(200, "{}")
                .with_header("Content-Type: application/json")
                .with_header("X-Trace: a")
                .with_header("X-Trace: b"),
        );
        let mut gateway = Gateway::new(transport.clone()).with_request(request());

        gateway.exec().unwrap();
        gateway.exec().unwrap();
        assert_eq!(transport.call_count(), 1);

        let response = gateway.response().unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.header("x-trace"), Some("b"));
        assert_eq!(response.request(), &request());
    }

    #[test]
    fn reset_returns_to_idle() {
        let transport = ScriptedTransport::new().respond(200, "{}");
        let mut gateway = Gateway::new(transport).with_request(request());
        gateway.exec().unwrap();
        gateway.reset();
        assert!(!gateway.is_executed());
        assert!(gateway.response().is_none());
        assert!(gateway.request().is_none());
        assert!(gateway.headers().is_empty());
    }

    #[test]
    fn transport_failures_surface() {
        let transport = ScriptedTransport::new().fail("connection refused");
        let mut gateway = Gateway::new(transport).with_request(request());
        let err = gateway.exec().unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Transport);
        assert!(!gateway.is_executed());
    }

    #[test]
    fn writes_carry_a_payload_and_deletes_do_not() {
        let transport = ScriptedTransport::new().respond(200, "{}").respond(200, "{}");
        let mut gateway = Gateway::new(transport.clone());

        let mut post = Request::post().with_path("http://api.test").with_url_param("person");
        post.add_post_param("name", "Ada");
        gateway.set_request(post).exec().unwrap();

        gateway.reset();
        gateway
            .set_request(Request::delete().with_path("http://api.test").with_cookie("sid", "1"))
            .exec()
            .unwrap();

        let calls = transport.calls();
        let body = calls[0].body.as_ref().unwrap();
        assert!(!body.is_multipart());
        assert_eq!(body.field(PAYLOAD_FIELD), Some(r#"{"name":"Ada"}"#));
        assert!(calls[1].body.is_none());
        assert_eq!(calls[1].cookie_header().as_deref(), Some("sid=1"));
    }

    #[test]
    fn file_references_become_parts() {
        let mut params = Values::new();
        params.insert("name".to_string(), Value::from("Ada"));
        params.insert("cv".to_string(), Value::from("@/tmp/upload-x/cv.pdf"));
        params.insert("email".to_string(), Value::from("ada@example.com"));

        let body = encode_body(&params, false).unwrap();
        assert!(body.is_multipart());
        assert_eq!(body.files()[0].name, "cv");
        assert_eq!(body.files()[0].path, PathBuf::from("/tmp/upload-x/cv.pdf"));
        assert_eq!(
            body.field(PAYLOAD_FIELD),
            Some(r#"{"name":"Ada","email":"ada@example.com"}"#)
        );

        assert!(encode_body(&Values::new(), true).unwrap().is_multipart());
    }

    #[test]
    fn header_lines_parse() {
        let headers = parse_headers(&[
            "HTTP/1.1 200 OK".to_string(),
            "Content-Length:  12\r\n".to_string(),
        ])
        .unwrap();
        assert_eq!(headers.get("Content-Length").map(String::as_str), Some("12"));
        assert_eq!(headers.len(), 1);
    }
}
