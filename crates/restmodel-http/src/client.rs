//! Client: base URI, gateway and error mapping for one remote service.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use restmodel_core::error::{ClientError, ClientErrorKind, Error, Result, ServiceError};
use restmodel_core::Schema;

use crate::config::ClientConfig;
use crate::envelope::Envelope;
use crate::gateway::Gateway;
use crate::request::Request;
use crate::response::Response;
use crate::status;

/// Error type reported when the service does not name one.
pub const DEFAULT_ERROR_TYPE: &str = "ServiceErrorResponse";

/// A client shared between models.
pub type SharedClient = Arc<Mutex<Client>>;

/// Structured error body sent with non-success statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_code: Option<ErrorCode>,
}

/// Services send codes as strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Text(String),
    Number(serde_json::Number),
}

impl ErrorCode {
    /// The code reduced to its digits; `None` when nothing is left.
    pub fn digits(&self) -> Option<String> {
        let raw = match self {
            ErrorCode::Text(text) => text.clone(),
            ErrorCode::Number(number) => number.to_string(),
        };
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() { None } else { Some(digits) }
    }
}

impl ErrorBody {
    /// Decode a body; `None` if it is not a JSON object of this shape.
    pub fn decode(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }

    pub fn into_service_error(self, http_status: u16) -> ServiceError {
        ServiceError {
            error_type: self
                .error_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_ERROR_TYPE.to_string()),
            message: self
                .error_message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    status::reason(status::normalize(http_status))
                        .unwrap_or("Unknown")
                        .to_string()
                }),
            code: self.error_code.as_ref().and_then(ErrorCode::digits),
            status: http_status,
        }
    }
}

/// Where a client obtains schema descriptions.
pub trait SchemaSource: Send + Sync + fmt::Debug {
    fn describe(&self, client: &mut Client, resource: &str) -> Result<Schema>;
}

/// Schemas held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemas {
    schemas: HashMap<String, Schema>,
}

impl StaticSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: impl Into<String>, schema: Schema) -> Self {
        self.schemas.insert(resource.into(), schema);
        self
    }

    pub fn insert(&mut self, resource: impl Into<String>, schema: Schema) {
        self.schemas.insert(resource.into(), schema);
    }
}

impl SchemaSource for StaticSchemas {
    fn describe(&self, _client: &mut Client, resource: &str) -> Result<Schema> {
        self.schemas.get(resource).cloned().ok_or_else(|| {
            Error::Client(ClientError {
                kind: ClientErrorKind::NoSchemaSource,
                status: None,
                body: None,
                message: format!("no schema registered for '{}'", resource),
                source: None,
            })
        })
    }
}

/// Fetches `GET <uri>/<resource>/<segment>` and reads the envelope payload
/// as a schema object.
#[derive(Debug, Clone)]
pub struct DescribeEndpoint {
    segment: String,
}

impl Default for DescribeEndpoint {
    fn default() -> Self {
        Self {
            segment: "describe".to_string(),
        }
    }
}

impl DescribeEndpoint {
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
        }
    }
}

impl SchemaSource for DescribeEndpoint {
    fn describe(&self, client: &mut Client, resource: &str) -> Result<Schema> {
        let mut request = Request::get()
            .with_url_param(resource)
            .with_url_param(self.segment.as_str());
        let response = client.run(&mut request)?;
        let envelope = Envelope::decode(response.content())?;
        let json = serde_json::Value::from(envelope.payload);
        let schema = Schema::from_json(&json)?;
        tracing::debug!(resource, fields = schema.len(), "Fetched service description");
        Ok(schema)
    }
}

/// Runs requests against one service.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    gateway: Option<Gateway>,
    schema_source: Option<Arc<dyn SchemaSource>>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            gateway: None,
            schema_source: None,
        }
    }

    /// Client over a reqwest transport built from the config.
    #[cfg(feature = "http")]
    pub fn http(config: ClientConfig) -> Result<Self> {
        let transport = crate::http::HttpTransport::new(&config)?;
        Ok(Self::new(config).with_gateway(Gateway::new(transport)))
    }

    pub fn with_gateway(mut self, gateway: Gateway) -> Self {
        self.set_gateway(gateway);
        self
    }

    pub fn set_gateway(&mut self, mut gateway: Gateway) -> &mut Self {
        gateway.set_default_headers(
            self.config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        self.gateway = Some(gateway);
        self
    }

    pub fn gateway(&self) -> Option<&Gateway> {
        self.gateway.as_ref()
    }

    pub fn gateway_mut(&mut self) -> Option<&mut Gateway> {
        self.gateway.as_mut()
    }

    pub fn with_schema_source(mut self, source: impl SchemaSource + 'static) -> Self {
        self.schema_source = Some(Arc::new(source));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Wrap for sharing between models.
    pub fn shared(self) -> SharedClient {
        Arc::new(Mutex::new(self))
    }

    /// Execute `request` and return the response if its status counts as
    /// success.
    ///
    /// The request's base path is set to the client URI first. Non-success
    /// statuses with a structured error body become [`ServiceError`]s; any
    /// other non-success status is a [`ClientError`] carrying status and body.
    #[tracing::instrument(
        level = "debug",
        skip(self, request),
        fields(client = %self.config.name, method = %request.method())
    )]
    pub fn run(&mut self, request: &mut Request) -> Result<Response> {
        let Some(gateway) = self.gateway.as_mut() else {
            return Err(Error::Client(ClientError {
                kind: ClientErrorKind::NoGateway,
                status: None,
                body: None,
                message: "client has no gateway available".to_string(),
                source: None,
            }));
        };

        if gateway.is_executed() {
            gateway.reset();
        }
        request.set_path(&self.config.uri);
        gateway.set_request(request.clone());

        let response = match gateway.exec() {
            Ok(executed) => executed.response().cloned(),
            Err(e) => {
                return Err(Error::Client(ClientError {
                    kind: ClientErrorKind::Gateway,
                    status: None,
                    body: None,
                    message: format!("Gateway failed to execute request with message : {}", e),
                    source: Some(Box::new(Error::Gateway(e))),
                }));
            }
        };
        let Some(response) = response else {
            return Err(Error::Client(ClientError {
                kind: ClientErrorKind::Gateway,
                status: None,
                body: None,
                message: "Gateway failed to execute request with message : no response"
                    .to_string(),
                source: None,
            }));
        };

        let code = response.status();
        if self.config.is_success(code) {
            return Ok(response);
        }

        tracing::warn!(status = code, url = %request, "Service answered with a failure status");
        match ErrorBody::decode(response.content()) {
            Some(body) => Err(Error::Service(body.into_service_error(code))),
            None => {
                let normalized = status::normalize(code);
                Err(Error::Client(ClientError {
                    kind: ClientErrorKind::HttpStatus,
                    status: Some(normalized),
                    body: Some(response.content().to_string()),
                    message: format!(
                        "request failed with status {} {}",
                        normalized,
                        status::reason(normalized).unwrap_or("Unknown")
                    ),
                    source: None,
                }))
            }
        }
    }

    /// Schema description for a resource, from the configured source.
    pub fn service_description(&mut self, resource: &str) -> Result<Schema> {
        let Some(source) = self.schema_source.clone() else {
            return Err(Error::Client(ClientError {
                kind: ClientErrorKind::NoSchemaSource,
                status: None,
                body: None,
                message: format!("client '{}' cannot describe '{}'", self.config.name, resource),
                source: None,
            }));
        };
        tracing::debug!(resource, "Resolving service description");
        source.describe(self, resource)
    }
}

/// Convenience: run through a shared client.
pub fn run_shared(client: &SharedClient, request: &mut Request) -> Result<Response> {
    client
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .run(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use restmodel_core::FieldDescription;

    fn client(transport: &ScriptedTransport) -> Client {
        Client::new(ClientConfig::new("people", "http://api.test/v1"))
            .with_gateway(Gateway::new(transport.clone()))
    }

    #[test]
    fn without_gateway_run_fails() {
        let mut client = Client::new(ClientConfig::default());
        let err = client.run(&mut Request::get()).unwrap_err();
        match err {
            Error::Client(e) => assert_eq!(e.kind, ClientErrorKind::NoGateway),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn stamps_the_base_uri_and_returns_success() {
        let transport = ScriptedTransport::new().respond(201, "{}");
        let mut client = client(&transport);
        let mut request = Request::get().with_url_param("person");

        let response = client.run(&mut request).unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(request.path(), "http://api.test/v1");
        assert_eq!(transport.last_call().unwrap().url, "http://api.test/v1/person");
    }

    #[test]
    fn reuses_an_executed_gateway() {
        let transport = ScriptedTransport::new().respond(200, "a").respond(200, "b");
        let mut client = client(&transport);
        client.run(&mut Request::get()).unwrap();
        let second = client.run(&mut Request::get()).unwrap();
        assert_eq!(second.content(), "b");
    }

    #[test]
    fn structured_error_bodies_become_service_errors() {
        let transport = ScriptedTransport::new().respond(
            404,
            r#"{"errorType":"NotFound","errorMessage":"no such person","errorCode":"E-42"}"#,
        );
        let err = client(&transport).run(&mut Request::get()).unwrap_err();
        match err {
            Error::Service(e) => {
                assert_eq!(e.error_type, "NotFound");
                assert_eq!(e.message, "no such person");
                assert_eq!(e.code.as_deref(), Some("42"));
                assert_eq!(e.status, 404);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn missing_error_fields_fall_back() {
        let transport = ScriptedTransport::new().respond(403, r#"{"errorCode":17}"#);
        let err = client(&transport).run(&mut Request::get()).unwrap_err();
        match err {
            Error::Service(e) => {
                assert_eq!(e.error_type, DEFAULT_ERROR_TYPE);
                assert_eq!(e.message, "Forbidden");
                assert_eq!(e.code.as_deref(), Some("17"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn undecodable_bodies_become_client_errors() {
        let transport = ScriptedTransport::new().respond(418, "<html>teapot</html>");
        let err = client(&transport).run(&mut Request::get()).unwrap_err();
        assert_eq!(err.status(), Some(500));
        match err {
            Error::Client(e) => {
                assert_eq!(e.kind, ClientErrorKind::HttpStatus);
                assert_eq!(e.body.as_deref(), Some("<html>teapot</html>"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn gateway_failures_are_wrapped() {
        let transport = ScriptedTransport::new().fail("connection refused");
        let err = client(&transport).run(&mut Request::get()).unwrap_err();
        assert!(err.is_transport_error());
        assert!(err.to_string().contains("Gateway failed to execute request with message : connection refused"));
    }

    #[test]
    fn schema_sources() {
        let transport = ScriptedTransport::new();
        let mut bare = client(&transport);
        assert!(bare.service_description("person").is_err());

        let schema = Schema::new().field("name", FieldDescription::new("string"));
        let mut client =
            client(&transport).with_schema_source(StaticSchemas::new().with("person", schema));
        assert_eq!(client.service_description("person").unwrap().len(), 1);
        assert!(client.service_description("pet").is_err());
    }

    #[test]
    fn describe_endpoint_fetches_the_schema() {
        let transport = ScriptedTransport::new().respond(
            200,
            r#"{"contentType":"json","payload":{"id":"auto","name":{"type":"string","length":20}},"metadata":{}}"#,
        );
        let mut client = client(&transport).with_schema_source(DescribeEndpoint::default());
        let schema = client.service_description("person").unwrap();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(
            transport.last_call().unwrap().url,
            "http://api.test/v1/person/describe"
        );
    }
}
