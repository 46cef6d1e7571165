//! Error types for RestModel operations.

use std::fmt;

/// The primary error type for all RestModel operations.
#[derive(Debug)]
pub enum Error {
    /// Invalid field description, or mutation of a non-editable field
    Field(FieldError),
    /// Unknown field key referenced on a container
    Container(ContainerError),
    /// Transport-level failure or unsupported request method
    Gateway(GatewayError),
    /// Client orchestration failures (no gateway, non-success status)
    Client(ClientError),
    /// Structured error declared by the remote service
    Service(ServiceError),
    /// Response body could not be decoded for the request it answers
    Parser(ParserError),
    /// Model-level failures (missing collaborators, invalid state, unknown keys)
    Model(ModelError),
    /// Aggregated field validation failures
    Validation(ValidationError),
    /// I/O errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serde(String),
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    /// Key of the field the error belongs to, when known
    pub field: Option<String>,
    pub message: String,
    pub source: Option<BoxedSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// Description carries a key no field understands
    UnknownProperty,
    /// Description key holds a value of the wrong shape
    InvalidProperty,
    /// Description names a type tag with no registered kind
    UnknownKind,
    /// Attribute change attempted on a non-editable field
    NotEditable,
    /// Rule token names no known validator or filter
    UnknownRule,
    /// Rule token has malformed arguments
    InvalidRule,
    /// Uploaded file could not be bound to the field
    FileTransfer,
}

#[derive(Debug)]
pub struct ContainerError {
    pub kind: ContainerErrorKind,
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerErrorKind {
    /// Key is not part of the schema
    NoSuchField,
    /// Nested value object rejected the values handed to it
    NestedRejected,
}

#[derive(Debug)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    pub source: Option<BoxedSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Network or protocol failure inside the transport
    Transport,
    /// Method outside GET/POST/PUT/DELETE
    UnsupportedMethod,
    /// Request path and params do not form a valid URL
    InvalidUrl,
    /// A file part referenced by the request could not be read
    File,
}

#[derive(Debug)]
pub struct ClientError {
    pub kind: ClientErrorKind,
    /// HTTP status of the failed exchange (unrecognized codes are reported as 500)
    pub status: Option<u16>,
    /// Raw response body, when the server answered
    pub body: Option<String>,
    pub message: String,
    pub source: Option<BoxedSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// No gateway attached to the client
    NoGateway,
    /// Gateway failed to execute the request
    Gateway,
    /// Non-success status without a structured error body
    HttpStatus,
    /// No schema source configured, or it could not describe the resource
    NoSchemaSource,
}

/// Error declared by the remote service in a structured error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// Server-declared error type
    pub error_type: String,
    pub message: String,
    /// Server error code, digits only
    pub code: Option<String>,
    /// HTTP status the error arrived with
    pub status: u16,
}

#[derive(Debug)]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub message: String,
    /// Offending raw content, for diagnosis
    pub content: Option<String>,
    pub source: Option<BoxedSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserErrorKind {
    /// Body is not a valid envelope or lacks a payload
    Decode,
    /// Record cardinality does not match the request
    Cardinality,
}

#[derive(Debug)]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
    /// Per-field failures when `kind` is `Invalid`
    pub validation: Option<ValidationError>,
    pub source: Option<Box<Error>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// Dispatch attempted without a client
    NoClient,
    /// Dispatch attempted without a parser
    NoParser,
    /// Save attempted on a model that does not validate
    Invalid,
    /// Write to an attribute that is neither mapped nor in the schema
    UnknownKey,
    /// Schema could not be resolved
    NoSchema,
    /// Attribute mapping configuration error
    Mapping,
    /// Order direction other than asc/desc
    InvalidOrder,
    /// Parser failed on the response
    Parse,
}

/// Validation error for field-level and model-level validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// The failures in schema order
    pub errors: Vec<FieldValidationError>,
}

/// A single validation failure for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidationError {
    /// The field key that failed validation
    pub field: String,
    /// Error code of the failing rule (e.g. `isEmpty`)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new empty validation error container.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Check if there are any validation errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add a field validation failure.
    pub fn add(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldValidationError {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        });
    }

    /// Keys of the fields that failed, in order, without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for err in &self.errors {
            if !seen.contains(&err.field.as_str()) {
                seen.push(&err.field);
            }
        }
        seen
    }

    /// Failures recorded for one field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldValidationError> {
        self.errors.iter().filter(move |e| e.field == field)
    }

    /// Convert to Result, returning Ok(()) if no errors, Err(self) otherwise.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Error {
    /// Did the failure happen below the HTTP layer (no response was received)?
    pub fn is_transport_error(&self) -> bool {
        match self {
            Error::Gateway(_) | Error::Io(_) => true,
            Error::Client(c) => c.kind == ClientErrorKind::Gateway,
            Error::Model(m) => m.source.as_deref().is_some_and(Error::is_transport_error),
            _ => false,
        }
    }

    /// HTTP status attached to client or service errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Client(c) => c.status,
            Error::Service(s) => Some(s.status),
            _ => None,
        }
    }

    /// Validation details, whether raised directly or through a model save.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(v) => Some(v),
            Error::Model(m) => m.validation.as_ref(),
            _ => None,
        }
    }
}

impl FieldError {
    pub fn new(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the key of the field this error belongs to.
    pub fn on(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            validation: None,
            source: None,
        }
    }
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }
}

impl ParserError {
    pub fn decode(message: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ParserErrorKind::Decode,
            message: message.into(),
            content: Some(content.into()),
            source: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Field(e) => write!(f, "Field error: {}", e),
            Error::Container(e) => write!(f, "Container error: {}", e),
            Error::Gateway(e) => write!(f, "Gateway error: {}", e),
            Error::Client(e) => write!(f, "Client error: {}", e),
            Error::Service(e) => write!(f, "Service error: {}", e),
            Error::Parser(e) => write!(f, "Parser error: {}", e),
            Error::Model(e) => write!(f, "Model error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Field(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Gateway(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Client(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Parser(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Model(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Validation(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} (field '{}')", self.message, field),
            None => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} [{}]: {}", self.error_type, code, self.message),
            None => write!(f, "{}: {}", self.error_type, self.message),
        }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "validation passed")
        } else if self.errors.len() == 1 {
            let err = &self.errors[0];
            write!(
                f,
                "validation error on '{}': {} ({})",
                err.field, err.code, err.message
            )
        } else {
            writeln!(f, "validation errors:")?;
            for err in &self.errors {
                writeln!(f, "  - {}: {} ({})", err.field, err.code, err.message)?;
            }
            Ok(())
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

impl From<FieldError> for Error {
    fn from(err: FieldError) -> Self {
        Error::Field(err)
    }
}

impl From<ContainerError> for Error {
    fn from(err: ContainerError) -> Self {
        Error::Container(err)
    }
}

impl From<GatewayError> for Error {
    fn from(err: GatewayError) -> Self {
        Error::Gateway(err)
    }
}

impl From<ClientError> for Error {
    fn from(err: ClientError) -> Self {
        Error::Client(err)
    }
}

impl From<ServiceError> for Error {
    fn from(err: ServiceError) -> Self {
        Error::Service(err)
    }
}

impl From<ParserError> for Error {
    fn from(err: ParserError) -> Self {
        Error::Parser(err)
    }
}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        Error::Model(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

/// Result type alias for RestModel operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_lists_every_failure() {
        let mut errors = ValidationError::new();
        errors.add("name", "isEmpty", "Value is required and can't be empty");
        errors.add("age", "notLessThan", "'1000' is not less than '1000'");

        let text = errors.to_string();
        assert!(text.starts_with("validation errors:"));
        assert!(text.contains("  - name: isEmpty"));
        assert!(text.contains("  - age: notLessThan"));
        assert_eq!(errors.fields(), vec!["name", "age"]);
    }

    #[test]
    fn transport_classification_follows_wrapping() {
        let gateway = Error::Gateway(GatewayError::new(
            GatewayErrorKind::Transport,
            "connection refused",
        ));
        assert!(gateway.is_transport_error());

        let wrapped = Error::Client(ClientError {
            kind: ClientErrorKind::Gateway,
            status: None,
            body: None,
            message: "Gateway failed to execute request with message : connection refused"
                .to_string(),
            source: None,
        });
        assert!(wrapped.is_transport_error());

        let service = Error::Service(ServiceError {
            error_type: "NotFound".to_string(),
            message: "no such record".to_string(),
            code: Some("404".to_string()),
            status: 404,
        });
        assert!(!service.is_transport_error());
        assert_eq!(service.status(), Some(404));
    }

    #[test]
    fn model_error_exposes_validation() {
        let mut validation = ValidationError::new();
        validation.add("name", "isEmpty", "Value is required and can't be empty");
        let mut err = ModelError::new(ModelErrorKind::Invalid, "model is not valid");
        err.validation = Some(validation);

        let err = Error::Model(err);
        let details = err.validation().expect("validation details");
        assert_eq!(details.errors[0].code, "isEmpty");
    }
}
