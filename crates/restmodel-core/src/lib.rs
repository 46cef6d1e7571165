//! Core types for RestModel Rust.
//!
//! This crate provides the building blocks shared by the HTTP layer and the
//! model layer:
//!
//! - `Value` dynamic values exchanged with the remote service
//! - `Field` kinds with their validator and filter chains
//! - `FieldContainer` for ordered, schema-backed field storage
//! - `ValueExchange` and `KindRegistry` for custom field kinds
//! - the `Error` taxonomy used across every crate

pub mod container;
pub mod error;
pub mod exchange;
pub mod field;
pub mod filter;
pub mod rule;
pub mod validate;
pub mod value;

pub use container::{FieldContainer, Slot, ValidityAggregation};
pub use error::{
    ClientError, ClientErrorKind, ContainerError, ContainerErrorKind, Error, FieldError,
    FieldErrorKind, FieldValidationError, GatewayError, GatewayErrorKind, ModelError,
    ModelErrorKind, ParserError, ParserErrorKind, Result, ServiceError, ValidationError,
};
pub use exchange::{KindFactory, KindRegistry, ValueExchange};
pub use field::{
    DateTimeFormat, Field, FieldDescription, FieldKind, FieldOption, Schema, StagedUpload,
    UploadedFile, Uploads,
};
pub use filter::Filter;
pub use rule::{RuleSpec, parse_rules};
pub use validate::{RuleFailure, Validator};
pub use value::{Value, Values};
