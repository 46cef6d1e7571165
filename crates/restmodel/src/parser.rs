//! Turning responses into model state.

use std::fmt;

use restmodel_core::error::{ParserError, ParserErrorKind, Result};
use restmodel_core::{Value, Values};
use restmodel_http::{Envelope, Method, Response};

use crate::iterator::ModelIterator;
use crate::model::Model;

/// What a parser did with a response.
#[derive(Debug)]
pub enum Parsed {
    /// The model was hydrated from a single record
    Record,
    /// A collection of records, materialized lazily
    Collection(ModelIterator),
    /// A write was acknowledged and the model hydrated from the reply
    Written,
    /// The model was reset and holds no record
    Removed,
}

/// Decodes response bodies for a model.
pub trait Parser: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Apply `response` to `model`, branching on the originating request's
    /// method and cardinality.
    fn parse(&self, response: &Response, model: &mut Model) -> Result<Parsed>;
}

/// Parser for the JSON envelope `{contentType, payload, metadata}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

fn not_a_record(value: &Value, content: &str) -> ParserError {
    ParserError::decode(
        format!("expected a record object, got {} : {}", value.type_name(), content),
        content,
    )
}

fn record_values(record: Value, content: &str) -> std::result::Result<Values, ParserError> {
    match record {
        Value::Object(values) => Ok(values),
        other => Err(not_a_record(&other, content)),
    }
}

impl Parser for JsonParser {
    fn name(&self) -> &str {
        "json"
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, response, model),
        fields(method = %response.request().method(), single = response.request().single_record())
    )]
    fn parse(&self, response: &Response, model: &mut Model) -> Result<Parsed> {
        let content = response.content();
        let envelope = Envelope::decode(content)?;
        let request = response.request();

        match (request.method(), request.single_record()) {
            (Method::Get, true) => {
                let first = match envelope.payload {
                    Value::Array(records) => records.into_iter().next(),
                    record @ Value::Object(_) => Some(record),
                    other => return Err(not_a_record(&other, content).into()),
                };
                match first {
                    Some(record) => {
                        model.load_values(record_values(record, content)?)?;
                        Ok(Parsed::Record)
                    }
                    None => {
                        tracing::debug!("Empty payload, resetting model");
                        model.reset()?;
                        Ok(Parsed::Removed)
                    }
                }
            }
            (Method::Get, false) => {
                let records = match envelope.payload {
                    Value::Array(records) => records,
                    Value::Object(keyed) => keyed.into_values().collect(),
                    other => {
                        return Err(ParserError::decode(
                            format!("expected a list of records, got {}", other.type_name()),
                            content,
                        )
                        .into());
                    }
                };
                tracing::debug!(records = records.len(), "Decoded collection");
                Ok(Parsed::Collection(
                    ModelIterator::new(records, model.prototype()?)
                        .with_metadata(envelope.metadata)
                        .with_request(request.clone()),
                ))
            }
            (Method::Delete, _) => {
                model.reset()?;
                Ok(Parsed::Removed)
            }
            (Method::Post | Method::Put, true) => {
                let record = match envelope.payload {
                    Value::Array(records) => records.into_iter().next().unwrap_or_default(),
                    record => record,
                };
                model.load_values(record_values(record, content)?)?;
                Ok(Parsed::Written)
            }
            (Method::Post | Method::Put, false) => Err(ParserError {
                kind: ParserErrorKind::Cardinality,
                message: "unexpected multiple records on write".to_string(),
                content: Some(content.to_string()),
                source: None,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restmodel_core::error::Error;
    use restmodel_core::{FieldDescription, Schema};
    use restmodel_http::Request;
    use std::collections::BTreeMap;

    fn model() -> Model {
        Model::builder("person")
            .schema(
                Schema::new()
                    .field("id", FieldDescription::new("auto"))
                    .field("name", FieldDescription::new("string")),
            )
            .build()
            .unwrap()
    }

    fn reply(request: Request, content: &str) -> Response {
        Response::new(200, BTreeMap::new(), request, content)
    }

    #[test]
    fn single_get_hydrates_the_first_record() {
        let mut m = model();
        let response = reply(
            Request::get(),
            r#"{"payload":[{"id":5,"name":"Ada"},{"id":6,"name":"Bob"}]}"#,
        );
        let parsed = JsonParser::new().parse(&response, &mut m).unwrap();
        assert!(matches!(parsed, Parsed::Record));
        assert_eq!(m.id(), Value::Int(5));
        assert_eq!(m.get("name"), Value::from("Ada"));
    }

    #[test]
    fn single_get_accepts_a_bare_object() {
        let mut m = model();
        let response = reply(Request::get(), r#"{"payload":{"id":7,"name":"Cy"}}"#);
        JsonParser::new().parse(&response, &mut m).unwrap();
        assert_eq!(m.id(), Value::Int(7));
    }

    #[test]
    fn empty_single_get_resets() {
        let mut m = model();
        m.set("name", "stale").unwrap();
        let response = reply(Request::get(), r#"{"payload":[]}"#);
        let parsed = JsonParser::new().parse(&response, &mut m).unwrap();
        assert!(matches!(parsed, Parsed::Removed));
        assert_eq!(m.get("name"), Value::Null);
        assert!(!m.is_changed());
    }

    #[test]
    fn collection_get_builds_an_iterator() {
        let mut m = model();
        let response = reply(
            Request::get().with_single_record(false),
            r#"{"payload":[{"id":1,"name":"A"},{"id":2,"name":"B"}],"metadata":{"total":2}}"#,
        );
        let Parsed::Collection(it) = JsonParser::new().parse(&response, &mut m).unwrap() else {
            panic!("expected a collection");
        };
        assert_eq!(it.len(), 2);
        assert_eq!(it.metadata_value("total"), Some(&Value::Int(2)));
        let names: Vec<Value> = it.into_iter().map(|r| r.unwrap().get("name")).collect();
        assert_eq!(names, vec![Value::from("A"), Value::from("B")]);
        assert!(!m.is_loaded());
    }

    #[test]
    fn keyed_collections_keep_payload_order() {
        let mut m = model();
        let response = reply(
            Request::get().with_single_record(false),
            r#"{"payload":{"b":{"id":1,"name":"first"},"a":{"id":2,"name":"second"}}}"#,
        );
        let Parsed::Collection(it) = JsonParser::new().parse(&response, &mut m).unwrap() else {
            panic!("expected a collection");
        };
        let names: Vec<Value> = it.into_iter().map(|r| r.unwrap().get("name")).collect();
        assert_eq!(names, vec![Value::from("first"), Value::from("second")]);
    }

    #[test]
    fn writes_hydrate_from_the_reply() {
        let mut m = model();
        let response = reply(Request::post(), r#"{"payload":[{"id":9,"name":"Ada"}]}"#);
        let parsed = JsonParser::new().parse(&response, &mut m).unwrap();
        assert!(matches!(parsed, Parsed::Written));
        assert_eq!(m.id(), Value::Int(9));

        let response = reply(Request::put().with_single_record(false), r#"{"payload":[]}"#);
        let err = JsonParser::new().parse(&response, &mut m).unwrap_err();
        assert!(matches!(err, Error::Parser(ref e) if e.kind == ParserErrorKind::Cardinality));
    }

    #[test]
    fn delete_resets() {
        let mut m = model();
        m.load_values([("id".to_string(), Value::Int(3))].into_iter().collect())
            .unwrap();
        let parsed = JsonParser::new()
            .parse(&reply(Request::delete(), r#"{"payload":true}"#), &mut m)
            .unwrap();
        assert!(matches!(parsed, Parsed::Removed));
        assert_eq!(m.id(), Value::Null);
    }

    #[test]
    fn malformed_content_is_a_decode_error() {
        let mut m = model();
        let err = JsonParser::new()
            .parse(&reply(Request::get(), "<html>"), &mut m)
            .unwrap_err();
        match err {
            Error::Parser(e) => {
                assert_eq!(e.kind, ParserErrorKind::Decode);
                assert_eq!(e.content.as_deref(), Some("<html>"));
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
