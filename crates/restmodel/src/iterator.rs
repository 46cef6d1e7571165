//! Lazy iteration over collection results.

use restmodel_core::error::{Error, ParserError, Result};
use restmodel_core::{Value, ValueExchange, Values};
use restmodel_http::Request;

use crate::model::Model;

/// Records of a collection response, materialized as models on demand.
///
/// Each step hydrates a fresh copy of the prototype model, so yielded
/// models are independent of each other and of the iterator. The cursor
/// methods leave [`count`](Self::count) untouched; use
/// [`into_iter`](IntoIterator::into_iter) for iterator adapters.
#[derive(Debug, Clone)]
pub struct ModelIterator {
    records: Vec<Value>,
    position: usize,
    prototype: Model,
    metadata: Values,
    request: Option<Request>,
    key_field: String,
}

impl ModelIterator {
    pub fn new(records: Vec<Value>, prototype: Model) -> Self {
        let key_field = prototype.primary_key().to_string();
        Self {
            records,
            position: 0,
            prototype,
            metadata: Values::new(),
            request: None,
            key_field,
        }
    }

    pub fn empty(prototype: Model) -> Self {
        Self::new(Vec::new(), prototype)
    }

    pub fn with_metadata(mut self, metadata: Values) -> Self {
        self.metadata = metadata;
        self
    }

    /// Request stamped onto every yielded model.
    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Field used by [`ids`](Self::ids); defaults to the prototype's primary key.
    pub fn with_key_field(mut self, key: impl Into<String>) -> Self {
        self.key_field = key.into();
        self
    }

    fn materialize(&self, index: usize) -> Option<Result<Model>> {
        let record = self.records.get(index)?;
        Some(self.hydrate(index, record))
    }

    fn hydrate(&self, index: usize, record: &Value) -> Result<Model> {
        let Value::Object(values) = record else {
            return Err(Error::Parser(ParserError::decode(
                format!(
                    "collection record {} is {}, expected an object",
                    index,
                    record.type_name()
                ),
                record.to_text(),
            )));
        };
        let mut model = self.prototype.clone();
        model.load_record(values.clone(), self.request.clone())?;
        Ok(model)
    }

    /// Model at the cursor without advancing.
    pub fn current(&self) -> Option<Result<Model>> {
        self.materialize(self.position)
    }

    /// Model at the cursor, then advance.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Result<Model>> {
        let item = self.materialize(self.position)?;
        self.position += 1;
        Some(item)
    }

    /// Move the cursor; returns the model there.
    pub fn seek(&mut self, position: usize) -> Option<Result<Model>> {
        self.position = position.min(self.records.len());
        self.current()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn rewind(&mut self) -> &mut Self {
        self.position = 0;
        self
    }

    /// Total number of records, regardless of the cursor.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of records held; the cursor does not affect it.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Records from the cursor to the end.
    pub fn remaining(&self) -> usize {
        self.records.len().saturating_sub(self.position)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw records as received.
    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn prototype(&self) -> &Model {
        &self.prototype
    }

    /// Replace the records and rewind.
    pub fn set_records(&mut self, records: Vec<Value>) -> &mut Self {
        self.records = records;
        self.position = 0;
        self
    }

    /// Pairs `(record[key], record[value])` for every record.
    pub fn key_value_pairs(&self, key: &str, value: &str) -> Vec<(Value, Value)> {
        self.records
            .iter()
            .map(|record| (lookup(record, key), lookup(record, value)))
            .collect()
    }

    /// Key-field value of every record.
    pub fn ids(&self) -> Vec<Value> {
        self.records
            .iter()
            .map(|record| lookup(record, &self.key_field))
            .collect()
    }

    pub fn metadata(&self) -> &Values {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn set_metadata(&mut self, metadata: Values) -> &mut Self {
        self.metadata = metadata;
        self
    }

    /// The request that produced this collection, or the deferred one under
    /// a dispatch lock.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }
}

fn lookup(record: &Value, key: &str) -> Value {
    record
        .as_object()
        .and_then(|fields| fields.get(key))
        .cloned()
        .unwrap_or_default()
}

impl IntoIterator for ModelIterator {
    type Item = Result<Model>;
    type IntoIter = IntoModels;

    /// Iterate from the current cursor position onwards.
    fn into_iter(self) -> IntoModels {
        IntoModels { cursor: self }
    }
}

/// Owning iterator over the remaining models of a [`ModelIterator`].
#[derive(Debug, Clone)]
pub struct IntoModels {
    cursor: ModelIterator,
}

impl Iterator for IntoModels {
    type Item = Result<Model>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cursor.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IntoModels {}

impl ValueExchange for ModelIterator {
    fn values(&self) -> Value {
        Value::Array(self.records.clone())
    }

    fn set_values(&mut self, values: Value) -> Result<()> {
        match values {
            Value::Array(records) => {
                self.set_records(records);
                Ok(())
            }
            Value::Null => {
                self.set_records(Vec::new());
                Ok(())
            }
            other => Err(Error::Serde(format!(
                "a collection expects an array, got {}",
                other.type_name()
            ))),
        }
    }

    fn clone_box(&self) -> Box<dyn ValueExchange> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restmodel_core::{FieldDescription, Schema};
    use serde_json::json;

    fn prototype() -> Model {
        Model::builder("book")
            .schema(
                Schema::new()
                    .field("id", FieldDescription::new("auto"))
                    .field("title", FieldDescription::new("string")),
            )
            .build()
            .unwrap()
    }

    fn records() -> Vec<Value> {
        vec![
            Value::from(json!({"id": 1, "title": "Dune"})),
            Value::from(json!({"id": 2, "title": "Emma"})),
        ]
    }

    #[test]
    fn yields_independent_loaded_models() {
        let mut it = ModelIterator::new(records(), prototype());
        assert_eq!(it.len(), 2);

        let mut first = it.next().unwrap().unwrap();
        let second = it.next().unwrap().unwrap();
        assert!(it.next().is_none());

        assert!(first.is_loaded());
        assert_eq!(first.get("title"), Value::from("Dune"));
        assert_eq!(second.get("title"), Value::from("Emma"));

        first.set("title", "Changed").unwrap();
        assert_eq!(it.prototype().get("title"), Value::Null);
        assert_eq!(it.records()[0], records()[0]);
    }

    #[test]
    fn cursor_controls() {
        let mut it = ModelIterator::new(records(), prototype());
        assert_eq!(it.seek(1).unwrap().unwrap().id(), Value::Int(2));
        assert_eq!(it.remaining(), 1);
        assert!(it.seek(9).is_none());
        it.rewind();
        assert_eq!(it.position(), 0);
        assert_eq!(it.current().unwrap().unwrap().id(), Value::Int(1));
    }

    #[test]
    fn count_ignores_the_cursor() {
        let mut it = ModelIterator::new(records(), prototype());
        it.next().unwrap().unwrap();
        assert_eq!(it.count(), 2);
        assert_eq!(it.remaining(), 1);
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert_eq!(it.count(), 2);
    }

    #[test]
    fn into_iter_continues_from_the_cursor() {
        let mut it = ModelIterator::new(records(), prototype());
        it.next().unwrap().unwrap();
        let rest = it.into_iter();
        assert_eq!(rest.len(), 1);
        let titles: Vec<Value> = rest.map(|m| m.unwrap().get("title")).collect();
        assert_eq!(titles, vec![Value::from("Emma")]);
    }

    #[test]
    fn projections() {
        let it = ModelIterator::new(records(), prototype());
        assert_eq!(it.ids(), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            it.key_value_pairs("id", "title"),
            vec![
                (Value::Int(1), Value::from("Dune")),
                (Value::Int(2), Value::from("Emma")),
            ]
        );
        assert_eq!(it.key_value_pairs("id", "missing")[0].1, Value::Null);
    }

    #[test]
    fn non_object_records_fail_to_materialize() {
        let mut it = ModelIterator::new(vec![Value::Int(3)], prototype());
        assert!(matches!(it.next(), Some(Err(Error::Parser(_)))));
    }

    #[test]
    fn exchanges_records_as_an_array() {
        let mut it = ModelIterator::empty(prototype())
            .with_metadata([("total".to_string(), Value::Int(2))].into_iter().collect());
        ValueExchange::set_values(&mut it, Value::Array(records())).unwrap();
        assert_eq!(it.len(), 2);
        assert_eq!(it.metadata_value("total"), Some(&Value::Int(2)));
        assert!(ValueExchange::set_values(&mut it, Value::from("x")).is_err());
    }
}
