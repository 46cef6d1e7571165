//! Ordered, schema-backed storage for a model's fields.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{
    ContainerError, ContainerErrorKind, Error, FieldError, FieldErrorKind, Result,
    ValidationError,
};
use crate::exchange::{KindRegistry, ValueExchange};
use crate::field::{Field, FieldKind, Schema, Uploads};
use crate::value::{Value, Values};

/// What sits under a container key.
#[derive(Debug, Clone)]
pub enum Slot {
    /// A built-in field kind
    Field(Field),
    /// A custom kind such as a nested model
    Object(Box<dyn ValueExchange>),
}

impl Slot {
    fn value(&self) -> Value {
        match self {
            Slot::Field(field) => field.value(),
            Slot::Object(object) => object.values(),
        }
    }

    fn validate(&mut self) -> bool {
        match self {
            Slot::Field(field) => field.validate(),
            Slot::Object(object) => object.validate(),
        }
    }

    fn error_codes(&self) -> Vec<String> {
        match self {
            Slot::Field(field) => field.errors().into_iter().map(str::to_string).collect(),
            Slot::Object(object) => object.errors(),
        }
    }
}

/// How per-field results combine into the container's validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidityAggregation {
    /// Valid only if every field is valid
    #[default]
    All,
    /// Legacy rule: once a field fails the result stays false, otherwise
    /// each field's result overwrites the running answer
    LastWins,
}

impl ValidityAggregation {
    fn combine(self, results: impl IntoIterator<Item = bool>) -> bool {
        match self {
            ValidityAggregation::All => results.into_iter().fold(true, |acc, r| acc && r),
            ValidityAggregation::LastWins => {
                let mut result: Option<bool> = None;
                for valid in results {
                    if result != Some(false) {
                        result = Some(valid);
                    }
                }
                result.unwrap_or(true)
            }
        }
    }
}

/// Ordered mapping from field key to field, in schema declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldContainer {
    keys: Vec<String>,
    index: HashMap<String, usize>,
    slots: Vec<Slot>,
    aggregation: ValidityAggregation,
    valid: Option<bool>,
}

impl FieldContainer {
    /// Build one slot per schema entry.
    ///
    /// Built-in type tags become [`Field`]s; other tags are looked up in the
    /// registry.
    pub fn build(schema: &Schema, registry: &KindRegistry) -> Result<Self> {
        let mut container = Self::default();
        for (key, description) in schema.iter() {
            let slot = if FieldKind::from_tag(&description.kind).is_some() {
                Slot::Field(Field::new(key, description.clone())?)
            } else if let Some(object) = registry.create(&description.kind) {
                Slot::Object(object)
            } else {
                return Err(Error::Field(
                    FieldError::new(
                        FieldErrorKind::UnknownKind,
                        format!("unknown field type '{}'", description.kind),
                    )
                    .on(key),
                ));
            };
            container.index.insert(key.to_string(), container.slots.len());
            container.keys.push(key.to_string());
            container.slots.push(slot);
        }
        tracing::trace!(fields = container.len(), "Built field container");
        Ok(container)
    }

    pub fn with_aggregation(mut self, aggregation: ValidityAggregation) -> Self {
        self.aggregation = aggregation;
        self.valid = None;
        self
    }

    pub fn aggregation(&self) -> ValidityAggregation {
        self.aggregation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Keys in schema order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn slot(&self, key: &str) -> Option<&Slot> {
        self.index.get(key).map(|&i| &self.slots[i])
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        match self.slot(key) {
            Some(Slot::Field(field)) => Some(field),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, key: &str) -> Option<&mut Field> {
        self.valid = None;
        let i = *self.index.get(key)?;
        match &mut self.slots[i] {
            Slot::Field(field) => Some(field),
            Slot::Object(_) => None,
        }
    }

    /// Iterate slots in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.keys.iter().map(String::as_str).zip(self.slots.iter())
    }

    /// Resolved value under `key`; null for unknown keys.
    pub fn get(&self, key: &str) -> Value {
        self.slot(key).map_or(Value::Null, Slot::value)
    }

    fn slot_mut(&mut self, key: &str) -> Result<&mut Slot> {
        let Some(&i) = self.index.get(key) else {
            return Err(Error::Container(ContainerError {
                kind: ContainerErrorKind::NoSuchField,
                key: key.to_string(),
                message: format!("offset '{}' does not exist", key),
            }));
        };
        self.valid = None;
        Ok(&mut self.slots[i])
    }

    /// Write a value through the field's parse/filter/validate pipeline.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.slot_mut(key)? {
            Slot::Field(field) => {
                field.set_value(value);
                Ok(())
            }
            Slot::Object(object) => object.set_values(value).map_err(|e| nested_rejected(key, &e)),
        }
    }

    /// Write a value received from the remote service.
    pub fn hydrate(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.slot_mut(key)? {
            Slot::Field(field) => {
                field.hydrate(value);
                Ok(())
            }
            Slot::Object(object) => object.set_values(value).map_err(|e| nested_rejected(key, &e)),
        }
    }

    /// Reset the value under `key` to null.
    pub fn unset(&mut self, key: &str) -> Result<()> {
        match self.slot_mut(key)? {
            Slot::Field(field) => {
                field.clear();
                Ok(())
            }
            Slot::Object(object) => object.set_values(Value::Null),
        }
    }

    /// Every key with its resolved value, nested objects included.
    pub fn values(&self) -> Values {
        self.iter()
            .map(|(key, slot)| (key.to_string(), slot.value()))
            .collect()
    }

    /// Write many values; the first unknown key aborts with an error.
    pub fn set_values(&mut self, values: Values) -> Result<()> {
        for (key, value) in values {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Hydrate many values, skipping keys outside the schema.
    ///
    /// Returns the skipped keys.
    pub fn hydrate_values(&mut self, values: Values) -> Result<Vec<String>> {
        let mut skipped = Vec::new();
        for (key, value) in values {
            if self.contains(&key) {
                self.hydrate(&key, value)?;
            } else {
                skipped.push(key);
            }
        }
        Ok(skipped)
    }

    /// Validate every slot and combine the results.
    pub fn validate(&mut self) -> bool {
        let results: Vec<bool> = self.slots.iter_mut().map(Slot::validate).collect();
        let valid = self.aggregation.combine(results);
        self.valid = Some(valid);
        valid
    }

    /// Cached validity, validating first if anything changed since.
    pub fn is_valid(&mut self) -> bool {
        match self.valid {
            Some(valid) => valid,
            None => self.validate(),
        }
    }

    /// Error codes per key from the last validation.
    pub fn errors(&self) -> IndexMap<String, Vec<String>> {
        self.iter()
            .map(|(key, slot)| (key.to_string(), slot.error_codes()))
            .collect()
    }

    /// Human-readable messages per key from the last validation.
    pub fn messages(&self) -> IndexMap<String, Vec<String>> {
        self.iter()
            .map(|(key, slot)| {
                let messages = match slot {
                    Slot::Field(field) => {
                        field.messages().iter().map(|m| m.message.clone()).collect()
                    }
                    Slot::Object(object) => object.errors(),
                };
                (key.to_string(), messages)
            })
            .collect()
    }

    /// Every failure from the last validation, in schema order.
    pub fn validation_error(&self) -> ValidationError {
        let mut error = ValidationError::new();
        for (key, slot) in self.iter() {
            match slot {
                Slot::Field(field) => {
                    for failure in field.messages() {
                        error.add(key, failure.code, failure.message.clone());
                    }
                }
                Slot::Object(object) => {
                    for code in object.errors() {
                        error.add(key, code.clone(), code);
                    }
                }
            }
        }
        error
    }

    /// Attach pending uploads to every file-transfer field that autoloads.
    ///
    /// Returns the keys of the fields that received a file.
    pub fn attach_uploads(&mut self, uploads: &mut Uploads) -> Result<Vec<String>> {
        let mut attached = Vec::new();
        for (key, slot) in self.keys.iter().zip(self.slots.iter_mut()) {
            if let Slot::Field(field) = slot {
                if field.autoloads() && field.attach_upload(uploads)? {
                    attached.push(key.clone());
                }
            }
        }
        if !attached.is_empty() {
            self.valid = None;
        }
        Ok(attached)
    }
}

fn nested_rejected(key: &str, err: &Error) -> Error {
    Error::Container(ContainerError {
        kind: ContainerErrorKind::NestedRejected,
        key: key.to_string(),
        message: format!("nested value under '{}' rejected the update: {}", key, err),
    })
}
