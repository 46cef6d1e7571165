//! Typed, validating holders for single schema attributes.
//!
//! A [`Field`] is built from a [`FieldDescription`]. Writes go through
//! `parse_value` for the field's [`FieldKind`], then the pre-filter chain,
//! and are validated immediately. Reads return the stored value (or the
//! default) through the post-filter chain.

mod datetime;
mod description;
mod upload;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::Value;
use crate::error::{FieldError, FieldErrorKind};
use crate::filter::{Filter, run_filters};
use crate::rule::parse_rules;
use crate::validate::{RuleFailure, Validator, run_chain};

pub use datetime::{DEFAULT_FORMAT, DateTimeFormat, parse_offset};
pub use description::{FieldDescription, FieldOption, Schema};
pub use upload::{StagedUpload, UploadedFile, Uploads};

/// Built-in field kinds, resolved from a description's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    String,
    Integer,
    Float,
    /// Server-generated value, never written by clients
    Auto,
    Enum,
    Set,
    DateTime,
    Object,
    Array,
    FileTransfer,
}

impl FieldKind {
    /// Resolve a type tag (case-insensitive).
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => FieldKind::Bool,
            "string" | "text" | "varchar" | "char" => FieldKind::String,
            "integer" | "int" => FieldKind::Integer,
            "float" | "double" | "decimal" => FieldKind::Float,
            "auto" => FieldKind::Auto,
            "enum" => FieldKind::Enum,
            "set" => FieldKind::Set,
            "datetime" => FieldKind::DateTime,
            "object" | "stdclass" => FieldKind::Object,
            "array" => FieldKind::Array,
            "filetransfer" => FieldKind::FileTransfer,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical type tag.
    pub const fn tag(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Auto => "auto",
            FieldKind::Enum => "enum",
            FieldKind::Set => "set",
            FieldKind::DateTime => "datetime",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
            FieldKind::FileTransfer => "filetransfer",
        }
    }

    /// Kinds whose `length` bounds magnitude rather than character count.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Float)
    }

    /// Coerce raw input into this kind's value shape.
    pub fn parse_value(&self, raw: Value) -> Value {
        match self {
            FieldKind::Auto => Value::Null,
            FieldKind::Bool => parse_bool(raw),
            FieldKind::String | FieldKind::FileTransfer => match raw {
                Value::Null => Value::Null,
                Value::Text(s) => Value::Text(s),
                other => Value::Text(other.to_text()),
            },
            FieldKind::Integer => match raw {
                Value::Null => Value::Null,
                other => Value::Int(other.coerce_int()),
            },
            FieldKind::Float => match raw {
                Value::Null => Value::Null,
                other => Value::Float(other.coerce_float()),
            },
            FieldKind::Enum | FieldKind::Set | FieldKind::DateTime => raw,
            FieldKind::Object => match raw {
                Value::Object(_) => raw,
                Value::Null => Value::Null,
                Value::Text(ref s) if s.eq_ignore_ascii_case("null") => Value::Null,
                Value::Array(items) => Value::Object(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v))
                        .collect(),
                ),
                scalar => Value::Object([("scalar".to_string(), scalar)].into_iter().collect()),
            },
            FieldKind::Array => match raw {
                Value::Array(_) | Value::Object(_) => raw,
                Value::Null => Value::Null,
                Value::Text(ref s) if s.eq_ignore_ascii_case("null") => Value::Null,
                scalar => Value::Array(vec![scalar]),
            },
        }
    }
}

fn parse_bool(raw: Value) -> Value {
    match raw {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(b),
        Value::Text(s) => match s.trim().to_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "1" => Value::Bool(true),
            "f" | "false" | "n" | "no" | "0" => Value::Bool(false),
            "" | "null" => Value::Null,
            _ => Value::Bool(Value::Text(s).truthy()),
        },
        other => Value::Bool(other.truthy()),
    }
}

/// One schema attribute: value, rules and validation state.
#[derive(Debug, Clone)]
pub struct Field {
    id: String,
    kind: FieldKind,
    desc: FieldDescription,
    value: Value,
    pre_filters: Vec<Filter>,
    validators: Vec<Validator>,
    post_filters: Vec<Filter>,
    failures: Vec<RuleFailure>,
    valid: Option<bool>,
    datetime_format: DateTimeFormat,
    datetime: Option<DateTime<FixedOffset>>,
    upload: Option<Arc<StagedUpload>>,
}

impl Field {
    /// Build a field from its description.
    pub fn new(id: impl Into<String>, description: FieldDescription) -> Result<Self, FieldError> {
        let id = id.into();
        let kind = FieldKind::from_tag(&description.kind).ok_or_else(|| {
            FieldError::new(
                FieldErrorKind::UnknownKind,
                format!("unknown field type '{}'", description.kind),
            )
            .on(id.clone())
        })?;

        let mut desc = description;
        if kind == FieldKind::Auto {
            desc.editable = false;
            desc.allow_null = true;
        }
        let datetime_format = if kind == FieldKind::DateTime {
            DateTimeFormat::new(desc.format.as_deref(), desc.timezone.as_deref())
                .map_err(|e| e.on(id.clone()))?
        } else {
            DateTimeFormat::default()
        };

        let mut field = Self {
            id,
            kind,
            desc,
            value: Value::Null,
            pre_filters: Vec::new(),
            validators: Vec::new(),
            post_filters: Vec::new(),
            failures: Vec::new(),
            valid: None,
            datetime_format,
            datetime: None,
            upload: None,
        };
        field.build_rules().map_err(|e| e.on(field.id.clone()))?;
        Ok(field)
    }

    fn build_rules(&mut self) -> Result<(), FieldError> {
        self.pre_filters.clear();
        self.validators.clear();
        self.post_filters.clear();
        self.valid = None;

        if !self.desc.editable {
            return Ok(());
        }

        for rule in parse_rules(self.desc.pre_filter.as_deref().unwrap_or_default())? {
            self.pre_filters.push(Filter::from_spec(&rule)?);
        }
        if self.desc.options.contains(&FieldOption::Unsigned) {
            self.pre_filters.push(Filter::Unsigned);
        }
        if self.desc.options.contains(&FieldOption::Zerofill) {
            let width = self
                .desc
                .length
                .map_or(crate::filter::DEFAULT_ZEROFILL_WIDTH, |l| l as usize);
            self.pre_filters.push(Filter::Zerofill(width));
        }

        if let Some(length) = self.desc.length {
            if self.kind.is_numeric() {
                let digits = i32::try_from(length).unwrap_or(i32::MAX);
                self.validators.push(Validator::LessThan(10f64.powi(digits)));
            } else {
                self.validators.push(Validator::StringLength {
                    min: 0,
                    max: Some(length as usize),
                });
            }
        }

        let declared = parse_rules(self.desc.validate.as_deref().unwrap_or_default())?;
        if !self.desc.allow_null && !declared.iter().any(|r| r.is("NotEmpty")) {
            self.validators.push(Validator::NotEmpty);
        }
        for rule in &declared {
            self.validators.push(Validator::from_spec(rule)?);
        }

        match self.kind {
            FieldKind::Enum => self
                .validators
                .push(Validator::InArray(self.desc.enumeration.clone())),
            FieldKind::Set => self
                .validators
                .push(Validator::Set(self.desc.enumeration.clone())),
            _ => {}
        }

        for rule in parse_rules(self.desc.post_filter.as_deref().unwrap_or_default())? {
            self.post_filters.push(Filter::from_spec(&rule)?);
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The description this field was built from, including later attribute changes.
    pub fn description(&self) -> &FieldDescription {
        &self.desc
    }

    pub fn is_editable(&self) -> bool {
        self.desc.editable
    }

    /// Coerce raw input for this field's kind.
    pub fn parse_value(&self, raw: Value) -> Value {
        self.kind.parse_value(raw)
    }

    /// Parse, pre-filter, store and validate. Returns the new validity.
    pub fn set_value(&mut self, raw: impl Into<Value>) -> bool {
        let parsed = self.parse_value(raw.into());
        self.store(parsed)
    }

    /// Store a value received from the remote service.
    ///
    /// Unlike [`set_value`](Self::set_value) this keeps server-generated
    /// values for auto fields.
    pub fn hydrate(&mut self, raw: impl Into<Value>) -> bool {
        let raw = raw.into();
        let parsed = if self.kind == FieldKind::Auto {
            raw
        } else {
            self.parse_value(raw)
        };
        self.store(parsed)
    }

    fn store(&mut self, parsed: Value) -> bool {
        let filtered = run_filters(&self.pre_filters, parsed);
        if self.kind == FieldKind::DateTime {
            self.datetime = self.datetime_format.parse(&filtered);
        }
        tracing::trace!(field = %self.id, value = %filtered, "Field value stored");
        self.value = filtered;
        self.validate()
    }

    /// Clear the stored value back to null.
    pub fn clear(&mut self) {
        self.value = Value::Null;
        self.datetime = None;
        self.failures.clear();
        self.valid = None;
    }

    /// Stored value, else the default, post-filtered; null if neither is set.
    pub fn value(&self) -> Value {
        let raw = if self.value.is_null() {
            &self.desc.default
        } else {
            &self.value
        };
        if raw.is_null() {
            return Value::Null;
        }

        let rendered = match (self.kind, &self.datetime) {
            (FieldKind::DateTime, Some(dt)) if !self.value.is_null() => {
                Value::Text(self.datetime_format.render(dt))
            }
            _ => raw.clone(),
        };
        run_filters(&self.post_filters, rendered)
    }

    /// The stored value exactly as written, without default or post-filters.
    pub fn raw_value(&self) -> &Value {
        &self.value
    }

    /// Parsed point in time for datetime fields.
    pub fn datetime(&self) -> Option<&DateTime<FixedOffset>> {
        self.datetime.as_ref()
    }

    /// Run the validator chain against the stored value.
    pub fn validate(&mut self) -> bool {
        self.failures.clear();

        if self.kind == FieldKind::Auto || (self.desc.allow_null && self.value.is_null()) {
            self.valid = Some(true);
            return true;
        }

        self.failures = run_chain(&self.validators, &self.value);
        if self.kind == FieldKind::DateTime && !self.value.is_null() && self.datetime.is_none() {
            self.failures.push(RuleFailure {
                code: "dateInvalidDate",
                message: format!(
                    "'{}' does not fit the date format '{}'",
                    self.value,
                    self.datetime_format.format_str()
                ),
            });
        }

        let valid = self.failures.is_empty();
        self.valid = Some(valid);
        valid
    }

    /// Cached validity, validating first if nothing was checked yet.
    pub fn is_valid(&mut self) -> bool {
        match self.valid {
            Some(valid) => valid,
            None => self.validate(),
        }
    }

    /// Error codes from the last validation.
    pub fn errors(&self) -> Vec<&'static str> {
        self.failures.iter().map(|f| f.code).collect()
    }

    /// Code and message pairs from the last validation.
    pub fn messages(&self) -> &[RuleFailure] {
        &self.failures
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn length(&self) -> Option<u32> {
        self.desc.length
    }

    pub fn set_length(&mut self, length: Option<u32>) -> Result<(), FieldError> {
        self.ensure_editable("length")?;
        self.desc.length = length;
        self.rebuild()
    }

    pub fn allow_null(&self) -> bool {
        self.desc.allow_null
    }

    pub fn set_allow_null(&mut self, allow: bool) -> Result<(), FieldError> {
        self.ensure_editable("allowNull")?;
        self.desc.allow_null = allow;
        self.rebuild()
    }

    pub fn default_value(&self) -> &Value {
        &self.desc.default
    }

    pub fn set_default_value(&mut self, value: impl Into<Value>) -> Result<(), FieldError> {
        self.ensure_editable("defaultValue")?;
        self.desc.default = value.into();
        Ok(())
    }

    pub fn options(&self) -> &[FieldOption] {
        &self.desc.options
    }

    pub fn set_options(&mut self, options: Vec<FieldOption>) -> Result<(), FieldError> {
        self.ensure_editable("options")?;
        self.desc.options = options;
        self.rebuild()
    }

    pub fn validate_spec(&self) -> Option<&str> {
        self.desc.validate.as_deref()
    }

    pub fn set_validate_spec(&mut self, rules: Option<String>) -> Result<(), FieldError> {
        self.ensure_editable("validate")?;
        self.desc.validate = rules;
        self.rebuild()
    }

    pub fn pre_filter_spec(&self) -> Option<&str> {
        self.desc.pre_filter.as_deref()
    }

    pub fn set_pre_filter_spec(&mut self, rules: Option<String>) -> Result<(), FieldError> {
        self.ensure_editable("preFilter")?;
        self.desc.pre_filter = rules;
        self.rebuild()
    }

    pub fn post_filter_spec(&self) -> Option<&str> {
        self.desc.post_filter.as_deref()
    }

    pub fn set_post_filter_spec(&mut self, rules: Option<String>) -> Result<(), FieldError> {
        self.ensure_editable("postFilter")?;
        self.desc.post_filter = rules;
        self.rebuild()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.desc.description.as_deref()
    }

    /// Descriptions stay writable on every field.
    pub fn set_description_text(&mut self, text: impl Into<String>) {
        self.desc.description = Some(text.into());
    }

    fn ensure_editable(&self, attribute: &str) -> Result<(), FieldError> {
        if self.desc.editable {
            Ok(())
        } else {
            Err(FieldError::new(
                FieldErrorKind::NotEditable,
                format!("cannot set '{}': field is not editable", attribute),
            )
            .on(self.id.clone()))
        }
    }

    fn rebuild(&mut self) -> Result<(), FieldError> {
        self.build_rules().map_err(|e| e.on(self.id.clone()))
    }

    /// Claim this field's pending upload, stage it, and store the staged path.
    ///
    /// Returns `false` when no usable upload is registered for the field.
    pub fn attach_upload(&mut self, uploads: &mut Uploads) -> Result<bool, FieldError> {
        if self.kind != FieldKind::FileTransfer {
            return Err(FieldError::new(
                FieldErrorKind::FileTransfer,
                format!("'{}' fields cannot receive uploads", self.kind.tag()),
            )
            .on(self.id.clone()));
        }

        let Some(file) = uploads.take(&self.id) else {
            tracing::info!(field = %self.id, "No upload registered for field");
            return Ok(false);
        };
        if let Some(reason) = &file.error {
            tracing::info!(field = %self.id, reason = %reason, "Discarding failed upload");
            self.clear();
            self.upload = None;
            return Ok(false);
        }

        let root = self.desc.tmp_directory.as_deref().map(Path::new);
        let staged = StagedUpload::stage(&file, root).map_err(|e| FieldError {
            kind: FieldErrorKind::FileTransfer,
            field: Some(self.id.clone()),
            message: format!(
                "unable to move uploaded file '{}' into a temporary location: {}",
                file.name, e
            ),
            source: Some(Box::new(e)),
        })?;
        let path = staged.path().to_string_lossy().into_owned();
        self.upload = Some(Arc::new(staged));
        self.set_value(path);
        Ok(true)
    }

    /// Path of the staged upload, if one is attached.
    pub fn upload_path(&self) -> Option<&Path> {
        self.upload.as_deref().map(StagedUpload::path)
    }

    /// Whether the description asks for uploads to be attached eagerly.
    pub fn autoloads(&self) -> bool {
        self.kind == FieldKind::FileTransfer && self.desc.autoload
    }
}
