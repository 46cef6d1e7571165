//! Declarative field descriptions and the ordered schemas built from them.

use crate::Value;
use crate::error::{Error, FieldError, FieldErrorKind};

/// Modifiers a numeric field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOption {
    /// Store the absolute value
    Unsigned,
    /// Left pad with zeros up to the field length
    Zerofill,
}

impl FieldOption {
    pub fn parse(name: &str) -> Result<Self, FieldError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "unsigned" => Ok(FieldOption::Unsigned),
            "zerofill" => Ok(FieldOption::Zerofill),
            other => Err(FieldError::new(
                FieldErrorKind::InvalidProperty,
                format!("unknown field option '{}'", other),
            )),
        }
    }
}

/// Everything a schema says about one field.
///
/// Built fluently in code or parsed from a service description with
/// [`FieldDescription::from_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescription {
    /// Type tag, e.g. `string`, `integer`, `datetime`, or a registered custom tag
    pub kind: String,
    /// Character bound for text, magnitude bound (`< 10^length`) for numbers
    pub length: Option<u32>,
    pub allow_null: bool,
    pub default: Value,
    pub description: Option<String>,
    pub options: Vec<FieldOption>,
    /// Validator rule list
    pub validate: Option<String>,
    pub pre_filter: Option<String>,
    pub post_filter: Option<String>,
    pub editable: bool,
    /// Allowed members for enum and set fields
    pub enumeration: Vec<String>,
    /// strftime-style format for datetime fields
    pub format: Option<String>,
    /// Fixed UTC offset for datetime fields, e.g. `+02:00`
    pub timezone: Option<String>,
    /// Root directory for staged uploads
    pub tmp_directory: Option<String>,
    /// Attach a pending upload as soon as the container is asked to
    pub autoload: bool,
}

impl Default for FieldDescription {
    fn default() -> Self {
        Self::new("string")
    }
}

impl FieldDescription {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            length: None,
            allow_null: false,
            default: Value::Null,
            description: None,
            options: Vec::new(),
            validate: None,
            pre_filter: None,
            post_filter: None,
            editable: true,
            enumeration: Vec::new(),
            format: None,
            timezone: None,
            tmp_directory: None,
            autoload: false,
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = allow;
        self
    }

    /// Shorthand for `allow_null(true)`.
    pub fn nullable(self) -> Self {
        self.allow_null(true)
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn option(mut self, option: FieldOption) -> Self {
        if !self.options.contains(&option) {
            self.options.push(option);
        }
        self
    }

    pub fn validate(mut self, rules: impl Into<String>) -> Self {
        self.validate = Some(rules.into());
        self
    }

    pub fn pre_filter(mut self, rules: impl Into<String>) -> Self {
        self.pre_filter = Some(rules.into());
        self
    }

    pub fn post_filter(mut self, rules: impl Into<String>) -> Self {
        self.post_filter = Some(rules.into());
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn enumeration<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumeration = members.into_iter().map(Into::into).collect();
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn tmp_directory(mut self, dir: impl Into<String>) -> Self {
        self.tmp_directory = Some(dir.into());
        self
    }

    pub fn autoload(mut self, autoload: bool) -> Self {
        self.autoload = autoload;
        self
    }

    /// Parse a description object as served by a remote schema endpoint.
    ///
    /// A bare string is accepted as shorthand for `{"type": <string>}`.
    /// Keys are matched exactly; an unrecognized key is an error.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, FieldError> {
        let map = match json {
            serde_json::Value::String(tag) => return Ok(Self::new(tag.clone())),
            serde_json::Value::Object(map) => map,
            other => {
                return Err(FieldError::new(
                    FieldErrorKind::InvalidProperty,
                    format!("field description must be an object, found {}", other),
                ));
            }
        };

        let mut desc = Self::new("string");
        let mut has_type = false;
        for (key, value) in map {
            match key.as_str() {
                "type" => {
                    desc.kind = expect_str(key, value)?;
                    has_type = true;
                }
                "length" => desc.length = expect_length(value)?,
                "allowNull" => desc.allow_null = Value::from(value.clone()).truthy(),
                "default" | "defaultValue" => desc.default = Value::from(value.clone()),
                "description" => desc.description = Some(expect_str(key, value)?),
                "options" => desc.options = expect_options(value)?,
                "validate" => desc.validate = Some(expect_str(key, value)?),
                "preFilter" => desc.pre_filter = Some(expect_str(key, value)?),
                "postFilter" => desc.post_filter = Some(expect_str(key, value)?),
                "editable" => desc.editable = Value::from(value.clone()).truthy(),
                "enumeration" => desc.enumeration = expect_list(key, value)?,
                "format" => desc.format = Some(expect_str(key, value)?),
                "timezone" => desc.timezone = Some(expect_str(key, value)?),
                "tmpDirectory" => desc.tmp_directory = Some(expect_str(key, value)?),
                "autoload" => desc.autoload = Value::from(value.clone()).truthy(),
                other => {
                    return Err(FieldError::new(
                        FieldErrorKind::UnknownProperty,
                        format!("property '{}' does not exist", other),
                    ));
                }
            }
        }

        if !has_type {
            return Err(FieldError::new(
                FieldErrorKind::InvalidProperty,
                "field description has no 'type'",
            ));
        }
        Ok(desc)
    }
}

fn expect_str(key: &str, value: &serde_json::Value) -> Result<String, FieldError> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(FieldError::new(
            FieldErrorKind::InvalidProperty,
            format!("'{}' must be a string, found {}", key, other),
        )),
    }
}

fn expect_length(value: &serde_json::Value) -> Result<Option<u32>, FieldError> {
    let parsed = match value {
        serde_json::Value::Null | serde_json::Value::Bool(false) => return Ok(None),
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| {
        FieldError::new(
            FieldErrorKind::InvalidProperty,
            format!("'length' must be a positive integer, found {}", value),
        )
    })
}

fn expect_list(key: &str, value: &serde_json::Value) -> Result<Vec<String>, FieldError> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s.clone()),
                other => Ok(Value::from(other.clone()).to_text()),
            })
            .collect(),
        serde_json::Value::String(s) => Ok(s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()),
        other => Err(FieldError::new(
            FieldErrorKind::InvalidProperty,
            format!("'{}' must be a list, found {}", key, other),
        )),
    }
}

fn expect_options(value: &serde_json::Value) -> Result<Vec<FieldOption>, FieldError> {
    let names = match value {
        serde_json::Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
        other => expect_list("options", other)?,
    };
    names.iter().map(|name| FieldOption::parse(name)).collect()
}

/// Ordered schema: field key to description, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldDescription)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, replacing any earlier description under the same key.
    pub fn field(mut self, key: impl Into<String>, description: FieldDescription) -> Self {
        self.insert(key, description);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, description: FieldDescription) {
        let key = key.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = description;
        } else {
            self.fields.push((key, description));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, d)| d)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDescription)> {
        self.fields.iter().map(|(k, d)| (k.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a JSON object mapping field keys to descriptions.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, FieldError> {
        let serde_json::Value::Object(map) = json else {
            return Err(FieldError::new(
                FieldErrorKind::InvalidProperty,
                format!("schema must be an object, found {}", json),
            ));
        };
        let mut schema = Self::new();
        for (key, value) in map {
            let description = FieldDescription::from_json(value).map_err(|e| e.on(key.clone()))?;
            schema.insert(key.clone(), description);
        }
        Ok(schema)
    }

    /// Parse schema JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_known_key() {
        let desc = FieldDescription::from_json(&json!({
            "type": "integer",
            "length": 3,
            "allowNull": true,
            "default": 7,
            "description": "Age in years",
            "options": "unsigned zerofill",
            "validate": "GreaterThan[0]",
            "preFilter": "StringTrim",
            "postFilter": "Int",
            "editable": true
        }))
        .unwrap();

        assert_eq!(desc.kind, "integer");
        assert_eq!(desc.length, Some(3));
        assert!(desc.allow_null);
        assert_eq!(desc.default, Value::Int(7));
        assert_eq!(desc.options, vec![FieldOption::Unsigned, FieldOption::Zerofill]);
        assert_eq!(desc.validate.as_deref(), Some("GreaterThan[0]"));
    }

    #[test]
    fn unknown_property_is_rejected() {
        let err = FieldDescription::from_json(&json!({"type": "string", "colour": "red"}))
            .unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::UnknownProperty);
        assert!(err.message.contains("colour"));
    }

    #[test]
    fn bare_tag_is_shorthand() {
        let desc = FieldDescription::from_json(&json!("auto")).unwrap();
        assert_eq!(desc.kind, "auto");
        assert!(desc.editable);
    }

    #[test]
    fn schema_keeps_declaration_order() {
        let schema = Schema::from_json_str(
            r#"{"zeta": "string", "alpha": {"type": "integer"}, "mid": {"type": "bool"}}"#,
        )
        .unwrap();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn schema_errors_name_the_field() {
        let err = Schema::from_json(&json!({"name": {"type": "string", "size": 2}})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("name"));
    }

    #[test]
    fn enumeration_accepts_list_or_csv() {
        let a = FieldDescription::from_json(&json!({"type": "enum", "enumeration": ["Bob", "Joe"]}))
            .unwrap();
        let b = FieldDescription::from_json(&json!({"type": "enum", "enumeration": "Bob, Joe"}))
            .unwrap();
        assert_eq!(a.enumeration, b.enumeration);
    }
}
