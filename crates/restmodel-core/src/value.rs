//! Dynamic values held by fields and exchanged with remote services.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A record: field key to value, in insertion order.
pub type Values = IndexMap<String, Value>;

/// A dynamically-typed value.
///
/// Remote payloads are loosely typed, so a field stores whatever its kind
/// coerced the input into and reads it back through the accessors below.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Ordered list
    Array(Vec<Value>),
    /// Keyed structure
    Object(Values),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Scalars travel as plain form values; everything else needs encoding.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_)
        )
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Numeric reading of the value; numeric text parses in full.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Text(s) => s.trim().parse().ok(),
            other => other.as_f64(),
        }
    }

    /// Integer coercion that reads the leading numeric portion of text:
    /// `"12abc"` is 12, `"abc"` is 0.
    pub fn coerce_int(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Bool(v) => i64::from(*v),
            Value::Int(v) => *v,
            Value::Float(v) => v.trunc() as i64,
            Value::Text(s) => leading_number(s, false)
                .and_then(|n| n.parse::<f64>().ok())
                .map_or(0, |n| n.trunc() as i64),
            Value::Array(items) => i64::from(!items.is_empty()),
            Value::Object(_) => 1,
        }
    }

    /// Float coercion that reads the leading numeric portion of text.
    pub fn coerce_float(&self) -> f64 {
        match self {
            Value::Float(v) => *v,
            Value::Text(s) => leading_number(s, true)
                .and_then(|n| n.parse().ok())
                .unwrap_or(0.0),
            other => other.coerce_int() as f64,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Values> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Render as text the way loosely-typed services print values.
    ///
    /// `true` becomes `"1"`, `false` and null become `""`, integral floats
    /// drop their fraction, containers render as JSON.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => format_float(*v),
            Value::Text(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => serde_json::Value::from(self.clone()).to_string(),
        }
    }

    /// Loose truthiness: zero, empty text, `"0"` and empty containers are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(v) => *v,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Text(s) => !(s.is_empty() || s == "0"),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    /// Empty in the sense of a required-field check.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Loose equality used for membership checks: compares rendered text.
    pub fn loosely_equals(&self, other: &str) -> bool {
        self.to_text() == other
    }
}

/// Slice the numeric prefix of `s` after leading whitespace.
///
/// Integers accept an optional sign and digits. Floats also accept one
/// decimal point and an exponent.
fn leading_number(s: &str, float: bool) -> Option<&str> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if float {
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        if end > digits_start && end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
            let mut exp = end + 1;
            if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
                while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                    exp += 1;
                }
                end = exp;
            }
        }
    }
    let number = &s[..end];
    if number[digits_start..].chars().any(|c| c.is_ascii_digit()) {
        Some(number)
    } else {
        None
    }
}

fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<Values> for Value {
    fn from(v: Values) -> Self {
        Value::Object(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

// TryFrom implementations for extracting values

fn type_mismatch(expected: &str, actual: &Value) -> Error {
    Error::Serde(format!("expected {}, found {}", expected, actual.type_name()))
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| type_mismatch("bool", &value))
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_i64().ok_or_else(|| type_mismatch("integer", &value))
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| type_mismatch("float", &value))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(type_mismatch("string", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scalars() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(2.5f64), Value::Float(2.5));
        assert_eq!(Value::from("hello"), Value::Text("hello".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(Value::Bool(true).to_text(), "1");
        assert_eq!(Value::Bool(false).to_text(), "");
        assert_eq!(Value::Float(3.0).to_text(), "3");
        assert_eq!(Value::Float(4.05).to_text(), "4.05");
        assert_eq!(Value::from(vec![1i64, 2]).to_text(), "[1,2]");
    }

    #[test]
    fn test_json_conversion_keeps_shape() {
        let json = serde_json::json!({"id": 5, "tags": ["a", "b"], "ratio": 0.5, "gone": null});
        let value = Value::from(json.clone());
        let object = value.as_object().expect("object");
        assert_eq!(object["id"], Value::Int(5));
        assert_eq!(object["gone"], Value::Null);
        assert_eq!(serde_json::Value::from(value), json);
    }

    #[test]
    fn test_blank_and_truthy() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("   ").is_blank());
        assert!(!Value::Int(0).is_blank());
        assert!(!Value::from("0").truthy());
        assert!(Value::from("no").truthy());
    }

    #[test]
    fn test_loose_numeric_coercion() {
        assert_eq!(Value::from("12abc").coerce_int(), 12);
        assert_eq!(Value::from("  -7").coerce_int(), -7);
        assert_eq!(Value::from("abc").coerce_int(), 0);
        assert_eq!(Value::from("3.9").coerce_int(), 3);
        assert_eq!(Value::Bool(true).coerce_int(), 1);
        assert!((Value::from("4.05xyz").coerce_float() - 4.05).abs() < f64::EPSILON);
        assert!((Value::from("1e3").coerce_float() - 1000.0).abs() < f64::EPSILON);
        assert!((Value::from(".5").coerce_float() - 0.5).abs() < f64::EPSILON);
        assert!(Value::from("e5").coerce_float().abs() < f64::EPSILON);
    }

    #[test]
    fn test_try_from_mismatch() {
        assert!(i64::try_from(Value::from("x")).is_err());
        assert_eq!(String::try_from(Value::from("x")).expect("text"), "x");
    }
}
