//! Value filters applied before storage (pre-filters) or on read (post-filters).

use crate::Value;
use crate::error::{FieldError, FieldErrorKind};
use crate::rule::RuleSpec;

/// Width used by `Zerofill` when neither an argument nor a field length is given.
pub const DEFAULT_ZEROFILL_WIDTH: usize = 10;

/// A single filter from the closed registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    StringTrim,
    StringToLower,
    StringToUpper,
    /// Keep only ASCII digits
    Digits,
    /// Keep only alphabetic characters
    Alpha,
    /// Keep only alphanumeric characters
    Alnum,
    /// Remove markup tags
    StripTags,
    /// Integer coercion
    Int,
    /// Absolute value of numeric input
    Unsigned,
    /// Left pad the rendered value with zeros
    Zerofill(usize),
    /// Mark a path as a file upload by prefixing `@`
    Filetransfer,
}

impl Filter {
    /// Resolve a parsed token against the registry.
    pub fn from_spec(spec: &RuleSpec) -> Result<Self, FieldError> {
        let filter = match spec.name.to_ascii_lowercase().as_str() {
            "stringtrim" => Filter::StringTrim,
            "stringtolower" => Filter::StringToLower,
            "stringtoupper" => Filter::StringToUpper,
            "digits" => Filter::Digits,
            "alpha" => Filter::Alpha,
            "alnum" => Filter::Alnum,
            "striptags" => Filter::StripTags,
            "int" => Filter::Int,
            "unsigned" => Filter::Unsigned,
            "zerofill" => {
                let width = match spec.args().first() {
                    Some(arg) => arg.parse().map_err(|_| {
                        FieldError::new(
                            FieldErrorKind::InvalidRule,
                            format!("invalid width '{}' for Zerofill", arg),
                        )
                    })?,
                    None => DEFAULT_ZEROFILL_WIDTH,
                };
                Filter::Zerofill(width)
            }
            "filetransfer" => Filter::Filetransfer,
            _ => {
                return Err(FieldError::new(
                    FieldErrorKind::UnknownRule,
                    format!("unknown filter '{}'", spec.name),
                ));
            }
        };
        Ok(filter)
    }

    /// Apply the filter. Null passes through every filter unchanged.
    pub fn apply(&self, value: Value) -> Value {
        if value.is_null() {
            return value;
        }
        match self {
            Filter::StringTrim => map_text(value, |s| s.trim().to_string()),
            Filter::StringToLower => map_text(value, |s| s.to_lowercase()),
            Filter::StringToUpper => map_text(value, |s| s.to_uppercase()),
            Filter::Digits => retain(value, |c| c.is_ascii_digit()),
            Filter::Alpha => retain(value, char::is_alphabetic),
            Filter::Alnum => retain(value, char::is_alphanumeric),
            Filter::StripTags => map_text(value, strip_tags),
            Filter::Int => Value::Int(value.coerce_int()),
            Filter::Unsigned => match value {
                Value::Int(v) => Value::Int(v.saturating_abs()),
                Value::Float(v) => Value::Float(v.abs()),
                Value::Text(s) => unsigned_text(s),
                other => other,
            },
            Filter::Zerofill(width) => {
                Value::Text(format!("{:0>width$}", value.to_text(), width = *width))
            }
            Filter::Filetransfer => match value {
                Value::Text(s) if !s.is_empty() && !s.starts_with('@') => {
                    Value::Text(format!("@{}", s))
                }
                other => other,
            },
        }
    }
}

fn map_text(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Text(s) => Value::Text(f(&s)),
        other => other,
    }
}

fn unsigned_text(s: String) -> Value {
    if let Ok(v) = s.trim().parse::<i64>() {
        return Value::Int(v.saturating_abs());
    }
    if let Ok(v) = s.trim().parse::<f64>() {
        return Value::Float(v.abs());
    }
    Value::Text(s)
}

fn retain(value: Value, keep: impl Fn(char) -> bool) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => value,
        other => Value::Text(other.to_text().chars().filter(|c| keep(*c)).collect()),
    }
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Apply filters in order.
pub fn run_filters(filters: &[Filter], value: Value) -> Value {
    filters.iter().fold(value, |acc, filter| {
        let out = filter.apply(acc);
        tracing::trace!(filter = ?filter, value = %out, "Applied filter");
        out
    })
}
