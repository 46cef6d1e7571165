//! Field validators and the regex cache they share.
//!
//! Validators are resolved from parsed [`RuleSpec`] tokens against a closed
//! registry. Each failing check records an error code and a message; a chain
//! runs every validator so callers see all problems at once.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{OnceLock, RwLock};

use regex::Regex;

use crate::Value;
use crate::error::{FieldError, FieldErrorKind};
use crate::rule::RuleSpec;

/// Thread-safe regex cache for compiled patterns.
struct RegexCache {
    cache: RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Compile a pattern through the process-wide cache.
pub fn compiled(pattern: &str) -> Result<Regex, regex::Error> {
    regex_cache().get_or_compile(pattern)
}

/// Check if a string matches a regex pattern.
///
/// Returns `false` if the pattern is invalid (logs a warning).
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid regex pattern in validation, treating as non-match"
            );
            false
        }
    }
}

/// Translate a delimited pattern such as `/^[a-z]+$/i` into regex syntax.
///
/// Undelimited patterns are returned unchanged.
pub fn normalize_pattern(raw: &str) -> String {
    let raw = raw.trim();
    let Some(body) = raw.strip_prefix('/') else {
        return raw.to_string();
    };
    let Some(end) = body.rfind('/') else {
        return raw.to_string();
    };

    let (pattern, flags) = (&body[..end], &body[end + 1..]);
    let flags: String = flags.chars().filter(|c| "imsx".contains(*c)).collect();
    if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", flags, pattern)
    }
}

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$";
const UK_POSTCODE_PATTERN: &str = r"^[A-Za-z]{1,2}[0-9A-Za-z]{1,2}[ ]?[0-9]{0,1}[A-Za-z]{2}$";

/// A failed check: error code plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub code: &'static str,
    pub message: String,
}

impl RuleFailure {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A single validator from the closed registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    NotEmpty,
    StringLength { min: usize, max: Option<usize> },
    LessThan(f64),
    GreaterThan(f64),
    Between { min: f64, max: f64 },
    Digits,
    Alpha,
    Alnum,
    Int,
    Float,
    EmailAddress,
    Regex(String),
    InArray(Vec<String>),
    /// Comma separated members, each within the haystack
    Set(Vec<String>),
    /// Size bounds in bytes for a file path value
    Filesize { max: u64, min: Option<u64> },
    /// Allowed file extensions, lowercase
    Filetype(Vec<String>),
    UkPostCode,
}

impl Validator {
    /// Resolve a parsed token against the registry.
    pub fn from_spec(spec: &RuleSpec) -> Result<Self, FieldError> {
        let args = spec.args();
        let validator = match spec.name.to_ascii_lowercase().as_str() {
            "notempty" => Validator::NotEmpty,
            "stringlength" => {
                let min = args.first().map_or(Ok(0), |a| parse_arg::<usize>(spec, a))?;
                let max = args.get(1).map(|a| parse_arg::<usize>(spec, a)).transpose()?;
                Validator::StringLength { min, max }
            }
            "lessthan" => Validator::LessThan(parse_arg(spec, required(spec, &args, 0)?)?),
            "greaterthan" => Validator::GreaterThan(parse_arg(spec, required(spec, &args, 0)?)?),
            "between" => Validator::Between {
                min: parse_arg(spec, required(spec, &args, 0)?)?,
                max: parse_arg(spec, required(spec, &args, 1)?)?,
            },
            "digits" => Validator::Digits,
            "alpha" => Validator::Alpha,
            "alnum" => Validator::Alnum,
            "int" => Validator::Int,
            "float" => Validator::Float,
            "emailaddress" => Validator::EmailAddress,
            "regex" => {
                let raw = spec.raw_args.as_deref().unwrap_or_default();
                let pattern = normalize_pattern(raw);
                if let Err(e) = Regex::new(&pattern) {
                    return Err(FieldError::new(
                        FieldErrorKind::InvalidRule,
                        format!("invalid pattern '{}' in Regex rule: {}", raw, e),
                    ));
                }
                Validator::Regex(pattern)
            }
            "inarray" => Validator::InArray(args),
            "set" => Validator::Set(args),
            "filesize" => Validator::Filesize {
                max: parse_size(spec, required(spec, &args, 0)?)?,
                min: args.get(1).map(|a| parse_size(spec, a)).transpose()?,
            },
            "filetype" => {
                Validator::Filetype(args.iter().map(|a| a.to_ascii_lowercase()).collect())
            }
            "ukpostcode" => Validator::UkPostCode,
            _ => {
                return Err(FieldError::new(
                    FieldErrorKind::UnknownRule,
                    format!("unknown validator '{}'", spec.name),
                ));
            }
        };
        Ok(validator)
    }

    /// Registry name of this validator.
    pub fn name(&self) -> &'static str {
        match self {
            Validator::NotEmpty => "NotEmpty",
            Validator::StringLength { .. } => "StringLength",
            Validator::LessThan(_) => "LessThan",
            Validator::GreaterThan(_) => "GreaterThan",
            Validator::Between { .. } => "Between",
            Validator::Digits => "Digits",
            Validator::Alpha => "Alpha",
            Validator::Alnum => "Alnum",
            Validator::Int => "Int",
            Validator::Float => "Float",
            Validator::EmailAddress => "EmailAddress",
            Validator::Regex(_) => "Regex",
            Validator::InArray(_) => "InArray",
            Validator::Set(_) => "Set",
            Validator::Filesize { .. } => "Filesize",
            Validator::Filetype(_) => "Filetype",
            Validator::UkPostCode => "UkPostCode",
        }
    }

    /// Check a value, appending any failure.
    ///
    /// Only `NotEmpty` has an opinion about null; every other validator
    /// ignores it.
    pub fn check(&self, value: &Value, failures: &mut Vec<RuleFailure>) {
        if let Validator::NotEmpty = self {
            if value.is_blank() {
                failures.push(RuleFailure::new(
                    "isEmpty",
                    "Value is required and can't be empty",
                ));
            }
            return;
        }
        if value.is_null() {
            return;
        }

        let text = value.to_text();
        match self {
            Validator::NotEmpty => {}
            Validator::StringLength { min, max } => {
                let len = text.chars().count();
                if len < *min {
                    failures.push(RuleFailure::new(
                        "stringLengthTooShort",
                        format!("'{}' is less than {} characters long", text, min),
                    ));
                }
                if let Some(max) = max {
                    if len > *max {
                        failures.push(RuleFailure::new(
                            "stringLengthTooLong",
                            format!("'{}' is more than {} characters long", text, max),
                        ));
                    }
                }
            }
            Validator::LessThan(max) => {
                if !value.to_number().is_some_and(|n| n < *max) {
                    failures.push(RuleFailure::new(
                        "notLessThan",
                        format!("'{}' is not less than '{}'", text, Value::Float(*max)),
                    ));
                }
            }
            Validator::GreaterThan(min) => {
                if !value.to_number().is_some_and(|n| n > *min) {
                    failures.push(RuleFailure::new(
                        "notGreaterThan",
                        format!("'{}' is not greater than '{}'", text, Value::Float(*min)),
                    ));
                }
            }
            Validator::Between { min, max } => {
                if !value.to_number().is_some_and(|n| n >= *min && n <= *max) {
                    failures.push(RuleFailure::new(
                        "notBetween",
                        format!(
                            "'{}' is not between '{}' and '{}', inclusively",
                            text,
                            Value::Float(*min),
                            Value::Float(*max)
                        ),
                    ));
                }
            }
            Validator::Digits => {
                if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
                    failures.push(RuleFailure::new(
                        "notDigits",
                        format!("'{}' must contain only digits", text),
                    ));
                }
            }
            Validator::Alpha => {
                if text.is_empty() || !text.chars().all(char::is_alphabetic) {
                    failures.push(RuleFailure::new(
                        "notAlpha",
                        format!("'{}' contains non alphabetic characters", text),
                    ));
                }
            }
            Validator::Alnum => {
                if text.is_empty() || !text.chars().all(char::is_alphanumeric) {
                    failures.push(RuleFailure::new(
                        "notAlnum",
                        format!(
                            "'{}' contains characters which are non alphabetic and no digits",
                            text
                        ),
                    ));
                }
            }
            Validator::Int => {
                let ok = matches!(value, Value::Int(_)) || text.trim().parse::<i64>().is_ok();
                if !ok {
                    failures.push(RuleFailure::new(
                        "notInt",
                        format!("'{}' does not appear to be an integer", text),
                    ));
                }
            }
            Validator::Float => {
                if value.to_number().is_none() {
                    failures.push(RuleFailure::new(
                        "notFloat",
                        format!("'{}' does not appear to be a float", text),
                    ));
                }
            }
            Validator::EmailAddress => {
                if !matches_pattern(&text, EMAIL_PATTERN) {
                    failures.push(RuleFailure::new(
                        "emailAddressInvalid",
                        format!("'{}' is not a valid email address", text),
                    ));
                }
            }
            Validator::Regex(pattern) => {
                if !matches_pattern(&text, pattern) {
                    failures.push(RuleFailure::new(
                        "regexNotMatch",
                        format!("'{}' does not match against pattern '{}'", text, pattern),
                    ));
                }
            }
            Validator::InArray(haystack) => {
                if !haystack.iter().any(|h| value.loosely_equals(h)) {
                    failures.push(RuleFailure::new(
                        "notInArray",
                        format!("'{}' was not found in the haystack", text),
                    ));
                }
            }
            Validator::Set(haystack) => {
                let outside: Vec<&str> = text
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !haystack.iter().any(|h| h == part))
                    .collect();
                if !outside.is_empty() {
                    failures.push(RuleFailure::new(
                        "notInSet",
                        format!(
                            "'{}' contains values outside the allowed set: {}",
                            text,
                            outside.join(", ")
                        ),
                    ));
                }
            }
            Validator::Filesize { max, min } => check_filesize(&text, *max, *min, failures),
            Validator::Filetype(extensions) => check_filetype(&text, extensions, failures),
            Validator::UkPostCode => {
                if !matches_pattern(text.trim(), UK_POSTCODE_PATTERN) {
                    failures.push(RuleFailure::new(
                        "postcodeInvalid",
                        format!("'{}' is not a valid UK postcode", text),
                    ));
                }
            }
        }
    }
}

fn file_path(text: &str) -> &Path {
    Path::new(text.strip_prefix('@').unwrap_or(text))
}

fn check_filesize(text: &str, max: u64, min: Option<u64>, failures: &mut Vec<RuleFailure>) {
    let Ok(meta) = std::fs::metadata(file_path(text)) else {
        failures.push(RuleFailure::new(
            "fileNotFound",
            format!("File '{}' is not readable or does not exist", text),
        ));
        return;
    };
    let size = meta.len();
    if size > max {
        failures.push(RuleFailure::new(
            "fileSizeTooBig",
            format!(
                "Maximum allowed size for file '{}' is '{}' but '{}' detected",
                text, max, size
            ),
        ));
    }
    if let Some(min) = min {
        if size < min {
            failures.push(RuleFailure::new(
                "fileSizeTooSmall",
                format!(
                    "Minimum expected size for file '{}' is '{}' but '{}' detected",
                    text, min, size
                ),
            ));
        }
    }
}

fn check_filetype(text: &str, extensions: &[String], failures: &mut Vec<RuleFailure>) {
    let path = file_path(text);
    if !path.is_file() {
        failures.push(RuleFailure::new(
            "fileNotFound",
            format!("File '{}' is not readable or does not exist", text),
        ));
        return;
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !extensions.iter().any(|allowed| *allowed == ext) {
        failures.push(RuleFailure::new(
            "fileTypeInvalid",
            format!("File '{}' has an invalid extension", text),
        ));
    }
}

fn required<'a>(spec: &RuleSpec, args: &'a [String], index: usize) -> Result<&'a String, FieldError> {
    args.get(index).ok_or_else(|| {
        FieldError::new(
            FieldErrorKind::InvalidRule,
            format!("rule '{}' expects at least {} argument(s)", spec.name, index + 1),
        )
    })
}

fn parse_arg<T: std::str::FromStr>(spec: &RuleSpec, arg: &str) -> Result<T, FieldError> {
    arg.trim().parse().map_err(|_| {
        FieldError::new(
            FieldErrorKind::InvalidRule,
            format!("invalid argument '{}' for rule '{}'", arg, spec.name),
        )
    })
}

/// Sizes accept an optional unit: `512`, `10kB`, `2MB`, `1GB`.
fn parse_size(spec: &RuleSpec, arg: &str) -> Result<u64, FieldError> {
    let arg = arg.trim();
    let split = arg
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(arg.len());
    let (number, unit) = arg.split_at(split);
    let number: f64 = parse_arg(spec, number)?;
    let factor = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "kb" | "k" => 1024.0,
        "mb" | "m" => 1024.0 * 1024.0,
        "gb" | "g" => 1024.0 * 1024.0 * 1024.0,
        _ => {
            return Err(FieldError::new(
                FieldErrorKind::InvalidRule,
                format!("invalid size unit '{}' for rule '{}'", unit, spec.name),
            ));
        }
    };
    Ok((number * factor) as u64)
}

/// Run every validator and collect all failures.
pub fn run_chain(validators: &[Validator], value: &Value) -> Vec<RuleFailure> {
    let mut failures = Vec::new();
    for validator in validators {
        validator.check(value, &mut failures);
    }
    failures
}
