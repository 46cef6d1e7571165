//! Parsing of rule lists such as `"StringLength[0,200] NotEmpty Regex(/^[a-z]+$/i)"`.
//!
//! A rule list is whitespace separated. Each token is a bare name or a name
//! followed by an argument list in parentheses or square brackets. Brackets
//! nest, so regex patterns with character classes survive intact.

use crate::error::{FieldError, FieldErrorKind};

/// One parsed rule token: the registry name plus its raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub name: String,
    /// Raw text between the delimiters, if any
    pub raw_args: Option<String>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_args: None,
        }
    }

    pub fn with_args(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_args: Some(args.into()),
        }
    }

    /// Comma separated arguments, trimmed, with surrounding quotes removed.
    pub fn args(&self) -> Vec<String> {
        match &self.raw_args {
            None => Vec::new(),
            Some(raw) if raw.trim().is_empty() => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(|a| a.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
                .collect(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Parse a whitespace separated rule list.
pub fn parse_rules(spec: &str) -> Result<Vec<RuleSpec>, FieldError> {
    let mut rules = Vec::new();
    for token in split_tokens(spec)? {
        rules.push(parse_token(&token)?);
    }
    Ok(rules)
}

fn split_tokens(spec: &str) -> Result<Vec<String>, FieldError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in spec.chars() {
        match ch {
            '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    FieldError::new(
                        FieldErrorKind::InvalidRule,
                        format!("unbalanced '{}' in rule list '{}'", ch, spec),
                    )
                })?;
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if depth != 0 {
        return Err(FieldError::new(
            FieldErrorKind::InvalidRule,
            format!("unterminated argument list in rule list '{}'", spec),
        ));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_token(token: &str) -> Result<RuleSpec, FieldError> {
    let Some(open) = token.find(['(', '[']) else {
        return Ok(RuleSpec::new(token));
    };

    let name = &token[..open];
    let close = match token.as_bytes()[open] {
        b'(' => ')',
        _ => ']',
    };
    if name.is_empty() || !token.ends_with(close) {
        return Err(FieldError::new(
            FieldErrorKind::InvalidRule,
            format!("malformed rule token '{}'", token),
        ));
    }

    Ok(RuleSpec::with_args(name, &token[open + 1..token.len() - 1]))
}
