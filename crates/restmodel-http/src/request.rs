//! Outgoing request description.
//!
//! A [`Request`] is plain data: method, base path, ordered URL segments,
//! query parameters, body parameters and cookies. Gateways turn it into a
//! transport call.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;
use url::form_urlencoded::byte_serialize;

use restmodel_core::error::{GatewayError, GatewayErrorKind};
use restmodel_core::{Value, Values};

/// HTTP methods a request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Methods that send the `payload` form field.
    pub const fn has_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(GatewayError::new(
                GatewayErrorKind::UnsupportedMethod,
                format!("a valid HTTP method is required, got '{}'", other),
            )),
        }
    }
}

/// A request to the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    method: Method,
    path: String,
    url_params: Vec<String>,
    get_params: Vec<(String, String)>,
    post_params: Values,
    cookies: BTreeMap<String, String>,
    single_record: bool,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::Get,
            path: "/".to_string(),
            url_params: Vec::new(),
            get_params: Vec::new(),
            post_params: Values::new(),
            cookies: BTreeMap::new(),
            single_record: true,
        }
    }
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get() -> Self {
        Self::new()
    }

    pub fn post() -> Self {
        Self::new().with_method(Method::Post)
    }

    pub fn put() -> Self {
        Self::new().with_method(Method::Put)
    }

    pub fn delete() -> Self {
        Self::new().with_method(Method::Delete)
    }

    // ==================== Method ====================

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the method from its name (any case).
    pub fn set_method(&mut self, method: &str) -> Result<&mut Self, GatewayError> {
        self.method = method.parse()?;
        Ok(self)
    }

    // ==================== Path ====================

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Set the base path; trailing slashes are dropped.
    pub fn set_path(&mut self, path: impl AsRef<str>) -> &mut Self {
        self.path = path.as_ref().trim_end_matches('/').to_string();
        self
    }

    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.set_path(path);
        self
    }

    // ==================== URL segments ====================

    pub fn url_params(&self) -> &[String] {
        &self.url_params
    }

    pub fn add_url_param(&mut self, segment: impl Into<String>) -> &mut Self {
        self.url_params.push(segment.into());
        self
    }

    pub fn with_url_param(mut self, segment: impl Into<String>) -> Self {
        self.add_url_param(segment);
        self
    }

    pub fn set_url_params(&mut self, segments: Vec<String>) -> &mut Self {
        self.url_params = segments;
        self
    }

    // ==================== Query parameters ====================

    pub fn get_params(&self) -> &[(String, String)] {
        &self.get_params
    }

    pub fn has_get_params(&self) -> bool {
        !self.get_params.is_empty()
    }

    /// Add a query parameter; an existing key keeps its position.
    pub fn add_get_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let (key, value) = (key.into(), value.into());
        match self.get_params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.get_params.push((key, value)),
        }
        self
    }

    pub fn with_get_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_get_param(key, value);
        self
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.get_params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_get_param(&mut self, key: &str) -> Option<String> {
        let index = self.get_params.iter().position(|(k, _)| k == key)?;
        Some(self.get_params.remove(index).1)
    }

    // ==================== Body parameters ====================

    pub fn post_params(&self) -> &Values {
        &self.post_params
    }

    pub fn has_post_params(&self) -> bool {
        !self.post_params.is_empty()
    }

    pub fn set_post_params(&mut self, params: Values) -> &mut Self {
        self.post_params = params;
        self
    }

    pub fn with_post_params(mut self, params: Values) -> Self {
        self.post_params = params;
        self
    }

    pub fn add_post_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.post_params.insert(key.into(), value.into());
        self
    }

    pub fn post_param(&self, key: &str) -> Option<&Value> {
        self.post_params.get(key)
    }

    pub fn remove_post_param(&mut self, key: &str) -> Option<Value> {
        self.post_params.shift_remove(key)
    }

    // ==================== Cookies ====================

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_cookie(name, value);
        self
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn remove_cookie(&mut self, name: &str) -> Option<String> {
        self.cookies.remove(name)
    }

    // ==================== Cardinality ====================

    /// Whether the response should carry one record rather than a collection.
    pub fn single_record(&self) -> bool {
        self.single_record
    }

    pub fn set_single_record(&mut self, single: bool) -> &mut Self {
        self.single_record = single;
        self
    }

    pub fn with_single_record(mut self, single: bool) -> Self {
        self.single_record = single;
        self
    }

    /// Full URL: base path, encoded segments, then the query string.
    ///
    /// A base without a scheme is treated as `http://`.
    pub fn url(&self) -> Result<String, GatewayError> {
        let base = if self.path.contains("://") {
            self.path.clone()
        } else {
            format!("http://{}", self.path.trim_start_matches('/'))
        };
        let mut url = Url::parse(&base).map_err(|e| GatewayError {
            kind: GatewayErrorKind::InvalidUrl,
            message: format!("'{}' is not a valid base URL: {}", self.path, e),
            source: Some(Box::new(e)),
        })?;

        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                GatewayError::new(
                    GatewayErrorKind::InvalidUrl,
                    format!("'{}' cannot carry path segments", self.path),
                )
            })?;
            segments.pop_if_empty();
            segments.extend(self.url_params.iter().filter(|s| !s.is_empty()));
        }

        if self.get_params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(self.get_params.iter());
        }
        Ok(url.into())
    }
}

fn encode(text: &str) -> String {
    byte_serialize(text.as_bytes()).collect()
}

/// Curl-like rendering: `GET http://h/p?x=1 -d k=v -b c=v`.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for segment in self.url_params.iter().filter(|s| !s.is_empty()) {
            write!(f, "/{}", encode(segment))?;
        }
        for (i, (key, value)) in self.get_params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, encode(value))?;
        }
        for (key, value) in &self.post_params {
            write!(f, " -d {}={}", key, encode(&value.to_text()))?;
        }
        for (key, value) in &self.cookies {
            write!(f, " -b {}={}", key, encode(value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let request = Request::new();
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/");
        assert!(request.single_record());
    }

    #[test]
    fn methods_parse_in_any_case() {
        assert_eq!("put".parse::<Method>().unwrap(), Method::Put);
        assert_eq!("Delete".parse::<Method>().unwrap(), Method::Delete);

        let mut request = Request::new();
        let err = request.set_method("PATCH").unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::UnsupportedMethod);
        assert_eq!(request.method(), Method::Get);
    }

    #[test]
    fn set_path_trims_trailing_slashes() {
        let mut request = Request::new();
        request.set_path("http://api.example.com/v1//");
        assert_eq!(request.path(), "http://api.example.com/v1");
    }

    #[test]
    fn url_encodes_segments_and_query() {
        let request = Request::new()
            .with_path("api.example.com/v1/")
            .with_url_param("people")
            .with_url_param("a b")
            .with_get_param("id", "5")
            .with_get_param("q", "x&y");
        assert_eq!(
            request.url().unwrap(),
            "http://api.example.com/v1/people/a%20b?id=5&q=x%26y"
        );
    }

    #[test]
    fn url_without_params() {
        let request = Request::new().with_path("https://h.example").with_url_param("person");
        assert_eq!(request.url().unwrap(), "https://h.example/person");
    }

    #[test]
    fn get_params_keep_insertion_order() {
        let mut request = Request::new();
        request.add_get_param("search", "search");
        request.add_get_param("name", "Ada");
        request.add_get_param("search", "again");
        assert_eq!(request.get_param("search"), Some("again"));
        assert_eq!(request.get_params()[1].0, "name");
        assert_eq!(request.remove_get_param("name").as_deref(), Some("Ada"));
        assert!(request.get_param("name").is_none());
    }

    #[test]
    fn display_is_curl_like() {
        let request = Request::post()
            .with_path("http://h")
            .with_url_param("p")
            .with_get_param("x", "1")
            .with_cookie("c", "v");
        let mut request = request;
        request.add_post_param("k", "v");
        assert_eq!(request.to_string(), "POST http://h/p?x=1 -d k=v -b c=v");
    }

    #[test]
    fn serde_round_trip_preserves_equality() {
        let mut request = Request::put().with_path("http://h").with_url_param("person");
        request.add_post_param("name", "Ada");
        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
