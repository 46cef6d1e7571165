//! Blocking HTTP transport backed by reqwest.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, multipart};
use reqwest::header::COOKIE;

use restmodel_core::error::{GatewayError, GatewayErrorKind};

use crate::config::ClientConfig;
use crate::request::Method;
use crate::transport::{Body, Transport, TransportRequest, TransportResponse};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport honoring the config's timeout and user agent.
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder().timeout(Duration::from_millis(config.timeout_ms));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| transport_error("failed to build HTTP client", e))?;
        tracing::debug!(timeout_ms = config.timeout_ms, "Built HTTP transport");
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn builder(&self, call: &TransportRequest) -> RequestBuilder {
        match call.method {
            Method::Get => self.client.get(&call.url),
            Method::Post => self.client.post(&call.url),
            Method::Put => self.client.put(&call.url),
            Method::Delete => self.client.delete(&call.url),
        }
    }
}

fn transport_error(context: &str, e: reqwest::Error) -> GatewayError {
    GatewayError {
        kind: GatewayErrorKind::Transport,
        message: format!("{}: {}", context, e),
        source: Some(Box::new(e)),
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    fn send(&mut self, call: &TransportRequest) -> Result<TransportResponse, GatewayError> {
        let mut builder = self.builder(call);
        for (name, value) in &call.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookies) = call.cookie_header() {
            builder = builder.header(COOKIE, cookies);
        }

        builder = match &call.body {
            None => builder,
            Some(Body::Form(fields)) => builder.form(fields),
            Some(Body::Multipart { fields, files }) => {
                let mut form = multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                for file in files {
                    form = form.file(file.name.clone(), &file.path).map_err(|e| GatewayError {
                        kind: GatewayErrorKind::File,
                        message: format!("unable to read '{}': {}", file.path.display(), e),
                        source: Some(Box::new(e)),
                    })?;
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .map_err(|e| transport_error("request failed", e))?;

        let status = response.status().as_u16();
        let raw_headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                format!("{}: {}", name.as_str(), String::from_utf8_lossy(value.as_bytes()))
            })
            .collect();
        let body = response
            .text()
            .map_err(|e| transport_error("failed to read response body", e))?;

        Ok(TransportResponse {
            status,
            raw_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_config() {
        let config = ClientConfig::new("people", "http://localhost:1").user_agent("restmodel-test");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.name(), "reqwest");
    }

    #[test]
    fn unreachable_hosts_are_transport_errors() {
        let config = ClientConfig::new("people", "http://127.0.0.1:9").timeout_ms(200);
        let mut transport = HttpTransport::new(&config).unwrap();
        let call = TransportRequest {
            method: Method::Get,
            url: "http://127.0.0.1:9/person".to_string(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
        };
        let err = transport.send(&call).unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Transport);
    }
}
