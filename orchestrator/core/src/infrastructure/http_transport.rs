// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// HTTP Agent Transport
//
// Anti-Corruption Layer between the router/monitor and worker agents.
// One pooled reqwest client is shared by every call; each request carries
// its own timeout. Bodies are read up to a byte cap. Every failure mode is
// folded into a CallOutcome.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

use crate::domain::gateway_config::RoutingSettings;
use crate::domain::routing::{CallOutcome, FailureKind, HttpMethod};
use crate::domain::transport::{AgentTransport, TransportRequest};

/// Body cap used by [`HttpAgentTransport::new`].
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct HttpAgentTransport {
    client: reqwest::Client,
    max_response_bytes: usize,
}

impl HttpAgentTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }

    /// Build the shared client from routing settings.
    pub fn from_settings(settings: &RoutingSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .connect_timeout(settings.connect_timeout)
            .user_agent(concat!("hiregate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(client).with_max_response_bytes(settings.max_response_bytes))
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    fn translate_error(error: reqwest::Error, timeout: Duration) -> CallOutcome {
        if error.is_timeout() {
            CallOutcome::timeout(timeout)
        } else if error.is_connect() {
            CallOutcome::unavailable(format!("connection failed: {}", error))
        } else {
            CallOutcome::unavailable(error.to_string())
        }
    }

    fn oversized(&self, status: u16) -> CallOutcome {
        CallOutcome::Failure {
            kind: FailureKind::Unavailable,
            status_code: Some(status),
            body: None,
            message: format!(
                "response body exceeds {} bytes",
                self.max_response_bytes
            ),
        }
    }

    /// Read the body chunk by chunk, giving up once the cap is passed.
    async fn read_body(
        &self,
        mut response: reqwest::Response,
        timeout: Duration,
    ) -> Result<Vec<u8>, CallOutcome> {
        let status = response.status().as_u16();
        let limit = u64::try_from(self.max_response_bytes).unwrap_or(u64::MAX);
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(self.oversized(status));
        }

        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > self.max_response_bytes {
                        return Err(self.oversized(status));
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => return Ok(body),
                Err(e) => return Err(Self::translate_error(e, timeout)),
            }
        }
    }
}

/// Flat object payload as query pairs; nulls are dropped.
fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = payload else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key.clone(), s.clone())),
            other => Some((key.clone(), other.to_string())),
        })
        .collect()
}

/// JSON when the body parses as JSON, text otherwise, `None` when empty.
fn parse_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn send(&self, request: &TransportRequest) -> CallOutcome {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url)
            .timeout(request.timeout);

        if let Some(payload) = request.payload.as_ref().filter(|p| !p.is_null()) {
            builder = if request.method.sends_query() {
                builder.query(&query_pairs(payload))
            } else {
                builder.json(payload)
            };
        }

        trace!(method = %request.method, url = %request.url, "Sending agent request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Self::translate_error(e, request.timeout),
        };

        let status = response.status().as_u16();
        match self.read_body(response, request.timeout).await {
            Ok(bytes) => CallOutcome::from_status(status, parse_body(&bytes)),
            Err(outcome) => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs() {
        let pairs = query_pairs(&json!({"q": "rust", "limit": 5, "remote": true, "skip": null}));
        assert_eq!(pairs.len(), 3);
        assert!(pairs.contains(&("q".to_string(), "rust".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "5".to_string())));
        assert!(pairs.contains(&("remote".to_string(), "true".to_string())));
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b""), None);
        assert_eq!(parse_body(b"  \n"), None);
        assert_eq!(parse_body(br#"{"ok":true}"#), Some(json!({"ok": true})));
        assert_eq!(parse_body(b"OK"), Some(json!("OK")));
    }
}
