// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Routing Domain Types
//!
//! Request descriptions handed to the router and the per-agent / aggregated
//! results it returns. Per-agent failures are data ([`CallOutcome::Failure`]),
//! never errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::error::CoordinatorError;

/// HTTP method forwarded to a worker agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and DELETE carry their payload as query parameters.
    pub fn sends_query(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(CoordinatorError::InvalidRequest(format!(
                "unsupported HTTP method '{}'",
                other
            ))),
        }
    }
}

/// What to send to each selected agent.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    /// Endpoint path on the agent, e.g. `/search`
    pub endpoint: String,
    pub method: HttpMethod,
    pub payload: Option<Value>,
    /// Overrides the router's default per-call timeout
    pub timeout: Option<Duration>,
}

impl CallSpec {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            payload: None,
            timeout: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Structural validation performed before any network call.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() || !endpoint.starts_with('/') {
            return Err(CoordinatorError::InvalidRequest(format!(
                "endpoint must be a path starting with '/': '{}'",
                self.endpoint
            )));
        }
        if endpoint.contains("://") || endpoint.starts_with("//") {
            return Err(CoordinatorError::InvalidRequest(format!(
                "endpoint must be a relative path, not a URL: '{}'",
                self.endpoint
            )));
        }
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(CoordinatorError::InvalidRequest(
                    "timeout must be greater than zero".to_string(),
                ));
            }
        }

        match (&self.payload, self.method.sends_query()) {
            (None, _) | (Some(Value::Null), _) => Ok(()),
            (Some(Value::Object(map)), true) => {
                if map.values().any(|v| v.is_object() || v.is_array()) {
                    Err(CoordinatorError::InvalidRequest(format!(
                        "{} payload must be a flat object of query parameters",
                        self.method
                    )))
                } else {
                    Ok(())
                }
            }
            (Some(Value::Object(_)), false) | (Some(Value::Array(_)), false) => Ok(()),
            (Some(_), true) => Err(CoordinatorError::InvalidRequest(format!(
                "{} payload must be a JSON object",
                self.method
            ))),
            (Some(_), false) => Err(CoordinatorError::InvalidRequest(
                "payload must be a JSON object or array".to_string(),
            )),
        }
    }
}

/// Which agents a routed request goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    /// Exactly one agent, called regardless of its health
    Agent(String),
    /// An explicit list, called concurrently
    Agents(Vec<String>),
    /// Every agent declaring the capability
    Capability {
        capability: String,
        skip_unhealthy: bool,
    },
}

/// A complete routing request.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedRequest {
    pub target: TargetSelector,
    pub call: CallSpec,
    /// Identity used when merging list-shaped results; router default when `None`
    pub dedup_key: Option<DedupKey>,
}

/// Identity used to deduplicate merged records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "fields")]
pub enum DedupKey {
    /// First present, non-null field of the list identifies a record;
    /// records carrying none of them fall back to structural equality
    Fields(Vec<String>),
    /// Whole-record equality
    Structural,
}

impl Default for DedupKey {
    fn default() -> Self {
        DedupKey::Fields(vec!["external_id".to_string(), "id".to_string()])
    }
}

impl DedupKey {
    /// Identity string for one record.
    pub fn identity(&self, record: &Value) -> String {
        if let DedupKey::Fields(fields) = self {
            if let Value::Object(map) = record {
                for field in fields {
                    match map.get(field) {
                        Some(Value::Null) | None => continue,
                        Some(value) => return format!("{}={}", field, canonical_json(value)),
                    }
                }
            }
        }
        format!("record={}", canonical_json(record))
    }
}

/// JSON text with object keys sorted, so key order never affects identity.
/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|key| format!("{}:{}", Value::String(key.clone()), canonical_json(&map[key])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

/// Why a call to an agent failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No response within the call's timeout
    Timeout,
    /// Connection refused, DNS failure, reset, unreadable response
    Unavailable,
    /// A response arrived with a non-success status
    HttpStatus,
}

/// Tagged result of one call to one agent.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success {
        status_code: u16,
        body: Option<Value>,
    },
    Failure {
        kind: FailureKind,
        status_code: Option<u16>,
        body: Option<Value>,
        message: String,
    },
}

impl CallOutcome {
    pub fn timeout(timeout: Duration) -> Self {
        CallOutcome::Failure {
            kind: FailureKind::Timeout,
            status_code: None,
            body: None,
            message: format!("timed out after {}ms", timeout.as_millis()),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        CallOutcome::Failure {
            kind: FailureKind::Unavailable,
            status_code: None,
            body: None,
            message: message.into(),
        }
    }

    /// Classify a received HTTP response by status.
    pub fn from_status(status_code: u16, body: Option<Value>) -> Self {
        if (200..300).contains(&status_code) {
            CallOutcome::Success { status_code, body }
        } else {
            CallOutcome::Failure {
                kind: FailureKind::HttpStatus,
                status_code: Some(status_code),
                body,
                message: format!("HTTP {}", status_code),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }
}

/// Result of calling one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "AgentResponseWire", from = "AgentResponseWire")]
pub struct AgentResponse {
    pub agent_name: String,
    pub outcome: CallOutcome,
}

impl AgentResponse {
    pub fn new(agent_name: impl Into<String>, outcome: CallOutcome) -> Self {
        Self {
            agent_name: agent_name.into(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.outcome {
            CallOutcome::Success { status_code, .. } => Some(*status_code),
            CallOutcome::Failure { status_code, .. } => *status_code,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match &self.outcome {
            CallOutcome::Success { body, .. } | CallOutcome::Failure { body, .. } => body.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            CallOutcome::Success { .. } => None,
            CallOutcome::Failure { message, .. } => Some(message),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            CallOutcome::Success { .. } => None,
            CallOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Convert into `Result` for callers that want to propagate agent failures.
    pub fn into_result(self, timeout: Duration) -> Result<Option<Value>, CoordinatorError> {
        match self.outcome {
            CallOutcome::Success { body, .. } => Ok(body),
            CallOutcome::Failure {
                kind: FailureKind::Timeout,
                ..
            } => Err(CoordinatorError::AgentTimeout {
                agent: self.agent_name,
                timeout_ms: millis(timeout),
            }),
            CallOutcome::Failure { message, .. } => Err(CoordinatorError::AgentUnavailable {
                agent: self.agent_name,
                reason: message,
            }),
        }
    }
}

/// Flat wire representation of [`AgentResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AgentResponseWire {
    agent_name: String,
    status_code: Option<u16>,
    body: Option<Value>,
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<FailureKind>,
}

impl From<AgentResponse> for AgentResponseWire {
    fn from(response: AgentResponse) -> Self {
        match response.outcome {
            CallOutcome::Success { status_code, body } => Self {
                agent_name: response.agent_name,
                status_code: Some(status_code),
                body,
                error: None,
                error_kind: None,
            },
            CallOutcome::Failure {
                kind,
                status_code,
                body,
                message,
            } => Self {
                agent_name: response.agent_name,
                status_code,
                body,
                error: Some(message),
                error_kind: Some(kind),
            },
        }
    }
}

impl From<AgentResponseWire> for AgentResponse {
    fn from(wire: AgentResponseWire) -> Self {
        let outcome = match wire.error {
            None => CallOutcome::Success {
                status_code: wire.status_code.unwrap_or(200),
                body: wire.body,
            },
            Some(message) => CallOutcome::Failure {
                kind: wire.error_kind.unwrap_or(if wire.status_code.is_some() {
                    FailureKind::HttpStatus
                } else {
                    FailureKind::Unavailable
                }),
                status_code: wire.status_code,
                body: wire.body,
                message,
            },
        };
        AgentResponse {
            agent_name: wire.agent_name,
            outcome,
        }
    }
}

/// Output of a multi-agent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub request_id: Uuid,
    /// One entry per contacted agent, in request order
    pub responses: Vec<AgentResponse>,
    pub successful_count: usize,
    pub failed_count: usize,
    /// Deduplicated merge of successful list-shaped bodies
    pub results: Vec<Value>,
}

impl AggregatedResult {
    pub fn empty() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            responses: Vec::new(),
            successful_count: 0,
            failed_count: 0,
            results: Vec::new(),
        }
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.responses.iter().map(|r| r.agent_name.clone()).collect()
    }
}

/// Either outcome of [`RoutedRequest`] dispatch.
///
/// Serialized as the bare inner value; the two shapes are told apart by the
/// presence of `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteOutcome {
    Single(AgentResponse),
    Aggregated(AggregatedResult),
}

/// Distributed search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    /// Cap on merged results returned (total_found is unaffected)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Capability to fan out to; router default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,

    /// Extra filter fields forwarded verbatim to each agent
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl SearchRequest {
    /// Keys owned by the request itself; filters may not reuse them.
    pub const RESERVED_KEYS: [&'static str; 3] = ["query", "limit", "capability"];

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
            capability: None,
            filters: Map::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.query.trim().is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "search query cannot be empty".to_string(),
            ));
        }
        if self.limit == Some(0) {
            return Err(CoordinatorError::InvalidRequest(
                "search limit must be at least 1".to_string(),
            ));
        }
        if let Some(key) = Self::RESERVED_KEYS
            .iter()
            .find(|key| self.filters.contains_key(**key))
        {
            return Err(CoordinatorError::InvalidRequest(format!(
                "'{}' is a search field and cannot be used as a filter",
                key
            )));
        }
        Ok(())
    }

    /// Body forwarded to each search agent.
    pub fn agent_payload(&self) -> Value {
        let mut payload = self.filters.clone();
        payload.insert("query".to_string(), Value::String(self.query.clone()));
        if let Some(limit) = self.limit {
            payload.insert("limit".to_string(), Value::from(limit));
        }
        Value::Object(payload)
    }
}

/// Result of a distributed search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub request_id: Uuid,
    pub results: Vec<Value>,
    /// Deduplicated result count before `limit` is applied
    pub total_found: usize,
    pub agents_queried: Vec<String>,
    pub successful_count: usize,
    pub failed_count: usize,
    pub responses: Vec<AgentResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_spec_validation() {
        assert!(CallSpec::new(HttpMethod::Post, "/search")
            .with_payload(json!({"query": "rust"}))
            .validate()
            .is_ok());
        assert!(CallSpec::new(HttpMethod::Post, "search").validate().is_err());
        assert!(CallSpec::new(HttpMethod::Post, "http://evil/x").validate().is_err());
        assert!(CallSpec::new(HttpMethod::Post, "/x")
            .with_payload(json!("scalar"))
            .validate()
            .is_err());
        assert!(CallSpec::new(HttpMethod::Get, "/x")
            .with_payload(json!({"q": "rust", "page": 2}))
            .validate()
            .is_ok());
        assert!(CallSpec::new(HttpMethod::Get, "/x")
            .with_payload(json!({"nested": {"a": 1}}))
            .validate()
            .is_err());
        assert!(CallSpec::new(HttpMethod::Get, "/x")
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_search_filters_cannot_shadow_fields() {
        let mut request = SearchRequest::new("rust engineer");
        request.filters.insert("location".to_string(), json!("Berlin"));
        assert!(request.validate().is_ok());
        assert_eq!(request.agent_payload()["location"], "Berlin");

        for key in SearchRequest::RESERVED_KEYS {
            let mut request = SearchRequest::new("rust engineer");
            request.filters.insert(key.to_string(), json!("x"));
            let err = request.validate().unwrap_err();
            assert!(matches!(&err, CoordinatorError::InvalidRequest(m) if m.contains(key)));
        }

        // Duplicate keys in JSON never reach the filter map
        let parsed: Result<SearchRequest, _> =
            serde_json::from_str(r#"{"query": "a", "query": "b"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);

        let err = AgentResponse::new("alpha", CallOutcome::timeout(Duration::MAX))
            .into_result(Duration::MAX)
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::AgentTimeout { timeout_ms: u64::MAX, .. }));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_status_classification() {
        assert!(CallOutcome::from_status(204, None).is_success());
        let outcome = CallOutcome::from_status(503, None);
        assert!(matches!(
            outcome,
            CallOutcome::Failure { kind: FailureKind::HttpStatus, status_code: Some(503), .. }
        ));
    }

    #[test]
    fn test_agent_response_wire_shape() {
        let failed = AgentResponse::new("beta", CallOutcome::timeout(Duration::from_millis(250)));
        let wire = serde_json::to_value(&failed).unwrap();
        assert_eq!(wire["agent_name"], "beta");
        assert!(wire["status_code"].is_null());
        assert_eq!(wire["error"], "timed out after 250ms");
        assert_eq!(wire["error_kind"], "timeout");

        let parsed: AgentResponse = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed, failed);

        let ok = AgentResponse::new("alpha", CallOutcome::from_status(200, Some(json!([1]))));
        let wire = serde_json::to_value(&ok).unwrap();
        assert!(wire["error"].is_null());
        assert!(wire.get("error_kind").is_none());
    }

    #[test]
    fn test_into_result_maps_failure_kinds() {
        let timeout = Duration::from_secs(2);
        let err = AgentResponse::new("a", CallOutcome::timeout(timeout))
            .into_result(timeout)
            .unwrap_err();
        assert_eq!(err, CoordinatorError::AgentTimeout { agent: "a".into(), timeout_ms: 2000 });

        let err = AgentResponse::new("a", CallOutcome::unavailable("connection refused"))
            .into_result(timeout)
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::AgentUnavailable { .. }));
    }

    #[test]
    fn test_dedup_identity() {
        let key = DedupKey::default();
        assert_eq!(key.identity(&json!({"id": 1, "name": "a"})), "id=1");
        assert_eq!(
            key.identity(&json!({"external_id": "li-9", "id": 1})),
            "external_id=\"li-9\""
        );
        assert_eq!(
            key.identity(&json!({"b": 1, "a": 2})),
            key.identity(&json!({"a": 2, "b": 1}))
        );
        assert_eq!(
            DedupKey::Structural.identity(&json!({"id": 1, "x": 1})),
            "record={\"id\":1,\"x\":1}"
        );
    }

    #[test]
    fn test_search_payload_includes_filters() {
        let mut request = SearchRequest::new("rust engineer");
        request.limit = Some(10);
        request.filters.insert("location".into(), json!("Berlin"));
        let payload = request.agent_payload();
        assert_eq!(payload["query"], "rust engineer");
        assert_eq!(payload["limit"], 10);
        assert_eq!(payload["location"], "Berlin");

        let parsed: SearchRequest =
            serde_json::from_value(json!({"query": "q", "remote": true})).unwrap();
        assert_eq!(parsed.filters.get("remote"), Some(&json!(true)));
    }
}
