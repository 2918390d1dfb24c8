// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::types::*;

#[derive(Debug, thiserror::Error)]
pub enum GatewayClientError {
    /// The gateway could not be reached or the response could not be read.
    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with an error body.
    #[error("Gateway returned {status} ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("Unexpected gateway response: {0}")]
    Decode(String),

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),
}

impl GatewayClientError {
    /// `true` when the gateway reported the agent as unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayClientError::Api { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, GatewayClientError>;

/// Client for the hiregate gateway HTTP API.
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    client: Client,
}

impl GatewayClient {
    /// Create a new client for a gateway base URL, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Apply an overall per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Base URL extended by path segments, each percent-encoded.
    fn segments_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GatewayClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<ApiErrorBody>(&bytes) {
                Ok(body) => GatewayClientError::Api {
                    status: status.as_u16(),
                    kind: body.kind,
                    message: body.error,
                },
                Err(_) => GatewayClientError::Api {
                    status: status.as_u16(),
                    kind: "unknown".to_string(),
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                },
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| GatewayClientError::Decode(e.to_string()))
    }

    /// Gateway liveness (`GET /health`).
    pub async fn health(&self) -> Result<Liveness> {
        self.execute(self.client.get(self.url("/health"))).await
    }

    /// `true` if the gateway answers its liveness endpoint.
    pub async fn is_reachable(&self) -> bool {
        self.health().await.is_ok()
    }

    pub async fn full_health(&self) -> Result<FullHealth> {
        self.execute(self.client.get(self.url("/health/full"))).await
    }

    pub async fn list_agents(
        &self,
        capability: Option<&str>,
        status: Option<HealthState>,
    ) -> Result<Vec<AgentSummary>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(capability) = capability {
            query.push(("capability", capability.to_string()));
        }
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        self.execute(self.client.get(self.url("/api/agents")).query(&query))
            .await
    }

    pub async fn get_agent(&self, name: &str) -> Result<AgentSummary> {
        let url = self.segments_url(&["api", "agents", name])?;
        self.execute(self.client.get(url)).await
    }

    pub async fn agent_history(&self, name: &str) -> Result<AgentHistory> {
        let url = self.segments_url(&["api", "agents", name, "history"])?;
        self.execute(self.client.get(url)).await
    }

    /// Trigger an immediate health probe of one agent.
    pub async fn check_agent(&self, name: &str) -> Result<AgentSummary> {
        let url = self.segments_url(&["api", "agents", name, "check"])?;
        self.execute(self.client.post(url)).await
    }

    pub async fn health_report(&self) -> Result<HealthReport> {
        self.execute(self.client.get(self.url("/api/health"))).await
    }

    pub async fn critical_agents(&self) -> Result<Vec<AgentSummary>> {
        self.execute(self.client.get(self.url("/api/health/critical")))
            .await
    }

    /// Call one agent (`agent`) or several (`agents`).
    pub async fn call_agent(&self, request: &CallAgentRequest) -> Result<RouteOutcome> {
        self.execute(self.client.post(self.url("/api/call")).json(request))
            .await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        self.execute(self.client.post(self.url("/api/search")).json(request))
            .await
    }

    pub async fn route_capability(
        &self,
        capability: &str,
        request: &CapabilityRouteRequest,
    ) -> Result<AggregatedResult> {
        let url = self.segments_url(&["api", "capabilities", capability, "route"])?;
        self.execute(self.client.post(url).json(request)).await
    }

    pub async fn handoff(&self, agent: &str, payload: &Value) -> Result<AgentResponse> {
        let url = self.segments_url(&["api", "handoff", agent])?;
        self.execute(self.client.post(url).json(payload)).await
    }

    /// Rebuild the gateway's registry from its catalog.
    pub async fn discover(&self) -> Result<DiscoverResponse> {
        self.execute(self.client.post(self.url("/api/discover"))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_agents_sends_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agents")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("capability".into(), "search".into()),
                Matcher::UrlEncoded("status".into(), "healthy".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "name": "sourcing_agent",
                    "base_url": "http://127.0.0.1:8101",
                    "purpose": "sourcing",
                    "capabilities": ["search"],
                    "health_path": "/health",
                    "state": "healthy",
                    "last_checked_at": null,
                    "last_latency_ms": 12,
                    "consecutive_failures": 0
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let client = GatewayClient::new(server.url());
        let agents = client
            .list_agents(Some("search"), Some(HealthState::Healthy))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].state, HealthState::Healthy);
    }

    #[tokio::test]
    async fn test_api_error_body_is_decoded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/agents/ghost")
            .with_status(404)
            .with_body(r#"{"error":"Agent not found: ghost","kind":"agent_not_found"}"#)
            .create_async()
            .await;

        let err = GatewayClient::new(server.url())
            .get_agent("ghost")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            GatewayClientError::Api { kind, message, .. } => {
                assert_eq!(kind, "agent_not_found");
                assert!(message.contains("ghost"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_agent_decodes_both_shapes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/call")
            .match_body(Matcher::PartialJson(json!({"agent": "alpha"})))
            .with_status(200)
            .with_body(
                r#"{"agent_name":"alpha","status_code":200,"body":{"ok":true},"error":null}"#,
            )
            .create_async()
            .await;
        server
            .mock("POST", "/api/call")
            .match_body(Matcher::PartialJson(json!({"agents": ["alpha", "beta"]})))
            .with_status(200)
            .with_body(
                json!({
                    "request_id": "6f1c3c1e-2d7a-4d55-9d41-3f4e9b7c0a11",
                    "responses": [],
                    "successful_count": 0,
                    "failed_count": 0,
                    "results": []
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GatewayClient::new(server.url());

        let single = client
            .call_agent(&CallAgentRequest {
                agent: Some("alpha".to_string()),
                endpoint: "/status".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(single, RouteOutcome::Single(ref r) if r.is_success()));

        let many = client
            .call_agent(&CallAgentRequest {
                agents: Some(vec!["alpha".to_string(), "beta".to_string()]),
                endpoint: "/status".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(many, RouteOutcome::Aggregated(_)));
    }

    #[tokio::test]
    async fn test_agent_names_are_percent_encoded() {
        let mut server = mockito::Server::new_async().await;
        let agent = server
            .mock("GET", "/api/agents/team%2Flead%20agent")
            .with_status(404)
            .with_body(r#"{"error":"Agent not found","kind":"agent_not_found"}"#)
            .create_async()
            .await;
        let handoff = server
            .mock("POST", "/gw/api/handoff/screen%3Fdebug=1")
            .with_status(400)
            .with_body(r#"{"error":"no handoff","kind":"invalid_request"}"#)
            .create_async()
            .await;

        let err = GatewayClient::new(server.url())
            .get_agent("team/lead agent")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        agent.assert_async().await;

        let err = GatewayClient::new(format!("{}/gw/", server.url()))
            .handoff("screen?debug=1", &json!({"candidate_id": "c-1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayClientError::Api { status: 400, .. }));
        handoff.assert_async().await;
    }

    #[test]
    fn test_invalid_base_url() {
        let client = GatewayClient::new("not a url");
        assert!(matches!(
            client.segments_url(&["api", "agents", "alpha"]),
            Err(GatewayClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_gateway() {
        let client = GatewayClient::new("http://127.0.0.1:9");
        assert!(!client.is_reachable().await);
        assert!(matches!(
            client.health().await,
            Err(GatewayClientError::Transport(_))
        ));
    }
}
