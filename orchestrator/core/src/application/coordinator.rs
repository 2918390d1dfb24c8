// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Coordinator Service
//!
//! In-process facade over the registry, health monitor and router. The HTTP
//! API and the CLI's embedded mode both go through this type.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Request/response operations and wiring from configuration

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::health_monitor::{HealthMonitor, HealthMonitorConfig, StatusSummary};
use crate::application::registry::AgentRegistry;
use crate::application::router::{RequestRouter, RouterConfig};
use crate::domain::agent::{AgentRecord, HealthHistoryEntry, HealthState};
use crate::domain::error::CoordinatorError;
use crate::domain::gateway_config::GatewayConfig;
use crate::domain::routing::{
    AgentResponse, AggregatedResult, CallSpec, DedupKey, HttpMethod, RouteOutcome, RoutedRequest,
    SearchRequest, SearchResult, TargetSelector,
};
use crate::domain::transport::AgentTransport;
use crate::infrastructure::event_bus::{EventBus, EventReceiver};
use crate::infrastructure::http_transport::HttpAgentTransport;

/// Public view of one registered agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    pub base_url: String,
    pub purpose: String,
    pub capabilities: Vec<String>,
    pub health_path: String,
    pub state: HealthState,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_latency_ms: Option<u64>,
    pub consecutive_failures: u32,
}

impl From<&AgentRecord> for AgentSummary {
    fn from(record: &AgentRecord) -> Self {
        let descriptor = &record.descriptor;
        Self {
            name: descriptor.name.clone(),
            base_url: descriptor.base_url.clone(),
            purpose: descriptor.purpose.clone(),
            capabilities: descriptor.capabilities.iter().map(str::to_string).collect(),
            health_path: descriptor.health_path.clone(),
            state: record.current_state,
            last_checked_at: record.last_checked_at,
            last_latency_ms: record.last_latency_ms,
            consecutive_failures: record.consecutive_failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHistory {
    pub agent: String,
    pub capacity: usize,
    pub entries: Vec<HealthHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub summary: StatusSummary,
    pub monitor_running: bool,
    pub per_agent: Vec<AgentSummary>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Liveness {
    pub status: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullHealth {
    pub gateway: String,
    pub uptime_seconds: u64,
    pub agents: HealthReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub agent_count: usize,
    pub generation: u64,
}

/// Body of `POST /api/call`: exactly one of `agent` or `agents`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallAgentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<String>>,

    pub endpoint: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<DedupKey>,
}

impl CallAgentRequest {
    pub fn into_routed(self) -> Result<RoutedRequest, CoordinatorError> {
        let target = match (self.agent, self.agents) {
            (Some(agent), None) => TargetSelector::Agent(agent),
            (None, Some(agents)) => TargetSelector::Agents(agents),
            _ => {
                return Err(CoordinatorError::InvalidRequest(
                    "exactly one of 'agent' or 'agents' must be given".to_string(),
                ))
            }
        };

        Ok(RoutedRequest {
            target,
            call: build_call(self.method, self.endpoint, self.payload, self.timeout_ms),
            dedup_key: self.dedup_key,
        })
    }
}

/// Body of `POST /api/capabilities/{capability}/route`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRouteRequest {
    pub endpoint: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default = "default_skip_unhealthy")]
    pub skip_unhealthy: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<DedupKey>,
}

fn default_skip_unhealthy() -> bool {
    true
}

impl CapabilityRouteRequest {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            payload: None,
            timeout_ms: None,
            skip_unhealthy: true,
            dedup_key: None,
        }
    }
}

fn build_call(
    method: HttpMethod,
    endpoint: String,
    payload: Option<Value>,
    timeout_ms: Option<u64>,
) -> CallSpec {
    let mut call = CallSpec::new(method, endpoint);
    call.payload = payload;
    call.timeout = timeout_ms.map(Duration::from_millis);
    call
}

pub struct CoordinatorService {
    registry: Arc<AgentRegistry>,
    monitor: Arc<HealthMonitor>,
    router: Arc<RequestRouter>,
    event_bus: EventBus,
    shutdown_token: CancellationToken,
    started_at: Instant,
}

impl CoordinatorService {
    pub fn new(
        registry: Arc<AgentRegistry>,
        monitor: Arc<HealthMonitor>,
        router: Arc<RequestRouter>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            registry,
            monitor,
            router,
            event_bus,
            shutdown_token: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// Wire every component from configuration using the HTTP transport.
    ///
    /// The registry is discovered here; the monitor is not started.
    pub fn bootstrap(config: &GatewayConfig) -> anyhow::Result<Self> {
        let transport = HttpAgentTransport::from_settings(&config.spec.routing)
            .context("Failed to build agent HTTP client")?;
        Self::bootstrap_with_transport(config, Arc::new(transport))
    }

    pub fn bootstrap_with_transport(
        config: &GatewayConfig,
        transport: Arc<dyn AgentTransport>,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| CoordinatorError::Catalog(format!("invalid configuration: {:#}", e)))?;

        let event_bus = EventBus::with_default_capacity();

        let registry = Arc::new(
            AgentRegistry::new(config.spec.agents.clone(), config.spec.health.history_size)
                .with_event_bus(event_bus.clone()),
        );
        let agent_count = registry
            .discover()
            .context("Failed to discover agents from catalog")?;

        let monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&registry),
            Arc::clone(&transport),
            event_bus.clone(),
            HealthMonitorConfig::from(&config.spec.health),
        ));
        let router = Arc::new(
            RequestRouter::new(
                Arc::clone(&registry),
                transport,
                RouterConfig::from(&config.spec.routing),
            )
            .with_event_bus(event_bus.clone()),
        );

        info!(agent_count, gateway = %config.metadata.name, "Coordinator bootstrapped");
        Ok(Self::new(registry, monitor, router, event_bus))
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn router(&self) -> &Arc<RequestRouter> {
        &self.router
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn start_monitor(&self) -> bool {
        self.monitor.start()
    }

    /// Cancelled once the gateway starts shutting down. Long-lived responses
    /// such as the event stream end when it fires.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Signal shutdown to open streams without waiting for the monitor.
    pub fn begin_shutdown(&self) {
        self.shutdown_token.cancel();
    }

    pub async fn shutdown(&self) {
        self.begin_shutdown();
        self.monitor.stop().await;
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn liveness(&self) -> Liveness {
        Liveness {
            status: "healthy".to_string(),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    pub fn full_health(&self) -> FullHealth {
        FullHealth {
            gateway: "up".to_string(),
            uptime_seconds: self.uptime_seconds(),
            agents: self.get_health_report(),
        }
    }

    pub fn list_agents(
        &self,
        capability: Option<&str>,
        status: Option<HealthState>,
    ) -> Vec<AgentSummary> {
        self.registry
            .list(capability, status)
            .iter()
            .map(|record| AgentSummary::from(record.as_ref()))
            .collect()
    }

    pub fn get_agent(&self, name: &str) -> Result<AgentSummary, CoordinatorError> {
        self.registry
            .get(name)
            .map(|record| AgentSummary::from(record.as_ref()))
    }

    pub fn agent_history(&self, name: &str) -> Result<AgentHistory, CoordinatorError> {
        Ok(AgentHistory {
            agent: name.to_string(),
            capacity: self.registry.history_size(),
            entries: self.registry.history(name)?,
        })
    }

    pub async fn check_agent(&self, name: &str) -> Result<AgentSummary, CoordinatorError> {
        let record = self.monitor.check_agent(name).await?;
        Ok(AgentSummary::from(record.as_ref()))
    }

    pub fn get_health_report(&self) -> HealthReport {
        HealthReport {
            summary: self.monitor.get_status_summary(),
            monitor_running: self.monitor.is_running(),
            per_agent: self.list_agents(None, None),
            generated_at: Utc::now(),
        }
    }

    pub fn critical_agents(&self) -> Vec<AgentSummary> {
        self.monitor
            .get_critical_agents()
            .iter()
            .map(|record| AgentSummary::from(record.as_ref()))
            .collect()
    }

    pub async fn call_agent(
        &self,
        request: CallAgentRequest,
    ) -> Result<RouteOutcome, CoordinatorError> {
        let routed = request.into_routed()?;
        self.router.route(&routed).await
    }

    pub async fn search_multi(
        &self,
        request: SearchRequest,
    ) -> Result<SearchResult, CoordinatorError> {
        self.router.route_search(&request).await
    }

    pub async fn route_by_capability(
        &self,
        capability: &str,
        request: CapabilityRouteRequest,
    ) -> Result<AggregatedResult, CoordinatorError> {
        let routed = RoutedRequest {
            target: TargetSelector::Capability {
                capability: capability.to_string(),
                skip_unhealthy: request.skip_unhealthy,
            },
            call: build_call(
                request.method,
                request.endpoint,
                request.payload,
                request.timeout_ms,
            ),
            dedup_key: request.dedup_key,
        };

        match self.router.route(&routed).await? {
            RouteOutcome::Aggregated(result) => Ok(result),
            RouteOutcome::Single(response) => Ok(crate::application::aggregation::aggregate(
                vec![response],
                routed.dedup_key.as_ref().unwrap_or(&self.router.config().dedup_key),
            )),
        }
    }

    pub async fn handoff(
        &self,
        target: &str,
        payload: Value,
    ) -> Result<AgentResponse, CoordinatorError> {
        self.router.route_handoff(target, payload).await
    }

    /// Rebuild the registry from the catalog, discarding all health data.
    pub fn rediscover(&self) -> Result<DiscoverResponse, CoordinatorError> {
        let agent_count = self.registry.discover()?;
        Ok(DiscoverResponse {
            agent_count,
            generation: self.registry.generation(),
        })
    }

    pub fn subscribe_events(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::AgentCatalog;
    use crate::domain::routing::CallOutcome;
    use crate::domain::transport::TransportRequest;
    use async_trait::async_trait;
    use serde_json::json;

    struct OkTransport;

    #[async_trait]
    impl AgentTransport for OkTransport {
        async fn send(&self, _request: &TransportRequest) -> CallOutcome {
            CallOutcome::from_status(200, Some(json!({"results": [{"id": 1}]})))
        }
    }

    fn service() -> CoordinatorService {
        let mut config = GatewayConfig::default();
        config.spec.agents = AgentCatalog::default()
            .with_agent("alpha", 9001, "a", ["search"])
            .with_agent("beta", 9002, "b", ["screening"]);
        CoordinatorService::bootstrap_with_transport(&config, Arc::new(OkTransport)).unwrap()
    }

    #[test]
    fn test_bootstrap_discovers_catalog() {
        let service = service();
        let agents = service.list_agents(None, None);
        assert_eq!(agents.len(), 2);
        assert!(agents.iter().all(|a| a.state == HealthState::Unknown));
        assert!(!service.get_health_report().monitor_running);
    }

    #[test]
    fn test_bootstrap_fails_on_bad_catalog() {
        let mut config = GatewayConfig::default();
        config.spec.agents = AgentCatalog::default()
            .with_agent("alpha", 9001, "a", ["search"])
            .with_agent("alpha", 9002, "b", ["search"]);
        assert!(CoordinatorService::bootstrap_with_transport(&config, Arc::new(OkTransport)).is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_invalid_settings() {
        let mut config = GatewayConfig::default();
        config.spec.agents = AgentCatalog::default().with_agent("alpha", 9001, "a", ["search"]);
        config.spec.health.interval = Duration::ZERO;

        let err = CoordinatorService::bootstrap_with_transport(&config, Arc::new(OkTransport))
            .err()
            .unwrap();
        match err.downcast_ref::<CoordinatorError>() {
            Some(CoordinatorError::Catalog(message)) => {
                assert!(message.contains("interval"), "{message}");
            }
            other => panic!("expected a catalog error, got {:?}", other),
        }

        config.spec.health.interval = Duration::from_secs(30);
        config.spec.routing.default_timeout = Duration::ZERO;
        assert!(CoordinatorService::bootstrap(&config).is_err());
    }

    #[test]
    fn test_call_request_needs_one_target() {
        let request = CallAgentRequest {
            endpoint: "/status".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            request.into_routed(),
            Err(CoordinatorError::InvalidRequest(_))
        ));

        let request = CallAgentRequest {
            agent: Some("alpha".to_string()),
            agents: Some(vec!["beta".to_string()]),
            endpoint: "/status".to_string(),
            ..Default::default()
        };
        assert!(request.into_routed().is_err());
    }

    #[tokio::test]
    async fn test_check_agent_updates_report() {
        let service = service();
        let summary = service.check_agent("beta").await.unwrap();
        assert_eq!(summary.state, HealthState::Healthy);

        let report = service.get_health_report();
        assert_eq!(report.summary.healthy, 1);
        assert_eq!(report.summary.unknown, 1);
        assert_eq!(service.agent_history("beta").unwrap().entries.len(), 1);
        assert!(service.critical_agents().is_empty());
    }

    #[tokio::test]
    async fn test_capability_route_opt_out_of_health_filter() {
        let service = service();

        let result = service
            .route_by_capability("search", CapabilityRouteRequest::new(HttpMethod::Get, "/jobs"))
            .await
            .unwrap();
        assert!(result.responses.is_empty());

        let mut request = CapabilityRouteRequest::new(HttpMethod::Get, "/jobs");
        request.skip_unhealthy = false;
        let result = service.route_by_capability("search", request).await.unwrap();
        assert_eq!(result.successful_count, 1);
        assert_eq!(result.results, vec![json!({"id": 1})]);
    }

    #[test]
    fn test_rediscover_bumps_generation() {
        let service = service();
        let response = service.rediscover().unwrap();
        assert_eq!(response.agent_count, 2);
        assert_eq!(response.generation, 2);
    }
}
