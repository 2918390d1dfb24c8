// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request Router
//!
//! Sends requests to one agent, an explicit set of agents, or every agent
//! declaring a capability. Multi-agent calls are issued together and merged
//! by [`aggregation`](crate::application::aggregation).
//!
//! Only validation failures detected before any network call are returned as
//! errors. Agent failures come back as [`CallOutcome::Failure`] entries.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Reads the registry, calls agents through the transport

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::application::aggregation;
use crate::application::registry::AgentRegistry;
use crate::domain::agent::{AgentRecord, HealthState};
use crate::domain::error::CoordinatorError;
use crate::domain::events::RoutingEvent;
use crate::domain::gateway_config::{RoutingSettings, WorkflowEndpoint};
use crate::domain::routing::{
    millis, AgentResponse, AggregatedResult, CallOutcome, CallSpec, DedupKey, FailureKind,
    HttpMethod, RouteOutcome, RoutedRequest, SearchRequest, SearchResult, TargetSelector,
};
use crate::domain::transport::{AgentTransport, TransportRequest};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Per-call timeout when the call spec gives none
    pub default_timeout: Duration,
    pub search: WorkflowEndpoint,
    pub handoff: WorkflowEndpoint,
    /// Merge identity when the request gives none
    pub dedup_key: DedupKey,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from(&RoutingSettings::default())
    }
}

impl From<&RoutingSettings> for RouterConfig {
    fn from(settings: &RoutingSettings) -> Self {
        let dedup_key = if settings.dedup_fields.is_empty() {
            DedupKey::Structural
        } else {
            DedupKey::Fields(settings.dedup_fields.clone())
        };
        Self {
            default_timeout: settings.default_timeout,
            search: settings.search.clone(),
            handoff: settings.handoff.clone(),
            dedup_key,
        }
    }
}

pub struct RequestRouter {
    registry: Arc<AgentRegistry>,
    transport: Arc<dyn AgentTransport>,
    config: RouterConfig,
    event_bus: Option<EventBus>,
}

impl RequestRouter {
    pub fn new(
        registry: Arc<AgentRegistry>,
        transport: Arc<dyn AgentTransport>,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            config,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Call one agent regardless of its health.
    pub async fn route_to_agent(
        &self,
        name: &str,
        call: &CallSpec,
    ) -> Result<AgentResponse, CoordinatorError> {
        call.validate()?;
        validate_name(name)?;
        let record = self.registry.get(name)?;

        let started = Instant::now();
        let response = self.call_agent(&record, call).await;
        self.publish_routed(
            uuid::Uuid::new_v4(),
            call,
            std::slice::from_ref(&response),
            started,
        );

        Ok(response)
    }

    /// Call every named agent concurrently; responses follow request order.
    ///
    /// Repeated names are called once. All names are resolved before any
    /// call is made.
    pub async fn route_to_agents(
        &self,
        names: &[String],
        call: &CallSpec,
    ) -> Result<AggregatedResult, CoordinatorError> {
        self.route_to_agents_with_key(names, call, &self.config.dedup_key)
            .await
    }

    async fn route_to_agents_with_key(
        &self,
        names: &[String],
        call: &CallSpec,
        dedup_key: &DedupKey,
    ) -> Result<AggregatedResult, CoordinatorError> {
        call.validate()?;
        if names.is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "at least one agent name is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(names.len());
        for name in names {
            validate_name(name)?;
            if seen.insert(name.as_str()) {
                records.push(self.registry.get(name)?);
            }
        }

        Ok(self.fan_out(&records, call, dedup_key).await)
    }

    /// Call every agent declaring `capability`.
    ///
    /// With `skip_unhealthy` only agents currently `Healthy` are called. No
    /// matching agent yields an empty result, not an error.
    pub async fn route_by_capability(
        &self,
        capability: &str,
        call: &CallSpec,
        skip_unhealthy: bool,
    ) -> Result<AggregatedResult, CoordinatorError> {
        self.route_by_capability_with_key(capability, call, skip_unhealthy, &self.config.dedup_key)
            .await
    }

    async fn route_by_capability_with_key(
        &self,
        capability: &str,
        call: &CallSpec,
        skip_unhealthy: bool,
        dedup_key: &DedupKey,
    ) -> Result<AggregatedResult, CoordinatorError> {
        call.validate()?;

        match self.select_capability(capability, skip_unhealthy) {
            Ok(records) => Ok(self.fan_out(&records, call, dedup_key).await),
            Err(CoordinatorError::NoAgentsForCapability(capability)) => {
                warn!(
                    capability = %capability,
                    skip_unhealthy,
                    "No agents available for capability; returning empty result"
                );
                Ok(AggregatedResult::empty())
            }
            Err(e) => Err(e),
        }
    }

    fn select_capability(
        &self,
        capability: &str,
        skip_unhealthy: bool,
    ) -> Result<Vec<Arc<AgentRecord>>, CoordinatorError> {
        if capability.trim().is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "capability cannot be empty".to_string(),
            ));
        }

        let state = skip_unhealthy.then_some(HealthState::Healthy);
        let records = self.registry.list(Some(capability), state);
        if records.is_empty() {
            return Err(CoordinatorError::NoAgentsForCapability(
                capability.to_string(),
            ));
        }
        Ok(records)
    }

    /// Dispatch a complete [`RoutedRequest`].
    pub async fn route(&self, request: &RoutedRequest) -> Result<RouteOutcome, CoordinatorError> {
        let dedup_key = request
            .dedup_key
            .as_ref()
            .unwrap_or(&self.config.dedup_key);

        match &request.target {
            TargetSelector::Agent(name) => self
                .route_to_agent(name, &request.call)
                .await
                .map(RouteOutcome::Single),
            TargetSelector::Agents(names) => self
                .route_to_agents_with_key(names, &request.call, dedup_key)
                .await
                .map(RouteOutcome::Aggregated),
            TargetSelector::Capability {
                capability,
                skip_unhealthy,
            } => self
                .route_by_capability_with_key(capability, &request.call, *skip_unhealthy, dedup_key)
                .await
                .map(RouteOutcome::Aggregated),
        }
    }

    /// Distributed search over every healthy agent with the search capability.
    pub async fn route_search(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResult, CoordinatorError> {
        request.validate()?;

        let capability = request
            .capability
            .as_deref()
            .unwrap_or(&self.config.search.capability);
        let call = CallSpec::new(HttpMethod::Post, self.config.search.endpoint.clone())
            .with_payload(request.agent_payload());

        let aggregated = self.route_by_capability(capability, &call, true).await?;

        let agents_queried = aggregated.agent_names();
        let total_found = aggregated.results.len();
        let mut results = aggregated.results;
        if let Some(limit) = request.limit {
            results.truncate(limit);
        }

        info!(
            request_id = %aggregated.request_id,
            capability,
            agents = agents_queried.len(),
            total_found,
            returned = results.len(),
            "Distributed search completed"
        );

        Ok(SearchResult {
            request_id: aggregated.request_id,
            results,
            total_found,
            agents_queried,
            successful_count: aggregated.successful_count,
            failed_count: aggregated.failed_count,
            responses: aggregated.responses,
        })
    }

    /// Hand a payload to one agent's handoff endpoint.
    ///
    /// The target must declare the configured handoff capability.
    pub async fn route_handoff(
        &self,
        target: &str,
        payload: Value,
    ) -> Result<AgentResponse, CoordinatorError> {
        if !payload.is_object() {
            return Err(CoordinatorError::InvalidRequest(
                "handoff payload must be a JSON object".to_string(),
            ));
        }
        validate_name(target)?;

        let record = self.registry.get(target)?;
        let capability = &self.config.handoff.capability;
        if !record.descriptor.has_capability(capability) {
            return Err(CoordinatorError::InvalidRequest(format!(
                "agent '{}' does not declare the '{}' capability required for handoff (declares: {})",
                target, capability, record.descriptor.capabilities
            )));
        }

        let call = CallSpec::new(HttpMethod::Post, self.config.handoff.endpoint.clone())
            .with_payload(payload);
        self.route_to_agent(target, &call).await
    }

    async fn fan_out(
        &self,
        records: &[Arc<AgentRecord>],
        call: &CallSpec,
        dedup_key: &DedupKey,
    ) -> AggregatedResult {
        let started = Instant::now();
        let responses = join_all(records.iter().map(|record| self.call_agent(record, call))).await;

        let result = aggregation::aggregate(responses, dedup_key);
        self.publish_routed(result.request_id, call, &result.responses, started);
        debug!(
            request_id = %result.request_id,
            endpoint = %call.endpoint,
            successful = result.successful_count,
            failed = result.failed_count,
            merged = result.results.len(),
            "Fan-out completed"
        );
        result
    }

    async fn call_agent(&self, record: &AgentRecord, call: &CallSpec) -> AgentResponse {
        let timeout = call.timeout.unwrap_or(self.config.default_timeout);
        let request = TransportRequest {
            url: record.descriptor.endpoint_url(&call.endpoint),
            method: call.method,
            payload: call.payload.clone(),
            timeout,
        };

        let outcome = tokio::time::timeout(timeout, self.transport.send(&request))
            .await
            .unwrap_or_else(|_| CallOutcome::timeout(timeout));

        let label = match &outcome {
            CallOutcome::Success { .. } => "success",
            CallOutcome::Failure { kind, message, .. } => {
                debug!(
                    agent = record.name(),
                    method = %call.method,
                    endpoint = %call.endpoint,
                    "Agent call failed: {}",
                    message
                );
                match kind {
                    FailureKind::Timeout => "timeout",
                    FailureKind::Unavailable => "unavailable",
                    FailureKind::HttpStatus => "http_status",
                }
            }
        };
        metrics::counter!(
            "hiregate_agent_calls_total",
            "agent" => record.name().to_string(),
            "outcome" => label
        )
        .increment(1);

        AgentResponse::new(record.name(), outcome)
    }

    fn publish_routed(
        &self,
        request_id: uuid::Uuid,
        call: &CallSpec,
        responses: &[AgentResponse],
        started: Instant,
    ) {
        let Some(bus) = &self.event_bus else {
            return;
        };
        let successful_count = responses.iter().filter(|r| r.is_success()).count();
        bus.publish_routing_event(RoutingEvent::RequestRouted {
            request_id,
            endpoint: call.endpoint.clone(),
            agents: responses.iter().map(|r| r.agent_name.clone()).collect(),
            successful_count,
            failed_count: responses.len() - successful_count,
            duration_ms: millis(started.elapsed()),
            routed_at: Utc::now(),
        });
    }
}

fn validate_name(name: &str) -> Result<(), CoordinatorError> {
    if name.trim().is_empty() {
        return Err(CoordinatorError::InvalidRequest(
            "agent name cannot be empty".to_string(),
        ));
    }
    Ok(())
}
