// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command backend: a running gateway when one answers, else an embedded
//! coordinator.

use anyhow::Result;
use serde_json::Value;
use tracing::info;

use hiregate_core::application::coordinator::{
    AgentHistory, AgentSummary, CallAgentRequest, CapabilityRouteRequest, DiscoverResponse,
    FullHealth, HealthReport,
};
use hiregate_core::domain::agent::HealthState;
use hiregate_core::domain::routing::{
    AgentResponse, AggregatedResult, RouteOutcome, SearchRequest, SearchResult,
};
use hiregate_sdk::GatewayClient;

use crate::daemon::{check_gateway_running, GatewayStatus, GatewayTarget};
use crate::embedded::EmbeddedGateway;

pub enum Backend {
    Remote(GatewayClient),
    Embedded(EmbeddedGateway),
}

impl Backend {
    /// Prefer the gateway at `target`; embed when nothing is listening.
    pub async fn connect(target: &GatewayTarget) -> Result<Self> {
        match check_gateway_running(target).await? {
            GatewayStatus::Running { .. } => Ok(Backend::Remote(GatewayClient::new(target.base_url()))),
            GatewayStatus::Unhealthy { error } => anyhow::bail!(
                "Gateway at {} is running but unhealthy: {}",
                target.base_url(),
                error
            ),
            GatewayStatus::Stopped => {
                info!("No gateway at {}; using embedded coordinator", target.base_url());
                Ok(Backend::Embedded(
                    EmbeddedGateway::new(target.config_path.clone()).await?,
                ))
            }
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Backend::Embedded(_))
    }

    pub async fn list_agents(
        &self,
        capability: Option<&str>,
        status: Option<HealthState>,
    ) -> Result<Vec<AgentSummary>> {
        Ok(match self {
            Backend::Remote(client) => client.list_agents(capability, status).await?,
            Backend::Embedded(gateway) => gateway.service().list_agents(capability, status),
        })
    }

    pub async fn get_agent(&self, name: &str) -> Result<AgentSummary> {
        Ok(match self {
            Backend::Remote(client) => client.get_agent(name).await?,
            Backend::Embedded(gateway) => gateway.service().get_agent(name)?,
        })
    }

    pub async fn agent_history(&self, name: &str) -> Result<AgentHistory> {
        Ok(match self {
            Backend::Remote(client) => client.agent_history(name).await?,
            Backend::Embedded(gateway) => gateway.service().agent_history(name)?,
        })
    }

    pub async fn check_agent(&self, name: &str) -> Result<AgentSummary> {
        Ok(match self {
            Backend::Remote(client) => client.check_agent(name).await?,
            Backend::Embedded(gateway) => gateway.service().check_agent(name).await?,
        })
    }

    pub async fn health_report(&self) -> Result<HealthReport> {
        Ok(match self {
            Backend::Remote(client) => client.health_report().await?,
            Backend::Embedded(gateway) => gateway.service().get_health_report(),
        })
    }

    pub async fn full_health(&self) -> Result<FullHealth> {
        Ok(match self {
            Backend::Remote(client) => client.full_health().await?,
            Backend::Embedded(gateway) => gateway.service().full_health(),
        })
    }

    pub async fn critical_agents(&self) -> Result<Vec<AgentSummary>> {
        Ok(match self {
            Backend::Remote(client) => client.critical_agents().await?,
            Backend::Embedded(gateway) => gateway.service().critical_agents(),
        })
    }

    pub async fn call_agent(&self, request: CallAgentRequest) -> Result<RouteOutcome> {
        Ok(match self {
            Backend::Remote(client) => client.call_agent(&request).await?,
            Backend::Embedded(gateway) => gateway.service().call_agent(request).await?,
        })
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResult> {
        Ok(match self {
            Backend::Remote(client) => client.search(&request).await?,
            Backend::Embedded(gateway) => gateway.service().search_multi(request).await?,
        })
    }

    pub async fn route_capability(
        &self,
        capability: &str,
        request: CapabilityRouteRequest,
    ) -> Result<AggregatedResult> {
        Ok(match self {
            Backend::Remote(client) => client.route_capability(capability, &request).await?,
            Backend::Embedded(gateway) => {
                gateway
                    .service()
                    .route_by_capability(capability, request)
                    .await?
            }
        })
    }

    pub async fn handoff(&self, agent: &str, payload: Value) -> Result<AgentResponse> {
        Ok(match self {
            Backend::Remote(client) => client.handoff(agent, &payload).await?,
            Backend::Embedded(gateway) => gateway.service().handoff(agent, payload).await?,
        })
    }

    pub async fn discover(&self) -> Result<DiscoverResponse> {
        Ok(match self {
            Backend::Remote(client) => client.discover().await?,
            Backend::Embedded(gateway) => gateway.service().rediscover()?,
        })
    }
}
