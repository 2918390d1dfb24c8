// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::HealthState;

/// Events emitted by the health monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HealthEvent {
    /// An agent's health state differs from the previous probe.
    AgentStateChanged {
        agent: String,
        previous: HealthState,
        current: HealthState,
        consecutive_failures: u32,
        changed_at: DateTime<Utc>,
    },
    /// One full probe cycle finished and its results were applied.
    HealthCycleCompleted {
        cycle: u64,
        healthy: usize,
        unhealthy: usize,
        unreachable: usize,
        unknown: usize,
        duration_ms: u64,
        completed_at: DateTime<Utc>,
    },
    /// Probe results from a cycle were dropped because the registry was
    /// re-populated while the cycle was in flight.
    HealthCycleDiscarded {
        cycle: u64,
        discarded_at: DateTime<Utc>,
    },
}

impl HealthEvent {
    /// Agent the event is about, if it concerns a single agent.
    pub fn agent(&self) -> Option<&str> {
        match self {
            HealthEvent::AgentStateChanged { agent, .. } => Some(agent),
            _ => None,
        }
    }
}

/// Events emitted by the agent registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    AgentsDiscovered {
        agent_count: usize,
        generation: u64,
        discovered_at: DateTime<Utc>,
    },
}

/// Events emitted by the request router after a routed call completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoutingEvent {
    RequestRouted {
        request_id: Uuid,
        endpoint: String,
        agents: Vec<String>,
        successful_count: usize,
        failed_count: usize,
        duration_ms: u64,
        routed_at: DateTime<Utc>,
    },
}

impl RoutingEvent {
    pub fn involves(&self, agent_name: &str) -> bool {
        match self {
            RoutingEvent::RequestRouted { agents, .. } => agents.iter().any(|a| a == agent_name),
        }
    }
}
