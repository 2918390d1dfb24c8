// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Domain Types
//!
//! Descriptor, liveness state and registry record for a worker agent.
//!
//! - [`AgentDescriptor`]: immutable identity and location, built from the catalog.
//! - [`HealthState`]: liveness classification of the most recent probe.
//! - [`AgentRecord`]: descriptor plus current health, owned by the registry.
//! - [`HealthHistoryEntry`]: one point in an agent's bounded probe history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Default path probed by the health monitor.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Explicit set of capability tags declared by an agent.
///
/// Ordered so that listings and serialized output are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    pub fn new<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(capabilities.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}

/// Immutable description of a worker agent.
///
/// Created once per discovery cycle; changing any field requires re-discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique logical name (registry key)
    pub name: String,

    /// Scheme + host + port, without trailing slash (e.g. `http://127.0.0.1:8101`)
    pub base_url: String,

    /// Free-text statement of what the agent does
    pub purpose: String,

    /// Declared capability tags
    pub capabilities: CapabilitySet,

    /// Path of the liveness endpoint
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

impl AgentDescriptor {
    /// Absolute URL for an endpoint path on this agent.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    pub fn health_url(&self) -> String {
        self.endpoint_url(&self.health_path)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

/// Liveness classification of an agent.
///
/// There is no terminal state: every probe may move an agent to any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Not probed yet in this discovery cycle
    Unknown,
    /// Latest probe returned a success status within its timeout
    Healthy,
    /// Latest probe completed with a non-success status
    Unhealthy,
    /// Latest probe timed out or could not connect
    Unreachable,
}

impl HealthState {
    pub const ALL: [HealthState; 4] = [
        HealthState::Healthy,
        HealthState::Unhealthy,
        HealthState::Unreachable,
        HealthState::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Unreachable => "unreachable",
        }
    }

    /// `Unhealthy` and `Unreachable` agents are reported as critical.
    pub fn is_critical(&self) -> bool {
        matches!(self, HealthState::Unhealthy | HealthState::Unreachable)
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(HealthState::Unknown),
            "healthy" => Ok(HealthState::Healthy),
            "unhealthy" => Ok(HealthState::Unhealthy),
            "unreachable" => Ok(HealthState::Unreachable),
            other => Err(format!(
                "invalid health state '{}': expected healthy, unhealthy, unreachable or unknown",
                other
            )),
        }
    }
}

/// Descriptor plus current health, one per registered agent.
///
/// Records are replaced as a whole on every health update, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub descriptor: AgentDescriptor,
    pub current_state: HealthState,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_latency_ms: Option<u64>,
    pub consecutive_failures: u32,
}

impl AgentRecord {
    /// Fresh record as produced by discovery.
    pub fn new(descriptor: AgentDescriptor) -> Self {
        Self {
            descriptor,
            current_state: HealthState::Unknown,
            last_checked_at: None,
            last_latency_ms: None,
            consecutive_failures: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Successor record after a probe result.
    pub fn with_health_result(
        &self,
        state: HealthState,
        latency_ms: Option<u64>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        let consecutive_failures = if state == HealthState::Healthy {
            0
        } else {
            self.consecutive_failures.saturating_add(1)
        };

        Self {
            descriptor: self.descriptor.clone(),
            current_state: state,
            last_checked_at: Some(checked_at),
            last_latency_ms: latency_ms,
            consecutive_failures,
        }
    }
}

/// One entry of an agent's bounded health history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub state: HealthState,
    pub latency_ms: Option<u64>,
}
