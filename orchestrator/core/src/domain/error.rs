// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Coordinator error taxonomy.
//!
//! Only failures detected before any network call propagate as errors.
//! Per-agent call failures travel as data inside
//! [`CallOutcome`](crate::domain::routing::CallOutcome) and can be converted into
//! [`CoordinatorError::AgentUnavailable`] / [`CoordinatorError::AgentTimeout`]
//! by callers that want `?` semantics.

/// Errors surfaced by the registry, monitor, router and coordinator service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("No agents declare capability '{0}'")]
    NoAgentsForCapability(String),

    #[error("Agent '{agent}' unavailable: {reason}")]
    AgentUnavailable { agent: String, reason: String },

    #[error("Agent '{agent}' timed out after {timeout_ms}ms")]
    AgentTimeout { agent: String, timeout_ms: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl CoordinatorError {
    /// Stable machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CoordinatorError::AgentNotFound(_) => "agent_not_found",
            CoordinatorError::NoAgentsForCapability(_) => "no_agents_for_capability",
            CoordinatorError::AgentUnavailable { .. } => "agent_unavailable",
            CoordinatorError::AgentTimeout { .. } => "agent_timeout",
            CoordinatorError::InvalidRequest(_) => "invalid_request",
            CoordinatorError::Catalog(_) => "catalog_error",
        }
    }
}
