// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wire types shared with the gateway.
//!
//! Re-exported from `hiregate-core` so client and server never drift apart.

use serde::{Deserialize, Serialize};

pub use hiregate_core::application::coordinator::{
    AgentHistory, AgentSummary, CallAgentRequest, CapabilityRouteRequest, DiscoverResponse,
    FullHealth, HealthReport, Liveness,
};
pub use hiregate_core::application::health_monitor::StatusSummary;
pub use hiregate_core::domain::agent::{HealthHistoryEntry, HealthState};
pub use hiregate_core::domain::routing::{
    AgentResponse, AggregatedResult, DedupKey, FailureKind, HttpMethod, RouteOutcome,
    SearchRequest, SearchResult,
};

/// Error body returned by the gateway for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub kind: String,
}
