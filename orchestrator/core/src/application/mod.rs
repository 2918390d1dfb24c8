// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod aggregation;
pub mod coordinator;
pub mod health_monitor;
pub mod registry;
pub mod router;

// Re-export services for convenience
pub use coordinator::{
    AgentHistory, AgentSummary, CallAgentRequest, CapabilityRouteRequest, CoordinatorService,
    DiscoverResponse, FullHealth, HealthReport, Liveness,
};
pub use health_monitor::{HealthMonitor, HealthMonitorConfig, StatusSummary};
pub use registry::AgentRegistry;
pub use router::{RequestRouter, RouterConfig};
