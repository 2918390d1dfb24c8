// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # hiregate-core
//!
//! Agent orchestration core of the hiregate recruiting gateway: a static
//! catalog of worker agents, a registry of their current health, a
//! background health monitor, and a router that sends requests to one or
//! many agents and merges their answers.
//!
//! # Architecture
//!
//! - **domain**: catalog, agent records, routing value types, errors, the
//!   transport seam and gateway configuration
//! - **application**: registry, health monitor, router, coordinator service
//! - **infrastructure**: reqwest transport and the broadcast event bus
//! - **presentation**: axum HTTP API

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::CoordinatorService;
pub use domain::error::CoordinatorError;
pub use domain::gateway_config::GatewayConfig;
