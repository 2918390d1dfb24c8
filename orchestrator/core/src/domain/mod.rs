// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: agent descriptors, catalog, health states, routing value
//! types, the transport seam and gateway configuration.

pub mod agent;
pub mod catalog;
pub mod error;
pub mod events;
pub mod gateway_config;
pub mod routing;
pub mod transport;
