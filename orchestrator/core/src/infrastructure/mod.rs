// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod http_transport;

pub use event_bus::{DomainEvent, EventBus, EventReceiver};
pub use http_transport::HttpAgentTransport;
