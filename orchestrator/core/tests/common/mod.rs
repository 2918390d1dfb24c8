// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use hiregate_core::domain::catalog::AgentCatalog;
use hiregate_core::domain::gateway_config::GatewayConfig;
use hiregate_core::domain::routing::CallOutcome;
use hiregate_core::domain::transport::{AgentTransport, TransportRequest};
use hiregate_core::CoordinatorService;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub enum Behavior {
    Respond(u16, Option<Value>),
    Refuse,
    Stall,
}

/// In-memory transport answering by exact URL; unknown URLs are refused.
#[derive(Default)]
pub struct MockTransport {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn on(&self, url: &str, behavior: Behavior) -> &Self {
        self.behaviors.lock().insert(url.to_string(), behavior);
        self
    }

    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.url.ends_with(path))
            .map(|c| c.url.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl AgentTransport for MockTransport {
    async fn send(&self, request: &TransportRequest) -> CallOutcome {
        self.calls.lock().push(request.clone());
        let behavior = self.behaviors.lock().get(&request.url).cloned();
        match behavior {
            Some(Behavior::Respond(status, body)) => CallOutcome::from_status(status, body),
            Some(Behavior::Stall) => std::future::pending().await,
            Some(Behavior::Refuse) | None => CallOutcome::unavailable("connection refused"),
        }
    }
}

/// alpha:9001 and beta:9002 search, gamma:9003 screening + handoff.
pub fn recruiting_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.spec.agents = AgentCatalog::default()
        .with_agent("alpha", 9001, "job board sourcing", ["search"])
        .with_agent("beta", 9002, "professional network sourcing", ["search"])
        .with_agent("gamma", 9003, "screening", ["screening", "handoff"]);
    config.spec.routing.default_timeout = Duration::from_millis(100);
    config.spec.health.probe_timeout = Duration::from_millis(100);
    config
}

pub fn service_with(config: &GatewayConfig, transport: Arc<MockTransport>) -> Arc<CoordinatorService> {
    Arc::new(
        CoordinatorService::bootstrap_with_transport(config, transport)
            .expect("bootstrap with valid catalog"),
    )
}
