// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Transport Adapter interface.
//!
//! The monitor and router talk to worker agents only through this trait. The
//! production implementation is
//! [`HttpAgentTransport`](crate::infrastructure::http_transport::HttpAgentTransport);
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::domain::routing::{CallOutcome, HttpMethod};

/// One outbound HTTP call to a worker agent.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Absolute URL
    pub url: String,
    pub method: HttpMethod,
    pub payload: Option<Value>,
    pub timeout: Duration,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            payload: None,
            timeout,
        }
    }
}

/// Pooled HTTP client seam.
///
/// Implementations never return errors: timeouts, refused connections and
/// non-success statuses are all reported as [`CallOutcome::Failure`].
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> CallOutcome;
}
