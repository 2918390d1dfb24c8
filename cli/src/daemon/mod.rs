// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Gateway server mode and detection
//!
//! Handles:
//! - Resolving which gateway a command talks to
//! - HTTP liveness checks
//! - Running the gateway in the foreground (see [`server`])

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

pub mod server;

pub use server::start_gateway;

/// Port used by client commands when none is given.
pub const DEFAULT_PORT: u16 = 8080;

/// Where a command finds its gateway and configuration.
#[derive(Debug, Clone)]
pub struct GatewayTarget {
    pub host: String,
    /// Explicit `--port`; `serve` falls back to the configured port
    pub port: Option<u16>,
    pub config_path: Option<PathBuf>,
}

impl GatewayTarget {
    pub fn new(host: impl Into<String>, port: Option<u16>, config_path: Option<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port,
            config_path,
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port())
        } else {
            format!("http://{}:{}", self.host, self.port())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayStatus {
    Running { uptime: Option<u64> },
    Stopped,
    Unhealthy { error: String },
}

/// Check whether a gateway answers its liveness endpoint.
pub async fn check_gateway_running(target: &GatewayTarget) -> Result<GatewayStatus> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()?;

    let health_url = format!("{}/health", target.base_url());

    match client.get(&health_url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let uptime = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["uptime_seconds"].as_u64());
            Ok(GatewayStatus::Running { uptime })
        }
        Ok(resp) => Ok(GatewayStatus::Unhealthy {
            error: format!("HTTP {}", resp.status()),
        }),
        Err(_) => Ok(GatewayStatus::Stopped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_for(server: &mockito::Server) -> GatewayTarget {
        let addr = server.socket_address();
        GatewayTarget::new(addr.ip().to_string(), Some(addr.port()), None)
    }

    #[test]
    fn test_base_url() {
        let target = GatewayTarget::new("127.0.0.1", None, None);
        assert_eq!(target.base_url(), "http://127.0.0.1:8080");

        let target = GatewayTarget::new("https://gateway.internal/", Some(443), None);
        assert_eq!(target.base_url(), "https://gateway.internal:443");
    }

    #[tokio::test]
    async fn test_running_gateway_reports_uptime() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy","uptime_seconds":42}"#)
            .create_async()
            .await;

        let status = check_gateway_running(&target_for(&server)).await.unwrap();
        assert_eq!(status, GatewayStatus::Running { uptime: Some(42) });
    }

    #[tokio::test]
    async fn test_error_status_is_unhealthy() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(503)
            .create_async()
            .await;

        let status = check_gateway_running(&target_for(&server)).await.unwrap();
        assert!(matches!(status, GatewayStatus::Unhealthy { .. }));
    }

    #[tokio::test]
    async fn test_nothing_listening_is_stopped() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = GatewayTarget::new("127.0.0.1", Some(port), None);

        let status = check_gateway_running(&target).await.unwrap();
        assert_eq!(status, GatewayStatus::Stopped);
    }
}
