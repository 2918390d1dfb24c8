// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Gateway HTTP server

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use hiregate_core::domain::gateway_config::GatewayConfig;
use hiregate_core::presentation::api::app;
use hiregate_core::CoordinatorService;

use super::GatewayTarget;

/// Load configuration, start the health monitor and serve the API until a
/// shutdown signal arrives.
pub async fn start_gateway(target: &GatewayTarget, run_monitor: bool) -> Result<()> {
    let mut config = GatewayConfig::load_or_default(target.config_path.clone())
        .context("Failed to load configuration")?;
    if let Some(port) = target.port {
        config.spec.gateway.port = port;
    }

    config
        .validate()
        .context("Configuration validation failed")?;

    info!(
        gateway = %config.metadata.name,
        agents = config.spec.agents.len(),
        "Configuration loaded"
    );

    let service = Arc::new(
        CoordinatorService::bootstrap(&config).context("Failed to initialize coordinator")?,
    );

    install_metrics_exporter(&config)?;

    if run_monitor && !service.start_monitor() {
        info!("Health monitor disabled by configuration");
    }

    let addr = format!(
        "{}:{}",
        config.spec.gateway.bind_address, config.spec.gateway.port
    );
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Gateway listening on {}", addr);

    let draining = service.clone();
    let served = axum::serve(listener, app(service.clone()))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Event streams end before connections are drained
            draining.begin_shutdown();
        })
        .await
        .context("HTTP server failed");

    info!("Gateway shutting down");
    service.shutdown().await;

    served
}

fn install_metrics_exporter(config: &GatewayConfig) -> Result<()> {
    let Some(metrics) = config
        .spec
        .observability
        .as_ref()
        .and_then(|o| o.metrics.as_ref())
        .filter(|m| m.enabled)
    else {
        return Ok(());
    };

    let addr: SocketAddr = format!("{}:{}", config.spec.gateway.bind_address, metrics.port)
        .parse()
        .with_context(|| format!("Invalid metrics listen address on port {}", metrics.port))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
