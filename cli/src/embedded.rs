// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedded mode (when no gateway is running)
//!
//! Builds the coordinator in-process and answers one command directly.
//! Agents are probed once up front so health filters mean something.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use hiregate_core::domain::gateway_config::GatewayConfig;
use hiregate_core::CoordinatorService;

pub struct EmbeddedGateway {
    service: Arc<CoordinatorService>,
}

impl EmbeddedGateway {
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config =
            GatewayConfig::load_or_default(config_path).context("Failed to load configuration")?;

        config
            .validate()
            .context("Configuration validation failed")?;

        let service = CoordinatorService::bootstrap(&config)
            .context("Failed to initialize embedded coordinator")?;

        Ok(Self::from_service(Arc::new(service)).await)
    }

    /// Wrap an already bootstrapped coordinator and run one probe cycle.
    pub async fn from_service(service: Arc<CoordinatorService>) -> Self {
        if let Some(summary) = service.monitor().run_cycle().await {
            debug!(
                healthy = summary.healthy,
                total = summary.total,
                "Embedded health cycle completed"
            );
        }
        Self { service }
    }

    pub fn service(&self) -> &Arc<CoordinatorService> {
        &self.service
    }
}
