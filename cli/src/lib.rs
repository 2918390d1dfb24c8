// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! hiregate CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Gateway server bootstrap, gateway detection and the
//!   remote/embedded command backend

pub mod backend;
pub mod commands;
pub mod daemon;
pub mod embedded;

pub use backend::Backend;
pub use daemon::{GatewayStatus, GatewayTarget};

use anyhow::{Context, Result};
use std::path::PathBuf;

use hiregate_core::GatewayConfig;

/// Pick the log level and format: explicit flags win, then the
/// configuration's `observability.logging`, then `info` / `text`.
pub fn resolve_logging(
    level: Option<String>,
    format: Option<String>,
    config_path: Option<PathBuf>,
) -> (String, String) {
    if let (Some(level), Some(format)) = (&level, &format) {
        return (level.clone(), format.clone());
    }

    let configured = GatewayConfig::load_or_default(config_path)
        .ok()
        .and_then(|config| config.spec.observability)
        .and_then(|observability| observability.logging);

    let level = level
        .or_else(|| configured.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let format = format
        .or_else(|| configured.map(|l| l.format))
        .unwrap_or_else(|| "text".to_string());
    (level, format)
}

/// Initialize tracing subscriber for logging.
///
/// `RUST_LOG` wins over `level`; `format` selects `json` or compact text.
/// Logs go to stderr so command output stays pipeable.
pub fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().try_init(),
        _ => builder.compact().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))
}
