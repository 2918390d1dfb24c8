// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Gateway lifecycle commands: serve, status

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::daemon::{check_gateway_running, start_gateway, GatewayStatus, GatewayTarget};

#[derive(Args)]
pub struct ServeArgs {
    /// Serve the API without the periodic health monitor
    #[arg(long)]
    pub no_monitor: bool,
}

pub async fn handle_command(args: ServeArgs, target: &GatewayTarget) -> Result<()> {
    if let GatewayStatus::Running { .. } = check_gateway_running(target).await? {
        println!(
            "{}",
            format!("Gateway already running at {}", target.base_url()).yellow()
        );
        return Ok(());
    }

    start_gateway(target, !args.no_monitor).await
}

pub async fn status(target: &GatewayTarget) -> Result<()> {
    match check_gateway_running(target).await? {
        GatewayStatus::Running { uptime } => {
            println!("{}", format!("✓ Gateway is running at {}", target.base_url()).green());
            if let Some(uptime) = uptime {
                println!("  Uptime: {}s", uptime);
            }
        }
        GatewayStatus::Unhealthy { error } => {
            println!(
                "{}",
                format!("⚠ Gateway at {} is unhealthy: {}", target.base_url(), error).yellow()
            );
        }
        GatewayStatus::Stopped => {
            println!("{}", format!("✗ No gateway at {}", target.base_url()).red());
            println!("Run 'hiregate serve' to start one.");
        }
    }
    Ok(())
}
