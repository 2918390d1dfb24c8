// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::backend::Backend;
use crate::daemon::GatewayTarget;

use super::{embedded_notice, print_agent_table, print_json};

#[derive(Args)]
pub struct HealthArgs {
    /// Include gateway uptime alongside the agent report
    #[arg(long, conflicts_with = "critical")]
    pub full: bool,

    /// Only list unhealthy and unreachable agents
    #[arg(long)]
    pub critical: bool,

    /// Print raw JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_command(args: HealthArgs, target: &GatewayTarget) -> Result<()> {
    let backend = Backend::connect(target).await?;
    embedded_notice(&backend);

    if args.critical {
        let agents = backend.critical_agents().await?;
        if args.json {
            return print_json(&agents);
        }
        if agents.is_empty() {
            println!("{}", "✓ No critical agents".green());
        } else {
            print_agent_table(&agents);
        }
        return Ok(());
    }

    let report = if args.full {
        let full = backend.full_health().await?;
        if args.json {
            return print_json(&full);
        }
        println!("Gateway: {} (uptime {}s)", full.gateway.green(), full.uptime_seconds);
        full.agents
    } else {
        let report = backend.health_report().await?;
        if args.json {
            return print_json(&report);
        }
        report
    };

    let summary = &report.summary;
    println!(
        "{} agents: {} healthy, {} unhealthy, {} unreachable, {} unknown",
        summary.total,
        summary.healthy.to_string().green(),
        summary.unhealthy.to_string().yellow(),
        summary.unreachable.to_string().red(),
        summary.unknown
    );
    println!(
        "Monitor: {} ({} cycles)",
        if report.monitor_running { "running" } else { "stopped" },
        summary.cycles_completed
    );
    println!();
    print_agent_table(&report.per_agent);

    Ok(())
}
