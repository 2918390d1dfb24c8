// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # hiregate CLI
//!
//! The `hiregate` binary runs the agent gateway and talks to it.
//!
//! ## Architecture
//!
//! - **Server mode**: `hiregate serve` runs the gateway HTTP API in the foreground
//! - **Client mode**: other commands delegate to a running gateway, else embed
//!   the coordinator in-process for a one-shot answer
//! - **Detection**: HTTP liveness check against `--host`/`--port`
//!
//! ## Commands
//!
//! - `hiregate serve|status` - Run or inspect the gateway
//! - `hiregate agent list|show|history|check|call` - Worker agent operations
//! - `hiregate health|search|route|handoff` - Health and routing
//! - `hiregate config show|validate|generate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use hiregate_cli::commands::{
    self, AgentCommand, ConfigCommand, HandoffArgs, HealthArgs, RouteArgs, SearchArgs, ServeArgs,
};
use hiregate_cli::GatewayTarget;

/// hiregate - Agent orchestration gateway for recruiting workers
#[derive(Parser)]
#[command(name = "hiregate")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "HIREGATE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Gateway HTTP port (serve: overrides configuration; clients: default 8080)
    #[arg(long, global = true, env = "HIREGATE_PORT")]
    port: Option<u16>,

    /// Gateway HTTP host
    #[arg(long, global = true, env = "HIREGATE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HIREGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, env = "HIREGATE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway in the foreground
    #[command(name = "serve")]
    Serve(ServeArgs),

    /// Check whether a gateway is running
    #[command(name = "status")]
    Status,

    /// Worker agent operations
    #[command(name = "agent")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Agent health report
    #[command(name = "health")]
    Health(HealthArgs),

    /// Distributed candidate search across search agents
    #[command(name = "search")]
    Search(SearchArgs),

    /// Fan a call out to every agent with a capability
    #[command(name = "route")]
    Route(RouteArgs),

    /// Hand a payload off to an agent
    #[command(name = "handoff")]
    Handoff(HandoffArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (log_level, log_format) =
        hiregate_cli::resolve_logging(cli.log_level, cli.log_format, cli.config.clone());
    hiregate_cli::init_logging(&log_level, &log_format)?;

    let target = GatewayTarget::new(cli.host, cli.port, cli.config);

    match cli.command {
        Some(Commands::Serve(args)) => commands::serve::handle_command(args, &target).await,
        Some(Commands::Status) => commands::serve::status(&target).await,
        Some(Commands::Agent { command }) => commands::agent::handle_command(command, &target).await,
        Some(Commands::Health(args)) => commands::health::handle_command(args, &target).await,
        Some(Commands::Search(args)) => commands::search::handle_command(args, &target).await,
        Some(Commands::Route(args)) => commands::route::handle_route(args, &target).await,
        Some(Commands::Handoff(args)) => commands::route::handle_handoff(args, &target).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, target.config_path).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}
