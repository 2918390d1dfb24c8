// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use hiregate_core::domain::gateway_config::{GatewayConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration with the recruiting agent catalog
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./hiregate-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, force } => generate(&output, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = GatewayConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./hiregate-config.yaml");
        println!("  4. ~/.hiregate/config.yaml");
        println!("  5. /etc/hiregate/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    let spec = &config.spec;
    println!("{}", "Gateway:".bold());
    println!("  Name: {}", config.metadata.name);
    println!(
        "  Listen: {}:{}",
        spec.gateway.bind_address, spec.gateway.port
    );
    println!();

    println!("{}", "Health Monitor:".bold());
    println!("  Enabled: {}", spec.health.enabled);
    println!(
        "  Interval: {}",
        format_duration(spec.health.interval)
    );
    println!(
        "  Probe timeout: {}",
        format_duration(spec.health.probe_timeout)
    );
    println!("  History size: {}", spec.health.history_size);
    println!();

    println!("{}", "Routing:".bold());
    println!(
        "  Default timeout: {}",
        format_duration(spec.routing.default_timeout)
    );
    println!(
        "  Search: {} -> {}",
        spec.routing.search.capability, spec.routing.search.endpoint
    );
    println!(
        "  Handoff: {} -> {}",
        spec.routing.handoff.capability, spec.routing.handoff.endpoint
    );
    println!("  Dedup fields: {}", spec.routing.dedup_fields.join(", "));
    println!();

    println!("{} ({}):", "Agents".bold(), spec.agents.len());
    match spec.agents.descriptors() {
        Ok(descriptors) => {
            for agent in descriptors {
                println!(
                    "  {} {} [{}]",
                    agent.name.bold(),
                    agent.base_url,
                    agent.capabilities
                );
            }
        }
        Err(e) => println!("  {}", format!("Invalid catalog: {}", e).red()),
    }
    println!();

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    humantime_serde::re::humantime::format_duration(duration).to_string()
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config =
        GatewayConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!(
        "{}",
        format!(
            "✓ Configuration is valid ({} agents)",
            config.spec.agents.len()
        )
        .green()
    );

    Ok(())
}

fn generate(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    GatewayConfig::sample()
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
