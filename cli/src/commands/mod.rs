// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the hiregate CLI

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::Value;

use hiregate_core::application::coordinator::AgentSummary;
use hiregate_core::domain::agent::HealthState;
use hiregate_core::domain::routing::{AgentResponse, AggregatedResult};

use crate::backend::Backend;

pub mod agent;
pub mod config;
pub mod health;
pub mod route;
pub mod search;
pub mod serve;

pub use self::agent::AgentCommand;
pub use self::config::ConfigCommand;
pub use self::health::HealthArgs;
pub use self::route::{HandoffArgs, RouteArgs};
pub use self::search::SearchArgs;
pub use self::serve::ServeArgs;

/// Parse a `--payload` argument as JSON.
pub fn parse_payload(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|raw| serde_json::from_str(raw).context("Payload is not valid JSON"))
        .transpose()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn status_label(state: HealthState) -> ColoredString {
    match state {
        HealthState::Healthy => state.as_str().green(),
        HealthState::Unhealthy => state.as_str().yellow(),
        HealthState::Unreachable => state.as_str().red(),
        HealthState::Unknown => state.as_str().dimmed(),
    }
}

pub(crate) fn embedded_notice(backend: &Backend) {
    if backend.is_embedded() {
        eprintln!(
            "{}",
            "No gateway running; answered by an embedded coordinator.".dimmed()
        );
    }
}

pub(crate) fn print_agent_table(agents: &[AgentSummary]) {
    println!(
        "{:<20} {:<12} {:<10} {:<28} {}",
        "NAME", "STATUS", "LATENCY", "CAPABILITIES", "URL"
    );
    for agent in agents {
        let latency = agent
            .last_latency_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<12} {:<10} {:<28} {}",
            agent.name.bold(),
            status_label(agent.state),
            latency,
            agent.capabilities.join(","),
            agent.base_url
        );
    }
}

pub(crate) fn print_response(response: &AgentResponse) -> Result<()> {
    let code = response
        .status_code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());

    match response.error() {
        None => println!("{} {} ({})", "✓".green(), response.agent_name.bold(), code),
        Some(error) => println!(
            "{} {} ({}): {}",
            "✗".red(),
            response.agent_name.bold(),
            code,
            error
        ),
    }
    if let Some(body) = response.body() {
        println!("{}", serde_json::to_string_pretty(body)?);
    }
    Ok(())
}

pub(crate) fn print_aggregated(result: &AggregatedResult) -> Result<()> {
    println!(
        "Request {}: {} succeeded, {} failed",
        result.request_id,
        result.successful_count.to_string().green(),
        result.failed_count.to_string().red()
    );
    for response in &result.responses {
        match response.error() {
            None => println!("  {} {}", "✓".green(), response.agent_name),
            Some(error) => println!("  {} {}: {}", "✗".red(), response.agent_name, error),
        }
    }
    if !result.results.is_empty() {
        println!();
        println!("{} merged results:", result.results.len());
        print_json(&result.results)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(None).unwrap(), None);
        assert_eq!(
            parse_payload(Some(r#"{"candidate_id":"c-1"}"#)).unwrap(),
            Some(json!({"candidate_id": "c-1"}))
        );
        assert!(parse_payload(Some("{broken")).is_err());
    }
}
