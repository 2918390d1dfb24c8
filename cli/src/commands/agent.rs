// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use hiregate_core::application::coordinator::CallAgentRequest;
use hiregate_core::domain::agent::HealthState;
use hiregate_core::domain::routing::{HttpMethod, RouteOutcome};

use crate::backend::Backend;
use crate::daemon::GatewayTarget;

use super::{
    embedded_notice, parse_payload, print_agent_table, print_aggregated, print_json,
    print_response, status_label,
};

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List registered agents
    List {
        /// Only agents advertising this capability
        #[arg(long)]
        capability: Option<String>,

        /// Only agents in this health state
        #[arg(long)]
        status: Option<HealthState>,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one agent
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Show recent health checks for an agent
    History {
        #[arg(value_name = "NAME")]
        name: String,

        /// Number of most recent entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Probe an agent now
    Check {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Call one or more agents directly
    Call {
        /// Agent names; more than one fans out and aggregates
        #[arg(value_name = "NAME", required = true, num_args = 1..)]
        names: Vec<String>,

        /// Agent endpoint path, e.g. /search
        #[arg(short, long)]
        endpoint: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: HttpMethod,

        /// JSON payload
        #[arg(short, long)]
        payload: Option<String>,

        /// Per-agent timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Rebuild the registry from the catalog (clears health data)
    Discover,
}

pub async fn handle_command(command: AgentCommand, target: &GatewayTarget) -> Result<()> {
    let backend = Backend::connect(target).await?;
    embedded_notice(&backend);

    match command {
        AgentCommand::List {
            capability,
            status,
            json,
        } => list_agents(&backend, capability.as_deref(), status, json).await,
        AgentCommand::Show { name } => show_agent(&backend, &name).await,
        AgentCommand::History { name, limit } => history(&backend, &name, limit).await,
        AgentCommand::Check { name } => check_agent(&backend, &name).await,
        AgentCommand::Call {
            names,
            endpoint,
            method,
            payload,
            timeout_ms,
        } => {
            let request = build_call_request(names, endpoint, method, payload.as_deref(), timeout_ms)?;
            call_agent(&backend, request).await
        }
        AgentCommand::Discover => {
            let discovered = backend.discover().await?;
            println!(
                "{}",
                format!(
                    "✓ Registered {} agents (generation {})",
                    discovered.agent_count, discovered.generation
                )
                .green()
            );
            Ok(())
        }
    }
}

async fn list_agents(
    backend: &Backend,
    capability: Option<&str>,
    status: Option<HealthState>,
    json: bool,
) -> Result<()> {
    let agents = backend.list_agents(capability, status).await?;
    if json {
        return print_json(&agents);
    }

    if agents.is_empty() {
        println!("{}", "No agents found".yellow());
        return Ok(());
    }

    println!("{} agents found:", agents.len());
    print_agent_table(&agents);
    Ok(())
}

async fn show_agent(backend: &Backend, name: &str) -> Result<()> {
    let agent = backend.get_agent(name).await?;

    println!("{}", agent.name.bold());
    println!("  Purpose:      {}", agent.purpose);
    println!("  URL:          {}", agent.base_url);
    println!("  Health path:  {}", agent.health_path);
    println!("  Capabilities: {}", agent.capabilities.join(", "));
    println!("  Status:       {}", status_label(agent.state));
    println!("  Failures:     {}", agent.consecutive_failures);
    if let Some(checked) = agent.last_checked_at {
        println!("  Last check:   {}", checked.to_rfc3339());
    }
    if let Some(latency) = agent.last_latency_ms {
        println!("  Latency:      {}ms", latency);
    }
    Ok(())
}

async fn history(backend: &Backend, name: &str, limit: usize) -> Result<()> {
    let history = backend.agent_history(name).await?;

    if history.entries.is_empty() {
        println!("{}", format!("No health checks recorded for {}", name).yellow());
        return Ok(());
    }

    let skip = history.entries.len().saturating_sub(limit);
    println!(
        "Last {} of {} checks for {} (capacity {}):",
        history.entries.len() - skip,
        history.entries.len(),
        history.agent.bold(),
        history.capacity
    );
    for entry in history.entries.iter().skip(skip) {
        let latency = entry
            .latency_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  {:<12} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            status_label(entry.state),
            latency
        );
    }
    Ok(())
}

async fn check_agent(backend: &Backend, name: &str) -> Result<()> {
    let agent = backend.check_agent(name).await?;
    let latency = agent
        .last_latency_ms
        .map(|ms| format!(" in {}ms", ms))
        .unwrap_or_default();
    println!(
        "{} is {}{} ({} consecutive failures)",
        agent.name.bold(),
        status_label(agent.state),
        latency,
        agent.consecutive_failures
    );
    Ok(())
}

fn build_call_request(
    mut names: Vec<String>,
    endpoint: String,
    method: HttpMethod,
    payload: Option<&str>,
    timeout_ms: Option<u64>,
) -> Result<CallAgentRequest> {
    let (agent, agents) = if names.len() == 1 {
        (names.pop(), None)
    } else {
        (None, Some(names))
    };

    Ok(CallAgentRequest {
        agent,
        agents,
        endpoint,
        method,
        payload: parse_payload(payload)?,
        timeout_ms,
        dedup_key: None,
    })
}

async fn call_agent(backend: &Backend, request: CallAgentRequest) -> Result<()> {
    match backend.call_agent(request).await? {
        RouteOutcome::Single(response) => print_response(&response),
        RouteOutcome::Aggregated(result) => print_aggregated(&result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_name_targets_one_agent() {
        let request = build_call_request(
            vec!["screening_agent".to_string()],
            "/screen".to_string(),
            HttpMethod::Post,
            Some(r#"{"candidate_id":"c-9"}"#),
            Some(500),
        )
        .unwrap();

        assert_eq!(request.agent.as_deref(), Some("screening_agent"));
        assert!(request.agents.is_none());
        assert_eq!(request.payload, Some(json!({"candidate_id": "c-9"})));
        assert_eq!(request.timeout_ms, Some(500));
        assert!(request.into_routed().is_ok());
    }

    #[test]
    fn test_several_names_fan_out() {
        let request = build_call_request(
            vec!["sourcing_agent".to_string(), "linkedin_agent".to_string()],
            "/jobs".to_string(),
            HttpMethod::Get,
            None,
            None,
        )
        .unwrap();

        assert!(request.agent.is_none());
        assert_eq!(request.agents.as_ref().map(Vec::len), Some(2));
    }
}
