// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value};

use hiregate_core::domain::routing::SearchRequest;

use crate::backend::Backend;
use crate::daemon::GatewayTarget;

use super::{embedded_notice, print_json};

#[derive(Args)]
pub struct SearchArgs {
    /// Free-text query forwarded to every search agent
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Maximum merged results to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Capability to fan out to (default: search)
    #[arg(long)]
    pub capability: Option<String>,

    /// Extra filter forwarded to agents, `key=value` (value may be JSON)
    #[arg(short, long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Print raw JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_command(args: SearchArgs, target: &GatewayTarget) -> Result<()> {
    let request = SearchRequest {
        query: args.query,
        limit: args.limit,
        capability: args.capability,
        filters: parse_filters(&args.filters)?,
    };

    let backend = Backend::connect(target).await?;
    embedded_notice(&backend);

    let result = backend.search(request).await?;
    if args.json {
        return print_json(&result);
    }

    println!(
        "Found {} candidates ({} shown) from {} agents",
        result.total_found.to_string().bold(),
        result.results.len(),
        result.agents_queried.len()
    );
    for response in result.responses.iter().filter(|r| !r.is_success()) {
        println!(
            "  {} {}: {}",
            "✗".red(),
            response.agent_name,
            response.error().unwrap_or("failed")
        );
    }
    if !result.results.is_empty() {
        print_json(&result.results)?;
    }
    Ok(())
}

/// Parse `key=value` filters; values that parse as JSON keep their type.
pub fn parse_filters(raw: &[String]) -> Result<Map<String, Value>> {
    let mut filters = Map::new();
    for item in raw {
        let (key, value) = item
            .split_once('=')
            .with_context(|| format!("Filter '{}' is not in key=value form", item))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Filter '{}' has an empty key", item);
        }
        if SearchRequest::RESERVED_KEYS.contains(&key) {
            anyhow::bail!("Filter '{}' uses reserved key '{}'; use the matching flag", item, key);
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        filters.insert(key.to_string(), value);
    }
    Ok(filters)
}
