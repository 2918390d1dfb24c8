// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Capability routing and handoff commands

use anyhow::{Context, Result};
use clap::Args;

use hiregate_core::application::coordinator::CapabilityRouteRequest;
use hiregate_core::domain::routing::{DedupKey, HttpMethod};

use crate::backend::Backend;
use crate::daemon::GatewayTarget;

use super::{embedded_notice, parse_payload, print_aggregated, print_json, print_response};

#[derive(Args)]
pub struct RouteArgs {
    #[arg(value_name = "CAPABILITY")]
    pub capability: String,

    /// Agent endpoint path
    #[arg(short, long)]
    pub endpoint: String,

    #[arg(short = 'X', long, default_value = "POST")]
    pub method: HttpMethod,

    /// JSON payload
    #[arg(short, long)]
    pub payload: Option<String>,

    /// Per-agent timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Also call agents that are not currently healthy
    #[arg(long)]
    pub include_unhealthy: bool,

    /// Identity field for deduplicating merged records (repeatable)
    #[arg(long = "dedup-field", value_name = "FIELD")]
    pub dedup_fields: Vec<String>,

    /// Print raw JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct HandoffArgs {
    #[arg(value_name = "AGENT")]
    pub agent: String,

    /// JSON object handed to the agent
    #[arg(short, long)]
    pub payload: String,
}

pub async fn handle_route(args: RouteArgs, target: &GatewayTarget) -> Result<()> {
    let mut request = CapabilityRouteRequest::new(args.method, args.endpoint);
    request.payload = parse_payload(args.payload.as_deref())?;
    request.timeout_ms = args.timeout_ms;
    request.skip_unhealthy = !args.include_unhealthy;
    if !args.dedup_fields.is_empty() {
        request.dedup_key = Some(DedupKey::Fields(args.dedup_fields));
    }

    let backend = Backend::connect(target).await?;
    embedded_notice(&backend);

    let result = backend.route_capability(&args.capability, request).await?;
    if args.json {
        return print_json(&result);
    }
    if result.responses.is_empty() {
        println!("No agents available for capability '{}'", args.capability);
        return Ok(());
    }
    print_aggregated(&result)
}

pub async fn handle_handoff(args: HandoffArgs, target: &GatewayTarget) -> Result<()> {
    let payload = parse_payload(Some(&args.payload))?
        .context("Handoff payload is required")?;

    let backend = Backend::connect(target).await?;
    embedded_notice(&backend);

    let response = backend.handoff(&args.agent, payload).await?;
    print_response(&response)
}
