// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! hiregate Rust SDK
//!
//! Typed async client for a running hiregate gateway.

pub mod client;
pub mod types;

pub use client::{GatewayClient, GatewayClientError};
pub use types::*;
