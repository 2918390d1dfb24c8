// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration Types
//
// Defines the configuration schema for a hiregate gateway process:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP listener settings
// - Health monitor cadence and probe timeout
// - Routing defaults (timeouts, connection pool, workflow endpoints)
// - The static agent catalog
// - Logging and metrics settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::catalog::AgentCatalog;

pub const API_VERSION: &str = "hiregate.io/v1";
pub const KIND: &str = "GatewayConfig";
pub const CONFIG_PATH_ENV: &str = "HIREGATE_CONFIG_PATH";

/// Top-level Kubernetes-style gateway configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// API version (must be "hiregate.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GatewayConfig")
    pub kind: String,

    /// Gateway metadata (name, labels, version)
    pub metadata: ManifestMetadata,

    /// Gateway settings and agent catalog
    pub spec: GatewayConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable gateway name
    pub name: String,

    /// Optional: Configuration version for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Optional: Labels for categorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Body of the manifest (content under `spec:`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigSpec {
    /// HTTP API listener
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Health monitor settings
    #[serde(default)]
    pub health: HealthSettings,

    /// Request routing settings
    #[serde(default)]
    pub routing: RoutingSettings,

    /// Static agent catalog
    #[serde(default)]
    pub agents: AgentCatalog,

    /// Logging and metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Delay between probe cycles (e.g. "30s")
    #[serde(default = "default_health_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Timeout of a single probe, independent of the interval
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// Entries kept per agent in the history ring buffer
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Run the background monitor
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// Per-call timeout when the caller gives none
    #[serde(default = "default_call_timeout", with = "humantime_serde")]
    pub default_timeout: Duration,

    /// TCP connect timeout for the shared client
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Idle connections kept per agent host
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,

    /// Largest agent response body read; bigger bodies fail the call
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Distributed search workflow target
    #[serde(default = "default_search_workflow")]
    pub search: WorkflowEndpoint,

    /// Single-target handoff workflow target
    #[serde(default = "default_handoff_workflow")]
    pub handoff: WorkflowEndpoint,

    /// Record fields tried, in order, as merge identity
    #[serde(default = "default_dedup_fields")]
    pub dedup_fields: Vec<String>,
}

/// Capability + endpoint pair used by a named routing workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEndpoint {
    pub capability: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Metrics configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus exposition
    #[serde(default)]
    pub enabled: bool,

    /// Metrics listener port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_health_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_history_size() -> usize {
    100
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_pool_size() -> usize {
    16
}

fn default_max_response_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_search_workflow() -> WorkflowEndpoint {
    WorkflowEndpoint {
        capability: "search".to_string(),
        endpoint: "/search".to_string(),
    }
}

fn default_handoff_workflow() -> WorkflowEndpoint {
    WorkflowEndpoint {
        capability: "handoff".to_string(),
        endpoint: "/handoff".to_string(),
    }
}

fn default_dedup_fields() -> Vec<String> {
    vec!["external_id".to_string(), "id".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval: default_health_interval(),
            probe_timeout: default_probe_timeout(),
            history_size: default_history_size(),
            enabled: true,
        }
    }
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            default_timeout: default_call_timeout(),
            connect_timeout: default_connect_timeout(),
            pool_max_idle_per_host: default_pool_size(),
            max_response_bytes: default_max_response_bytes(),
            search: default_search_workflow(),
            handoff: default_handoff_workflow(),
            dedup_fields: default_dedup_fields(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for GatewayConfigSpec {
    fn default() -> Self {
        Self {
            gateway: GatewaySettings::default(),
            health: HealthSettings::default(),
            routing: RoutingSettings::default(),
            agents: AgentCatalog::default(),
            observability: None,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "hiregate".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: GatewayConfigSpec::default(),
        }
    }
}

impl GatewayConfig {
    /// Sample configuration with the recruiting platform's worker agents
    pub fn sample() -> Self {
        let mut config = Self::default();
        config.metadata.name = "recruiting-gateway".to_string();
        config.spec.agents = AgentCatalog::default()
            .with_agent(
                "sourcing_agent",
                8101,
                "Searches job boards and talent pools for candidates",
                ["search"],
            )
            .with_agent(
                "linkedin_agent",
                8102,
                "Searches professional network profiles",
                ["search", "enrichment"],
            )
            .with_agent(
                "enrichment_agent",
                8103,
                "Adds public contact and career data to candidate profiles",
                ["enrichment"],
            )
            .with_agent(
                "screening_agent",
                8104,
                "Scores candidate profiles against job requirements",
                ["screening"],
            )
            .with_agent(
                "interview_agent",
                8105,
                "Runs structured interview workflows for finalized candidates",
                ["interview", "handoff"],
            );
        config.spec.observability = Some(ObservabilityConfig {
            logging: Some(LoggingConfig::default()),
            metrics: Some(MetricsConfig {
                enabled: false,
                port: default_metrics_port(),
            }),
        });
        config
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. HIREGATE_CONFIG_PATH environment variable
    /// 2. ./hiregate-config.yaml (working directory)
    /// 3. ~/.hiregate/config.yaml (user home)
    /// 4. /etc/hiregate/config.yaml (system, Unix) or C:\ProgramData\Hiregate\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./hiregate-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hiregate").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/hiregate/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Hiregate\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, falling back to [`GatewayConfig::sample`]
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // 1. Explicit CLI path (Fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        // 2. Discovery (Env -> Cwd -> Home -> System)
        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(&config_path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", config_path, e)
            })?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using the built-in agent catalog.");
            let mut config = Self::sample();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|key| std::env::var(key).ok());
    }

    fn apply_overrides_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("HIREGATE_HEALTH_INTERVAL") {
            match humantime_serde::re::humantime::parse_duration(&val) {
                Ok(interval) if !interval.is_zero() => {
                    tracing::info!("Environment override: HIREGATE_HEALTH_INTERVAL={}", val);
                    self.spec.health.interval = interval;
                }
                _ => tracing::warn!(
                    "Invalid value for HIREGATE_HEALTH_INTERVAL: '{}'. Expected a duration like '30s'. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("HIREGATE_PROBE_TIMEOUT") {
            match humantime_serde::re::humantime::parse_duration(&val) {
                Ok(timeout) if !timeout.is_zero() => {
                    tracing::info!("Environment override: HIREGATE_PROBE_TIMEOUT={}", val);
                    self.spec.health.probe_timeout = timeout;
                }
                _ => tracing::warn!(
                    "Invalid value for HIREGATE_PROBE_TIMEOUT: '{}'. Expected a duration like '5s'. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("HIREGATE_AGENT_HOST") {
            if val.trim().is_empty() {
                tracing::warn!("Empty HIREGATE_AGENT_HOST ignored");
            } else {
                tracing::info!("Environment override: HIREGATE_AGENT_HOST={}", val);
                self.spec.agents.default_host = val;
            }
        }

        if let Some(val) = lookup("HIREGATE_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: HIREGATE_PORT={}", port);
                    self.spec.gateway.port = port;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for HIREGATE_PORT: '{}'. Expected a port number. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let health = &self.spec.health;
        if health.interval.is_zero() {
            anyhow::bail!("spec.health.interval must be greater than zero");
        }
        if health.probe_timeout.is_zero() {
            anyhow::bail!("spec.health.probe_timeout must be greater than zero");
        }
        if health.history_size == 0 {
            anyhow::bail!("spec.health.history_size must be at least 1");
        }

        let routing = &self.spec.routing;
        if routing.default_timeout.is_zero() {
            anyhow::bail!("spec.routing.default_timeout must be greater than zero");
        }
        if routing.max_response_bytes == 0 {
            anyhow::bail!("spec.routing.max_response_bytes must be greater than zero");
        }
        for (name, workflow) in [("search", &routing.search), ("handoff", &routing.handoff)] {
            if workflow.capability.trim().is_empty() {
                anyhow::bail!("spec.routing.{}.capability cannot be empty", name);
            }
            if !workflow.endpoint.starts_with('/') {
                anyhow::bail!(
                    "spec.routing.{}.endpoint must start with '/': {}",
                    name,
                    workflow.endpoint
                );
            }
        }

        self.spec.agents.validate()?;

        Ok(())
    }
}
