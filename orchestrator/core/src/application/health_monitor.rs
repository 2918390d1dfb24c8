// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Health Monitor - background liveness probing of registered agents
//!
//! Every cycle probes all agents concurrently, waits for every probe to
//! finish, then applies the whole batch to the registry in one write. A batch
//! gathered before a re-discovery is dropped.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Keeps registry health current and reports on it

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::registry::{AgentRegistry, HealthObservation, HealthUpdate};
use crate::domain::agent::{AgentRecord, HealthState};
use crate::domain::error::CoordinatorError;
use crate::domain::events::HealthEvent;
use crate::domain::gateway_config::HealthSettings;
use crate::domain::routing::{millis, CallOutcome, FailureKind};
use crate::domain::transport::{AgentTransport, TransportRequest};
use crate::infrastructure::event_bus::EventBus;

/// Configuration for the health monitor
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// Delay between cycles
    pub interval: Duration,

    /// Timeout of each individual probe
    pub probe_timeout: Duration,

    /// Whether the background loop may run
    pub enabled: bool,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self::from(&HealthSettings::default())
    }
}

impl From<&HealthSettings> for HealthMonitorConfig {
    fn from(settings: &HealthSettings) -> Self {
        Self {
            interval: settings.interval,
            probe_timeout: settings.probe_timeout,
            enabled: settings.enabled,
        }
    }
}

/// Map a probe outcome onto a health state.
pub fn classify(outcome: &CallOutcome) -> HealthState {
    match outcome {
        CallOutcome::Success { .. } => HealthState::Healthy,
        CallOutcome::Failure {
            kind: FailureKind::HttpStatus,
            ..
        } => HealthState::Unhealthy,
        CallOutcome::Failure {
            kind: FailureKind::Timeout | FailureKind::Unavailable,
            ..
        } => HealthState::Unreachable,
    }
}

/// Agent counts per health state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub unreachable: usize,
    pub unknown: usize,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

impl StatusSummary {
    pub fn count(&self, state: HealthState) -> usize {
        match state {
            HealthState::Healthy => self.healthy,
            HealthState::Unhealthy => self.unhealthy,
            HealthState::Unreachable => self.unreachable,
            HealthState::Unknown => self.unknown,
        }
    }

    fn tally<'a>(records: impl IntoIterator<Item = &'a Arc<AgentRecord>>) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.total += 1;
            match record.current_state {
                HealthState::Healthy => summary.healthy += 1,
                HealthState::Unhealthy => summary.unhealthy += 1,
                HealthState::Unreachable => summary.unreachable += 1,
                HealthState::Unknown => summary.unknown += 1,
            }
        }
        summary
    }
}

struct MonitorTask {
    shutdown_token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct FailureMirror {
    generation: u64,
    counts: HashMap<String, u32>,
}

pub struct HealthMonitor {
    registry: Arc<AgentRegistry>,
    transport: Arc<dyn AgentTransport>,
    event_bus: EventBus,
    config: HealthMonitorConfig,
    failures: RwLock<FailureMirror>,
    cycles_completed: AtomicU64,
    last_cycle_at: RwLock<Option<DateTime<Utc>>>,
    task: Mutex<Option<MonitorTask>>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<AgentRegistry>,
        transport: Arc<dyn AgentTransport>,
        event_bus: EventBus,
        config: HealthMonitorConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            event_bus,
            config,
            failures: RwLock::new(FailureMirror::default()),
            cycles_completed: AtomicU64::new(0),
            last_cycle_at: RwLock::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &HealthMonitorConfig {
        &self.config
    }

    /// Spawn the background loop.
    ///
    /// Returns `false` without spawning when disabled or already running.
    pub fn start(self: &Arc<Self>) -> bool {
        if !self.config.enabled {
            warn!("Health monitor is disabled by configuration; not starting");
            return false;
        }

        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            warn!("Health monitor is already running");
            return false;
        }

        let shutdown_token = CancellationToken::new();
        let monitor = Arc::clone(self);
        let token = shutdown_token.clone();
        let handle = tokio::spawn(async move {
            monitor.run(token).await;
        });

        *task = Some(MonitorTask {
            shutdown_token,
            handle,
        });
        true
    }

    /// Cancel the loop and wait for it to exit.
    ///
    /// A cycle already in progress completes and is applied first.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        let Some(task) = task else {
            debug!("Health monitor stop requested while not running");
            return;
        };

        task.shutdown_token.cancel();
        if let Err(e) = task.handle.await {
            warn!("Health monitor task ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    async fn run(&self, shutdown_token: CancellationToken) {
        info!(
            interval_ms = millis(self.config.interval),
            probe_timeout_ms = millis(self.config.probe_timeout),
            "Starting health monitor background task"
        );

        let mut tick = interval(self.config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping health monitor");
                    break;
                }
                _ = tick.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        info!("Health monitor background task stopped");
    }

    /// Probe every registered agent once and apply the results.
    ///
    /// Returns `None` when the results were discarded because the registry
    /// was re-discovered mid-cycle.
    pub async fn run_cycle(&self) -> Option<StatusSummary> {
        let started = Instant::now();
        let generation = self.registry.generation();
        let records = self.registry.list(None, None);

        debug!(agent_count = records.len(), generation, "Running health cycle");

        let observations = join_all(records.iter().map(|record| self.probe(record))).await;

        let cycle = self.cycles_completed.load(Ordering::Relaxed) + 1;
        let Some(updates) = self.registry.apply_health_results(generation, &observations) else {
            warn!(cycle, "Registry re-discovered during health cycle; results discarded");
            self.event_bus.publish_health_event(HealthEvent::HealthCycleDiscarded {
                cycle,
                discarded_at: Utc::now(),
            });
            return None;
        };

        for update in &updates {
            self.record_update(generation, update);
        }

        let completed_at = Utc::now();
        self.cycles_completed.store(cycle, Ordering::Relaxed);
        *self.last_cycle_at.write() = Some(completed_at);

        let summary = self.get_status_summary();
        for state in HealthState::ALL {
            metrics::gauge!("hiregate_agents", "state" => state.as_str())
                .set(summary.count(state) as f64);
        }

        let duration_ms = millis(started.elapsed());
        info!(
            cycle,
            healthy = summary.healthy,
            unhealthy = summary.unhealthy,
            unreachable = summary.unreachable,
            duration_ms,
            "Health cycle completed"
        );
        self.event_bus.publish_health_event(HealthEvent::HealthCycleCompleted {
            cycle,
            healthy: summary.healthy,
            unhealthy: summary.unhealthy,
            unreachable: summary.unreachable,
            unknown: summary.unknown,
            duration_ms,
            completed_at,
        });

        Some(summary)
    }

    /// Probe one agent immediately and apply the result.
    ///
    /// A result gathered before a re-discovery is dropped and the current
    /// record returned instead.
    pub async fn check_agent(&self, name: &str) -> Result<Arc<AgentRecord>, CoordinatorError> {
        let generation = self.registry.generation();
        let record = self.registry.get(name)?;
        let observation = self.probe(&record).await;

        let Some(mut updates) = self
            .registry
            .apply_health_results(generation, std::slice::from_ref(&observation))
        else {
            debug!(agent = name, "Registry re-discovered during check; result discarded");
            return self.registry.get(name);
        };
        let update = updates
            .pop()
            .ok_or_else(|| CoordinatorError::AgentNotFound(name.to_string()))?;
        self.record_update(generation, &update);

        Ok(update.record)
    }

    async fn probe(&self, record: &AgentRecord) -> HealthObservation {
        let timeout = self.config.probe_timeout;
        let request = TransportRequest::get(record.descriptor.health_url(), timeout);

        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.transport.send(&request))
            .await
            .unwrap_or_else(|_| CallOutcome::timeout(timeout));
        let elapsed_ms = millis(started.elapsed());

        let state = classify(&outcome);
        let latency_ms = match state {
            HealthState::Unreachable => None,
            _ => Some(elapsed_ms),
        };

        metrics::counter!(
            "hiregate_health_probes_total",
            "agent" => record.name().to_string(),
            "state" => state.as_str()
        )
        .increment(1);
        if let Some(latency) = latency_ms {
            metrics::histogram!("hiregate_health_probe_latency_ms", "agent" => record.name().to_string())
                .record(latency as f64);
        }

        if let CallOutcome::Failure { message, .. } = &outcome {
            debug!(agent = record.name(), state = %state, "Health probe failed: {}", message);
        }

        HealthObservation {
            agent_name: record.name().to_string(),
            state,
            latency_ms,
            checked_at: Utc::now(),
        }
    }

    fn record_update(&self, generation: u64, update: &HealthUpdate) {
        let record = &update.record;
        {
            let mut mirror = self.failures.write();
            if mirror.generation != generation {
                mirror.generation = generation;
                mirror.counts.clear();
            }
            mirror
                .counts
                .insert(record.name().to_string(), record.consecutive_failures);
        }

        if !update.changed() {
            return;
        }

        if record.current_state.is_critical() {
            warn!(
                agent = record.name(),
                previous = %update.previous,
                current = %record.current_state,
                consecutive_failures = record.consecutive_failures,
                "Agent health degraded"
            );
        } else {
            info!(
                agent = record.name(),
                previous = %update.previous,
                current = %record.current_state,
                "Agent health changed"
            );
        }

        self.event_bus.publish_health_event(HealthEvent::AgentStateChanged {
            agent: record.name().to_string(),
            previous: update.previous,
            current: record.current_state,
            consecutive_failures: record.consecutive_failures,
            changed_at: record.last_checked_at.unwrap_or_else(Utc::now),
        });
    }

    /// Consecutive failures observed by this monitor for an agent.
    pub fn failure_count(&self, name: &str) -> u32 {
        self.failures.read().counts.get(name).copied().unwrap_or(0)
    }

    /// Agents currently `Unhealthy` or `Unreachable`, in catalog order.
    pub fn get_critical_agents(&self) -> Vec<Arc<AgentRecord>> {
        self.registry
            .list(None, None)
            .into_iter()
            .filter(|record| record.current_state.is_critical())
            .collect()
    }

    pub fn get_status_summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::tally(&self.registry.list(None, None));
        summary.cycles_completed = self.cycles_completed.load(Ordering::Relaxed);
        summary.last_cycle_at = *self.last_cycle_at.read();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::AgentCatalog;
    use async_trait::async_trait;
    use serde_json::json;

    /// Answers by port: 9001 healthy, 9002 HTTP 503, anything else refused.
    struct PortTransport;

    #[async_trait]
    impl AgentTransport for PortTransport {
        async fn send(&self, request: &TransportRequest) -> CallOutcome {
            if request.url.contains(":9001/") {
                CallOutcome::from_status(200, Some(json!({"status": "ok"})))
            } else if request.url.contains(":9002/") {
                CallOutcome::from_status(503, None)
            } else {
                CallOutcome::unavailable("connection refused")
            }
        }
    }

    /// Never answers; the probe timeout must fire.
    struct StalledTransport;

    #[async_trait]
    impl AgentTransport for StalledTransport {
        async fn send(&self, _request: &TransportRequest) -> CallOutcome {
            std::future::pending().await
        }
    }

    /// Answers 200 after a fixed delay.
    struct SlowTransport(Duration);

    #[async_trait]
    impl AgentTransport for SlowTransport {
        async fn send(&self, _request: &TransportRequest) -> CallOutcome {
            tokio::time::sleep(self.0).await;
            CallOutcome::from_status(200, None)
        }
    }

    /// Re-discovers the registry while the probe is in flight, then fails.
    struct RediscoveringTransport(Arc<AgentRegistry>);

    #[async_trait]
    impl AgentTransport for RediscoveringTransport {
        async fn send(&self, _request: &TransportRequest) -> CallOutcome {
            self.0.discover().unwrap();
            CallOutcome::unavailable("connection refused")
        }
    }

    fn monitor_with(transport: Arc<dyn AgentTransport>, config: HealthMonitorConfig) -> Arc<HealthMonitor> {
        let catalog = AgentCatalog::default()
            .with_agent("alpha", 9001, "healthy agent", ["search"])
            .with_agent("beta", 9002, "failing agent", ["search"])
            .with_agent("gamma", 9003, "absent agent", ["screening"]);
        let registry = Arc::new(AgentRegistry::new(catalog, 10));
        registry.discover().unwrap();
        Arc::new(HealthMonitor::new(registry, transport, EventBus::new(64), config))
    }

    fn fast_config() -> HealthMonitorConfig {
        HealthMonitorConfig {
            interval: Duration::from_millis(20),
            probe_timeout: Duration::from_millis(50),
            enabled: true,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&CallOutcome::from_status(204, None)), HealthState::Healthy);
        assert_eq!(classify(&CallOutcome::from_status(500, None)), HealthState::Unhealthy);
        assert_eq!(classify(&CallOutcome::from_status(404, None)), HealthState::Unhealthy);
        assert_eq!(
            classify(&CallOutcome::timeout(Duration::from_secs(1))),
            HealthState::Unreachable
        );
        assert_eq!(classify(&CallOutcome::unavailable("refused")), HealthState::Unreachable);
    }

    #[tokio::test]
    async fn test_cycle_classifies_every_agent() {
        let monitor = monitor_with(Arc::new(PortTransport), fast_config());
        let mut events = monitor.event_bus.subscribe();

        let summary = monitor.run_cycle().await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.healthy, 1);
        assert_eq!(summary.unhealthy, 1);
        assert_eq!(summary.unreachable, 1);
        assert_eq!(summary.cycles_completed, 1);

        let beta = monitor.registry.get("beta").unwrap();
        assert_eq!(beta.consecutive_failures, 1);
        assert!(beta.last_latency_ms.is_some());
        let gamma = monitor.registry.get("gamma").unwrap();
        assert_eq!(gamma.last_latency_ms, None);

        let critical: Vec<String> = monitor
            .get_critical_agents()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(critical, vec!["beta", "gamma"]);

        // Three transitions out of Unknown, then the cycle summary
        let mut state_changes = 0;
        for _ in 0..4 {
            if let crate::infrastructure::event_bus::DomainEvent::Health(
                HealthEvent::AgentStateChanged { .. },
            ) = events.recv().await.unwrap()
            {
                state_changes += 1;
            }
        }
        assert_eq!(state_changes, 3);
    }

    #[tokio::test]
    async fn test_failure_counts_accumulate() {
        let monitor = monitor_with(Arc::new(PortTransport), fast_config());
        monitor.run_cycle().await.unwrap();
        monitor.run_cycle().await.unwrap();

        assert_eq!(monitor.failure_count("alpha"), 0);
        assert_eq!(monitor.failure_count("beta"), 2);
        assert_eq!(monitor.failure_count("gamma"), 2);
        assert_eq!(monitor.registry.history("beta").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stalled_probe_times_out() {
        let monitor = monitor_with(Arc::new(StalledTransport), fast_config());
        let summary = monitor.run_cycle().await.unwrap();
        assert_eq!(summary.unreachable, 3);
    }

    #[tokio::test]
    async fn test_probes_run_concurrently() {
        let monitor = monitor_with(Arc::new(StalledTransport), fast_config());

        let started = Instant::now();
        let summary = monitor.run_cycle().await.unwrap();
        let elapsed = started.elapsed();

        // Three 50ms timeouts awaited one after another would take 150ms
        assert_eq!(summary.unreachable, 3);
        assert!(elapsed < Duration::from_millis(140), "cycle took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_stop_applies_in_flight_cycle() {
        let config = HealthMonitorConfig {
            interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(1),
            enabled: true,
        };
        let monitor = monitor_with(Arc::new(SlowTransport(Duration::from_millis(80))), config);

        // The first tick fires immediately, so a cycle is in flight here
        assert!(monitor.start());
        tokio::time::sleep(Duration::from_millis(20)).await;
        monitor.stop().await;

        assert!(!monitor.is_running());
        let summary = monitor.get_status_summary();
        assert_eq!(summary.cycles_completed, 1);
        assert_eq!(summary.healthy, 3);
        assert!(summary.last_cycle_at.is_some());
        assert_eq!(monitor.registry.history("alpha").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_check_discards_result_after_rediscovery() {
        let catalog = AgentCatalog::default().with_agent("alpha", 9001, "a", ["search"]);
        let registry = Arc::new(AgentRegistry::new(catalog, 10));
        registry.discover().unwrap();
        let monitor = HealthMonitor::new(
            Arc::clone(&registry),
            Arc::new(RediscoveringTransport(Arc::clone(&registry))),
            EventBus::new(16),
            fast_config(),
        );

        let record = monitor.check_agent("alpha").await.unwrap();

        assert_eq!(registry.generation(), 2);
        assert_eq!(record.current_state, HealthState::Unknown);
        assert_eq!(record.consecutive_failures, 0);
        assert!(registry.history("alpha").unwrap().is_empty());
        assert_eq!(monitor.failure_count("alpha"), 0);
    }

    #[tokio::test]
    async fn test_check_agent() {
        let monitor = monitor_with(Arc::new(PortTransport), fast_config());

        let record = monitor.check_agent("alpha").await.unwrap();
        assert_eq!(record.current_state, HealthState::Healthy);
        assert_eq!(monitor.registry.get("beta").unwrap().current_state, HealthState::Unknown);

        assert!(matches!(
            monitor.check_agent("ghost").await,
            Err(CoordinatorError::AgentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_start_stop_restart() {
        let monitor = monitor_with(Arc::new(PortTransport), fast_config());

        assert!(monitor.start());
        assert!(!monitor.start());
        tokio::time::sleep(Duration::from_millis(60)).await;
        monitor.stop().await;
        assert!(!monitor.is_running());

        let cycles = monitor.get_status_summary().cycles_completed;
        assert!(cycles >= 1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(monitor.get_status_summary().cycles_completed, cycles);

        assert!(monitor.start());
        assert!(monitor.is_running());
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_disabled_monitor_does_not_start() {
        let config = HealthMonitorConfig {
            enabled: false,
            ..fast_config()
        };
        let monitor = monitor_with(Arc::new(PortTransport), config);
        assert!(!monitor.start());
        assert!(!monitor.is_running());
        monitor.stop().await;
    }
}
