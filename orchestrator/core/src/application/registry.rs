// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Registry
//!
//! In-memory view of every catalog agent together with its current health.
//!
//! All state sits behind one [`parking_lot::RwLock`] that is never held across
//! an `.await`. Discovery swaps the whole map at once, so readers observe
//! either the previous population or the new one. Health updates replace a
//! single record's `Arc` wholesale; readers keep the snapshot they already
//! hold.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::agent::{AgentRecord, HealthHistoryEntry, HealthState};
use crate::domain::catalog::AgentCatalog;
use crate::domain::error::CoordinatorError;
use crate::domain::events::RegistryEvent;
use crate::infrastructure::event_bus::EventBus;

/// One probe result to apply to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthObservation {
    pub agent_name: String,
    pub state: HealthState,
    pub latency_ms: Option<u64>,
    pub checked_at: DateTime<Utc>,
}

/// Outcome of applying one [`HealthObservation`].
#[derive(Debug, Clone)]
pub struct HealthUpdate {
    pub previous: HealthState,
    pub record: Arc<AgentRecord>,
}

impl HealthUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.record.current_state
    }
}

struct RegistryEntry {
    record: Arc<AgentRecord>,
    history: VecDeque<HealthHistoryEntry>,
}

#[derive(Default)]
struct RegistryState {
    order: Vec<String>,
    entries: HashMap<String, RegistryEntry>,
    generation: u64,
}

pub struct AgentRegistry {
    catalog: AgentCatalog,
    history_size: usize,
    state: RwLock<RegistryState>,
    event_bus: Option<EventBus>,
}

impl AgentRegistry {
    /// Empty registry; call [`discover`](Self::discover) to populate it.
    pub fn new(catalog: AgentCatalog, history_size: usize) -> Self {
        Self {
            catalog,
            history_size: history_size.max(1),
            state: RwLock::new(RegistryState::default()),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Rebuild the registry from the catalog.
    ///
    /// Every agent starts `Unknown` with empty history. Never contacts agents.
    pub fn discover(&self) -> Result<usize, CoordinatorError> {
        let descriptors = self.catalog.descriptors()?;

        let mut order = Vec::with_capacity(descriptors.len());
        let mut entries = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            order.push(descriptor.name.clone());
            entries.insert(
                descriptor.name.clone(),
                RegistryEntry {
                    record: Arc::new(AgentRecord::new(descriptor)),
                    history: VecDeque::with_capacity(self.history_size),
                },
            );
        }
        let count = order.len();

        let generation = {
            let mut state = self.state.write();
            state.order = order;
            state.entries = entries;
            state.generation += 1;
            state.generation
        };

        info!(agent_count = count, generation, "Agent registry discovered");
        metrics::gauge!("hiregate_registered_agents").set(count as f64);

        if let Some(bus) = &self.event_bus {
            bus.publish_registry_event(RegistryEvent::AgentsDiscovered {
                agent_count: count,
                generation,
                discovered_at: Utc::now(),
            });
        }

        Ok(count)
    }

    pub fn get(&self, name: &str) -> Result<Arc<AgentRecord>, CoordinatorError> {
        self.state
            .read()
            .entries
            .get(name)
            .map(|entry| Arc::clone(&entry.record))
            .ok_or_else(|| CoordinatorError::AgentNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().entries.contains_key(name)
    }

    /// Records in catalog order, optionally filtered by capability and state.
    pub fn list(
        &self,
        capability: Option<&str>,
        state: Option<HealthState>,
    ) -> Vec<Arc<AgentRecord>> {
        let guard = self.state.read();
        guard
            .order
            .iter()
            .filter_map(|name| guard.entries.get(name))
            .map(|entry| &entry.record)
            .filter(|record| capability.is_none_or(|c| record.descriptor.has_capability(c)))
            .filter(|record| state.is_none_or(|s| record.current_state == s))
            .cloned()
            .collect()
    }

    /// Apply one probe result; the single mutation entry point for health.
    pub fn apply_health_result(
        &self,
        name: &str,
        state: HealthState,
        latency_ms: Option<u64>,
    ) -> Result<HealthUpdate, CoordinatorError> {
        let observation = HealthObservation {
            agent_name: name.to_string(),
            state,
            latency_ms,
            checked_at: Utc::now(),
        };
        let mut guard = self.state.write();
        Self::apply_locked(&mut guard, self.history_size, &observation)
            .ok_or_else(|| CoordinatorError::AgentNotFound(name.to_string()))
    }

    /// Apply a whole probe cycle atomically.
    ///
    /// Returns `None`, applying nothing, when the registry was re-discovered
    /// after `generation` was read.
    pub fn apply_health_results(
        &self,
        generation: u64,
        observations: &[HealthObservation],
    ) -> Option<Vec<HealthUpdate>> {
        let mut guard = self.state.write();
        if guard.generation != generation {
            debug!(
                expected = generation,
                current = guard.generation,
                "Discarding stale health observations"
            );
            return None;
        }

        Some(
            observations
                .iter()
                .filter_map(|obs| Self::apply_locked(&mut guard, self.history_size, obs))
                .collect(),
        )
    }

    fn apply_locked(
        state: &mut RegistryState,
        history_size: usize,
        observation: &HealthObservation,
    ) -> Option<HealthUpdate> {
        let entry = state.entries.get_mut(&observation.agent_name)?;
        let previous = entry.record.current_state;

        let record = Arc::new(entry.record.with_health_result(
            observation.state,
            observation.latency_ms,
            observation.checked_at,
        ));
        entry.record = Arc::clone(&record);

        if entry.history.len() >= history_size {
            entry.history.pop_front();
        }
        entry.history.push_back(HealthHistoryEntry {
            timestamp: observation.checked_at,
            state: observation.state,
            latency_ms: observation.latency_ms,
        });

        Some(HealthUpdate { previous, record })
    }

    /// Health history, oldest first.
    pub fn history(&self, name: &str) -> Result<Vec<HealthHistoryEntry>, CoordinatorError> {
        self.state
            .read()
            .entries
            .get(name)
            .map(|entry| entry.history.iter().cloned().collect())
            .ok_or_else(|| CoordinatorError::AgentNotFound(name.to_string()))
    }

    /// Incremented on every successful discovery.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn names(&self) -> Vec<String> {
        self.state.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn catalog(&self) -> &AgentCatalog {
        &self.catalog
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }
}
