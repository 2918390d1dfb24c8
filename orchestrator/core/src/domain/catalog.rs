// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Descriptor Catalog
//!
//! Static mapping from agent name to network location, purpose and declared
//! capabilities. This is the only configuration the registry is built from.
//!
//! ```yaml
//! default_host: 127.0.0.1
//! entries:
//!   sourcing_agent:
//!     port: 8101
//!     purpose: Finds candidates on job boards
//!     capabilities: [search]
//! ```
//!
//! Entry order is preserved so registry listings follow the catalog.
//! Duplicate names are rejected while parsing.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::domain::agent::{AgentDescriptor, CapabilitySet, DEFAULT_HEALTH_PATH};
use crate::domain::error::CoordinatorError;

/// Definition of one agent as written in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntrySpec {
    /// TCP port the agent listens on
    pub port: u16,

    /// What the agent is for
    pub purpose: String,

    /// Capability tags (e.g. "search", "enrichment")
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Host override; falls back to the catalog's `default_host`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Liveness endpoint override (default: `/health`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_path: Option<String>,
}

/// A named catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub spec: CatalogEntrySpec,
}

/// Ordered catalog entries, (de)serialized as a YAML/JSON mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntries(Vec<CatalogEntry>);

impl CatalogEntries {
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.0.iter()
    }
}

impl Serialize for CatalogEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|entry| (&entry.name, &entry.spec)))
    }
}

impl<'de> Deserialize<'de> for CatalogEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = CatalogEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping from agent name to agent definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                let mut seen = HashSet::new();

                while let Some((name, spec)) = map.next_entry::<String, CatalogEntrySpec>()? {
                    if !seen.insert(name.clone()) {
                        return Err(de::Error::custom(format!(
                            "duplicate agent name '{}' in catalog",
                            name
                        )));
                    }
                    entries.push(CatalogEntry { name, spec });
                }

                Ok(CatalogEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// The static agent catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCatalog {
    /// Host used for entries without an explicit `host`
    #[serde(default = "default_host")]
    pub default_host: String,

    /// Agents keyed by unique name
    #[serde(default)]
    pub entries: CatalogEntries,
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self {
            default_host: default_host(),
            entries: CatalogEntries::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl AgentCatalog {
    /// Append an agent definition (builder style, used by tests and sample config).
    pub fn with_agent<I, S>(mut self, name: &str, port: u16, purpose: &str, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.0.push(CatalogEntry {
            name: name.to_string(),
            spec: CatalogEntrySpec {
                port,
                purpose: purpose.to_string(),
                capabilities: capabilities.into_iter().map(Into::into).collect(),
                host: None,
                health_path: None,
            },
        });
        self
    }

    /// Append a fully specified entry.
    pub fn push(&mut self, name: impl Into<String>, spec: CatalogEntrySpec) {
        self.entries.0.push(CatalogEntry {
            name: name.into(),
            spec,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.0.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Check structural validity. Reachability of agents is never checked here.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.default_host.trim().is_empty() {
            return Err(CoordinatorError::Catalog(
                "default_host cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in self.entries.iter() {
            let name = entry.name.as_str();

            if name.trim().is_empty() {
                return Err(CoordinatorError::Catalog(
                    "agent name cannot be empty".to_string(),
                ));
            }
            if name.chars().any(char::is_whitespace) {
                return Err(CoordinatorError::Catalog(format!(
                    "agent name '{}' cannot contain whitespace",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(CoordinatorError::Catalog(format!(
                    "duplicate agent name '{}'",
                    name
                )));
            }
            if entry.spec.port == 0 {
                return Err(CoordinatorError::Catalog(format!(
                    "agent '{}' must declare a non-zero port",
                    name
                )));
            }
            if entry.spec.purpose.trim().is_empty() {
                return Err(CoordinatorError::Catalog(format!(
                    "agent '{}' must declare a purpose",
                    name
                )));
            }
            if entry.spec.capabilities.iter().any(|c| c.trim().is_empty()) {
                return Err(CoordinatorError::Catalog(format!(
                    "agent '{}' declares an empty capability tag",
                    name
                )));
            }
            if let Some(host) = &entry.spec.host {
                if host.trim().is_empty() {
                    return Err(CoordinatorError::Catalog(format!(
                        "agent '{}' has an empty host",
                        name
                    )));
                }
            }
            if let Some(path) = &entry.spec.health_path {
                if !path.starts_with('/') {
                    return Err(CoordinatorError::Catalog(format!(
                        "agent '{}' health_path must start with '/': {}",
                        name, path
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validate and build one descriptor per entry, in catalog order.
    pub fn descriptors(&self) -> Result<Vec<AgentDescriptor>, CoordinatorError> {
        self.validate()?;

        Ok(self
            .entries
            .iter()
            .map(|entry| {
                let host = entry.spec.host.as_deref().unwrap_or(&self.default_host);
                AgentDescriptor {
                    name: entry.name.clone(),
                    base_url: base_url(host, entry.spec.port),
                    purpose: entry.spec.purpose.clone(),
                    capabilities: CapabilitySet::new(entry.spec.capabilities.iter().cloned()),
                    health_path: entry
                        .spec
                        .health_path
                        .clone()
                        .unwrap_or_else(|| DEFAULT_HEALTH_PATH.to_string()),
                }
            })
            .collect())
    }
}

fn base_url(host: &str, port: u16) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_YAML: &str = r#"
default_host: 10.0.0.5
entries:
  sourcing_agent:
    port: 8101
    purpose: Finds candidates on job boards
    capabilities: [search]
  enrichment_agent:
    port: 8102
    purpose: Adds public profile data
    capabilities: [enrichment, search]
    host: https://enrich.internal
    health_path: /status
"#;

    #[test]
    fn test_parse_preserves_order_and_builds_descriptors() {
        let catalog: AgentCatalog = serde_yaml::from_str(CATALOG_YAML).unwrap();
        assert_eq!(catalog.names(), vec!["sourcing_agent", "enrichment_agent"]);

        let descriptors = catalog.descriptors().unwrap();
        assert_eq!(descriptors[0].base_url, "http://10.0.0.5:8101");
        assert_eq!(descriptors[0].health_path, "/health");
        assert_eq!(descriptors[1].base_url, "https://enrich.internal:8102");
        assert_eq!(descriptors[1].health_url(), "https://enrich.internal:8102/status");
        assert!(descriptors[1].has_capability("enrichment"));
    }

    #[test]
    fn test_duplicate_names_rejected_at_parse() {
        let yaml = r#"
entries:
  alpha: { port: 9001, purpose: a, capabilities: [search] }
  alpha: { port: 9002, purpose: b, capabilities: [search] }
"#;
        assert!(serde_yaml::from_str::<AgentCatalog>(yaml).is_err());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let yaml = r#"
entries:
  alpha: { purpose: a, capabilities: [search] }
"#;
        assert!(serde_yaml::from_str::<AgentCatalog>(yaml).is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_entries() {
        let catalog = AgentCatalog::default().with_agent("alpha", 0, "a", ["search"]);
        assert!(matches!(catalog.validate(), Err(CoordinatorError::Catalog(_))));

        let catalog = AgentCatalog::default()
            .with_agent("alpha", 9001, "a", ["search"])
            .with_agent("alpha", 9002, "b", ["search"]);
        assert!(matches!(catalog.descriptors(), Err(CoordinatorError::Catalog(_))));

        let catalog = AgentCatalog::default().with_agent("", 9001, "a", ["search"]);
        assert!(catalog.validate().is_err());

        let catalog = AgentCatalog::default().with_agent("alpha", 9001, "a", [" "]);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_serialize_roundtrip_keeps_mapping_shape() {
        let catalog = AgentCatalog::default()
            .with_agent("alpha", 9001, "first", ["search"])
            .with_agent("beta", 9002, "second", ["search"]);
        let yaml = serde_yaml::to_string(&catalog).unwrap();
        assert!(yaml.contains("alpha:"));
        let parsed: AgentCatalog = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, catalog);
    }
}
