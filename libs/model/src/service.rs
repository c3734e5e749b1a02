//! Service definitions.

use std::collections::BTreeMap;
use std::time::Duration;

use rollout_id::ServiceId;
use serde::{Deserialize, Serialize};

// =============================================================================
// Container Spec
// =============================================================================

/// What a task runs.
///
/// Equality is structural over every field. Two specs that differ only in
/// the order of `env` entries are different specs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ContainerSpec {
    /// Shorthand for a spec that only names an image.
    pub fn image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// True for a task that was never given a container.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// Update Policy
// =============================================================================

/// How a service rolls out a new spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Maximum replacements in flight. Zero means all dirty tasks at once.
    #[serde(default)]
    pub parallelism: u64,

    /// Pause a worker takes between two replacements.
    #[serde(default, with = "duration_ms")]
    pub delay: Duration,
}

impl UpdateConfig {
    pub fn new(parallelism: u64, delay: Duration) -> Self {
        Self { parallelism, delay }
    }

    /// Number of workers to start for `dirty` stale tasks. Never more than
    /// there are tasks to replace.
    pub fn workers_for(&self, dirty: usize) -> usize {
        match self.parallelism {
            0 => dirty,
            n => usize::try_from(n).unwrap_or(usize::MAX).min(dirty),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// =============================================================================
// Service
// =============================================================================

/// Scheduling mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// A fixed number of replicas placed by the scheduler.
    #[default]
    Replicated,
    /// One task per eligible node. Tasks never move between nodes.
    Fill,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,

    /// Desired container. `None` for a service that has not been given one yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateConfig>,

    #[serde(default)]
    pub mode: ServiceMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub spec: ServiceSpec,
}

impl Service {
    pub fn new(spec: ServiceSpec) -> Self {
        Self {
            id: ServiceId::new(),
            spec,
        }
    }

    pub fn is_fill(&self) -> bool {
        self.spec.mode == ServiceMode::Fill
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_spec_empty() {
        assert!(ContainerSpec::default().is_empty());
        assert!(!ContainerSpec::image("nginx:1.25").is_empty());

        let mut labelled = ContainerSpec::default();
        labelled.labels.insert("tier".into(), "web".into());
        assert!(!labelled.is_empty());
    }

    #[test]
    fn test_workers_for() {
        assert_eq!(UpdateConfig::new(0, Duration::ZERO).workers_for(7), 7);
        assert_eq!(UpdateConfig::new(2, Duration::ZERO).workers_for(7), 2);
        assert_eq!(UpdateConfig::new(9, Duration::ZERO).workers_for(3), 3);
        assert_eq!(UpdateConfig::new(u64::MAX, Duration::ZERO).workers_for(5), 5);
        assert_eq!(UpdateConfig::new(0, Duration::ZERO).workers_for(0), 0);
    }

    #[test]
    fn test_update_config_json() {
        let cfg: UpdateConfig =
            serde_json::from_str(r#"{"parallelism":2,"delay":1500}"#).unwrap();
        assert_eq!(cfg, UpdateConfig::new(2, Duration::from_millis(1500)));

        let defaults: UpdateConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, UpdateConfig::default());
    }

    #[test]
    fn test_service_mode_json() {
        let spec: ServiceSpec =
            serde_json::from_str(r#"{"name":"agent","mode":"fill"}"#).unwrap();
        assert_eq!(spec.mode, ServiceMode::Fill);
        assert!(spec.container.is_none());
    }
}
