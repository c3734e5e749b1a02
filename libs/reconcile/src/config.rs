//! Updater configuration.

use std::time::Duration;

use anyhow::{Context, Result};
use rollout_model::UpdateConfig;

/// Settings shared by every update a supervisor starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// Policy used for services whose spec carries no update policy.
    /// Defaults to unlimited parallelism and no delay.
    pub default_update: UpdateConfig,
}

impl UpdaterConfig {
    /// Load configuration from environment variables.
    ///
    /// - `ROLLOUT_UPDATE_PARALLELISM`: default parallelism (0 = unlimited)
    /// - `ROLLOUT_UPDATE_DELAY_MS`: default delay between replacements
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parallelism = match lookup("ROLLOUT_UPDATE_PARALLELISM") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid ROLLOUT_UPDATE_PARALLELISM: {v:?}"))?,
            None => 0,
        };

        let delay = match lookup("ROLLOUT_UPDATE_DELAY_MS") {
            Some(v) => Duration::from_millis(
                v.trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid ROLLOUT_UPDATE_DELAY_MS: {v:?}"))?,
            ),
            None => Duration::ZERO,
        };

        Ok(Self {
            default_update: UpdateConfig::new(parallelism, delay),
        })
    }

    /// The policy to apply to a service with the given explicit policy.
    pub fn policy_for(&self, explicit: Option<&UpdateConfig>) -> UpdateConfig {
        explicit.copied().unwrap_or(self.default_update)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = UpdaterConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, UpdaterConfig::default());
        assert_eq!(config.default_update.parallelism, 0);
        assert_eq!(config.default_update.delay, Duration::ZERO);
    }

    #[test]
    fn test_reads_values() {
        let config = UpdaterConfig::from_lookup(lookup(&[
            ("ROLLOUT_UPDATE_PARALLELISM", "3"),
            ("ROLLOUT_UPDATE_DELAY_MS", " 250 "),
        ]))
        .unwrap();
        assert_eq!(
            config.default_update,
            UpdateConfig::new(3, Duration::from_millis(250))
        );
    }

    #[test]
    fn test_rejects_garbage() {
        let err = UpdaterConfig::from_lookup(lookup(&[("ROLLOUT_UPDATE_PARALLELISM", "two")]))
            .unwrap_err();
        assert!(err.to_string().contains("ROLLOUT_UPDATE_PARALLELISM"));
    }

    #[test]
    fn test_explicit_policy_wins() {
        let config = UpdaterConfig {
            default_update: UpdateConfig::new(5, Duration::from_secs(1)),
        };
        let explicit = UpdateConfig::new(1, Duration::ZERO);

        assert_eq!(config.policy_for(Some(&explicit)), explicit);
        assert_eq!(config.policy_for(None), config.default_update);
    }
}
