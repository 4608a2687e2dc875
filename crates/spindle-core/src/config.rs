use std::time::Duration;

use crate::domain::SpindleError;

/// Engine configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpindleConfig {
    /// How often each instance attempts a poll tick (default: `5s`).
    pub poll_interval: Duration,
    /// TTL of the poll lock (default: `30s`). Must exceed the worst-case
    /// tick duration.
    pub lock_ttl: Duration,
    /// Lock name guarding the poller (default: `pending_task_poller`).
    pub poll_lock_name: String,
    /// Delay applied when a handler keeps a row processing without saying
    /// when to check again (default: `5s`).
    pub rearm_delay: Duration,
    /// Deadline applied to deferred rows that do not set one (default:
    /// `1h`). `0` disables it.
    pub default_deadline: Option<Duration>,
}

impl Default for SpindleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            lock_ttl: Duration::from_secs(30),
            poll_lock_name: "pending_task_poller".to_string(),
            rearm_delay: Duration::from_secs(5),
            default_deadline: Some(Duration::from_secs(3600)),
        }
    }
}

impl SpindleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default               |
    /// |---------------------------------|-----------------------|
    /// | `SPINDLE_POLL_INTERVAL_SECS`    | `5`                   |
    /// | `SPINDLE_LOCK_TTL_SECS`         | `30`                  |
    /// | `SPINDLE_POLL_LOCK_NAME`        | `pending_task_poller` |
    /// | `SPINDLE_REARM_DELAY_SECS`      | `5`                   |
    /// | `SPINDLE_DEFAULT_DEADLINE_SECS` | `3600`                |
    pub fn from_env() -> Result<Self, SpindleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SpindleError> {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| -> Result<Duration, SpindleError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| SpindleError::Config(format!("{key}={raw:?}: {e}"))),
            }
        };

        let default_deadline = secs(
            "SPINDLE_DEFAULT_DEADLINE_SECS",
            defaults.default_deadline.unwrap_or(Duration::ZERO),
        )?;

        let config = Self {
            poll_interval: secs("SPINDLE_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            lock_ttl: secs("SPINDLE_LOCK_TTL_SECS", defaults.lock_ttl)?,
            poll_lock_name: lookup("SPINDLE_POLL_LOCK_NAME")
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.poll_lock_name),
            rearm_delay: secs("SPINDLE_REARM_DELAY_SECS", defaults.rearm_delay)?,
            default_deadline: (!default_deadline.is_zero()).then_some(default_deadline),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SpindleError> {
        if self.poll_interval.is_zero() {
            return Err(SpindleError::Config("poll interval must be positive".into()));
        }
        if self.rearm_delay.is_zero() {
            return Err(SpindleError::Config("rearm delay must be positive".into()));
        }
        if self.poll_lock_name.is_empty() {
            return Err(SpindleError::Config("poll lock name must not be empty".into()));
        }
        if self.lock_ttl <= self.poll_interval {
            return Err(SpindleError::Config(format!(
                "lock ttl ({}s) must exceed poll interval ({}s)",
                self.lock_ttl.as_secs(),
                self.poll_interval.as_secs()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<SpindleConfig, SpindleError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SpindleConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(load(&[]).unwrap(), SpindleConfig::default());
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("SPINDLE_POLL_INTERVAL_SECS", "2"),
            ("SPINDLE_LOCK_TTL_SECS", " 20 "),
            ("SPINDLE_POLL_LOCK_NAME", "media_poller"),
            ("SPINDLE_REARM_DELAY_SECS", "15"),
            ("SPINDLE_DEFAULT_DEADLINE_SECS", "0"),
        ])
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.lock_ttl, Duration::from_secs(20));
        assert_eq!(config.poll_lock_name, "media_poller");
        assert_eq!(config.rearm_delay, Duration::from_secs(15));
        assert_eq!(config.default_deadline, None);
    }

    #[rstest]
    #[case::not_a_number(&[("SPINDLE_POLL_INTERVAL_SECS", "soon")])]
    #[case::negative(&[("SPINDLE_LOCK_TTL_SECS", "-1")])]
    #[case::zero_interval(&[("SPINDLE_POLL_INTERVAL_SECS", "0")])]
    #[case::zero_rearm(&[("SPINDLE_REARM_DELAY_SECS", "0")])]
    #[case::ttl_equals_interval(&[("SPINDLE_POLL_INTERVAL_SECS", "30")])]
    #[case::ttl_below_interval(&[("SPINDLE_LOCK_TTL_SECS", "3")])]
    #[case::empty_lock_name(&[("SPINDLE_POLL_LOCK_NAME", "  ")])]
    fn invalid_values_are_config_errors(#[case] vars: &[(&str, &str)]) {
        let err = load(vars).unwrap_err();
        assert!(matches!(err, SpindleError::Config(_)), "{err}");
    }

    #[test]
    fn parse_error_names_the_variable() {
        let err = load(&[("SPINDLE_REARM_DELAY_SECS", "five")]).unwrap_err();
        assert!(err.to_string().contains("SPINDLE_REARM_DELAY_SECS"));
    }
}
