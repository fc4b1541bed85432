//! Operator configuration.

use std::time::Duration;

/// Tunables for the reconcile workers and the convergence verifier.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Interval between route-sampling rounds in the verifier
    pub sample_interval: Duration,

    /// How long an idle worker waits before re-deriving state anyway
    pub idle_repoll: Duration,

    /// Snapshots older than this are not acted upon
    pub snapshot_max_age: Duration,

    /// How long a single add/remove step may take to show up in the mesh
    pub step_timeout: Duration,

    /// First retry delay after a failed executor call
    pub backoff_base: Duration,

    /// Retry delays double up to this cap
    pub backoff_max: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl OperatorConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            sample_interval: env_secs("FLOTILLA_SAMPLE_INTERVAL_SECS", 3),
            idle_repoll: env_secs("FLOTILLA_IDLE_REPOLL_SECS", 10),
            snapshot_max_age: env_secs("FLOTILLA_SNAPSHOT_MAX_AGE_SECS", 30),
            step_timeout: env_secs("FLOTILLA_STEP_TIMEOUT_SECS", 120),
            backoff_base: env_millis("FLOTILLA_BACKOFF_BASE_MILLIS", 500),
            backoff_max: env_secs("FLOTILLA_BACKOFF_MAX_SECS", 30),
        }
    }
}

fn env_secs(var: &str, default: u64) -> Duration {
    Duration::from_secs(env_u64(var, default))
}

fn env_millis(var: &str, default: u64) -> Duration {
    Duration::from_millis(env_u64(var, default))
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .map(|s| s.parse().unwrap_or_else(|_| panic!("Invalid {var}")))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = OperatorConfig::from_env();
        assert!(config.backoff_base < config.backoff_max);
        assert!(config.sample_interval < config.step_timeout);
        assert!(config.snapshot_max_age > config.sample_interval);
    }
}
