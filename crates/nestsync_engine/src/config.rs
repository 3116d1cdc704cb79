//! Configuration for the sync engine.

use nestsync_protocol::{EntityType, MergePolicy};
use std::time::Duration;

/// Configuration for a sync orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Entity collections to synchronize, pulled in this order.
    pub collections: Vec<EntityType>,
    /// Maximum number of remote changes per pull request.
    pub pull_batch_size: u32,
    /// Maximum number of pending actions pushed per cycle.
    pub push_batch_size: u32,
    /// Retry budget per pending action before it is dead-lettered.
    pub max_retries: u32,
    /// Interval between automatic sync cycles while idle.
    pub sync_interval: Duration,
    /// Fixed timeout carried by each pull/push call. Transport
    /// implementations apply it; expiry is classified as a transient
    /// failure.
    pub timeout: Duration,
    /// Policy for overlapping field edits.
    pub policy: MergePolicy,
    /// Backoff curve shared by cycle retries and action requeues.
    pub backoff: BackoffConfig,
}

impl SyncConfig {
    /// Creates a configuration for the given collections.
    pub fn new(collections: impl IntoIterator<Item = EntityType>) -> Self {
        Self {
            collections: collections.into_iter().collect(),
            pull_batch_size: 100,
            push_batch_size: 50,
            max_retries: 3,
            sync_interval: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
            policy: MergePolicy::default(),
            backoff: BackoffConfig::default(),
        }
    }

    /// Sets the pull batch size.
    pub fn with_pull_batch_size(mut self, size: u32) -> Self {
        self.pull_batch_size = size;
        self
    }

    /// Sets the push batch size.
    pub fn with_push_batch_size(mut self, size: u32) -> Self {
        self.push_batch_size = size;
        self
    }

    /// Sets the per-action retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the automatic sync interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the merge policy.
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the backoff configuration.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Configuration for backoff behavior under sustained failure.
///
/// Bounded exponential backoff with jitter: the observed remote behavior
/// only fixes a periodic interval, so the curve itself is this crate's
/// documented choice (initial 500 ms, doubling, capped at 60 s, ±25%
/// jitter).
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on the computed delay.
    pub max_delay: Duration,
    /// Multiplier applied per consecutive failure.
    pub multiplier: f64,
    /// Whether to add up to 25% jitter to each delay.
    pub add_jitter: bool,
}

impl BackoffConfig {
    /// Creates a backoff configuration with the default curve.
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// A configuration with zero delays. Retries become immediately
    /// eligible; used by tests and interactive tooling.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Calculates the delay after `attempt` consecutive failures
    /// (1-indexed; attempt 0 means no failure yet and has no delay).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64()
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter, derived without an external RNG.
            let jitter = capped * 0.25 * jitter_fraction();
            Duration::from_secs_f64(capped + jitter)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Pseudo-random fraction in [0, 1) from the wall clock's sub-second
/// nanos.
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
