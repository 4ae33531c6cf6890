use crate::admission::TokenBucket;
use crate::config::{AdmissionConfig, SweepMode};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// What a sweep does with the existing buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPolicy {
    /// Discard every bucket, regardless of activity
    FullReset,

    /// Discard buckets whose caller has been idle for at least `idle_ttl`
    IdleEviction { idle_ttl: Duration },
}

/// Per-caller admission gate
///
/// One token bucket per caller key, created on first use. Buckets live in a
/// single map behind a reader/writer lock; admission takes the exclusive lock
/// because it mutates the bucket, introspection takes the shared lock.
pub struct AdmissionController {
    buckets: RwLock<HashMap<String, TokenBucket>>,
    burst: u32,
    refill_per_minute: u32,
    sweep_interval: Duration,
    policy: SweepPolicy,
}

impl AdmissionController {
    /// Creates a controller from the admission configuration
    pub fn new(config: &AdmissionConfig) -> Self {
        let policy = match config.sweep_policy {
            SweepMode::FullReset => SweepPolicy::FullReset,
            SweepMode::IdleEviction => SweepPolicy::IdleEviction {
                idle_ttl: config.idle_ttl(),
            },
        };

        Self {
            buckets: RwLock::new(HashMap::new()),
            burst: config.burst,
            refill_per_minute: config.refill_per_minute,
            sweep_interval: config.sweep_interval(),
            policy,
        }
    }

    /// Admits or rejects one call for `key`
    pub fn admit(&self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    /// Admits or rejects one call for `key` at the given instant
    pub fn admit_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);

        let allowed = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, self.refill_per_minute, now))
            .try_take(now);

        if !allowed {
            tracing::debug!("Admission denied for {}", key);
        }

        allowed
    }

    /// Tokens currently available to `key`, or `None` if it has no bucket yet
    pub fn remaining(&self, key: &str) -> Option<f64> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets.get(key).map(|b| b.available(Instant::now()))
    }

    /// Number of caller keys currently tracked
    pub fn bucket_count(&self) -> usize {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn policy(&self) -> SweepPolicy {
        self.policy
    }

    /// Runs one sweep now
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Runs one sweep at the given instant, returning how many buckets were dropped
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        let before = buckets.len();

        match self.policy {
            SweepPolicy::FullReset => buckets.clear(),
            SweepPolicy::IdleEviction { idle_ttl } => {
                buckets.retain(|_, bucket| bucket.idle_for(now) < idle_ttl)
            }
        }

        before - buckets.len()
    }

    /// Spawns the periodic sweeper on the current tokio runtime
    ///
    /// The task holds only a weak handle, so it exits once the controller is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::downgrade(self);
        let interval = self.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                let removed = controller.sweep();
                tracing::debug!(
                    "Admission sweep dropped {} buckets ({:?})",
                    removed,
                    controller.policy
                );
            }
        })
    }
}
