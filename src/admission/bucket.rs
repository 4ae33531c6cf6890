use std::time::{Duration, Instant};

/// Token bucket for a single caller key
///
/// The fill level is tracked in nanoseconds of accrued refill time rather than
/// fractional tokens: one token equals one emission interval
/// (`60s / refill_per_minute`). Integer arithmetic keeps repeated small
/// refills exact. A fresh bucket starts full, so a new caller may burst
/// `capacity` requests at once.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    emission_interval_ns: u128,
    capacity_ns: u128,
    level_ns: u128,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    /// Creates a full bucket
    pub fn new(capacity: u32, refill_per_minute: u32, now: Instant) -> Self {
        let emission_interval_ns =
            Duration::from_secs(60).as_nanos() / u128::from(refill_per_minute.max(1));
        let capacity_ns = emission_interval_ns * u128::from(capacity);

        Self {
            emission_interval_ns,
            capacity_ns,
            level_ns: capacity_ns,
            last_refill: now,
            last_seen: now,
        }
    }

    /// Attempts to take one token
    ///
    /// Returns `true` if a token was available. The caller's last-seen time
    /// is updated either way.
    pub fn try_take(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.last_seen = self.last_seen.max(now);

        if self.level_ns >= self.emission_interval_ns {
            self.level_ns -= self.emission_interval_ns;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, without mutating the bucket
    pub fn available(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill).as_nanos();
        let level = (self.level_ns + elapsed).min(self.capacity_ns);
        level as f64 / self.emission_interval_ns as f64
    }

    /// How long this bucket has gone without a request
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    fn refill(&mut self, now: Instant) {
        // Instants earlier than the last refill add nothing
        if now <= self.last_refill {
            return;
        }
        let elapsed = now.duration_since(self.last_refill).as_nanos();
        self.level_ns = (self.level_ns + elapsed).min(self.capacity_ns);
        self.last_refill = now;
    }
}
