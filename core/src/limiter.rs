//! Token-bucket admission control
//!
//! One limiter instance is shared by every worker in a run and enforces the
//! global aggregate request rate. The balance refills continuously with
//! elapsed wall-clock time, so admission granularity is not tied to whole
//! time units. Fairness across contending workers is best-effort: the first
//! caller after a refill wins.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// One unit was consumed; the action may proceed now.
    Granted,

    /// The balance is below one unit.
    Denied {
        /// Minimum wait until a re-attempt can succeed.
        retry_after: Duration,
    },
}

impl Admission {
    /// Whether this admission was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted)
    }
}

#[derive(Debug)]
struct Bucket {
    /// Actions allowed per `per`.
    rate: f64,
    /// Refill period in nanoseconds.
    per: f64,
    /// Current balance; fractional, never above `rate`.
    left: f64,
    /// Instant of the last refill.
    last: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last).as_nanos() as f64;
        self.last = now;
        self.left += self.rate * (elapsed / self.per);
    }
}

/// Token-bucket rate limiter allowing `rate` actions per `per` duration
///
/// The whole refill-and-decide sequence runs under one mutex: the decision
/// depends on the balance the refill just produced, so the two cannot be
/// individually atomic.
#[derive(Debug)]
pub struct RateLimiter {
    inner: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` actions per `per` duration, starting
    /// with `initial` actions in the bucket.
    ///
    /// Rates below one action are clamped to one.
    pub fn new(rate: f64, per: Duration, initial: f64) -> Self {
        Self {
            inner: Mutex::new(Bucket {
                rate: rate.max(1.0),
                per: per.as_nanos() as f64,
                left: initial,
                last: Instant::now(),
            }),
        }
    }

    /// Create a limiter that starts with a full bucket.
    pub fn full(rate: f64, per: Duration) -> Self {
        Self::new(rate, per, rate.max(1.0))
    }

    /// Check whether one action may proceed now.
    ///
    /// Refills the balance from elapsed time, then either consumes one unit
    /// or reports the minimum wait until a unit will be available. A balance
    /// that overflowed `rate` is clamped to `rate - 1` as part of the grant,
    /// so the bucket never holds more than `rate - 1` after a grant.
    pub fn admit(&self) -> Admission {
        let now = Instant::now();
        let mut bucket = self.lock();
        bucket.refill(now);

        if bucket.left > bucket.rate {
            bucket.left = bucket.rate - 1.0;
            Admission::Granted
        } else if bucket.left >= 1.0 {
            bucket.left -= 1.0;
            Admission::Granted
        } else {
            let needed = 1.0 - bucket.left;
            let nanos = (needed / (bucket.rate / bucket.per)).ceil();
            Admission::Denied {
                retry_after: Duration::from_nanos(nanos as u64),
            }
        }
    }

    /// Replace the rate without resetting the balance or the refill clock,
    /// allowing live rate changes mid-run.
    pub fn configure(&self, rate: f64, per: Duration) {
        let mut bucket = self.lock();
        bucket.rate = rate.max(1.0);
        bucket.per = per.as_nanos() as f64;
    }

    /// Current balance after a refill. Fractional, never above `rate`.
    pub fn remaining(&self) -> f64 {
        let now = Instant::now();
        let mut bucket = self.lock();
        bucket.refill(now);
        // A long idle stretch can overfill the balance; the capacity bound
        // holds after every operation, not only after a grant.
        if bucket.left > bucket.rate {
            bucket.left = bucket.rate;
        }
        bucket.left
    }

    /// Restart the refill clock without touching the balance.
    ///
    /// Called by the barrier leader once every worker has finished
    /// initialization, so time spent in setup does not accrue tokens.
    pub fn restart(&self) {
        let mut bucket = self.lock();
        bucket.last = Instant::now();
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        // A panic while holding the lock leaves the bucket in a consistent
        // state (all mutation is plain arithmetic), so a poisoned guard is
        // still usable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
