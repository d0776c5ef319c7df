//! Wall-clock access for TTL and timestamp checks.
//!
//! The engines never call `Utc::now()` directly. They ask a [`Clock`], so that production code reads the system
//! time and tests can pin "now" to an exact millisecond.
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use apisign_common::EpochMillis;
use chrono::Utc;

pub trait Clock: Clone + Send + Sync {
    fn now_millis(&self) -> EpochMillis;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> EpochMillis {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now: EpochMillis) -> Self {
        Self { now: Arc::new(AtomicI64::new(now)) }
    }

    pub fn set(&self, now: EpochMillis) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> EpochMillis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Whether `then` lies more than `ttl_ms` before `now`. An age too large for an `i64` counts as expired.
pub fn older_than(now: EpochMillis, then: EpochMillis, ttl_ms: i64) -> bool {
    now.checked_sub(then).map_or(true, |age| age > ttl_ms)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ages_at_the_edges() {
        assert!(!older_than(10_000, 9_000, 1_000));
        assert!(older_than(10_000, 8_999, 1_000));
        assert!(older_than(10_000, i64::MIN, 1_000));
        assert!(older_than(0, -i64::MAX, i64::MAX - 1));
        assert!(!older_than(0, -i64::MAX, i64::MAX));
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        other.advance(500);
        assert_eq!(clock.now_millis(), 1_500);
        clock.set(42);
        assert_eq!(other.now_millis(), 42);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
