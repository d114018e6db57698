//! Injected time source so lifecycle-timing tests (7-day expiry,
//! settlement T+2) run instantly instead of sleeping.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock with an explicit, independently advanceable time.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(start) })
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }

    pub fn set(&self, new_now: DateTime<Utc>) {
        *self.now.lock().unwrap() = new_now;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_independently_of_wall_time() {
        let clock = TestClock::new(DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().into());
        let start = clock.now();
        clock.advance(chrono::Duration::days(7) + chrono::Duration::seconds(1));
        assert_eq!(clock.now() - start, chrono::Duration::days(7) + chrono::Duration::seconds(1));
    }
}
