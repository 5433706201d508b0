// Time Provider Port (for testability)

use chrono::{Local, TimeZone};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Format an epoch-ms timestamp the way arrival times are shown
    fn format_arrival(&self, millis: i64) -> String {
        match Local.timestamp_millis_opt(millis).single() {
            Some(dt) => dt.format("%H:%M:%S").to_string(),
            None => String::new(),
        }
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Manually advanced clock. Displays times in UTC so tests are stable.
    pub struct ManualClock {
        now: AtomicI64,
        step: i64,
    }

    impl ManualClock {
        /// Every `now_millis` call advances the clock by `step` ms afterwards
        pub fn new(start: i64, step: i64) -> Self {
            Self {
                now: AtomicI64::new(start),
                step,
            }
        }

        pub fn set(&self, millis: i64) {
            self.now.store(millis, Ordering::SeqCst);
        }
    }

    impl TimeProvider for ManualClock {
        fn now_millis(&self) -> i64 {
            self.now.fetch_add(self.step, Ordering::SeqCst)
        }

        fn format_arrival(&self, millis: i64) -> String {
            match chrono::Utc.timestamp_millis_opt(millis).single() {
                Some(dt) => dt.format("%H:%M:%S").to_string(),
                None => String::new(),
            }
        }
    }
}
