//! Time source for row timestamps
//!
//! The stores never read the wall clock themselves; a `Clock` is handed to
//! them at construction so tests can pin `created_at`/`updated_at`.

use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::{Mutex, MutexGuard};

/// Something that can tell the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// RFC 3339 timestamp as stored in the database
    fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant, movable by hand
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Parse an RFC 3339 instant, panicking on bad input (test helper)
    pub fn at(rfc3339: &str) -> Self {
        let now = DateTime::parse_from_rfc3339(rfc3339)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|e| panic!("invalid timestamp {rfc3339}: {e}"));
        Self::new(now)
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.lock() += by;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
