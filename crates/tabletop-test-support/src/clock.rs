//! Test clock — deterministic `Clock` implementation for tests.

use chrono::{DateTime, Utc};
use tabletop_core::clock::Clock;

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
