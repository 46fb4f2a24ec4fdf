// Time Provider Port (for deterministic direct-mode timestamps in tests)

use chrono::{DateTime, Utc};

/// Time provider interface. Direct mode stamps deliveries with a
/// locally-observed start time.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
