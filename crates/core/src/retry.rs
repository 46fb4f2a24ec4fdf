// Retry spec, forwarded to the queue service via `_retry`.
// The client never retries on its own; the service executes this.

use std::fmt;

/// Retry-interval growth policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Immediate,
    Fixed { interval: u64 },
    Exponential { exponent: u64 },
}

/// Retry directive for a job.
///
/// Wire form is pipe-delimited: `3`, `3|immediate`, `3|fixed|4`,
/// `3|exponential|4`. A bare count carries no backoff segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    pub count: u32,
    pub backoff: Option<Backoff>,
}

impl Retry {
    /// Retry `count` times with the service's default backoff.
    pub fn count(count: u32) -> Self {
        Self {
            count,
            backoff: None,
        }
    }

    pub fn with_backoff(count: u32, backoff: Backoff) -> Self {
        Self {
            count,
            backoff: Some(backoff),
        }
    }
}

impl fmt::Display for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backoff {
            None => write!(f, "{}", self.count),
            Some(Backoff::Immediate) => write!(f, "{}|immediate", self.count),
            Some(Backoff::Fixed { interval }) => write!(f, "{}|fixed|{}", self.count, interval),
            Some(Backoff::Exponential { exponent }) => {
                write!(f, "{}|exponential|{}", self.count, exponent)
            }
        }
    }
}
