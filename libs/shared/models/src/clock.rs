use chrono::{DateTime, Utc};

/// Injected time source.
///
/// Core code asks the clock instead of calling `Utc::now()` so that booking
/// windows, cancellation notice, and streak math are reproducible in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
