use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use vantage_core::Timestamp;
use vantage_ports::Clock;

/// Clock frozen at a point in time that only advances explicitly
///
/// Used wherever a test needs stable timestamps, e.g. to compare two
/// aggregation passes or to age the portfolio history.
pub struct ManualClock {
    current_time: RwLock<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at the current wall time
    pub fn new() -> Arc<Self> {
        Self::starting_at(Utc::now())
    }

    /// Create a clock frozen at `time`
    pub fn starting_at(time: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            current_time: RwLock::new(time),
        })
    }

    /// Move time forward by `duration`
    pub fn advance(&self, duration: Duration) {
        *self.current_time.write() += duration;
    }

    /// Explicitly set the time
    ///
    /// Warning: This can cause time discontinuities. Use with caution.
    pub fn set_time(&self, time: Timestamp) {
        *self.current_time.write() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current_time.read()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}
