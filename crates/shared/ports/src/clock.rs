use chrono::Duration;
use vantage_core::Timestamp;

/// Port for the time source used to stamp snapshots, records and notices
///
/// The hub and the action dispatcher never read the wall clock directly,
/// so period PnL windows can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Time elapsed on this clock since `earlier`
    fn elapsed_since(&self, earlier: Timestamp) -> Duration {
        self.now() - earlier
    }

    fn name(&self) -> &str {
        "Clock"
    }
}
