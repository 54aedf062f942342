//! Vantage Clock Infrastructure
//!
//! Time sources injected into the dashboard hub and action dispatcher:
//!
//! - [`SystemClock`] follows wall-clock time
//! - [`ManualClock`] only moves when told to, for deterministic tests
//!
//! ## Usage
//!
//! ```ignore
//! use vantage_clock::{Clock, ManualClock};
//! use chrono::Duration;
//!
//! let clock = ManualClock::starting_at(start);
//! clock.advance(Duration::hours(25));
//! assert_eq!(clock.now() - start, Duration::hours(25));
//! ```

mod manual;
mod system;

pub use manual::ManualClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use vantage_ports::Clock;
