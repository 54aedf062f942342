//! Vantage Ports
//!
//! Port definitions (traits) for the Vantage dashboard engine.
//! These define the boundaries between the dashboard core and the
//! collaborators it does not own: the trading engine, its event bus and
//! the farm/goal record store.

mod clock;
mod error;
mod events;
mod source;
mod store;

pub use clock::Clock;
pub use error::{SourceError, SourceResult, StoreError, StoreResult};
pub use events::{EventBus, EventSubscriber};
pub use source::SnapshotSource;
pub use store::RecordStore;
