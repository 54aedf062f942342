//! Vantage Sim
//!
//! In-process implementations of the dashboard's collaborator ports:
//!
//! - [`SimEngine`]: an in-memory trading engine acting as the snapshot source
//! - [`ChannelEventBus`]: broadcast-channel event bus
//! - [`MemoryRecordStore`] / [`JsonFileStore`]: farm and goal persistence
//!
//! Used by the runner binary and as test doubles with fault injection.

pub mod bus;
pub mod engine;
pub mod store;

pub use bus::{ChannelEventBus, ChannelEventSubscriber};
pub use engine::SimEngine;
pub use store::{JsonFileStore, MemoryRecordStore};
