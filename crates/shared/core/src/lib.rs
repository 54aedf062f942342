//! Vantage Core Domain
//!
//! Pure domain types for the Vantage dashboard engine.
//! This crate contains no async, no I/O, and is 100% unit testable.
//!
//! Agents, orders and positions are owned by the trading engine and are
//! read-only here. Farms and goals are persisted records owned by an
//! external store.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Agents
    Agent,
    AgentConfig,
    AgentId,
    // Events
    EngineEvent,
    // Farms & goals
    Farm,
    FarmConfig,
    FarmStatus,
    Goal,
    GoalConfig,
    GoalStatus,
    GoalType,
    // Orders & positions
    Order,
    OrderDraft,
    OrderId,
    OrderStatus,
    OrderType,
    PerformanceCounters,
    Portfolio,
    Position,
    RecordId,
    Side,
};
pub use values::{
    Percent, Price, PriceMap, Quantity, Symbol, Timestamp, VolumeMap, clamp_percent, ratio_percent,
};
