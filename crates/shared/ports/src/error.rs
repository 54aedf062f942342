use thiserror::Error;

/// Errors raised by the trading engine ports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Snapshot source unavailable: {0}")]
    Unavailable(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Order rejected by engine: {0}")]
    Rejected(String),

    #[error("Snapshot source timed out after {0} ms")]
    Timeout(u64),

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Errors raised by the persisted record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record id: {0}")]
    Duplicate(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
