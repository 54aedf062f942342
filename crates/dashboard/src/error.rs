//! Dashboard errors

use thiserror::Error;
use vantage_ports::{SourceError, StoreError};

/// Errors from a refresh pass or a subscription
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Snapshot source error: {0}")]
    Source(#[from] SourceError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Subscription closed")]
    Unsubscribed,
}

/// Errors returned by dispatched actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Snapshot source error: {0}")]
    Source(#[from] SourceError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

impl ActionError {
    /// True when the action was rejected before any write was attempted
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ActionError::UnknownSymbol(_)
                | ActionError::UnknownAgent(_)
                | ActionError::InvalidQuantity(_)
                | ActionError::InvalidPrice(_)
                | ActionError::InvalidRecord(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;
