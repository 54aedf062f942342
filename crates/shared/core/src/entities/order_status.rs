use serde::{Deserialize, Serialize};

/// Order lifecycle status as reported by the engine.
///
/// Orders are created `Pending`; only engine events move them to
/// `Filled` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted, not yet executed
    #[default]
    Pending,
    /// Completely executed
    Filled,
    /// Cancelled before execution
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order is still working
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}
