use serde::{Deserialize, Serialize};

/// Order types a dashboard user can place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Execute at current market price
    #[default]
    Market,
    /// Execute at specified price or better
    Limit,
}
