use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AgentId;

/// Identifier of a persisted record (farm or goal)
pub type RecordId = String;

/// Farm lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FarmStatus {
    #[default]
    Active,
    Paused,
    Stopped,
}

/// A named grouping of agents with aggregated performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub id: RecordId,
    pub name: String,
    pub status: FarmStatus,
    #[serde(default)]
    pub agent_ids: Vec<AgentId>,
    /// Profit target for the whole farm
    pub target: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Farm {
    /// Build an active farm with a generated id
    pub fn from_config(config: FarmConfig, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: config.name,
            status: FarmStatus::Active,
            agent_ids: config.agent_ids,
            target: config.target,
            created_at: timestamp,
        }
    }
}

/// Farm creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmConfig {
    pub name: String,
    #[serde(default)]
    pub agent_ids: Vec<AgentId>,
    #[serde(default)]
    pub target: Decimal,
}

impl FarmConfig {
    pub fn new(name: impl Into<String>, agent_ids: Vec<AgentId>, target: Decimal) -> Self {
        Self {
            name: name.into(),
            agent_ids,
            target,
        }
    }
}
