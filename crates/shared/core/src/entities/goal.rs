use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AgentId, RecordId};

/// Which metric a goal tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Profit in quote currency
    Profit,
    /// Win rate in percent
    WinRate,
    /// Number of trades
    TradeCount,
}

/// Goal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Failed,
}

/// A target metric with a derived progress percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: RecordId,
    pub name: String,
    pub goal_type: GoalType,
    pub status: GoalStatus,
    /// Agents the goal is measured over; empty means every agent
    #[serde(default)]
    pub agent_ids: Vec<AgentId>,
    pub target: Decimal,
    /// Stored as zero on creation; displayed progress is always derived
    #[serde(default)]
    pub progress: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Build an active goal with a generated id and zero progress
    pub fn from_config(config: GoalConfig, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: config.name,
            goal_type: config.goal_type,
            status: GoalStatus::Active,
            agent_ids: config.agent_ids,
            target: config.target,
            progress: Decimal::ZERO,
            created_at: timestamp,
        }
    }
}

/// Goal creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    pub name: String,
    pub goal_type: GoalType,
    pub target: Decimal,
    #[serde(default)]
    pub agent_ids: Vec<AgentId>,
}

impl GoalConfig {
    pub fn new(name: impl Into<String>, goal_type: GoalType, target: Decimal) -> Self {
        Self {
            name: name.into(),
            goal_type,
            target,
            agent_ids: Vec::new(),
        }
    }

    /// Restrict the goal to a set of agents
    pub fn for_agents(mut self, agent_ids: Vec<AgentId>) -> Self {
        self.agent_ids = agent_ids;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_goal_from_config_starts_active_at_zero() {
        let config = GoalConfig::new("Make 5k", GoalType::Profit, dec!(5000));
        let goal = Goal::from_config(config, Utc::now());

        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.progress, Decimal::ZERO);
        assert!(!goal.id.is_empty());
    }

    #[test]
    fn test_goal_type_wire_names() {
        let json = serde_json::to_string(&GoalType::WinRate).unwrap();
        assert_eq!(json, "\"win_rate\"");
    }
}
