use async_trait::async_trait;
use vantage_core::{Agent, AgentConfig, AgentId, Order, PriceMap, VolumeMap};

use crate::error::SourceResult;

/// Port for the trading engine that owns agents, orders, positions and prices
///
/// Read-only from the dashboard's perspective except for the explicit
/// write operations forwarded by the action dispatcher.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// All agents with their portfolios, orders and counters
    async fn all_agents(&self) -> SourceResult<Vec<Agent>>;

    /// Current price per symbol
    async fn current_prices(&self) -> SourceResult<PriceMap>;

    /// Current traded volume per symbol
    ///
    /// Engines without a volume feed keep the default, which reports
    /// every volume as unavailable.
    async fn current_volumes(&self) -> SourceResult<VolumeMap> {
        Ok(VolumeMap::new())
    }

    /// Submit an already validated order
    async fn place_order(&self, order: Order) -> SourceResult<()>;

    /// Create a new agent
    async fn create_agent(&self, config: AgentConfig) -> SourceResult<Agent>;

    /// Start trading for an agent
    async fn start_agent(&self, agent_id: &AgentId) -> SourceResult<()>;

    /// Stop trading for an agent
    async fn stop_agent(&self, agent_id: &AgentId) -> SourceResult<()>;

    /// Get the source's name/identifier for debugging
    fn name(&self) -> &str {
        "SnapshotSource"
    }
}
