use serde::{Deserialize, Serialize};

use super::{Agent, Order};
use crate::values::PriceMap;

/// Discrete events pushed by the trading engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EngineEvent {
    /// A new agent was created
    AgentCreated(Agent),
    /// An order was executed
    OrderFilled(Order),
    /// One or more prices changed; carries only the changed symbols
    PricesUpdated(PriceMap),
}

impl EngineEvent {
    /// Name of the event as seen on the bus
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::AgentCreated(_) => "agentCreated",
            EngineEvent::OrderFilled(_) => "orderFilled",
            EngineEvent::PricesUpdated(_) => "pricesUpdated",
        }
    }

    /// True for events that invalidate derived metrics
    pub fn requires_aggregation(&self) -> bool {
        !matches!(self, EngineEvent::PricesUpdated(_))
    }
}
