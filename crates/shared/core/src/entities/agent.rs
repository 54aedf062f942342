use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{Order, Position};
use crate::values::{Percent, Symbol};

/// Unique identifier for an agent
pub type AgentId = String;

/// Agent holdings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Total portfolio value (cash + marked positions), never negative
    pub total_value: Decimal,
    /// Open positions
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl Portfolio {
    pub fn with_value(total_value: Decimal) -> Self {
        Self {
            total_value,
            positions: Vec::new(),
        }
    }

    /// Total value with the non-negative invariant enforced
    pub fn value(&self) -> Decimal {
        self.total_value.max(Decimal::ZERO)
    }
}

/// Counters maintained by the engine for each agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceCounters {
    /// Win rate in percent as reported by the engine
    pub win_rate: Percent,
    pub total_trades: u64,
}

/// An autonomous trading entity, owned by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub active: bool,
    pub portfolio: Portfolio,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub performance: PerformanceCounters,
}

impl Agent {
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, total_value: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: false,
            portfolio: Portfolio::with_value(total_value),
            orders: Vec::new(),
            performance: PerformanceCounters::default(),
        }
    }

    /// Orders still waiting for execution
    pub fn pending_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.status.is_active())
    }

    /// Orders the engine reported as executed
    pub fn filled_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.is_filled())
    }

    /// Open position on `symbol`, if any
    pub fn position_for(&self, symbol: &str) -> Option<&Position> {
        self.portfolio.positions.iter().find(|p| p.symbol == symbol)
    }
}

/// Agent creation request, forwarded verbatim to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    /// Capital allocated to the agent at creation
    #[serde(default = "default_starting_capital")]
    pub starting_capital: Decimal,
    /// Symbols the agent is allowed to trade
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    /// Free-form strategy label understood by the engine
    #[serde(default)]
    pub strategy: Option<String>,
}

fn default_starting_capital() -> Decimal {
    dec!(10_000)
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            starting_capital: default_starting_capital(),
            symbols: Vec::new(),
            strategy: None,
        }
    }
}
