//! Derived view model shared by every dashboard tab
//!
//! A `DashboardState` is rebuilt from scratch on every refresh pass and
//! handed out as an immutable `Arc`. The only incremental change is the
//! price map, patched on price-push events.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vantage_core::{
    AgentId, FarmStatus, GoalType, Order, Percent, Price, PriceMap, Quantity, RecordId, Side,
    Symbol, Timestamp,
};

/// Whether an agent is currently trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Stopped,
}

impl AgentStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            AgentStatus::Active
        } else {
            AgentStatus::Stopped
        }
    }
}

/// Per-agent derived metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_id: AgentId,
    pub name: String,
    pub status: AgentStatus,
    pub portfolio_value: Decimal,
    /// Portfolio value minus the assumed starting capital
    pub pnl: Decimal,
    /// Verbatim from the engine's counters
    pub win_rate: Percent,
    /// Verbatim from the engine's counters
    pub total_trades: u64,
    pub open_positions: usize,
    /// Share of this agent's filled orders that are in profit at current prices
    pub mark_win_rate: Percent,
}

/// An open position together with its owner and current mark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub agent_id: AgentId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub entry_price: Price,
    /// Current price, or the entry price when the symbol is unpriced
    pub mark_price: Price,
    pub unrealized_pnl: Decimal,
}

/// Aggregated performance of one farm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmProgress {
    pub farm_id: RecordId,
    pub name: String,
    pub status: FarmStatus,
    pub member_count: usize,
    pub active_members: usize,
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    /// Farm PnL against its target, in [0, 100]
    pub progress: Percent,
}

/// Derived progress of one goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_id: RecordId,
    pub name: String,
    pub goal_type: GoalType,
    /// Current value of the tracked metric
    pub current: Decimal,
    pub target: Decimal,
    /// In [0, 100] regardless of overshoot
    pub progress: Percent,
}

/// The single derived view model consumed by all tabs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    pub portfolio_value: Decimal,
    pub total_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub weekly_pnl: Decimal,
    pub monthly_pnl: Decimal,
    pub active_agents: usize,
    pub total_agents: usize,
    pub agents: BTreeMap<AgentId, AgentPerformance>,
    pub open_positions: Vec<OpenPosition>,
    pub pending_orders: Vec<Order>,
    pub executed_orders: Vec<Order>,
    pub win_rate: Percent,
    pub farm_progress: BTreeMap<RecordId, FarmProgress>,
    pub goal_progress: BTreeMap<RecordId, GoalProgress>,
    pub market_prices: PriceMap,
    /// `None` when no volume feed reports the symbol
    pub market_volumes: BTreeMap<Symbol, Option<Quantity>>,
    /// False while the last refresh pass failed
    pub connected: bool,
    /// Snapshot time of the pass that produced this state
    pub last_update: Option<Timestamp>,
}

impl DashboardState {
    /// State shown before the first successful pass
    pub fn empty() -> Self {
        Self {
            portfolio_value: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            daily_pnl: Decimal::ZERO,
            weekly_pnl: Decimal::ZERO,
            monthly_pnl: Decimal::ZERO,
            active_agents: 0,
            total_agents: 0,
            agents: BTreeMap::new(),
            open_positions: Vec::new(),
            pending_orders: Vec::new(),
            executed_orders: Vec::new(),
            win_rate: Decimal::ZERO,
            farm_progress: BTreeMap::new(),
            goal_progress: BTreeMap::new(),
            market_prices: PriceMap::new(),
            market_volumes: BTreeMap::new(),
            connected: false,
            last_update: None,
        }
    }

    /// Copy with `changed` prices merged into the price map, stamped `at`.
    ///
    /// Derived metrics are left as computed by the last full pass.
    pub fn with_prices(&self, changed: &PriceMap, at: Timestamp) -> Self {
        let mut next = self.clone();
        for (symbol, price) in changed {
            next.market_prices.insert(symbol.clone(), *price);
            next.market_volumes.entry(symbol.clone()).or_insert(None);
        }
        next.last_update = Some(at);
        next
    }

    /// Copy of the last good state flagged as disconnected
    pub fn disconnected(&self) -> Self {
        Self {
            connected: false,
            ..self.clone()
        }
    }

    /// Performance of one agent
    pub fn agent(&self, agent_id: &str) -> Option<&AgentPerformance> {
        self.agents.get(agent_id)
    }

    /// Current price of a symbol
    pub fn price(&self, symbol: &str) -> Option<Price> {
        self.market_prices.get(symbol).copied()
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::empty()
    }
}
