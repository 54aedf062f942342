//! Vantage Dashboard Engine
//!
//! Turns raw agent/order/position records into the derived metrics every
//! dashboard tab displays, and keeps any number of tabs live without each
//! one querying the trading engine on its own:
//!
//! - **Metric Aggregator**: pure `Snapshot -> DashboardState` computation
//! - **Subscription Hub**: one shared refresh loop, per-tab disposers,
//!   last-known-good retention on failure
//! - **Action Dispatcher**: validated writes followed by re-aggregation
//!
//! ## Architecture
//!
//! ```text
//!   Snapshot Source ──┐        ┌──────────────────────────────────┐
//!   (agents, prices)  │ pull   │          Dashboard Hub           │
//!                     ├──────► │  ┌────────────────────────────┐  │
//!   Record Store ─────┘        │  │   Metric Aggregator        │  │
//!   (farms, goals)             │  │   - portfolio value / PnL  │  │
//!                              │  │   - win rate, per agent    │  │
//!   Event Bus ───────────────► │  │   - farm / goal progress   │  │
//!   (agentCreated,             │  └─────────────┬──────────────┘  │
//!    orderFilled,              │                │ Arc<State>      │
//!    pricesUpdated)            │        broadcast to every tab    │
//!                              └────────────────┬─────────────────┘
//!                                               │
//!                        ┌──────────────────────┼──────────────────┐
//!                        ▼                      ▼                  ▼
//!                   Subscription           Subscription       Subscription
//!                   (overview)             (agents)           (orders)
//!                        │
//!                        └─► DashboardActions ─► Source / Store ─► refresh
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vantage_dashboard::{DashboardHub, HubConfig};
//!
//! let hub = DashboardHub::new(source, bus, store, clock, HubConfig::default());
//! let mut tab = hub.subscribe("overview").await;
//!
//! println!("portfolio = {}", tab.state().portfolio_value);
//! tab.actions().place_order("agent-1", draft).await?;
//! let next = tab.changed().await?;
//! ```

pub mod actions;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod history;
pub mod hub;
pub mod notice;
pub mod state;

// Re-export main types
pub use actions::{DashboardActions, Refresher};
pub use aggregator::{MetricAggregator, Snapshot, WinTally};
pub use config::{AggregatorConfig, HistoryConfig, HubConfig, PeriodPnl, PnlWeights};
pub use error::{ActionError, HubError};
pub use history::{PeriodBaselines, ValueHistory, ValueSample};
pub use hub::{DashboardHub, Subscription, SubscriptionId};
pub use notice::{Notice, NoticeLevel, NoticeSource};
pub use state::{
    AgentPerformance, AgentStatus, DashboardState, FarmProgress, GoalProgress, OpenPosition,
};
