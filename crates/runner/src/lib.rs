//! Vantage Runner - Live Dashboard over a Simulated Engine
//!
//! Wires every collaborator of the dashboard hub in one process:
//!
//! - **Config**: JSON runner configuration (symbols, seed agents, timings)
//! - **App**: engine, event bus, record store, clock and hub
//! - **Price Feed**: random-walk prices and occasional fills so the
//!   dashboard has something to show
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────┐  set_price / fill_order   ┌──────────────┐
//!   │  Price Feed  │ ────────────────────────► │  SimEngine   │
//!   └──────────────┘                           └──────┬───────┘
//!                                                     │ events
//!                                                     ▼
//!   ┌──────────────┐        farms/goals        ┌──────────────┐
//!   │ Record Store │ ────────────────────────► │ DashboardHub │ ──► tabs
//!   └──────────────┘                           └──────────────┘
//! ```

pub mod app;
pub mod config;
pub mod price_feed;

// Re-export main types
pub use app::DashboardApp;
pub use config::{ConfigError, FeedConfig, RunnerConfig, SeedAgent, SymbolConfig};
pub use price_feed::{FeedHandle, FeedStats, PriceFeed};
