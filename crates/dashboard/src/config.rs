//! Dashboard configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vantage_core::Symbol;

/// Fractions of total PnL reported for each period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnlWeights {
    pub daily: Decimal,
    pub weekly: Decimal,
    pub monthly: Decimal,
}

impl Default for PnlWeights {
    fn default() -> Self {
        Self {
            daily: dec!(0.10),
            weekly: dec!(0.35),
            monthly: dec!(0.70),
        }
    }
}

/// How daily/weekly/monthly PnL are derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PeriodPnl {
    /// Fixed fractions of total PnL. No per-period cost basis is tracked.
    Fractional(PnlWeights),
    /// Real deltas against the oldest portfolio value inside each window
    Rolling,
}

impl Default for PeriodPnl {
    fn default() -> Self {
        PeriodPnl::Fractional(PnlWeights::default())
    }
}

/// Configuration for the metric aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Capital every agent is assumed to have started with.
    /// PnL is always measured against this constant.
    pub starting_capital: Decimal,
    /// Period PnL policy
    pub period_pnl: PeriodPnl,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            starting_capital: dec!(10_000),
            period_pnl: PeriodPnl::default(),
        }
    }
}

/// Retention of the portfolio-value history used for rolling period PnL
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    /// Samples older than this are dropped
    pub retention: chrono::Duration,
    /// Minimum spacing between two recorded samples
    pub min_spacing: chrono::Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: chrono::Duration::days(30),
            min_spacing: chrono::Duration::minutes(1),
        }
    }
}

/// Configuration for the subscription hub and the action dispatcher
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Liveness floor: full refresh at least this often
    pub refresh_interval: Duration,
    /// Upper bound for one pull from the snapshot source
    pub source_timeout: Duration,
    /// Symbols accepted for orders even before they have a price
    pub symbols: Vec<Symbol>,
    /// Capacity of the notice side channel
    pub notice_capacity: usize,
    /// Aggregation settings
    pub aggregator: AggregatorConfig,
    /// Portfolio-value history settings
    pub history: HistoryConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
            source_timeout: Duration::from_secs(3),
            symbols: Vec::new(),
            notice_capacity: 64,
            aggregator: AggregatorConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}
