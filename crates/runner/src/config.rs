//! Runner configuration
//!
//! Loaded from a JSON file; every field has a default so a partial file is
//! enough.
//!
//! ```json
//! {
//!   "symbols": [{ "symbol": "BTC-USD", "price": "50000" }],
//!   "agents": [{ "id": "alpha", "name": "Alpha", "active": true }],
//!   "refresh_interval_ms": 5000,
//!   "source_timeout_ms": 3000,
//!   "starting_capital": "10000",
//!   "period_pnl": { "mode": "rolling" },
//!   "store_path": "records.json",
//!   "feed": { "interval_ms": 1000, "price_volatility": 0.0005, "fill_probability": 0.2 }
//! }
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use vantage_core::{PriceMap, Symbol};
use vantage_dashboard::{AggregatorConfig, HubConfig, PeriodPnl};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid symbol config: {0}")]
    InvalidSymbol(String),

    #[error("Invalid agent config: {0}")]
    InvalidAgent(String),

    #[error("Invalid timing config: {0}")]
    InvalidTiming(String),

    #[error("Invalid feed config: {0}")]
    InvalidFeed(String),
}

/// A tradable symbol and its opening price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub symbol: Symbol,
    pub price: Decimal,
}

impl SymbolConfig {
    pub fn new(symbol: impl Into<Symbol>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

/// An agent present in the engine at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedAgent {
    /// Generated when omitted
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Defaults to the configured starting capital
    #[serde(default)]
    pub capital: Option<Decimal>,
    #[serde(default)]
    pub active: bool,
}

impl SeedAgent {
    pub fn new(id: &str, name: &str, active: bool) -> Self {
        Self {
            id: Some(id.to_string()),
            name: name.to_string(),
            capital: None,
            active,
        }
    }
}

/// Price feed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    /// Max relative price move per tick (0.001 = 0.1%)
    pub price_volatility: f64,
    /// Chance per tick of filling one pending order
    pub fill_probability: f64,
    /// Seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
            price_volatility: 0.0005,
            fill_probability: 0.2,
            seed: None,
        }
    }
}

/// Full runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub symbols: Vec<SymbolConfig>,
    pub agents: Vec<SeedAgent>,
    pub refresh_interval_ms: u64,
    pub source_timeout_ms: u64,
    pub starting_capital: Decimal,
    pub period_pnl: PeriodPnl,
    /// JSON file for farms and goals; in-memory when unset
    pub store_path: Option<PathBuf>,
    pub event_capacity: usize,
    pub feed: FeedConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                SymbolConfig::new("BTC-USD", dec!(50000)),
                SymbolConfig::new("ETH-USD", dec!(3000)),
            ],
            agents: vec![
                SeedAgent::new("alpha", "Alpha", true),
                SeedAgent::new("beta", "Beta", false),
            ],
            refresh_interval_ms: 5000,
            source_timeout_ms: 3000,
            starting_capital: dec!(10000),
            period_pnl: PeriodPnl::default(),
            store_path: None,
            event_capacity: 1024,
            feed: FeedConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::InvalidSymbol(
                "at least one symbol is required".to_string(),
            ));
        }
        let mut symbols = HashSet::new();
        for symbol in &self.symbols {
            if symbol.symbol.trim().is_empty() {
                return Err(ConfigError::InvalidSymbol("empty symbol".to_string()));
            }
            if symbol.price <= Decimal::ZERO {
                return Err(ConfigError::InvalidSymbol(format!(
                    "{} has non-positive price {}",
                    symbol.symbol, symbol.price
                )));
            }
            if !symbols.insert(&symbol.symbol) {
                return Err(ConfigError::InvalidSymbol(format!(
                    "{} listed twice",
                    symbol.symbol
                )));
            }
        }

        let mut ids = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(ConfigError::InvalidAgent("empty agent name".to_string()));
            }
            if agent.capital.is_some_and(|c| c < Decimal::ZERO) {
                return Err(ConfigError::InvalidAgent(format!(
                    "{} has negative capital",
                    agent.name
                )));
            }
            if let Some(id) = &agent.id {
                if !ids.insert(id) {
                    return Err(ConfigError::InvalidAgent(format!("duplicate id {}", id)));
                }
            }
        }

        if self.refresh_interval_ms == 0 || self.source_timeout_ms == 0 {
            return Err(ConfigError::InvalidTiming(
                "refresh interval and source timeout must be positive".to_string(),
            ));
        }
        if self.starting_capital <= Decimal::ZERO {
            return Err(ConfigError::InvalidAgent(
                "starting capital must be positive".to_string(),
            ));
        }

        if self.feed.enabled && self.feed.interval_ms == 0 {
            return Err(ConfigError::InvalidFeed("interval must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.feed.fill_probability) {
            return Err(ConfigError::InvalidFeed(format!(
                "fill probability {} outside [0, 1]",
                self.feed.fill_probability
            )));
        }
        if !(0.0..1.0).contains(&self.feed.price_volatility) {
            return Err(ConfigError::InvalidFeed(format!(
                "price volatility {} outside [0, 1)",
                self.feed.price_volatility
            )));
        }
        Ok(())
    }

    /// Opening prices keyed by symbol
    pub fn initial_prices(&self) -> PriceMap {
        self.symbols
            .iter()
            .map(|s| (s.symbol.clone(), s.price))
            .collect()
    }

    /// Hub settings derived from this configuration
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
            source_timeout: Duration::from_millis(self.source_timeout_ms),
            symbols: self.symbols.iter().map(|s| s.symbol.clone()).collect(),
            aggregator: AggregatorConfig {
                starting_capital: self.starting_capital,
                period_pnl: self.period_pnl,
            },
            ..Default::default()
        }
    }
}
