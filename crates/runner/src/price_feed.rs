//! Price Feed - keeps the simulated market moving
//!
//! Each tick moves one symbol's price by a bounded random step (publishing
//! `pricesUpdated` through the engine) and, with a configured probability,
//! fills one pending order (publishing `orderFilled`).

use log::{debug, info};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use vantage_core::{OrderStatus, Price, Quantity, Symbol};
use vantage_sim::SimEngine;

use crate::config::FeedConfig;

/// Smallest price the random walk can reach
const MIN_PRICE: Decimal = dec!(0.01);

/// What a feed did while it ran
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub ticks: u64,
    pub price_updates: u64,
    pub fills: u64,
}

/// Random-walk price generator driving a [`SimEngine`]
pub struct PriceFeed {
    engine: Arc<SimEngine>,
    config: FeedConfig,
    prices: BTreeMap<Symbol, Price>,
    volumes: BTreeMap<Symbol, Quantity>,
    rng: StdRng,
    stats: FeedStats,
}

impl PriceFeed {
    pub fn new(
        engine: Arc<SimEngine>,
        config: FeedConfig,
        prices: BTreeMap<Symbol, Price>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            engine,
            config,
            prices,
            volumes: BTreeMap::new(),
            rng,
            stats: FeedStats::default(),
        }
    }

    pub fn price(&self, symbol: &str) -> Option<Price> {
        self.prices.get(symbol).copied()
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    /// Advance the market by one step
    pub fn tick(&mut self) {
        self.stats.ticks += 1;
        self.step_price();

        if self.rng.gen_bool(self.config.fill_probability) {
            self.fill_one();
        }
    }

    fn step_price(&mut self) {
        if self.prices.is_empty() {
            return;
        }
        let index = self.rng.gen_range(0..self.prices.len());
        let Some((symbol, current)) = self
            .prices
            .iter()
            .nth(index)
            .map(|(s, p)| (s.clone(), *p))
        else {
            return;
        };

        let change: f64 = self.rng.gen_range(-1.0..1.0) * self.config.price_volatility;
        let step = Decimal::from_f64(change).unwrap_or_default();
        let next = (current * (Decimal::ONE + step)).round_dp(2).max(MIN_PRICE);

        self.prices.insert(symbol.clone(), next);
        self.engine.set_price(symbol, next);
        self.stats.price_updates += 1;
    }

    fn fill_one(&mut self) {
        let pending: Vec<_> = self
            .engine
            .orders()
            .into_iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .collect();
        if pending.is_empty() {
            return;
        }

        let order = &pending[self.rng.gen_range(0..pending.len())];
        match self.engine.fill_order(&order.id) {
            Ok(filled) => {
                let volume = self.volumes.entry(filled.symbol.clone()).or_default();
                *volume += filled.quantity;
                self.engine.set_volume(filled.symbol.clone(), *volume);
                self.stats.fills += 1;
                debug!("Feed filled order {} on {}", filled.id, filled.symbol);
            }
            Err(e) => debug!("Feed could not fill {}: {}", order.id, e),
        }
    }

    /// Tick until `shutdown` fires; returns what was done
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> FeedStats {
        let period = Duration::from_millis(self.config.interval_ms.max(1));
        let mut ticker = tokio::time::interval(period);
        info!("Price feed started ({}ms interval)", self.config.interval_ms);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.tick(),
            }
        }

        info!(
            "Price feed stopped after {} ticks ({} fills)",
            self.stats.ticks, self.stats.fills
        );
        self.stats
    }

    /// Run on a background task
    pub fn spawn(self) -> FeedHandle {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(self.run(shutdown_rx));
        FeedHandle { shutdown, handle }
    }
}

/// A running [`PriceFeed`]
pub struct FeedHandle {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<FeedStats>,
}

impl FeedHandle {
    /// Stop the feed and wait for it to finish
    pub async fn stop(self) -> FeedStats {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap_or_default()
    }
}
