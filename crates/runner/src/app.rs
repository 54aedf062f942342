//! Application wiring
//!
//! Builds the simulated engine and its event bus, the record store, the
//! clock and the dashboard hub from a [`RunnerConfig`].

use log::info;
use std::sync::Arc;
use uuid::Uuid;
use vantage_clock::SystemClock;
use vantage_core::Agent;
use vantage_dashboard::DashboardHub;
use vantage_ports::{Clock, RecordStore};
use vantage_sim::{ChannelEventBus, JsonFileStore, MemoryRecordStore, SimEngine};

use crate::config::{ConfigError, RunnerConfig};
use crate::price_feed::{FeedHandle, PriceFeed};

/// Every component of a running dashboard
pub struct DashboardApp {
    pub config: RunnerConfig,
    pub bus: Arc<ChannelEventBus>,
    pub engine: Arc<SimEngine>,
    pub store: Arc<dyn RecordStore>,
    pub hub: DashboardHub,
}

impl DashboardApp {
    /// Wire the app on the system clock
    pub fn from_config(config: RunnerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Wire the app on the given clock
    pub fn with_clock(config: RunnerConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let bus = Arc::new(ChannelEventBus::new(config.event_capacity));
        let engine = Arc::new(SimEngine::new(bus.clone()).with_prices(config.initial_prices()));

        for seed in &config.agents {
            let id = seed
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let capital = seed.capital.unwrap_or(config.starting_capital);
            let mut agent = Agent::new(id, seed.name.clone(), capital);
            agent.active = seed.active;

            info!(
                "Seeded agent '{}' ({}) with {} [{}]",
                agent.name,
                agent.id,
                capital,
                if agent.active { "active" } else { "stopped" }
            );
            engine.insert_agent(agent);
        }

        let store: Arc<dyn RecordStore> = match &config.store_path {
            Some(path) => {
                info!("Using JSON record store at {}", path.display());
                Arc::new(JsonFileStore::new(path))
            }
            None => {
                info!("Using in-memory record store");
                Arc::new(MemoryRecordStore::new())
            }
        };

        let hub = DashboardHub::new(
            engine.clone(),
            bus.clone(),
            store.clone(),
            clock,
            config.hub_config(),
        );

        Ok(Self {
            config,
            bus,
            engine,
            store,
            hub,
        })
    }

    /// Price feed over this app's engine
    pub fn price_feed(&self) -> PriceFeed {
        PriceFeed::new(
            self.engine.clone(),
            self.config.feed.clone(),
            self.config.initial_prices(),
        )
    }

    /// Start the price feed if enabled
    pub fn spawn_feed(&self) -> Option<FeedHandle> {
        if !self.config.feed.enabled {
            return None;
        }
        Some(self.price_feed().spawn())
    }
}
