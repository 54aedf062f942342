//! Simulated trading engine
//!
//! Holds agents, their orders and positions, and the current price and
//! volume maps in memory. Orders stay pending until the simulation fills
//! them with [`SimEngine::fill_order`].

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;
use vantage_core::{
    Agent, AgentConfig, AgentId, EngineEvent, Order, OrderStatus, Position, Price, PriceMap,
    Quantity, Symbol, VolumeMap,
};
use vantage_ports::{SnapshotSource, SourceError, SourceResult};

use crate::bus::ChannelEventBus;

/// In-memory snapshot source with simulation and fault-injection controls
pub struct SimEngine {
    agents: DashMap<AgentId, Agent>,
    prices: RwLock<PriceMap>,
    volumes: RwLock<VolumeMap>,
    bus: Arc<ChannelEventBus>,
    /// When set, every call fails with `Unavailable`
    unavailable: AtomicBool,
    /// Artificial delay applied to snapshot reads
    latency: RwLock<Option<Duration>>,
}

impl SimEngine {
    pub fn new(bus: Arc<ChannelEventBus>) -> Self {
        Self {
            agents: DashMap::new(),
            prices: RwLock::new(PriceMap::new()),
            volumes: RwLock::new(VolumeMap::new()),
            bus,
            unavailable: AtomicBool::new(false),
            latency: RwLock::new(None),
        }
    }

    /// Seed initial prices without publishing an event
    pub fn with_prices(self, prices: PriceMap) -> Self {
        *self.prices.write() = prices;
        self
    }

    pub fn bus(&self) -> &Arc<ChannelEventBus> {
        &self.bus
    }

    /// Add or replace an agent without publishing an event
    pub fn insert_agent(&self, agent: Agent) {
        self.agents.insert(agent.id.clone(), agent);
    }

    pub fn agent(&self, agent_id: &str) -> Option<Agent> {
        self.agents.get(agent_id).map(|a| a.value().clone())
    }

    /// Every order across all agents
    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .agents
            .iter()
            .flat_map(|entry| entry.value().orders.clone())
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        orders
    }

    /// Overwrite an agent's engine-reported portfolio value
    pub fn set_portfolio_value(&self, agent_id: &str, value: Decimal) -> SourceResult<()> {
        let mut agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| SourceError::AgentNotFound(agent_id.to_string()))?;
        agent.portfolio.total_value = value;
        Ok(())
    }

    /// Overwrite an agent's engine-reported win rate and trade count
    pub fn set_performance(
        &self,
        agent_id: &str,
        win_rate: Decimal,
        total_trades: u64,
    ) -> SourceResult<()> {
        let mut agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| SourceError::AgentNotFound(agent_id.to_string()))?;
        agent.performance.win_rate = win_rate;
        agent.performance.total_trades = total_trades;
        Ok(())
    }

    /// Update one price and publish `pricesUpdated` with just that symbol
    pub fn set_price(&self, symbol: impl Into<Symbol>, price: Price) {
        let symbol = symbol.into();
        self.prices.write().insert(symbol.clone(), price);

        let mut changed = PriceMap::new();
        changed.insert(symbol, price);
        self.bus.publish(EngineEvent::PricesUpdated(changed));
    }

    pub fn set_volume(&self, symbol: impl Into<Symbol>, volume: Quantity) {
        self.volumes.write().insert(symbol.into(), volume);
    }

    /// Fault injection: make every call fail until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
        info!("Engine availability set to {}", !unavailable);
    }

    /// Fault injection: delay snapshot reads
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Execute a pending order at its own price.
    ///
    /// Opens, grows, reduces or flips the agent's position on the symbol,
    /// bumps the agent's trade count and publishes `orderFilled`.
    pub fn fill_order(&self, order_id: &str) -> SourceResult<Order> {
        self.check_available()?;

        let filled = {
            let mut entry = self
                .agents
                .iter_mut()
                .find(|entry| entry.value().orders.iter().any(|o| o.id == order_id))
                .ok_or_else(|| SourceError::Rejected(format!("unknown order {}", order_id)))?;
            let agent = entry.value_mut();

            let order = agent
                .orders
                .iter_mut()
                .find(|o| o.id == order_id)
                .ok_or_else(|| SourceError::Rejected(format!("unknown order {}", order_id)))?;
            if !order.status.is_active() {
                return Err(SourceError::Rejected(format!(
                    "order {} is {:?}",
                    order_id, order.status
                )));
            }
            order.status = OrderStatus::Filled;
            let filled = order.clone();

            apply_fill(&mut agent.portfolio.positions, &filled);
            agent.performance.total_trades += 1;
            filled
        };

        debug!(
            "Filled {} {:?} {} {} @ {}",
            filled.id, filled.side, filled.quantity, filled.symbol, filled.price
        );
        self.bus.publish(EngineEvent::OrderFilled(filled.clone()));
        Ok(filled)
    }

    fn check_available(&self) -> SourceResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn apply_fill(positions: &mut Vec<Position>, order: &Order) {
    let Some(index) = positions.iter().position(|p| p.symbol == order.symbol) else {
        positions.push(Position::new(
            order.symbol.clone(),
            order.side,
            order.quantity,
            order.price,
        ));
        return;
    };

    let position = &mut positions[index];
    if position.side == order.side {
        position.add(order.quantity, order.price);
    } else if order.quantity < position.quantity {
        position.quantity -= order.quantity;
    } else if order.quantity == position.quantity {
        positions.remove(index);
    } else {
        let remaining = order.quantity - position.quantity;
        *position = Position::new(order.symbol.clone(), order.side, remaining, order.price);
    }
}

#[async_trait]
impl SnapshotSource for SimEngine {
    async fn all_agents(&self) -> SourceResult<Vec<Agent>> {
        self.check_available()?;
        self.simulate_latency().await;
        Ok(self.agents.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn current_prices(&self) -> SourceResult<PriceMap> {
        self.check_available()?;
        self.simulate_latency().await;
        Ok(self.prices.read().clone())
    }

    async fn current_volumes(&self) -> SourceResult<VolumeMap> {
        self.check_available()?;
        Ok(self.volumes.read().clone())
    }

    async fn place_order(&self, order: Order) -> SourceResult<()> {
        self.check_available()?;
        let mut agent = self
            .agents
            .get_mut(&order.agent_id)
            .ok_or_else(|| SourceError::AgentNotFound(order.agent_id.clone()))?;

        if agent.orders.iter().any(|o| o.id == order.id) {
            return Err(SourceError::Rejected(format!("duplicate order id {}", order.id)));
        }
        debug!("Accepted order {} for {}", order.id, order.agent_id);
        agent.orders.push(order);
        Ok(())
    }

    async fn create_agent(&self, config: AgentConfig) -> SourceResult<Agent> {
        self.check_available()?;
        let agent = Agent::new(
            Uuid::new_v4().to_string(),
            config.name,
            config.starting_capital,
        );
        self.agents.insert(agent.id.clone(), agent.clone());

        info!("Created agent '{}' ({})", agent.name, agent.id);
        self.bus.publish(EngineEvent::AgentCreated(agent.clone()));
        Ok(agent)
    }

    async fn start_agent(&self, agent_id: &AgentId) -> SourceResult<()> {
        self.set_active(agent_id, true)
    }

    async fn stop_agent(&self, agent_id: &AgentId) -> SourceResult<()> {
        self.set_active(agent_id, false)
    }

    fn name(&self) -> &str {
        "SimEngine"
    }
}

impl SimEngine {
    fn set_active(&self, agent_id: &str, active: bool) -> SourceResult<()> {
        self.check_available()?;
        let mut agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| SourceError::AgentNotFound(agent_id.to_string()))?;
        agent.active = active;
        info!("Agent {} {}", agent_id, if active { "started" } else { "stopped" });
        Ok(())
    }
}
