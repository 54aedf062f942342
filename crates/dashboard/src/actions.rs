//! Action Dispatcher
//!
//! Validates consumer intents, forwards them to the engine or the record
//! store, and only then asks for a re-aggregation so that no tab sees stale
//! data presented as if it already reflected the write.
//!
//! Rejections happen before any write: no id is generated, nothing is
//! forwarded and no refresh is triggered. Every rejection or downstream
//! failure is also published on the notice channel.

use async_trait::async_trait;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::broadcast;
use vantage_core::{
    Agent, AgentConfig, AgentId, Farm, FarmConfig, FarmStatus, Goal, GoalConfig, GoalStatus,
    Order, OrderDraft, OrderType, RecordId, Symbol,
};
use vantage_ports::{Clock, RecordStore, SnapshotSource, StoreError};

use crate::error::{ActionError, HubError, Result};
use crate::notice::Notice;
use crate::state::DashboardState;

/// Something that can re-run aggregation and report the latest state
#[async_trait]
pub trait Refresher: Send + Sync {
    /// Run a full pass and return the resulting state
    async fn refresh(&self) -> std::result::Result<Arc<DashboardState>, HubError>;

    /// Latest published state, without any I/O
    fn latest(&self) -> Arc<DashboardState>;
}

/// Mutation actions handed to every subscriber
#[derive(Clone)]
pub struct DashboardActions {
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    refresher: Arc<dyn Refresher>,
    notices: broadcast::Sender<Notice>,
    /// Symbols accepted even before they have a price
    symbols: Arc<Vec<Symbol>>,
}

impl DashboardActions {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        refresher: Arc<dyn Refresher>,
        notices: broadcast::Sender<Notice>,
        symbols: Vec<Symbol>,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            refresher,
            notices,
            symbols: Arc::new(symbols),
        }
    }

    /// Validate and submit an order on behalf of an agent
    pub async fn place_order(&self, agent_id: &str, draft: OrderDraft) -> Result<Order> {
        let latest = self.refresher.latest();
        let order = match self.build_order(agent_id, &draft, &latest) {
            Ok(order) => order,
            Err(e) => return Err(self.reject("place order", e)),
        };

        info!(
            "[ACTIONS] Placing {:?} {:?} {} {} @ {} for {}",
            order.order_type, order.side, order.quantity, order.symbol, order.price, agent_id
        );
        let result = self.source.place_order(order.clone()).await;
        self.settle("place order", result.map(|_| order)).await
    }

    /// Create a new agent on the engine
    pub async fn create_agent(&self, config: AgentConfig) -> Result<Agent> {
        info!("[ACTIONS] Creating agent '{}'", config.name);
        let result = self.source.create_agent(config).await;
        self.settle("create agent", result).await
    }

    pub async fn start_agent(&self, agent_id: &AgentId) -> Result<()> {
        info!("[ACTIONS] Starting agent {}", agent_id);
        let result = self.source.start_agent(agent_id).await;
        self.settle("start agent", result).await
    }

    pub async fn stop_agent(&self, agent_id: &AgentId) -> Result<()> {
        info!("[ACTIONS] Stopping agent {}", agent_id);
        let result = self.source.stop_agent(agent_id).await;
        self.settle("stop agent", result).await
    }

    /// Persist a new active farm
    pub async fn create_farm(&self, config: FarmConfig) -> Result<Farm> {
        if let Err(e) = validate_record(&config.name, config.target) {
            return Err(self.reject("create farm", e));
        }

        let farm = Farm::from_config(config, self.clock.now());
        info!("[ACTIONS] Creating farm '{}' ({})", farm.name, farm.id);
        let result = self.store.append_farm(farm.clone()).await;
        self.settle("create farm", result.map(|_| farm)).await
    }

    /// Persist a new active goal with zero progress
    pub async fn create_goal(&self, config: GoalConfig) -> Result<Goal> {
        if let Err(e) = validate_record(&config.name, config.target) {
            return Err(self.reject("create goal", e));
        }

        let goal = Goal::from_config(config, self.clock.now());
        info!(
            "[ACTIONS] Creating {:?} goal '{}' ({})",
            goal.goal_type, goal.name, goal.id
        );
        let result = self.store.append_goal(goal.clone()).await;
        self.settle("create goal", result.map(|_| goal)).await
    }

    /// Change a farm's status
    pub async fn set_farm_status(&self, farm_id: &RecordId, status: FarmStatus) -> Result<Farm> {
        let result = async {
            let mut farm = self.store.farm(farm_id).await?;
            farm.status = status;
            self.store.update_farm(farm.clone()).await?;
            Ok::<_, StoreError>(farm)
        }
        .await;
        self.settle("update farm", result).await
    }

    /// Change a goal's status
    pub async fn set_goal_status(&self, goal_id: &RecordId, status: GoalStatus) -> Result<Goal> {
        let result = async {
            let mut goal = self.store.goal(goal_id).await?;
            goal.status = status;
            self.store.update_goal(goal.clone()).await?;
            Ok::<_, StoreError>(goal)
        }
        .await;
        self.settle("update goal", result).await
    }

    /// Explicit re-aggregation
    pub async fn refresh(&self) -> std::result::Result<Arc<DashboardState>, HubError> {
        self.refresher.refresh().await
    }

    fn build_order(
        &self,
        agent_id: &str,
        draft: &OrderDraft,
        latest: &DashboardState,
    ) -> Result<Order> {
        if draft.quantity <= Decimal::ZERO {
            return Err(ActionError::InvalidQuantity(format!(
                "quantity must be positive, got {}",
                draft.quantity
            )));
        }

        // Only a connected state is a reliable roster
        if latest.connected && latest.agent(agent_id).is_none() {
            return Err(ActionError::UnknownAgent(agent_id.to_string()));
        }

        let market_price = latest.price(&draft.symbol);
        if market_price.is_none() && !self.symbols.contains(&draft.symbol) {
            return Err(ActionError::UnknownSymbol(draft.symbol.clone()));
        }

        let price = match draft.order_type {
            OrderType::Limit => draft.price.ok_or_else(|| {
                ActionError::InvalidPrice("limit order requires a price".to_string())
            })?,
            OrderType::Market => draft.price.or(market_price).ok_or_else(|| {
                ActionError::InvalidPrice(format!("no market price for {}", draft.symbol))
            })?,
        };
        if price <= Decimal::ZERO {
            return Err(ActionError::InvalidPrice(format!(
                "price must be positive, got {}",
                price
            )));
        }

        Ok(Order::from_draft(agent_id, draft, price, self.clock.now()))
    }

    fn reject(&self, action: &str, error: ActionError) -> ActionError {
        warn!("[ACTIONS] Rejected {}: {}", action, error);
        self.notify(Notice::action_rejected(
            format!("Cannot {}: {}", action, error),
            self.clock.now(),
        ));
        error
    }

    /// Report a finished write and refresh. The write has already completed
    /// when this runs, whatever its outcome.
    async fn settle<T, E>(&self, action: &str, result: std::result::Result<T, E>) -> Result<T>
    where
        E: Into<ActionError>,
    {
        let result = result.map_err(Into::into);
        if let Err(e) = &result {
            warn!("[ACTIONS] Failed to {}: {}", action, e);
            self.notify(Notice::action_failed(
                format!("Failed to {}: {}", action, e),
                self.clock.now(),
            ));
        }

        if let Err(e) = self.refresher.refresh().await {
            // The hub has already published its own notice for this
            debug!("[ACTIONS] Refresh after {} failed: {}", action, e);
        }

        result
    }

    fn notify(&self, notice: Notice) {
        // Nobody listening is not an error
        let _ = self.notices.send(notice);
    }
}

fn validate_record(name: &str, target: Decimal) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ActionError::InvalidRecord("name must not be empty".to_string()));
    }
    if target < Decimal::ZERO {
        return Err(ActionError::InvalidRecord(format!(
            "target must not be negative, got {}",
            target
        )));
    }
    Ok(())
}
