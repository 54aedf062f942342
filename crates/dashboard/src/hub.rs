//! Subscription Hub
//!
//! Owns the single refresh loop shared by every dashboard tab. The loop is
//! started by the first subscriber and stopped when the last one leaves;
//! each subscriber gets its own watch channel so that a released tab never
//! receives another push.
//!
//! A pass pulls agents, prices and volumes from the snapshot source (bounded
//! by `source_timeout`), reads farms and goals from the record store,
//! aggregates, and publishes the resulting `Arc<DashboardState>` to every
//! subscriber. Passes never overlap. A failed pass keeps the last good
//! state, flags it as disconnected and raises a notice.

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use vantage_core::{EngineEvent, PriceMap, VolumeMap};
use vantage_ports::{Clock, EventBus, EventSubscriber, RecordStore, SnapshotSource, SourceError};

use crate::actions::{DashboardActions, Refresher};
use crate::aggregator::{MetricAggregator, Snapshot};
use crate::config::HubConfig;
use crate::error::HubError;
use crate::history::ValueHistory;
use crate::notice::Notice;
use crate::state::DashboardState;

/// Identifier of one subscription, unique per hub
pub type SubscriptionId = u64;

type StateTx = watch::Sender<Arc<DashboardState>>;
type StateRx = watch::Receiver<Arc<DashboardState>>;

struct Subscriber {
    tab_id: String,
    tx: StateTx,
}

/// Handle to the running refresh loop
struct Driver {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    next_id: SubscriptionId,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    driver: Option<Driver>,
}

struct HubInner {
    config: HubConfig,
    aggregator: MetricAggregator,
    source: Arc<dyn SnapshotSource>,
    events: Arc<dyn EventBus>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    /// Last published state
    latest: StateTx,
    history: Mutex<ValueHistory>,
    /// Held for the duration of a pass or a price patch
    pass_lock: tokio::sync::Mutex<()>,
    registry: Mutex<Registry>,
    notices: broadcast::Sender<Notice>,
}

/// Shared dashboard state with a single refresh loop for all tabs
#[derive(Clone)]
pub struct DashboardHub {
    inner: Arc<HubInner>,
}

impl DashboardHub {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        events: Arc<dyn EventBus>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        config: HubConfig,
    ) -> Self {
        let (latest, _) = watch::channel(Arc::new(DashboardState::empty()));
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));

        info!(
            "[HUB] Created over '{}' (refresh every {:?}, source timeout {:?})",
            source.name(),
            config.refresh_interval,
            config.source_timeout
        );

        Self {
            inner: Arc::new(HubInner {
                aggregator: MetricAggregator::new(config.aggregator.clone()),
                history: Mutex::new(ValueHistory::new(config.history.clone())),
                config,
                source,
                events,
                store,
                clock,
                latest,
                pass_lock: tokio::sync::Mutex::new(()),
                registry: Mutex::new(Registry::default()),
                notices,
            }),
        }
    }

    /// Register a tab.
    ///
    /// The subscription starts out holding the latest known state, the
    /// shared loop is started if this is the first subscriber, and a fresh
    /// pass is run before returning. Failures of that pass surface through
    /// the state's `connected` flag and the notice channel.
    pub async fn subscribe(&self, tab_id: impl Into<String>) -> Subscription {
        let tab_id = tab_id.into();
        let (id, rx) = {
            let mut registry = self.inner.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;

            let (tx, rx) = watch::channel(self.inner.latest.borrow().clone());
            registry.subscribers.insert(
                id,
                Subscriber {
                    tab_id: tab_id.clone(),
                    tx,
                },
            );

            let running = registry
                .driver
                .as_ref()
                .is_some_and(|d| !d.handle.is_finished());
            if !running {
                registry.driver = Some(HubInner::start_driver(&self.inner));
            }
            (id, rx)
        };
        info!("[HUB] Tab '{}' subscribed as #{}", tab_id, id);

        let mut subscription = Subscription {
            id,
            tab_id,
            rx,
            notices: self.inner.notices.subscribe(),
            actions: self.actions(),
            hub: self.inner.clone(),
            active: true,
        };

        if let Err(e) = self.inner.refresh_pass().await {
            debug!("[HUB] Initial pass for #{} failed: {}", id, e);
        }
        // `state()` already reflects the initial pass; `changed()` waits for the next push
        subscription.rx.mark_unchanged();
        subscription
    }

    /// Action dispatcher bound to this hub
    pub fn actions(&self) -> DashboardActions {
        DashboardActions::new(
            self.inner.source.clone(),
            self.inner.store.clone(),
            self.inner.clock.clone(),
            self.inner.clone(),
            self.inner.notices.clone(),
            self.inner.config.symbols.clone(),
        )
    }

    /// Run a full pass now
    pub async fn refresh(&self) -> Result<Arc<DashboardState>, HubError> {
        self.inner.refresh_pass().await
    }

    pub fn latest(&self) -> Arc<DashboardState> {
        self.inner.latest.borrow().clone()
    }

    /// Listen to notices without subscribing to state
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().subscribers.len()
    }

    /// True while the shared refresh loop is alive
    pub fn is_running(&self) -> bool {
        self.inner
            .registry
            .lock()
            .driver
            .as_ref()
            .is_some_and(|d| !d.handle.is_finished())
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }
}

impl HubInner {
    /// Attaches to the bus before returning so that events emitted right
    /// after `subscribe` are queued for the loop.
    fn start_driver(inner: &Arc<Self>) -> Driver {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let events = inner.events.listen();
        let handle = tokio::spawn(Self::run_driver(inner.clone(), events, shutdown_rx));
        info!("[HUB] Refresh loop started");
        Driver { shutdown, handle }
    }

    async fn run_driver(
        self: Arc<Self>,
        mut events: Box<dyn EventSubscriber>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut ticker = interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The subscriber that started the loop runs the first pass itself
        ticker.tick().await;

        let mut bus_open = true;
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                event = events.next(), if bus_open => match event {
                    Ok(event) => self.handle_event(event).await,
                    Err(SourceError::ChannelClosed) => {
                        warn!("[HUB] Event bus closed, falling back to periodic refresh");
                        bus_open = false;
                    }
                    Err(e) => warn!("[HUB] Event bus error: {}", e),
                },

                _ = ticker.tick() => {
                    if let Err(e) = self.refresh_pass().await {
                        debug!("[HUB] Periodic pass failed: {}", e);
                    }
                }
            }
        }
        info!("[HUB] Refresh loop stopped");
    }

    async fn handle_event(&self, event: EngineEvent) {
        debug!("[HUB] Event {}", event.name());
        match event {
            EngineEvent::PricesUpdated(prices) => self.patch_prices(&prices).await,
            other if other.requires_aggregation() => {
                if let Err(e) = self.refresh_pass().await {
                    debug!("[HUB] Pass after {} failed: {}", other.name(), e);
                }
            }
            _ => {}
        }
    }

    /// Merge new prices into the latest state without a full pass
    async fn patch_prices(&self, prices: &PriceMap) {
        let _pass = self.pass_lock.lock().await;
        let patched = self.latest.borrow().with_prices(prices, self.clock.now());
        self.publish(Arc::new(patched));
    }

    async fn refresh_pass(&self) -> Result<Arc<DashboardState>, HubError> {
        let _pass = self.pass_lock.lock().await;

        match self.build_state().await {
            Ok(state) => {
                let state = Arc::new(state);
                self.publish(state.clone());
                Ok(state)
            }
            Err(e) => {
                warn!("[HUB] Refresh failed, keeping last state: {}", e);
                let _ = self.notices.send(Notice::refresh_failed(
                    format!("Dashboard refresh failed: {}", e),
                    self.clock.now(),
                ));

                let latest = self.latest.borrow().clone();
                if latest.connected {
                    self.publish(Arc::new(latest.disconnected()));
                }
                Err(e)
            }
        }
    }

    async fn build_state(&self) -> Result<DashboardState, HubError> {
        let started = self.clock.now();
        let (agents, prices, volumes) = self.pull_source().await?;
        let farms = self.store.farms().await?;
        let goals = self.store.goals().await?;

        let taken_at = self.clock.now();
        let baselines = self.history.lock().baselines(taken_at);
        let snapshot = Snapshot::new(agents, prices, taken_at)
            .with_volumes(volumes)
            .with_farms(farms)
            .with_goals(goals)
            .with_baselines(baselines);

        let state = self.aggregator.aggregate(&snapshot);
        self.history.lock().record(taken_at, state.portfolio_value);

        debug!(
            "[HUB] Pass complete in {}ms: {} agents, value {}, pnl {}",
            self.clock.elapsed_since(started).num_milliseconds(),
            state.total_agents,
            state.portfolio_value,
            state.total_pnl
        );
        Ok(state)
    }

    async fn pull_source(
        &self,
    ) -> Result<(Vec<vantage_core::Agent>, PriceMap, VolumeMap), SourceError> {
        let limit = self.config.source_timeout;
        let pull = async {
            let (agents, prices) =
                tokio::try_join!(self.source.all_agents(), self.source.current_prices())?;
            let volumes = match self.source.current_volumes().await {
                Ok(volumes) => volumes,
                Err(e) => {
                    debug!("[HUB] Volumes unavailable: {}", e);
                    VolumeMap::new()
                }
            };
            Ok::<_, SourceError>((agents, prices, volumes))
        };

        timeout(limit, pull)
            .await
            .map_err(|_| SourceError::Timeout(limit.as_millis() as u64))?
    }

    fn publish(&self, state: Arc<DashboardState>) {
        let registry = self.registry.lock();
        self.latest.send_replace(state.clone());
        for subscriber in registry.subscribers.values() {
            subscriber.tx.send_replace(state.clone());
        }
    }

    /// Drop a subscriber; stops the loop when it was the last one
    fn release(&self, id: SubscriptionId) {
        let driver = {
            let mut registry = self.registry.lock();
            if let Some(subscriber) = registry.subscribers.remove(&id) {
                info!("[HUB] Tab '{}' (#{}) unsubscribed", subscriber.tab_id, id);
            }
            if registry.subscribers.is_empty() {
                registry.driver.take()
            } else {
                None
            }
        };

        if let Some(driver) = driver {
            // The loop may already be gone if the runtime is shutting down
            let _ = driver.shutdown.send(());
            info!("[HUB] Last tab left, stopping refresh loop");
        }
    }
}

#[async_trait]
impl Refresher for HubInner {
    async fn refresh(&self) -> Result<Arc<DashboardState>, HubError> {
        self.refresh_pass().await
    }

    fn latest(&self) -> Arc<DashboardState> {
        self.latest.borrow().clone()
    }
}

/// A tab's view of the hub. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    tab_id: String,
    rx: StateRx,
    notices: broadcast::Receiver<Notice>,
    actions: DashboardActions,
    hub: Arc<HubInner>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    /// Most recent state pushed to this tab
    pub fn state(&self) -> Arc<DashboardState> {
        self.rx.borrow().clone()
    }

    /// Wait for the next push
    pub async fn changed(&mut self) -> Result<Arc<DashboardState>, HubError> {
        if !self.active {
            return Err(HubError::Unsubscribed);
        }
        self.rx
            .changed()
            .await
            .map_err(|_| HubError::Unsubscribed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    pub fn actions(&self) -> &DashboardActions {
        &self.actions
    }

    /// Wait for the next notice; lagged notices are skipped
    pub async fn next_notice(&mut self) -> Option<Notice> {
        loop {
            match self.notices.recv().await {
                Ok(notice) => return Some(notice),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_notice(&mut self) -> Option<Notice> {
        loop {
            match self.notices.try_recv() {
                Ok(notice) => return Some(notice),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stop receiving pushes. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if self.active {
            self.active = false;
            self.hub.release(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("tab_id", &self.tab_id)
            .field("active", &self.active)
            .finish()
    }
}
