//! Subscription Hub Integration Test
//!
//! Drives the hub against the in-process engine, bus and record store:
//! - Immediate state on subscribe
//! - One shared loop for every tab, started and stopped by the subscriber set
//! - Event-driven refresh and price patching
//! - Last-known-good retention with notices on failure
//! - Actions that re-aggregate before returning

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use vantage_clock::ManualClock;
use vantage_core::{
    Agent, AgentConfig, FarmConfig, GoalConfig, GoalType, Order, OrderDraft, PriceMap, Side,
};
use vantage_dashboard::{
    AggregatorConfig, DashboardHub, HubConfig, HubError, NoticeLevel, NoticeSource, PeriodPnl,
    Subscription,
};
use vantage_ports::{Clock, SnapshotSource, SourceError};
use vantage_sim::{ChannelEventBus, MemoryRecordStore, SimEngine};

struct Harness {
    bus: Arc<ChannelEventBus>,
    engine: Arc<SimEngine>,
    store: Arc<MemoryRecordStore>,
    clock: Arc<ManualClock>,
    hub: DashboardHub,
}

/// Long enough that the periodic tick never fires inside a test
fn quiet_config() -> HubConfig {
    HubConfig {
        refresh_interval: Duration::from_secs(600),
        symbols: vec!["BTC-USD".to_string(), "ETH-USD".to_string()],
        ..Default::default()
    }
}

fn harness(config: HubConfig) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();

    let bus = Arc::new(ChannelEventBus::new(256));
    let mut prices = PriceMap::new();
    prices.insert("BTC-USD".to_string(), dec!(50_000));
    let engine = Arc::new(SimEngine::new(bus.clone()).with_prices(prices));

    let mut alpha = Agent::new("agent-1", "Alpha", dec!(12_000));
    alpha.active = true;
    engine.insert_agent(alpha);
    engine.insert_agent(Agent::new("agent-2", "Beta", dec!(9_500)));

    let store = Arc::new(MemoryRecordStore::new());
    let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());

    let hub = DashboardHub::new(
        engine.clone(),
        bus.clone(),
        store.clone(),
        clock.clone(),
        config,
    );

    Harness {
        bus,
        engine,
        store,
        clock,
        hub,
    }
}

/// Yield until the number of loops attached to the bus settles at `count`
async fn wait_for_listeners(bus: &ChannelEventBus, count: usize) {
    for _ in 0..1_000 {
        if bus.listener_count() == count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("expected {} bus listeners, found {}", count, bus.listener_count());
}

async fn wait_for_listener(bus: &ChannelEventBus) {
    wait_for_listeners(bus, 1).await;
}

async fn next_push(sub: &mut Subscription) -> Arc<vantage_dashboard::DashboardState> {
    timeout(Duration::from_secs(5), sub.changed())
        .await
        .expect("no push received")
        .expect("subscription closed")
}

fn pending_order(agent_id: &str, quantity: rust_decimal::Decimal) -> Order {
    let draft = OrderDraft::market("BTC-USD", Side::Buy, quantity);
    Order::from_draft(agent_id, &draft, dec!(50_000), Utc::now())
}

#[tokio::test]
async fn test_subscribe_delivers_state_immediately() {
    let h = harness(quiet_config());

    let sub = h.hub.subscribe("overview").await;
    let state = sub.state();

    assert!(state.connected);
    assert_eq!(state.portfolio_value, dec!(21_500));
    assert_eq!(state.total_pnl, dec!(1_500));
    assert_eq!(state.total_agents, 2);
    assert_eq!(state.active_agents, 1);
    assert_eq!(state.price("BTC-USD"), Some(dec!(50_000)));
    assert_eq!(state.last_update, Some(h.clock.now()));
    assert_eq!(sub.tab_id(), "overview");
}

#[tokio::test]
async fn test_tabs_share_one_loop() {
    let h = harness(quiet_config());

    let mut overview = h.hub.subscribe("overview").await;
    let mut agents = h.hub.subscribe("agents").await;
    wait_for_listener(&h.bus).await;

    assert_eq!(h.hub.subscriber_count(), 2);
    assert!(h.hub.is_running());
    assert_eq!(h.bus.listener_count(), 1);
    assert_ne!(overview.id(), agents.id());

    // The second tab's initial pass was pushed to the first one too
    assert_eq!(next_push(&mut overview).await.total_agents, 2);

    h.engine
        .create_agent(AgentConfig::new("Gamma"))
        .await
        .unwrap();

    let a = next_push(&mut overview).await;
    let b = next_push(&mut agents).await;
    assert_eq!(a.total_agents, 3);
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn test_event_right_after_subscribe_is_not_lost() {
    let h = harness(quiet_config());

    let mut sub = h.hub.subscribe("overview").await;
    assert_eq!(h.bus.listener_count(), 1);

    h.engine.create_agent(AgentConfig::new("Gamma")).await.unwrap();

    let state = timeout(Duration::from_millis(500), sub.changed())
        .await
        .expect("event emitted after subscribe was dropped")
        .unwrap();
    assert_eq!(state.total_agents, 3);
}

#[tokio::test]
async fn test_order_filled_triggers_refresh() {
    let h = harness(quiet_config());
    let mut sub = h.hub.subscribe("orders").await;
    wait_for_listener(&h.bus).await;

    let order = pending_order("agent-1", dec!(0.1));
    h.engine.place_order(order.clone()).await.unwrap();
    h.engine.fill_order(&order.id).unwrap();

    let state = next_push(&mut sub).await;
    assert_eq!(state.executed_orders.len(), 1);
    assert_eq!(state.executed_orders[0].id, order.id);
    assert_eq!(state.open_positions.len(), 1);
    assert!(state.pending_orders.is_empty());
}

#[tokio::test]
async fn test_price_update_patches_prices_only() {
    let h = harness(quiet_config());
    let mut sub = h.hub.subscribe("market").await;
    wait_for_listener(&h.bus).await;

    let pass_time = sub.state().last_update;
    h.clock.advance(chrono::Duration::seconds(2));

    // Not announced on the bus, so only a full pass would pick it up
    h.engine.set_portfolio_value("agent-1", dec!(30_000)).unwrap();
    h.engine.set_price("ETH-USD", dec!(3_000));

    let state = next_push(&mut sub).await;
    assert_eq!(state.last_update, Some(h.clock.now()));
    assert_ne!(state.last_update, pass_time);
    assert_eq!(state.price("ETH-USD"), Some(dec!(3_000)));
    assert_eq!(state.price("BTC-USD"), Some(dec!(50_000)));
    assert_eq!(state.market_volumes.get("ETH-USD"), Some(&None));
    assert_eq!(state.portfolio_value, dec!(21_500));

    let refreshed = h.hub.refresh().await.unwrap();
    assert_eq!(refreshed.portfolio_value, dec!(39_500));
}

#[tokio::test]
async fn test_unsubscribe_stops_pushes() {
    let h = harness(quiet_config());
    let mut first = h.hub.subscribe("overview").await;
    let mut second = h.hub.subscribe("agents").await;
    wait_for_listener(&h.bus).await;

    first.unsubscribe();
    first.unsubscribe();
    assert!(!first.is_active());
    assert_eq!(first.changed().await, Err(HubError::Unsubscribed));
    assert_eq!(h.hub.subscriber_count(), 1);
    assert!(h.hub.is_running());

    h.engine.set_price("BTC-USD", dec!(51_000));
    let state = next_push(&mut second).await;
    assert_eq!(state.price("BTC-USD"), Some(dec!(51_000)));

    drop(second);
    assert_eq!(h.hub.subscriber_count(), 0);
    assert!(!h.hub.is_running());

    // Pass results still land in `latest` but nobody is pushed to
    h.hub.refresh().await.unwrap();
    assert_eq!(first.changed().await, Err(HubError::Unsubscribed));
}

#[tokio::test]
async fn test_loop_restarts_for_new_subscriber() {
    let h = harness(quiet_config());

    let sub = h.hub.subscribe("overview").await;
    wait_for_listener(&h.bus).await;
    drop(sub);
    assert!(!h.hub.is_running());
    wait_for_listeners(&h.bus, 0).await;

    let mut sub = h.hub.subscribe("overview").await;
    assert!(h.hub.is_running());
    wait_for_listener(&h.bus).await;

    h.engine.create_agent(AgentConfig::new("Delta")).await.unwrap();
    assert_eq!(next_push(&mut sub).await.total_agents, 3);
}

#[tokio::test]
async fn test_failed_refresh_keeps_last_state() {
    let h = harness(quiet_config());
    let mut sub = h.hub.subscribe("overview").await;
    let good = sub.state();

    h.engine.set_unavailable(true);
    let result = h.hub.refresh().await;
    assert!(matches!(
        result,
        Err(HubError::Source(SourceError::Unavailable(_)))
    ));

    let retained = next_push(&mut sub).await;
    assert!(!retained.connected);
    assert_eq!(retained.portfolio_value, good.portfolio_value);
    assert_eq!(retained.agents, good.agents);

    let notice = sub.try_notice().expect("refresh notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.source, NoticeSource::Refresh);

    // A second failure does not push again
    assert!(h.hub.refresh().await.is_err());
    assert!(!h.hub.latest().connected);

    h.engine.set_unavailable(false);
    let recovered = h.hub.refresh().await.unwrap();
    assert!(recovered.connected);
}

#[tokio::test]
async fn test_store_failure_keeps_last_state() {
    let h = harness(quiet_config());
    let sub = h.hub.subscribe("farms").await;
    assert!(sub.state().connected);

    h.store.set_unavailable(true);
    let result = h.hub.refresh().await;

    assert!(matches!(result, Err(HubError::Store(_))));
    assert!(!sub.state().connected);
    assert_eq!(sub.state().portfolio_value, dec!(21_500));
}

#[tokio::test]
async fn test_failure_on_first_pass_yields_empty_disconnected_state() {
    let h = harness(quiet_config());
    h.engine.set_unavailable(true);

    let mut sub = h.hub.subscribe("overview").await;
    let state = sub.state();

    assert!(!state.connected);
    assert_eq!(state.total_agents, 0);
    assert!(sub.try_notice().is_some_and(|n| n.is_error()));
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_times_out() {
    let config = HubConfig {
        source_timeout: Duration::from_millis(100),
        ..quiet_config()
    };
    let h = harness(config);
    let sub = h.hub.subscribe("overview").await;

    h.engine.set_latency(Some(Duration::from_secs(1)));
    let result = h.hub.refresh().await;

    assert_eq!(result, Err(HubError::Source(SourceError::Timeout(100))));
    assert!(!sub.state().connected);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_tick_refreshes_without_events() {
    let config = HubConfig {
        refresh_interval: Duration::from_secs(5),
        ..quiet_config()
    };
    let h = harness(config);
    let mut sub = h.hub.subscribe("overview").await;
    wait_for_listener(&h.bus).await;

    h.engine.set_portfolio_value("agent-2", dec!(10_500)).unwrap();

    let state = timeout(Duration::from_secs(6), sub.changed())
        .await
        .expect("tick did not fire")
        .unwrap();
    assert_eq!(state.portfolio_value, dec!(22_500));
}

#[tokio::test(start_paused = true)]
async fn test_closed_bus_falls_back_to_ticks() {
    let config = HubConfig {
        refresh_interval: Duration::from_secs(5),
        ..quiet_config()
    };
    let h = harness(config);
    let mut sub = h.hub.subscribe("overview").await;
    wait_for_listener(&h.bus).await;

    h.bus.close();
    h.engine.set_portfolio_value("agent-1", dec!(13_000)).unwrap();

    let state = timeout(Duration::from_secs(6), sub.changed())
        .await
        .expect("tick did not fire")
        .unwrap();
    assert_eq!(state.portfolio_value, dec!(22_500));
    assert!(h.hub.is_running());
}

#[tokio::test]
async fn test_rolling_period_pnl_tracks_history() {
    let config = HubConfig {
        aggregator: AggregatorConfig {
            period_pnl: PeriodPnl::Rolling,
            ..Default::default()
        },
        ..quiet_config()
    };
    let h = harness(config);
    let sub = h.hub.subscribe("overview").await;
    assert_eq!(sub.state().daily_pnl, dec!(0));

    h.clock.advance(chrono::Duration::hours(2));
    h.engine.set_portfolio_value("agent-1", dec!(12_400)).unwrap();
    let state = h.hub.refresh().await.unwrap();

    assert_eq!(state.daily_pnl, dec!(400));
    assert_eq!(state.weekly_pnl, dec!(400));
    assert_eq!(state.total_pnl, dec!(1_900));
}

#[tokio::test]
async fn test_place_order_refreshes_before_returning() {
    let h = harness(quiet_config());
    let sub = h.hub.subscribe("orders").await;

    let order = sub
        .actions()
        .place_order("agent-1", OrderDraft::market("BTC-USD", Side::Buy, dec!(0.2)))
        .await
        .unwrap();

    let state = h.hub.latest();
    assert_eq!(state.pending_orders.len(), 1);
    assert_eq!(state.pending_orders[0].id, order.id);
    assert_eq!(sub.state().pending_orders.len(), 1);
}

#[tokio::test]
async fn test_rejected_order_leaves_state_untouched() {
    let h = harness(quiet_config());
    let mut sub = h.hub.subscribe("orders").await;
    let before = sub.state();

    let result = sub
        .actions()
        .place_order("agent-1", OrderDraft::market("BTC-USD", Side::Buy, dec!(0)))
        .await;

    assert!(result.is_err());
    assert!(Arc::ptr_eq(&before, &sub.state()));
    assert!(h.engine.orders().is_empty());

    let notice = sub.try_notice().expect("rejection notice");
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.source, NoticeSource::Action);
}

#[tokio::test]
async fn test_farm_and_goal_actions_show_up_in_state() {
    let h = harness(quiet_config());
    let sub = h.hub.subscribe("farms").await;

    let farm = sub
        .actions()
        .create_farm(FarmConfig::new(
            "Core",
            vec!["agent-1".into(), "agent-2".into()],
            dec!(3_000),
        ))
        .await
        .unwrap();
    let goal = sub
        .actions()
        .create_goal(GoalConfig::new("Profit", GoalType::Profit, dec!(3_000)))
        .await
        .unwrap();

    let state = h.hub.latest();
    let farm_progress = &state.farm_progress[&farm.id];
    assert_eq!(farm_progress.member_count, 2);
    assert_eq!(farm_progress.total_value, dec!(21_500));
    assert_eq!(farm_progress.progress, dec!(50));

    let goal_progress = &state.goal_progress[&goal.id];
    assert_eq!(goal_progress.current, dec!(1_500));
    assert_eq!(goal_progress.progress, dec!(50));
}

#[tokio::test]
async fn test_tiny_goal_target_saturates_progress() {
    let h = harness(quiet_config());
    let _sub = h.hub.subscribe("goals").await;

    let goal = h
        .hub
        .actions()
        .create_goal(GoalConfig::new(
            "Tiny",
            GoalType::Profit,
            rust_decimal::Decimal::new(1, 28),
        ))
        .await
        .unwrap();

    let state = h.hub.latest();
    assert!(state.connected);
    assert_eq!(state.goal_progress[&goal.id].progress, dec!(100));
    assert!(h.hub.is_running());
}
