//! Metric Aggregation
//!
//! Computes a complete [`DashboardState`] from one snapshot of the engine
//! plus the persisted farm and goal records.
//!
//! ## Rules
//!
//! 1. **Portfolio value**: sum of every agent's total value
//! 2. **Total PnL**: portfolio value minus `agents * starting_capital`.
//!    Per-agent cost basis is not tracked; PnL is always relative to the
//!    configured starting capital.
//! 3. **Period PnL**: fixed fractions of total PnL, or real deltas against
//!    the history baselines (see [`PeriodPnl`])
//! 4. **Win rate**: filled orders marked to market against the owner's open
//!    position on the same symbol; zero fills means zero, never NaN
//! 5. **Farms / goals**: reduced over their member agents, progress clamped
//!    to [0, 100]
//!
//! The aggregator never fails and never reads a clock: missing prices fall
//! back to the order's own price, unknown agent ids contribute nothing, and
//! `last_update` is the snapshot's own timestamp.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use vantage_core::{
    Agent, Farm, Goal, GoalType, Percent, PriceMap, Timestamp, VolumeMap, ratio_percent,
};

use crate::config::{AggregatorConfig, PeriodPnl};
use crate::history::PeriodBaselines;
use crate::state::{
    AgentPerformance, AgentStatus, DashboardState, FarmProgress, GoalProgress, OpenPosition,
};

/// Everything one aggregation pass reads
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub agents: Vec<Agent>,
    pub prices: PriceMap,
    pub volumes: VolumeMap,
    pub farms: Vec<Farm>,
    pub goals: Vec<Goal>,
    /// Oldest portfolio values per window, for rolling period PnL
    pub baselines: PeriodBaselines,
    /// When the snapshot was taken
    pub taken_at: Timestamp,
}

impl Snapshot {
    pub fn new(agents: Vec<Agent>, prices: PriceMap, taken_at: Timestamp) -> Self {
        Self {
            agents,
            prices,
            volumes: VolumeMap::new(),
            farms: Vec::new(),
            goals: Vec::new(),
            baselines: PeriodBaselines::default(),
            taken_at,
        }
    }

    pub fn with_volumes(mut self, volumes: VolumeMap) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn with_farms(mut self, farms: Vec<Farm>) -> Self {
        self.farms = farms;
        self
    }

    pub fn with_goals(mut self, goals: Vec<Goal>) -> Self {
        self.goals = goals;
        self
    }

    pub fn with_baselines(mut self, baselines: PeriodBaselines) -> Self {
        self.baselines = baselines;
        self
    }
}

/// Winning vs executed filled orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinTally {
    pub winning: u64,
    pub executed: u64,
}

impl WinTally {
    /// Win rate in percent; zero when nothing executed
    pub fn rate(&self) -> Percent {
        ratio_percent(Decimal::from(self.winning), Decimal::from(self.executed))
    }

    fn merge(self, other: WinTally) -> WinTally {
        WinTally {
            winning: self.winning + other.winning,
            executed: self.executed + other.executed,
        }
    }
}

/// Pure snapshot -> state computation
#[derive(Debug, Clone, Default)]
pub struct MetricAggregator {
    config: AggregatorConfig,
}

impl MetricAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Compute the full dashboard state for a snapshot
    pub fn aggregate(&self, snapshot: &Snapshot) -> DashboardState {
        // Engines may hand agents back in any order
        let mut agents: Vec<&Agent> = snapshot.agents.iter().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));

        let portfolio_value: Decimal = agents.iter().map(|a| a.portfolio.value()).sum();
        let total_pnl =
            portfolio_value - Decimal::from(agents.len()) * self.config.starting_capital;
        let (daily_pnl, weekly_pnl, monthly_pnl) =
            self.period_pnl(total_pnl, portfolio_value, &snapshot.baselines);

        let mut performance = BTreeMap::new();
        let mut tally = WinTally::default();
        for agent in &agents {
            let agent_tally = self.win_tally(agent, &snapshot.prices);
            tally = tally.merge(agent_tally);
            performance.insert(
                agent.id.clone(),
                self.agent_performance(agent, agent_tally),
            );
        }

        let open_positions = agents
            .iter()
            .flat_map(|agent| {
                agent.portfolio.positions.iter().map(move |position| {
                    let mark_price = snapshot
                        .prices
                        .get(&position.symbol)
                        .copied()
                        .unwrap_or(position.entry_price);
                    OpenPosition {
                        agent_id: agent.id.clone(),
                        symbol: position.symbol.clone(),
                        side: position.side,
                        quantity: position.quantity,
                        entry_price: position.entry_price,
                        mark_price,
                        unrealized_pnl: position.unrealized_pnl(mark_price),
                    }
                })
            })
            .collect();

        let pending_orders = agents
            .iter()
            .flat_map(|a| a.pending_orders().cloned())
            .collect();
        let executed_orders = agents
            .iter()
            .flat_map(|a| a.filled_orders().cloned())
            .collect();

        let farm_progress = snapshot
            .farms
            .iter()
            .map(|farm| (farm.id.clone(), self.farm_progress(farm, &performance)))
            .collect();
        let goal_progress = snapshot
            .goals
            .iter()
            .map(|goal| (goal.id.clone(), self.goal_progress(goal, &performance)))
            .collect();

        let market_volumes = snapshot
            .prices
            .keys()
            .map(|symbol| (symbol.clone(), snapshot.volumes.get(symbol).copied()))
            .collect();

        DashboardState {
            portfolio_value,
            total_pnl,
            daily_pnl,
            weekly_pnl,
            monthly_pnl,
            active_agents: agents.iter().filter(|a| a.active).count(),
            total_agents: agents.len(),
            agents: performance,
            open_positions,
            pending_orders,
            executed_orders,
            win_rate: tally.rate(),
            farm_progress,
            goal_progress,
            market_prices: snapshot.prices.clone(),
            market_volumes,
            connected: true,
            last_update: Some(snapshot.taken_at),
        }
    }

    /// Filled orders of one agent that are in profit at current prices.
    ///
    /// A fill only counts as winning when the agent still holds a position
    /// on the symbol. Unpriced symbols are marked at the order's own price,
    /// which is never a win.
    pub fn win_tally(&self, agent: &Agent, prices: &PriceMap) -> WinTally {
        let mut tally = WinTally::default();
        for order in agent.filled_orders() {
            tally.executed += 1;
            if agent.position_for(&order.symbol).is_none() {
                continue;
            }
            let mark = prices.get(&order.symbol).copied().unwrap_or(order.price);
            if order.mark_to_market(mark) > Decimal::ZERO {
                tally.winning += 1;
            }
        }
        tally
    }

    fn agent_performance(&self, agent: &Agent, tally: WinTally) -> AgentPerformance {
        let portfolio_value = agent.portfolio.value();
        AgentPerformance {
            agent_id: agent.id.clone(),
            name: agent.name.clone(),
            status: AgentStatus::from_active(agent.active),
            portfolio_value,
            pnl: portfolio_value - self.config.starting_capital,
            win_rate: agent.performance.win_rate,
            total_trades: agent.performance.total_trades,
            open_positions: agent.portfolio.positions.len(),
            mark_win_rate: tally.rate(),
        }
    }

    fn period_pnl(
        &self,
        total_pnl: Decimal,
        portfolio_value: Decimal,
        baselines: &PeriodBaselines,
    ) -> (Decimal, Decimal, Decimal) {
        match self.config.period_pnl {
            PeriodPnl::Fractional(weights) => (
                total_pnl * weights.daily,
                total_pnl * weights.weekly,
                total_pnl * weights.monthly,
            ),
            PeriodPnl::Rolling => {
                let delta = |baseline: Option<Decimal>| {
                    baseline.map_or(Decimal::ZERO, |start| portfolio_value - start)
                };
                (
                    delta(baselines.day),
                    delta(baselines.week),
                    delta(baselines.month),
                )
            }
        }
    }

    fn farm_progress(
        &self,
        farm: &Farm,
        performance: &BTreeMap<String, AgentPerformance>,
    ) -> FarmProgress {
        let members: Vec<&AgentPerformance> = farm
            .agent_ids
            .iter()
            .filter_map(|id| performance.get(id))
            .collect();

        let total_value: Decimal = members.iter().map(|p| p.portfolio_value).sum();
        let total_pnl: Decimal = members.iter().map(|p| p.pnl).sum();

        FarmProgress {
            farm_id: farm.id.clone(),
            name: farm.name.clone(),
            status: farm.status,
            member_count: farm.agent_ids.len(),
            active_members: members
                .iter()
                .filter(|p| p.status == AgentStatus::Active)
                .count(),
            total_value,
            total_pnl,
            progress: ratio_percent(total_pnl, farm.target),
        }
    }

    fn goal_progress(
        &self,
        goal: &Goal,
        performance: &BTreeMap<String, AgentPerformance>,
    ) -> GoalProgress {
        let scoped: Vec<&AgentPerformance> = if goal.agent_ids.is_empty() {
            performance.values().collect()
        } else {
            goal.agent_ids
                .iter()
                .filter_map(|id| performance.get(id))
                .collect()
        };

        let current = match goal.goal_type {
            GoalType::Profit => scoped.iter().map(|p| p.pnl).sum::<Decimal>(),
            GoalType::WinRate => {
                let trades: u64 = scoped.iter().map(|p| p.total_trades).sum();
                if trades == 0 {
                    Decimal::ZERO
                } else {
                    let weighted: Decimal = scoped
                        .iter()
                        .map(|p| p.win_rate * Decimal::from(p.total_trades))
                        .sum();
                    weighted / Decimal::from(trades)
                }
            }
            GoalType::TradeCount => {
                Decimal::from(scoped.iter().map(|p| p.total_trades).sum::<u64>())
            }
        };

        GoalProgress {
            goal_id: goal.id.clone(),
            name: goal.name.clone(),
            goal_type: goal.goal_type,
            current,
            target: goal.target,
            progress: ratio_percent(current, goal.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PnlWeights;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use vantage_core::{
        FarmConfig, GoalConfig, Order, OrderDraft, OrderStatus, Position, Side,
    };

    fn ts() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn agent(id: &str, value: Decimal) -> Agent {
        Agent::new(id, format!("Agent {id}"), value)
    }

    fn filled(agent_id: &str, symbol: &str, side: Side, price: Decimal) -> Order {
        let draft = OrderDraft::limit(symbol, side, dec!(1), price);
        let mut order = Order::from_draft(agent_id, &draft, price, ts());
        order.status = OrderStatus::Filled;
        order
    }

    fn prices(entries: &[(&str, Decimal)]) -> PriceMap {
        entries
            .iter()
            .map(|(s, p)| (s.to_string(), *p))
            .collect()
    }

    fn aggregator() -> MetricAggregator {
        MetricAggregator::new(AggregatorConfig::default())
    }

    #[test]
    fn test_two_agent_portfolio_and_pnl() {
        let snapshot = Snapshot::new(
            vec![agent("a", dec!(12_000)), agent("b", dec!(9_500))],
            PriceMap::new(),
            ts(),
        );

        let state = aggregator().aggregate(&snapshot);

        assert_eq!(state.portfolio_value, dec!(21_500));
        assert_eq!(state.total_pnl, dec!(1_500));
        assert_eq!(state.agents["a"].pnl, dec!(2_000));
        assert_eq!(state.agents["b"].pnl, dec!(-500));
        assert_eq!(state.total_agents, 2);
    }

    #[test]
    fn test_fractional_period_pnl() {
        let config = AggregatorConfig {
            period_pnl: PeriodPnl::Fractional(PnlWeights {
                daily: dec!(0.1),
                weekly: dec!(0.5),
                monthly: dec!(1),
            }),
            ..Default::default()
        };
        let snapshot = Snapshot::new(vec![agent("a", dec!(12_000))], PriceMap::new(), ts());

        let state = MetricAggregator::new(config).aggregate(&snapshot);

        assert_eq!(state.daily_pnl, dec!(200));
        assert_eq!(state.weekly_pnl, dec!(1000));
        assert_eq!(state.monthly_pnl, dec!(2000));
    }

    #[test]
    fn test_rolling_period_pnl_uses_baselines() {
        let config = AggregatorConfig {
            period_pnl: PeriodPnl::Rolling,
            ..Default::default()
        };
        let snapshot = Snapshot::new(vec![agent("a", dec!(12_000))], PriceMap::new(), ts())
            .with_baselines(PeriodBaselines {
                day: Some(dec!(11_900)),
                week: Some(dec!(11_000)),
                month: None,
            });

        let state = MetricAggregator::new(config).aggregate(&snapshot);

        assert_eq!(state.daily_pnl, dec!(100));
        assert_eq!(state.weekly_pnl, dec!(1_000));
        assert_eq!(state.monthly_pnl, Decimal::ZERO);
    }

    #[test]
    fn test_win_rate_three_of_four() {
        let mut a = agent("a", dec!(10_000));
        a.portfolio
            .positions
            .push(Position::new("X", Side::Buy, dec!(4), dec!(98)));
        a.orders = vec![
            filled("a", "X", Side::Buy, dec!(90)),
            filled("a", "X", Side::Buy, dec!(95)),
            filled("a", "X", Side::Buy, dec!(99)),
            filled("a", "X", Side::Buy, dec!(110)),
        ];

        let snapshot = Snapshot::new(vec![a], prices(&[("X", dec!(100))]), ts());
        let state = aggregator().aggregate(&snapshot);

        assert_eq!(state.agents["a"].mark_win_rate, dec!(75));
        assert_eq!(state.win_rate, dec!(75));
        assert_eq!(state.executed_orders.len(), 4);
    }

    #[test]
    fn test_global_win_rate_is_proportional() {
        let mut a = agent("a", dec!(10_000));
        a.portfolio
            .positions
            .push(Position::new("X", Side::Buy, dec!(4), dec!(98)));
        a.orders = vec![
            filled("a", "X", Side::Buy, dec!(90)),
            filled("a", "X", Side::Buy, dec!(95)),
            filled("a", "X", Side::Buy, dec!(99)),
            filled("a", "X", Side::Buy, dec!(110)),
        ];
        // Fills on a symbol with no open position never win
        let mut b = agent("b", dec!(10_000));
        b.orders = vec![
            filled("b", "Y", Side::Buy, dec!(1)),
            filled("b", "Y", Side::Buy, dec!(1)),
            filled("b", "Y", Side::Buy, dec!(1)),
            filled("b", "Y", Side::Buy, dec!(1)),
        ];

        let state = aggregator().aggregate(&Snapshot::new(
            vec![a, b],
            prices(&[("X", dec!(100)), ("Y", dec!(5))]),
            ts(),
        ));

        assert_eq!(state.agents["a"].mark_win_rate, dec!(75));
        assert_eq!(state.agents["b"].mark_win_rate, dec!(0));
        assert_eq!(state.win_rate, dec!(37.5));
    }

    #[test]
    fn test_zero_fills_zero_win_rate() {
        let state = aggregator().aggregate(&Snapshot::new(
            vec![agent("a", dec!(10_000))],
            PriceMap::new(),
            ts(),
        ));
        assert_eq!(state.win_rate, Decimal::ZERO);

        let empty = aggregator().aggregate(&Snapshot::new(Vec::new(), PriceMap::new(), ts()));
        assert_eq!(empty.win_rate, Decimal::ZERO);
        assert_eq!(empty.portfolio_value, Decimal::ZERO);
    }

    #[test]
    fn test_missing_price_falls_back_to_order_price() {
        let mut a = agent("a", dec!(10_000));
        a.portfolio
            .positions
            .push(Position::new("X", Side::Sell, dec!(1), dec!(50)));
        a.orders = vec![filled("a", "X", Side::Sell, dec!(50))];

        let state = aggregator().aggregate(&Snapshot::new(vec![a], PriceMap::new(), ts()));

        assert_eq!(state.win_rate, Decimal::ZERO);
        assert_eq!(state.open_positions[0].mark_price, dec!(50));
        assert_eq!(state.open_positions[0].unrealized_pnl, Decimal::ZERO);
    }

    #[test]
    fn test_short_fill_wins_when_price_drops() {
        let mut a = agent("a", dec!(10_000));
        a.portfolio
            .positions
            .push(Position::new("X", Side::Sell, dec!(1), dec!(50)));
        a.orders = vec![filled("a", "X", Side::Sell, dec!(50))];

        let state =
            aggregator().aggregate(&Snapshot::new(vec![a], prices(&[("X", dec!(40))]), ts()));

        assert_eq!(state.win_rate, dec!(100));
        assert_eq!(state.open_positions[0].unrealized_pnl, dec!(10));
    }

    #[test]
    fn test_orders_and_positions_flattened_in_agent_order() {
        let mut b = agent("b", dec!(10_000));
        b.portfolio
            .positions
            .push(Position::new("X", Side::Buy, dec!(1), dec!(1)));
        let draft = OrderDraft::market("X", Side::Buy, dec!(1));
        b.orders = vec![Order::from_draft("b", &draft, dec!(1), ts())];

        let mut a = agent("a", dec!(10_000));
        a.portfolio
            .positions
            .push(Position::new("Y", Side::Buy, dec!(1), dec!(1)));
        a.orders = vec![
            Order::from_draft("a", &draft, dec!(1), ts()),
            filled("a", "Y", Side::Buy, dec!(1)),
        ];

        let state = aggregator().aggregate(&Snapshot::new(vec![b, a], PriceMap::new(), ts()));

        assert_eq!(state.open_positions.len(), 2);
        assert_eq!(state.open_positions[0].agent_id, "a");
        assert_eq!(state.pending_orders.len(), 2);
        assert_eq!(state.pending_orders[0].agent_id, "a");
        assert_eq!(state.executed_orders.len(), 1);
    }

    #[test]
    fn test_agent_counts_and_status() {
        let mut a = agent("a", dec!(10_000));
        a.active = true;
        a.performance.win_rate = dec!(61.5);
        a.performance.total_trades = 13;
        let b = agent("b", dec!(10_000));

        let state = aggregator().aggregate(&Snapshot::new(vec![a, b], PriceMap::new(), ts()));

        assert_eq!(state.active_agents, 1);
        assert_eq!(state.agents["a"].status, AgentStatus::Active);
        assert_eq!(state.agents["b"].status, AgentStatus::Stopped);
        assert_eq!(state.agents["a"].win_rate, dec!(61.5));
        assert_eq!(state.agents["a"].total_trades, 13);
    }

    #[test]
    fn test_negative_portfolio_value_degrades_to_zero() {
        let state = aggregator().aggregate(&Snapshot::new(
            vec![agent("a", dec!(-100))],
            PriceMap::new(),
            ts(),
        ));
        assert_eq!(state.portfolio_value, Decimal::ZERO);
        assert_eq!(state.total_pnl, dec!(-10_000));
    }

    #[test]
    fn test_farm_reduction() {
        let mut a = agent("a", dec!(12_000));
        a.active = true;
        let b = agent("b", dec!(11_000));
        let c = agent("c", dec!(5_000));

        let farm = Farm::from_config(
            FarmConfig::new(
                "Momentum farm",
                vec!["a".into(), "b".into(), "ghost".into()],
                dec!(6_000),
            ),
            ts(),
        );
        let farm_id = farm.id.clone();

        let state = aggregator().aggregate(
            &Snapshot::new(vec![a, b, c], PriceMap::new(), ts()).with_farms(vec![farm]),
        );

        let progress = &state.farm_progress[&farm_id];
        assert_eq!(progress.total_value, dec!(23_000));
        assert_eq!(progress.total_pnl, dec!(3_000));
        assert_eq!(progress.member_count, 3);
        assert_eq!(progress.active_members, 1);
        assert_eq!(progress.progress, dec!(50));
    }

    #[test]
    fn test_goal_progress_is_clamped() {
        let mut a = agent("a", dec!(30_000));
        a.performance.total_trades = 40;
        a.performance.win_rate = dec!(80);
        let mut b = agent("b", dec!(5_000));
        b.performance.total_trades = 10;
        b.performance.win_rate = dec!(30);

        let goals = vec![
            Goal::from_config(GoalConfig::new("profit", GoalType::Profit, dec!(1_000)), ts()),
            Goal::from_config(
                GoalConfig::new("loss", GoalType::Profit, dec!(1_000)).for_agents(vec!["b".into()]),
                ts(),
            ),
            Goal::from_config(GoalConfig::new("trades", GoalType::TradeCount, dec!(100)), ts()),
            Goal::from_config(GoalConfig::new("win", GoalType::WinRate, dec!(70)), ts()),
            Goal::from_config(GoalConfig::new("zero", GoalType::TradeCount, dec!(0)), ts()),
        ];
        let ids: Vec<String> = goals.iter().map(|g| g.id.clone()).collect();

        let state = aggregator()
            .aggregate(&Snapshot::new(vec![a, b], PriceMap::new(), ts()).with_goals(goals));

        // 15_000 profit against 1_000 target overshoots
        assert_eq!(state.goal_progress[&ids[0]].current, dec!(15_000));
        assert_eq!(state.goal_progress[&ids[0]].progress, dec!(100));
        // Agent b alone lost money
        assert_eq!(state.goal_progress[&ids[1]].progress, dec!(0));
        // 50 of 100 trades
        assert_eq!(state.goal_progress[&ids[2]].progress, dec!(50));
        // (80*40 + 30*10) / 50 = 70
        assert_eq!(state.goal_progress[&ids[3]].current, dec!(70));
        assert_eq!(state.goal_progress[&ids[3]].progress, dec!(100));
        // Zero target never divides
        assert_eq!(state.goal_progress[&ids[4]].progress, dec!(0));

        for progress in state.goal_progress.values() {
            assert!(progress.progress >= dec!(0) && progress.progress <= dec!(100));
        }
    }

    #[test]
    fn test_volumes_default_to_unavailable() {
        let mut volumes = VolumeMap::new();
        volumes.insert("X".into(), dec!(1_234));

        let state = aggregator().aggregate(
            &Snapshot::new(Vec::new(), prices(&[("X", dec!(1)), ("Y", dec!(2))]), ts())
                .with_volumes(volumes),
        );

        assert_eq!(state.market_volumes["X"], Some(dec!(1_234)));
        assert_eq!(state.market_volumes["Y"], None);
        assert_eq!(state.market_prices.len(), 2);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let mut a = agent("a", dec!(12_000));
        a.portfolio
            .positions
            .push(Position::new("X", Side::Buy, dec!(2), dec!(90)));
        a.orders = vec![filled("a", "X", Side::Buy, dec!(90))];
        let agents = vec![a, agent("b", dec!(9_500))];
        let snapshot = Snapshot::new(agents, prices(&[("X", dec!(100))]), ts())
            .with_farms(vec![Farm::from_config(
                FarmConfig::new("f", vec!["a".into()], dec!(100)),
                ts(),
            )]);

        let aggregator = aggregator();
        let first = aggregator.aggregate(&snapshot);
        let second = aggregator.aggregate(&snapshot);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.last_update, Some(ts()));
        assert!(first.connected);
    }
}
