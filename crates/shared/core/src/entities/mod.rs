mod agent;
mod event;
mod farm;
mod goal;
mod order;
mod order_status;
mod order_type;
mod position;
mod side;

pub use agent::{Agent, AgentConfig, AgentId, PerformanceCounters, Portfolio};
pub use event::EngineEvent;
pub use farm::{Farm, FarmConfig, FarmStatus, RecordId};
pub use goal::{Goal, GoalConfig, GoalStatus, GoalType};
pub use order::{Order, OrderDraft, OrderId};
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use position::Position;
pub use side::Side;
