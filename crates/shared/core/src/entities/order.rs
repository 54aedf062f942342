use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AgentId, OrderStatus, OrderType, Side};
use crate::values::{Price, Quantity, Symbol};

/// Unique identifier for an order
pub type OrderId = String;

/// Full order details as held by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Agent that owns the order
    pub agent_id: AgentId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order from a draft with a freshly generated id
    pub fn from_draft(
        agent_id: impl Into<AgentId>,
        draft: &OrderDraft,
        price: Price,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            symbol: draft.symbol.clone(),
            side: draft.side,
            price,
            quantity: draft.quantity,
            order_type: draft.order_type,
            status: OrderStatus::Pending,
            created_at: timestamp,
        }
    }

    /// Returns true once the engine reported the order as executed
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Unrealized PnL of this execution marked at `mark_price`
    pub fn mark_to_market(&self, mark_price: Price) -> Decimal {
        (mark_price - self.price) * self.quantity * self.side.sign()
    }
}

/// Consumer intent to place an order, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    /// Required for limit orders; market orders use the current price
    pub price: Option<Price>,
    #[serde(default)]
    pub order_type: OrderType,
}

impl OrderDraft {
    /// Market order draft
    pub fn market(symbol: impl Into<Symbol>, side: Side, quantity: Quantity) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            price: None,
            order_type: OrderType::Market,
        }
    }

    /// Limit order draft
    pub fn limit(symbol: impl Into<Symbol>, side: Side, quantity: Quantity, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            price: Some(price),
            order_type: OrderType::Limit,
        }
    }
}
