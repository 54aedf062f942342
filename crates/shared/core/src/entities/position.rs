use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::{Price, Quantity, Symbol};

/// An open exposure held by an agent.
///
/// Exists only while the owning agent holds the exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    /// Position quantity (always positive)
    pub quantity: Quantity,
    /// Average entry price
    pub entry_price: Price,
}

impl Position {
    pub fn new(
        symbol: impl Into<Symbol>,
        side: Side,
        quantity: Quantity,
        entry_price: Price,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            entry_price,
        }
    }

    /// Calculate unrealized PnL at a given mark price
    pub fn unrealized_pnl(&self, mark_price: Price) -> Decimal {
        (mark_price - self.entry_price) * self.quantity * self.side.sign()
    }

    /// Add to the position, re-weighting the entry price
    pub fn add(&mut self, quantity: Quantity, price: Price) {
        let total = self.quantity + quantity;
        if total.is_zero() {
            return;
        }
        self.entry_price = (self.quantity * self.entry_price + quantity * price) / total;
        self.quantity = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_long_unrealized_pnl() {
        let pos = Position::new("BTC-USD", Side::Buy, dec!(2), dec!(100));
        assert_eq!(pos.unrealized_pnl(dec!(110)), dec!(20));
        assert_eq!(pos.unrealized_pnl(dec!(90)), dec!(-20));
    }

    #[test]
    fn test_short_unrealized_pnl() {
        let pos = Position::new("BTC-USD", Side::Sell, dec!(2), dec!(100));
        assert_eq!(pos.unrealized_pnl(dec!(90)), dec!(20));
    }

    #[test]
    fn test_add_reweights_entry() {
        let mut pos = Position::new("BTC-USD", Side::Buy, dec!(1), dec!(100));
        pos.add(dec!(1), dec!(200));
        assert_eq!(pos.quantity, dec!(2));
        assert_eq!(pos.entry_price, dec!(150));
    }
}
