use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision
pub type Quantity = Decimal;

/// Percentage in [0, 100] once it leaves the aggregator
pub type Percent = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Symbol identifier for a tradeable instrument
pub type Symbol = String;

/// Current price per symbol. Ordered so that equal inputs compare equal.
pub type PriceMap = BTreeMap<Symbol, Price>;

/// Traded volume per symbol, when a volume feed provides one
pub type VolumeMap = BTreeMap<Symbol, Quantity>;

/// Clamp a percentage into [0, 100]
pub fn clamp_percent(value: Decimal) -> Percent {
    value.clamp(Decimal::ZERO, dec!(100))
}

/// `numerator / denominator` as a clamped percentage.
///
/// A non-positive denominator yields zero rather than dividing. A ratio too
/// large for `Decimal` saturates at 100 (or 0 for a non-positive numerator).
pub fn ratio_percent(numerator: Decimal, denominator: Decimal) -> Percent {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match numerator
        .checked_div(denominator)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
    {
        Some(percent) => clamp_percent(percent),
        None if numerator > Decimal::ZERO => dec!(100),
        None => Decimal::ZERO,
    }
}
