//! Monetary amounts. Values are `Decimal` in memory and whole cents in the
//! database, so sums and comparisons stay exact.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{PharmacyError, Result};

/// Digits after the decimal point for every stored amount.
pub const SCALE: u32 = 2;

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

/// Round half away from zero to cents.
pub fn round(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn to_cents(amount: Decimal) -> Result<i64> {
    (round(amount) * Decimal::from(100))
        .to_i64()
        .ok_or_else(|| PharmacyError::InvalidArgument {
            field: "amount",
            value: amount.to_string(),
        })
}

/// Parse user input such as `12.5` or `1200`. Amounts are not rounded here;
/// storing them does that.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|_| PharmacyError::InvalidArgument {
        field: "amount",
        value: raw.to_string(),
    })
}

/// `total / count` to cents, zero when there is nothing to average.
pub fn average(total: Decimal, count: i64) -> Decimal {
    if count <= 0 {
        Decimal::ZERO
    } else {
        round(total / Decimal::from(count))
    }
}

/// Spreadsheet cells take floats; only the final display value is converted.
pub fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}
