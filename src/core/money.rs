//! Currency conversion between API decimals and stored minor units.
//!
//! Amounts live in the database as signed cents (`i64`). `Decimal` only appears at
//! the edges (JSON bodies, configuration), where it is rounded to two places with
//! banker's rounding exactly once.

use crate::errors::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a boundary amount to whole cents.
///
/// `field` names the input for the validation error if the value does not fit.
pub fn to_cents(amount: Decimal, field: &str) -> Result<i64> {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| Error::validation(field, format!("{amount} is out of range")))
}

/// Converts stored cents back into a two-place decimal.
#[must_use]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Renders cents as `12.34` for messages and logs.
#[must_use]
pub fn format_cents(cents: i64) -> String {
    format!("{:.2}", from_cents(cents))
}

/// `floor2(cents * percent / 100)` for non-negative inputs, never below zero.
#[must_use]
pub fn percent_of(cents: i64, percent: u8) -> i64 {
    if cents <= 0 {
        return 0;
    }
    let scaled = i128::from(cents) * i128::from(percent) / 100;
    i64::try_from(scaled).unwrap_or(i64::MAX)
}
