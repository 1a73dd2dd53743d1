//! Decimal arithmetic utilities for risk calculations.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{Result, RiskError};

/// Round a decimal to a specific number of decimal places.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}

/// Safe division that returns zero if divisor is zero.
///
/// A quotient outside the `Decimal` range (e.g. a large limit over dust
/// debt) is an `ArithmeticOverflow` error, never a panic.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Result<Decimal> {
    if denominator == Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    numerator
        .checked_div(denominator)
        .ok_or(RiskError::ArithmeticOverflow { context: "division" })
}

/// `numerator / denominator * 100`, zero when the denominator is zero.
pub fn safe_percent(numerator: Decimal, denominator: Decimal) -> Result<Decimal> {
    checked_mul(safe_div(numerator, denominator)?, dec!(100))
}

/// Multiplication that reports overflow instead of panicking.
pub fn checked_mul(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_mul(rhs)
        .ok_or(RiskError::ArithmeticOverflow {
            context: "multiplication",
        })
}

/// Portion of `value` earned at a rate quoted in percent (e.g. 4.5 = 4.5%).
pub fn apply_rate(value: Decimal, rate_pct: Decimal) -> Result<Decimal> {
    Ok(checked_mul(value, rate_pct)? / dec!(100))
}

/// Clamp negative values to zero.
pub fn floor_zero(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
