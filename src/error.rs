//! Error types for position aggregation.

use rust_decimal::Decimal;
use thiserror::Error;

/// Structural failures that abort aggregation for a position.
///
/// Numeric edge cases (zero denominators, ambiguous leverage) are not errors;
/// they resolve to defined sentinel values inside the calculators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskError {
    /// A used asset has no market data entry.
    #[error("missing market data for asset {symbol}")]
    MissingAssetData { symbol: String },

    /// The active or candidate category is not among the supplied definitions.
    #[error("unknown risk category {id}")]
    UnknownCategory { id: u32 },

    /// A risk factor is outside [0, 1] or a price is negative.
    #[error("invalid {field} for {symbol}: {value}")]
    InvalidRiskParameter {
        symbol: String,
        field: &'static str,
        value: Decimal,
    },

    /// A position amount or USD value is negative.
    #[error("negative {field} for {symbol}")]
    NegativeAmount { symbol: String, field: &'static str },

    /// A leverage type string that no classification matches.
    #[error("unknown leverage type: {0:?}")]
    UnknownLeverageType(String),

    /// Decimal arithmetic exceeded the representable range.
    #[error("arithmetic overflow while computing {context}")]
    ArithmeticOverflow { context: &'static str },
}

pub type Result<T> = std::result::Result<T, RiskError>;
