//! # Money Market Risk
//!
//! Risk aggregation for lending-protocol positions: borrow and liquidation
//! limits, health ratios, leverage classification, liquidation prices, net
//! APY and mode constraints, computed from a snapshot of the position and
//! the market.
//!
//! ## Architecture
//!
//! - `config`: Per-protocol analysis profiles
//! - `position`: Position, market and risk-category inputs
//! - `risk`: Aggregation, leverage, liquidation, yield and constraints
//! - `utils`: Shared decimal arithmetic
//! - `error`: Error type of the library

pub mod config;
pub mod error;
pub mod position;
pub mod risk;
pub mod utils;

pub use config::{AnalysisConfig, Config};
pub use error::{Result, RiskError};
pub use position::PositionSnapshot;
pub use risk::{AggregatedPositionResult, AggregationEngine};
