//! Risk aggregation for money-market positions.
//!
//! - Risk parameter resolution per asset and category
//! - Position totals, ratios and health
//! - Leverage classification and liquidation prices
//! - Net yield of supply and debt
//! - Isolation, siloed and category constraints

mod aggregation;
mod apy;
mod constraints;
mod leverage;
mod liquidation;
mod resolver;
mod result;

pub use aggregation::{sum, AggregationEngine, PositionTotals};
pub use apy::{apr_to_apy, CompoundingFrequency, NetApy, YieldAggregator};
pub use constraints::{CategoryEntryCheck, ModeConstraintEngine};
pub use leverage::{LeverageClassification, LeverageClassifier, LeverageType};
pub use liquidation::{
    long_liquidation_price, short_liquidation_price, LiquidationEstimate,
    LiquidationPriceCalculator,
};
pub use resolver::{
    resolve, strategy_for, BaseFactorStrategy, CategoryStrategy, RiskFactors,
    RiskParameterStrategy, ZeroWeightScope,
};
pub use result::AggregatedPositionResult;
