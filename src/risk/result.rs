//! Aggregated risk metrics of one position.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::risk::LeverageClassification;

/// Risk metrics for a position, recomputed from scratch on every call.
///
/// Ratios whose denominator is zero are reported as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPositionResult {
    pub supplied_usd: Decimal,
    /// Supplied value of assets enabled as collateral
    pub supplied_collateral_usd: Decimal,
    pub borrowed_usd: Decimal,
    pub borrow_limit_usd: Decimal,
    pub liquidation_limit_usd: Decimal,
    /// `max(0, borrow_limit - borrowed)`
    pub left_to_borrow_usd: Decimal,
    /// Borrow limit over debt, percent
    pub ratio: Decimal,
    /// Collateral value over debt, percent
    pub coll_ratio: Decimal,
    /// Borrow limit over liquidation limit
    pub liq_ratio: Decimal,
    pub liq_percent: Decimal,
    /// Collateral value over borrow limit, percent
    pub min_coll_ratio: Decimal,
    /// Collateral value over liquidation limit, percent
    pub coll_liquidation_ratio: Decimal,
    /// Liquidation limit over debt; below 1 the position is liquidatable
    pub health_ratio: Decimal,
    /// Health ratio when borrowed up to the borrow limit
    pub min_health_ratio: Decimal,
    pub leverage: LeverageClassification,
    /// Liquidation price; quoted in the counter asset for LSD loops and pairs
    pub liquidation_price_usd: Option<Decimal>,
    pub current_pair_ratio: Option<Decimal>,
    pub net_apy: Decimal,
    pub incentive_usd: Decimal,
    pub total_interest_usd: Decimal,
    pub in_isolation_mode: bool,
    pub in_siloed_mode: bool,
}

impl AggregatedPositionResult {
    /// Metrics of a position with no assets.
    pub fn empty() -> Self {
        Self {
            supplied_usd: Decimal::ZERO,
            supplied_collateral_usd: Decimal::ZERO,
            borrowed_usd: Decimal::ZERO,
            borrow_limit_usd: Decimal::ZERO,
            liquidation_limit_usd: Decimal::ZERO,
            left_to_borrow_usd: Decimal::ZERO,
            ratio: Decimal::ZERO,
            coll_ratio: Decimal::ZERO,
            liq_ratio: Decimal::ZERO,
            liq_percent: Decimal::ZERO,
            min_coll_ratio: Decimal::ZERO,
            coll_liquidation_ratio: Decimal::ZERO,
            health_ratio: Decimal::ZERO,
            min_health_ratio: Decimal::ZERO,
            leverage: LeverageClassification::None,
            liquidation_price_usd: None,
            current_pair_ratio: None,
            net_apy: Decimal::ZERO,
            incentive_usd: Decimal::ZERO,
            total_interest_usd: Decimal::ZERO,
            in_isolation_mode: false,
            in_siloed_mode: false,
        }
    }

    pub fn has_debt(&self) -> bool {
        self.borrowed_usd > Decimal::ZERO
    }

    /// Debt exceeds the liquidation limit.
    pub fn is_liquidatable(&self) -> bool {
        self.has_debt() && self.liquidation_limit_usd <= self.borrowed_usd
    }
}
