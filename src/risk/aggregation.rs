//! USD totals and the position aggregation entry point.
//!
//! Protocols differ only in how an asset's collateral weight is resolved;
//! everything else is the same filter-sum over used assets.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::position::{
    validate_category, Asset, PositionChange, PositionSnapshot, RiskCategory, UsedAsset,
};
use crate::utils::decimal::{
    checked_mul, floor_zero, round_to_precision, safe_div, safe_percent,
};

use super::apy::YieldAggregator;
use super::constraints::ModeConstraintEngine;
use super::leverage::LeverageClassifier;
use super::liquidation::LiquidationPriceCalculator;
use super::resolver::{strategy_for, RiskFactors, RiskParameterStrategy};
use super::result::AggregatedPositionResult;

/// Sum `projection` over the items matching `predicate`, in exact decimal.
pub fn sum<T, I, P, F>(items: I, predicate: P, projection: F) -> Decimal
where
    I: IntoIterator<Item = T>,
    P: Fn(&T) -> bool,
    F: Fn(&T) -> Decimal,
{
    items
        .into_iter()
        .filter(|item| predicate(item))
        .map(|item| projection(&item))
        .sum()
}

/// Collateral-weighted USD totals of a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionTotals {
    pub supplied_usd: Decimal,
    pub supplied_collateral_usd: Decimal,
    pub borrowed_usd: Decimal,
    pub borrow_limit_usd: Decimal,
    pub liquidation_limit_usd: Decimal,
}

/// Aggregates positions using one protocol's risk-parameter strategy.
pub struct AggregationEngine {
    strategy: Box<dyn RiskParameterStrategy>,
}

impl AggregationEngine {
    pub fn new(strategy: impl RiskParameterStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    /// Engine with the strategy the profile selects.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            strategy: strategy_for(config),
        }
    }

    /// Effective factors of `asset` under `category`.
    pub fn resolve(&self, asset: &Asset, category: Option<&RiskCategory>) -> RiskFactors {
        self.strategy.resolve(asset, category)
    }

    /// USD totals over used assets joined with their market data.
    pub fn totals(
        &self,
        assets: &[(&UsedAsset, &Asset)],
        category: Option<&RiskCategory>,
    ) -> PositionTotals {
        let collateral = |(used, _): &&(&UsedAsset, &Asset)| used.is_collateral();

        PositionTotals {
            supplied_usd: sum(
                assets,
                |(used, _)| used.is_supplied(),
                |(used, _)| used.supplied_usd,
            ),
            supplied_collateral_usd: sum(assets, collateral, |(used, _)| used.supplied_usd),
            borrowed_usd: sum(
                assets,
                |(used, _)| used.is_borrowed(),
                |(used, _)| used.borrowed_usd,
            ),
            borrow_limit_usd: sum(assets, collateral, |(used, asset)| {
                used.supplied_usd * self.resolve(asset, category).collateral_factor
            }),
            liquidation_limit_usd: sum(assets, collateral, |(used, asset)| {
                used.supplied_usd * self.resolve(asset, category).liquidation_threshold
            }),
        }
    }

    /// Aggregate a position under its active category.
    ///
    /// Aborts with a typed error if the snapshot is structurally unsound
    /// (missing market data, unknown category, out-of-range factors).
    pub fn aggregate(
        &self,
        snapshot: &PositionSnapshot,
        config: &AnalysisConfig,
    ) -> Result<AggregatedPositionResult> {
        self.aggregate_with_category(snapshot, snapshot.active_category, config)
    }

    /// Aggregate a position as if `category_id` were active.
    pub fn aggregate_with_category(
        &self,
        snapshot: &PositionSnapshot,
        category_id: u32,
        config: &AnalysisConfig,
    ) -> Result<AggregatedPositionResult> {
        snapshot.validate()?;
        let category = snapshot.category(category_id)?;
        if let Some(category) = category {
            validate_category(category)?;
        }

        let assets = snapshot.joined()?;
        let totals = self.totals(&assets, category);

        let leverage = LeverageClassifier::from_config(config).classify(&snapshot.used_assets);
        let estimate = LiquidationPriceCalculator::estimate(
            &leverage,
            snapshot,
            totals.borrowed_usd,
            totals.liquidation_limit_usd,
        )?;
        let yields = YieldAggregator::net_apy(assets.iter().copied())?;

        let liq_ratio = safe_div(totals.borrow_limit_usd, totals.liquidation_limit_usd)?;

        if totals.borrowed_usd > Decimal::ZERO && totals.liquidation_limit_usd <= totals.borrowed_usd
        {
            warn!(
                borrowed_usd = %totals.borrowed_usd,
                liquidation_limit_usd = %totals.liquidation_limit_usd,
                "Position is at or beyond its liquidation limit"
            );
        }

        let (leverage, liquidation_price_usd, current_pair_ratio) = match estimate {
            Some(e) => (e.classification, Some(e.price), e.pair_ratio),
            None => (leverage, None, None),
        };

        let result = AggregatedPositionResult {
            supplied_usd: totals.supplied_usd,
            supplied_collateral_usd: totals.supplied_collateral_usd,
            borrowed_usd: totals.borrowed_usd,
            borrow_limit_usd: totals.borrow_limit_usd,
            liquidation_limit_usd: totals.liquidation_limit_usd,
            left_to_borrow_usd: floor_zero(totals.borrow_limit_usd - totals.borrowed_usd),
            ratio: safe_percent(totals.borrow_limit_usd, totals.borrowed_usd)?,
            coll_ratio: safe_percent(totals.supplied_collateral_usd, totals.borrowed_usd)?,
            liq_ratio,
            liq_percent: checked_mul(liq_ratio, Decimal::ONE_HUNDRED)?,
            min_coll_ratio: safe_percent(totals.supplied_collateral_usd, totals.borrow_limit_usd)?,
            coll_liquidation_ratio: safe_percent(
                totals.supplied_collateral_usd,
                totals.liquidation_limit_usd,
            )?,
            health_ratio: round_to_precision(
                safe_div(totals.liquidation_limit_usd, totals.borrowed_usd)?,
                4,
            ),
            min_health_ratio: round_to_precision(
                safe_div(totals.liquidation_limit_usd, totals.borrow_limit_usd)?,
                4,
            ),
            leverage,
            liquidation_price_usd,
            current_pair_ratio,
            net_apy: yields.net_apy,
            incentive_usd: yields.incentive_usd,
            total_interest_usd: yields.total_interest_usd,
            in_isolation_mode: ModeConstraintEngine::is_in_isolation_mode(
                &snapshot.used_assets,
                &snapshot.market,
            )?,
            in_siloed_mode: ModeConstraintEngine::is_in_siloed_mode(
                &snapshot.used_assets,
                &snapshot.market,
            )?,
        };

        debug!(
            category = category_id,
            supplied_usd = %result.supplied_usd,
            borrowed_usd = %result.borrowed_usd,
            borrow_limit_usd = %result.borrow_limit_usd,
            liquidation_limit_usd = %result.liquidation_limit_usd,
            ratio = %result.ratio,
            leverage = %result.leverage.leverage_type(),
            "Aggregated position"
        );

        Ok(result)
    }

    /// Aggregate the position as it would be after `changes`.
    pub fn aggregate_after(
        &self,
        snapshot: &PositionSnapshot,
        changes: &[PositionChange],
        config: &AnalysisConfig,
    ) -> Result<AggregatedPositionResult> {
        self.aggregate(&snapshot.with_changes(changes)?, config)
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
