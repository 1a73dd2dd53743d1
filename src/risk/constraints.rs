//! Isolation, siloed-borrowing and risk-category constraints.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::{Result, RiskError};
use crate::position::{Asset, AssetMarketData, PositionSnapshot, UsedAssets, NO_CATEGORY};
use crate::utils::decimal::{floor_zero, safe_div};

use super::aggregation::AggregationEngine;
use super::result::AggregatedPositionResult;

/// Outcome of checking whether a position may switch to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntryCheck {
    /// Every borrowed asset is borrowable inside the category
    pub eligible: bool,
    /// Debt stays below the liquidation limit under the category's factors
    pub would_stay_overcollateralized: bool,
}

impl CategoryEntryCheck {
    pub fn can_enter(&self) -> bool {
        self.eligible && self.would_stay_overcollateralized
    }
}

/// Feasibility checks for protocol modes. All checks are pure predicates
/// over the snapshot; no mode state is kept.
pub struct ModeConstraintEngine<'a> {
    engine: &'a AggregationEngine,
    config: &'a AnalysisConfig,
}

impl<'a> ModeConstraintEngine<'a> {
    pub fn new(engine: &'a AggregationEngine, config: &'a AnalysisConfig) -> Self {
        Self { engine, config }
    }

    /// Check whether the position could enter `candidate`.
    ///
    /// Category 0 (no category) is always eligible. The collateralization
    /// check re-aggregates with the candidate's factors and requires
    /// `ratio == 0` or `ratio > liq_percent`, i.e. debt below the liquidation
    /// limit.
    pub fn can_enter_category(
        &self,
        snapshot: &PositionSnapshot,
        candidate: u32,
    ) -> Result<CategoryEntryCheck> {
        let eligible = match snapshot.category(candidate)? {
            None => true,
            Some(category) => snapshot
                .used_assets
                .values()
                .filter(|used| used.is_borrowed())
                .all(|used| category.is_borrow_eligible(&used.symbol)),
        };

        let simulated = self
            .engine
            .aggregate_with_category(snapshot, candidate, self.config)?;
        let would_stay_overcollateralized = stays_overcollateralized(&simulated);

        debug!(
            candidate,
            eligible,
            would_stay_overcollateralized,
            simulated_ratio = %simulated.ratio,
            "Checked category entry"
        );

        Ok(CategoryEntryCheck {
            eligible,
            would_stay_overcollateralized,
        })
    }

    /// Whether `symbol` may be borrowed given the position's current modes.
    pub fn can_borrow(&self, snapshot: &PositionSnapshot, symbol: &str) -> Result<bool> {
        let asset = snapshot.asset(symbol)?;
        if !asset.can_be_borrowed {
            return Ok(false);
        }

        if Self::is_in_isolation_mode(&snapshot.used_assets, &snapshot.market)?
            && !asset.borrowable_in_isolation
        {
            return Ok(false);
        }

        // A siloed asset must be the only debt, whichever side introduces it
        let other_debt = snapshot
            .used_assets
            .values()
            .any(|used| used.is_borrowed() && used.symbol != symbol);
        if other_debt
            && (asset.siloed_borrowing
                || Self::is_in_siloed_mode(&snapshot.used_assets, &snapshot.market)?)
        {
            return Ok(false);
        }

        if let Some(category) = snapshot.active()? {
            if !category.is_borrow_eligible(symbol) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Amount of `symbol` (asset units) still borrowable.
    ///
    /// Bounded by the position's remaining borrow capacity, the market's
    /// available liquidity and, in isolation mode, the remaining debt ceiling
    /// of the isolated collateral.
    pub fn max_borrowable(
        &self,
        snapshot: &PositionSnapshot,
        symbol: &str,
        result: &AggregatedPositionResult,
    ) -> Result<Decimal> {
        if !self.can_borrow(snapshot, symbol)? {
            return Ok(Decimal::ZERO);
        }

        let mut room_usd = result.left_to_borrow_usd;

        for used in snapshot.used_assets.values().filter(|u| u.is_collateral()) {
            let collateral = snapshot.asset(&used.symbol)?;
            if let (true, Some(ceiling)) = (collateral.isolation_mode, collateral.debt_ceiling_usd)
            {
                room_usd = room_usd.min(floor_zero(ceiling - collateral.isolation_debt_usd));
            }
        }

        let asset = snapshot.asset(symbol)?;
        let mut amount = safe_div(room_usd, asset.price_usd)?;
        if let Some(liquidity) = asset.available_liquidity {
            amount = amount.min(floor_zero(liquidity));
        }

        Ok(amount)
    }

    /// Whether any collateral asset carries the isolation flag.
    pub fn is_in_isolation_mode(used_assets: &UsedAssets, market: &AssetMarketData) -> Result<bool> {
        for used in used_assets.values().filter(|u| u.is_collateral()) {
            if lookup(market, &used.symbol)?.isolation_mode {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether any borrowed asset carries the siloed-borrowing flag.
    pub fn is_in_siloed_mode(used_assets: &UsedAssets, market: &AssetMarketData) -> Result<bool> {
        for used in used_assets.values().filter(|u| u.is_borrowed()) {
            if lookup(market, &used.symbol)?.siloed_borrowing {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Categories `symbol` could be used as collateral in.
    pub fn categories_for(snapshot: &PositionSnapshot, symbol: &str) -> Result<Vec<u32>> {
        let asset = snapshot.asset(symbol)?;
        Ok(snapshot
            .categories
            .values()
            .filter(|c| c.id != NO_CATEGORY)
            .filter(|c| asset.categories.contains(&c.id) || c.is_collateral_eligible(symbol))
            .map(|c| c.id)
            .collect())
    }
}

/// Debt-free, or debt below the liquidation limit.
fn stays_overcollateralized(result: &AggregatedPositionResult) -> bool {
    !result.has_debt() || result.liquidation_limit_usd > result.borrowed_usd
}

fn lookup<'m>(market: &'m AssetMarketData, symbol: &str) -> Result<&'m Asset> {
    market.get(symbol).ok_or_else(|| RiskError::MissingAssetData {
        symbol: symbol.to_string(),
    })
}
