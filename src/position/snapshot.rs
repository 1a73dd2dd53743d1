//! Point-in-time inputs for one position.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

use super::types::{
    Asset, AssetMarketData, RiskCategories, RiskCategory, UsedAsset, UsedAssets, NO_CATEGORY,
};

/// Everything the risk layer needs to evaluate one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub used_assets: UsedAssets,
    pub market: AssetMarketData,
    #[serde(default)]
    pub categories: RiskCategories,
    /// Active risk category, `0` for none
    #[serde(default)]
    pub active_category: u32,
}

impl PositionSnapshot {
    pub fn new(used_assets: UsedAssets, market: AssetMarketData) -> Self {
        Self {
            used_assets,
            market,
            categories: RiskCategories::new(),
            active_category: NO_CATEGORY,
        }
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = RiskCategory>) -> Self {
        self.categories
            .extend(categories.into_iter().map(|c| (c.id, c)));
        self
    }

    pub fn with_active_category(mut self, id: u32) -> Self {
        self.active_category = id;
        self
    }

    /// Market data for `symbol`, or `MissingAssetData`.
    pub fn asset(&self, symbol: &str) -> Result<&Asset> {
        self.market
            .get(symbol)
            .ok_or_else(|| RiskError::MissingAssetData {
                symbol: symbol.to_string(),
            })
    }

    /// Definition of category `id`; `None` for the "no category" id.
    pub fn category(&self, id: u32) -> Result<Option<&RiskCategory>> {
        if id == NO_CATEGORY {
            return Ok(None);
        }
        self.categories
            .get(&id)
            .map(Some)
            .ok_or(RiskError::UnknownCategory { id })
    }

    /// The currently active category definition, if any.
    pub fn active(&self) -> Result<Option<&RiskCategory>> {
        self.category(self.active_category)
    }

    /// Used assets paired with their market data.
    ///
    /// Fails on the first used asset without a market entry.
    pub fn joined(&self) -> Result<Vec<(&UsedAsset, &Asset)>> {
        self.used_assets
            .values()
            .map(|used| Ok((used, self.asset(&used.symbol)?)))
            .collect()
    }

    /// Check structural soundness before any arithmetic runs.
    pub fn validate(&self) -> Result<()> {
        for used in self.used_assets.values() {
            check_non_negative(&used.symbol, "suppliedAmount", used.supplied_amount)?;
            check_non_negative(&used.symbol, "suppliedUsd", used.supplied_usd)?;
            check_non_negative(&used.symbol, "borrowedAmount", used.borrowed_amount)?;
            check_non_negative(&used.symbol, "borrowedUsd", used.borrowed_usd)?;
            check_non_negative(&used.symbol, "borrowedStableUsd", used.borrowed_stable_usd)?;

            let asset = self.asset(&used.symbol)?;
            if asset.price_usd < Decimal::ZERO {
                return Err(RiskError::InvalidRiskParameter {
                    symbol: asset.symbol.clone(),
                    field: "priceUsd",
                    value: asset.price_usd,
                });
            }
            check_fraction(&asset.symbol, "collateralFactor", asset.collateral_factor)?;
            check_fraction(
                &asset.symbol,
                "liquidationThreshold",
                asset.liquidation_threshold,
            )?;
        }

        if let Some(category) = self.active()? {
            validate_category(category)?;
        }

        Ok(())
    }
}

/// Factors of a category must be fractions like any asset's.
pub(crate) fn validate_category(category: &RiskCategory) -> Result<()> {
    let label = format!("category {}", category.id);
    check_fraction(&label, "collateralFactor", category.collateral_factor)?;
    check_fraction(&label, "liquidationThreshold", category.liquidation_threshold)
}

fn check_non_negative(symbol: &str, field: &'static str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(RiskError::NegativeAmount {
            symbol: symbol.to_string(),
            field,
        });
    }
    Ok(())
}

fn check_fraction(symbol: &str, field: &'static str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(RiskError::InvalidRiskParameter {
            symbol: symbol.to_string(),
            field,
            value,
        });
    }
    Ok(())
}
