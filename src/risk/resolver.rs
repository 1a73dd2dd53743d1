//! Effective collateral factor and liquidation threshold per asset.
//!
//! Every weighted total (borrow limit, liquidation limit, category-entry
//! simulation, liquidation price) goes through the same resolver, so the
//! factors can never differ between passes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, ResolutionKind};
use crate::position::{Asset, RiskCategories, RiskCategory, NO_CATEGORY};

/// Collateral weight of one asset under the active category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskFactors {
    pub collateral_factor: Decimal,
    pub liquidation_threshold: Decimal,
}

impl RiskFactors {
    /// No collateral weight at all.
    pub const ZERO: RiskFactors = RiskFactors {
        collateral_factor: Decimal::ZERO,
        liquidation_threshold: Decimal::ZERO,
    };

    /// Base (non-category) factors of an asset.
    pub fn of_asset(asset: &Asset) -> Self {
        Self {
            collateral_factor: asset.collateral_factor,
            liquidation_threshold: asset.liquidation_threshold,
        }
    }

    pub fn of_category(category: &RiskCategory) -> Self {
        Self {
            collateral_factor: category.collateral_factor,
            liquidation_threshold: category.liquidation_threshold,
        }
    }
}

/// What a zero-weight asset loses inside a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroWeightScope {
    /// Both factors drop to zero
    #[default]
    CollateralAndLiquidation,
    /// Collateral factor drops to zero; the category liquidation threshold still applies
    CollateralOnly,
}

/// Protocol-specific resolution of an asset's collateral weight.
#[cfg_attr(test, mockall::automock)]
pub trait RiskParameterStrategy: Send + Sync {
    /// Factors for `asset` while `category` (if any) is active.
    fn resolve<'a>(&self, asset: &Asset, category: Option<&'a RiskCategory>) -> RiskFactors;
}

/// Resolution for protocols with e-mode style risk categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryStrategy {
    pub zero_weight: ZeroWeightScope,
}

impl CategoryStrategy {
    pub fn new(zero_weight: ZeroWeightScope) -> Self {
        Self { zero_weight }
    }
}

impl RiskParameterStrategy for CategoryStrategy {
    fn resolve(&self, asset: &Asset, category: Option<&RiskCategory>) -> RiskFactors {
        let category = match category {
            Some(c) if c.id != NO_CATEGORY => c,
            _ => return RiskFactors::of_asset(asset),
        };

        if !category.is_collateral_eligible(&asset.symbol)
            || category.collateral_factor == Decimal::ZERO
        {
            return RiskFactors::of_asset(asset);
        }

        if category.is_zero_weight(&asset.symbol) {
            return match self.zero_weight {
                ZeroWeightScope::CollateralAndLiquidation => RiskFactors::ZERO,
                ZeroWeightScope::CollateralOnly => RiskFactors {
                    collateral_factor: Decimal::ZERO,
                    liquidation_threshold: category.liquidation_threshold,
                },
            };
        }

        RiskFactors::of_category(category)
    }
}

/// Resolution for protocols without categories: base factors only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseFactorStrategy;

impl RiskParameterStrategy for BaseFactorStrategy {
    fn resolve(&self, asset: &Asset, _category: Option<&RiskCategory>) -> RiskFactors {
        RiskFactors::of_asset(asset)
    }
}

/// Build the strategy a profile asks for.
pub fn strategy_for(config: &AnalysisConfig) -> Box<dyn RiskParameterStrategy> {
    match config.resolution {
        ResolutionKind::Category => Box::new(CategoryStrategy::new(config.zero_weight_scope)),
        ResolutionKind::Base => Box::new(BaseFactorStrategy),
    }
}

/// Resolve with the default category rules, looking the category up by id.
///
/// An id with no definition resolves to base factors; callers that need to
/// reject unknown ids validate the snapshot first.
pub fn resolve(asset: &Asset, active_category: u32, categories: &RiskCategories) -> RiskFactors {
    CategoryStrategy::default().resolve(asset, categories.get(&active_category))
}
