//! Normalized market and position records consumed by the risk layer.
//!
//! Collaborators decode protocol data into these types; every amount is an
//! exact decimal in human units, never raw integer units or floats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Used assets of a position, keyed by symbol.
pub type UsedAssets = BTreeMap<String, UsedAsset>;

/// Market risk parameters, keyed by symbol.
pub type AssetMarketData = BTreeMap<String, Asset>;

/// Risk category definitions, keyed by category id.
pub type RiskCategories = BTreeMap<u32, RiskCategory>;

/// Category id meaning "no category active".
pub const NO_CATEGORY: u32 = 0;

fn default_true() -> bool {
    true
}

/// A reward stream attached to one side of a market.
///
/// `apy` is in percent. A negative value on the borrow side models a
/// yield-bearing debt token whose growth raises the cost of the debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncentiveStream {
    pub token: String,
    pub apy: Decimal,
}

/// Market-level data for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub symbol: String,
    pub price_usd: Decimal,
    /// Fraction of supplied value usable as borrow capacity (0-1)
    pub collateral_factor: Decimal,
    /// Fraction of supplied value at which the position is liquidatable (0-1)
    pub liquidation_threshold: Decimal,
    #[serde(default)]
    pub isolation_mode: bool,
    #[serde(default)]
    pub siloed_borrowing: bool,
    /// Ids of the risk categories this asset belongs to
    #[serde(default)]
    pub categories: BTreeSet<u32>,

    /// Base supply APY in percent
    #[serde(default)]
    pub supply_apy: Decimal,
    /// Variable borrow APY in percent
    #[serde(default)]
    pub borrow_apy: Decimal,
    /// Stable borrow APY in percent, for markets with a stable debt side
    #[serde(default)]
    pub stable_borrow_apy: Option<Decimal>,
    #[serde(default)]
    pub supply_incentives: Vec<IncentiveStream>,
    #[serde(default)]
    pub borrow_incentives: Vec<IncentiveStream>,

    /// May be borrowed while the position is in isolation mode
    #[serde(default)]
    pub borrowable_in_isolation: bool,
    /// Debt ceiling for positions isolated on this collateral
    #[serde(default)]
    pub debt_ceiling_usd: Option<Decimal>,
    /// Debt already drawn against `debt_ceiling_usd` across all users
    #[serde(default)]
    pub isolation_debt_usd: Decimal,
    /// Liquidity left in the market, in asset units
    #[serde(default)]
    pub available_liquidity: Option<Decimal>,
    #[serde(default = "default_true")]
    pub can_be_borrowed: bool,
}

impl Asset {
    /// Create an asset with base risk factors and no flags or rates.
    pub fn new(
        symbol: impl Into<String>,
        price_usd: Decimal,
        collateral_factor: Decimal,
        liquidation_threshold: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price_usd,
            collateral_factor,
            liquidation_threshold,
            isolation_mode: false,
            siloed_borrowing: false,
            categories: BTreeSet::new(),
            supply_apy: Decimal::ZERO,
            borrow_apy: Decimal::ZERO,
            stable_borrow_apy: None,
            supply_incentives: Vec::new(),
            borrow_incentives: Vec::new(),
            borrowable_in_isolation: false,
            debt_ceiling_usd: None,
            isolation_debt_usd: Decimal::ZERO,
            available_liquidity: None,
            can_be_borrowed: true,
        }
    }

    pub fn with_rates(mut self, supply_apy: Decimal, borrow_apy: Decimal) -> Self {
        self.supply_apy = supply_apy;
        self.borrow_apy = borrow_apy;
        self
    }

    pub fn with_stable_rate(mut self, stable_borrow_apy: Decimal) -> Self {
        self.stable_borrow_apy = Some(stable_borrow_apy);
        self
    }

    pub fn with_supply_incentive(mut self, token: impl Into<String>, apy: Decimal) -> Self {
        self.supply_incentives.push(IncentiveStream {
            token: token.into(),
            apy,
        });
        self
    }

    pub fn with_borrow_incentive(mut self, token: impl Into<String>, apy: Decimal) -> Self {
        self.borrow_incentives.push(IncentiveStream {
            token: token.into(),
            apy,
        });
        self
    }

    /// Flag as isolated collateral with the given debt ceiling.
    pub fn isolated(mut self, debt_ceiling_usd: Decimal, isolation_debt_usd: Decimal) -> Self {
        self.isolation_mode = true;
        self.debt_ceiling_usd = Some(debt_ceiling_usd);
        self.isolation_debt_usd = isolation_debt_usd;
        self
    }

    pub fn siloed(mut self) -> Self {
        self.siloed_borrowing = true;
        self
    }

    pub fn borrowable_in_isolation(mut self) -> Self {
        self.borrowable_in_isolation = true;
        self
    }

    pub fn with_liquidity(mut self, available: Decimal) -> Self {
        self.available_liquidity = Some(available);
        self
    }

    pub fn in_category(mut self, id: u32) -> Self {
        self.categories.insert(id);
        self
    }
}

/// An "e-mode" style risk bucket with its own factors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCategory {
    pub id: u32,
    #[serde(default)]
    pub label: Option<String>,
    pub collateral_factor: Decimal,
    pub liquidation_threshold: Decimal,
    #[serde(default)]
    pub eligible_collateral_assets: BTreeSet<String>,
    #[serde(default)]
    pub eligible_borrow_assets: BTreeSet<String>,
    /// Borrowable in-category but carrying no collateral weight
    #[serde(default)]
    pub zero_weight_assets: BTreeSet<String>,
}

impl RiskCategory {
    pub fn new(id: u32, collateral_factor: Decimal, liquidation_threshold: Decimal) -> Self {
        Self {
            id,
            label: None,
            collateral_factor,
            liquidation_threshold,
            eligible_collateral_assets: BTreeSet::new(),
            eligible_borrow_assets: BTreeSet::new(),
            zero_weight_assets: BTreeSet::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_collateral(mut self, symbols: &[&str]) -> Self {
        self.eligible_collateral_assets
            .extend(symbols.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_borrowable(mut self, symbols: &[&str]) -> Self {
        self.eligible_borrow_assets
            .extend(symbols.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_zero_weight(mut self, symbols: &[&str]) -> Self {
        self.zero_weight_assets
            .extend(symbols.iter().map(|s| s.to_string()));
        self
    }

    pub fn is_collateral_eligible(&self, symbol: &str) -> bool {
        self.eligible_collateral_assets.contains(symbol)
    }

    pub fn is_borrow_eligible(&self, symbol: &str) -> bool {
        self.eligible_borrow_assets.contains(symbol)
    }

    pub fn is_zero_weight(&self, symbol: &str) -> bool {
        self.zero_weight_assets.contains(symbol)
    }
}

/// One asset the user supplies and/or borrows.
///
/// Supply/borrow/collateral status is derived from the amounts, so the
/// flags can never disagree with the balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedAsset {
    pub symbol: String,
    #[serde(default)]
    pub supplied_amount: Decimal,
    #[serde(default)]
    pub supplied_usd: Decimal,
    /// Collateral switch as set by the user
    #[serde(default)]
    pub collateral: bool,
    #[serde(default)]
    pub borrowed_amount: Decimal,
    #[serde(default)]
    pub borrowed_usd: Decimal,
    /// Part of `borrowed_usd` accruing at the stable rate
    #[serde(default)]
    pub borrowed_stable_usd: Decimal,
}

impl UsedAsset {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            supplied_amount: Decimal::ZERO,
            supplied_usd: Decimal::ZERO,
            collateral: false,
            borrowed_amount: Decimal::ZERO,
            borrowed_usd: Decimal::ZERO,
            borrowed_stable_usd: Decimal::ZERO,
        }
    }

    /// Supplied balance with the collateral switch enabled.
    pub fn collateral(self, amount: Decimal, usd: Decimal) -> Self {
        Self {
            supplied_amount: amount,
            supplied_usd: usd,
            collateral: true,
            ..self
        }
    }

    /// Supplied balance that does not back any debt.
    pub fn supplied(self, amount: Decimal, usd: Decimal) -> Self {
        Self {
            supplied_amount: amount,
            supplied_usd: usd,
            collateral: false,
            ..self
        }
    }

    pub fn borrowed(self, amount: Decimal, usd: Decimal) -> Self {
        Self {
            borrowed_amount: amount,
            borrowed_usd: usd,
            ..self
        }
    }

    pub fn with_stable_debt(self, usd: Decimal) -> Self {
        Self {
            borrowed_stable_usd: usd,
            ..self
        }
    }

    pub fn is_supplied(&self) -> bool {
        self.supplied_amount > Decimal::ZERO
    }

    /// Supplied and enabled as collateral.
    pub fn is_collateral(&self) -> bool {
        self.is_supplied() && self.collateral
    }

    pub fn is_borrowed(&self) -> bool {
        self.borrowed_amount > Decimal::ZERO
    }

    /// Debt accruing at the variable rate.
    pub fn borrowed_variable_usd(&self) -> Decimal {
        (self.borrowed_usd - self.borrowed_stable_usd).max(Decimal::ZERO)
    }
}

/// Build a [`UsedAssets`] map from a list of used assets.
pub fn used_assets<I>(assets: I) -> UsedAssets
where
    I: IntoIterator<Item = UsedAsset>,
{
    assets
        .into_iter()
        .map(|asset| (asset.symbol.clone(), asset))
        .collect()
}

/// Build an [`AssetMarketData`] map from a list of assets.
pub fn market_data<I>(assets: I) -> AssetMarketData
where
    I: IntoIterator<Item = Asset>,
{
    assets
        .into_iter()
        .map(|asset| (asset.symbol.clone(), asset))
        .collect()
}
