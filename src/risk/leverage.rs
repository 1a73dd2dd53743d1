//! Leverage archetype detection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::RiskError;
use crate::position::UsedAssets;

/// Leverage archetype of a position, with the assets it is leveraged on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LeverageClassification {
    /// Not a simple leveraged position
    #[default]
    None,
    /// Volatile collateral against stable debt
    Long { asset: String },
    /// Stable collateral against volatile debt
    Short { asset: String },
    /// Liquid staking derivative looped against the asset it stakes
    LsdLeverage { asset: String, counter: String },
    /// Two distinct volatile assets, leveraged asset priced above the counter asset
    VolatilePair { asset: String, counter: String },
    /// Two distinct volatile assets, leveraged asset priced below the counter asset
    VolatilePairReverse { asset: String, counter: String },
}

impl LeverageClassification {
    pub fn leverage_type(&self) -> LeverageType {
        match self {
            Self::None => LeverageType::None,
            Self::Long { .. } => LeverageType::Long,
            Self::Short { .. } => LeverageType::Short,
            Self::LsdLeverage { .. } => LeverageType::LsdLeverage,
            Self::VolatilePair { .. } => LeverageType::VolatilePair,
            Self::VolatilePairReverse { .. } => LeverageType::VolatilePairReverse,
        }
    }

    /// The asset whose price movement drives liquidation.
    pub fn leveraged_asset(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Long { asset }
            | Self::Short { asset }
            | Self::LsdLeverage { asset, .. }
            | Self::VolatilePair { asset, .. }
            | Self::VolatilePairReverse { asset, .. } => Some(asset),
        }
    }

    /// Build a classification from a type label and its assets.
    ///
    /// Used for labels coming from collaborators; unknown labels fail.
    pub fn from_parts(
        label: &str,
        asset: impl Into<String>,
        counter: impl Into<String>,
    ) -> Result<Self, RiskError> {
        let asset = asset.into();
        let counter = counter.into();
        Ok(match label.parse::<LeverageType>()? {
            LeverageType::None => Self::None,
            LeverageType::Long => Self::Long { asset },
            LeverageType::Short => Self::Short { asset },
            LeverageType::LsdLeverage => Self::LsdLeverage { asset, counter },
            LeverageType::VolatilePair => Self::VolatilePair { asset, counter },
            LeverageType::VolatilePairReverse => Self::VolatilePairReverse { asset, counter },
        })
    }
}

/// Bare leverage label without assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeverageType {
    None,
    Long,
    Short,
    LsdLeverage,
    VolatilePair,
    VolatilePairReverse,
}

impl LeverageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeverageType::None => "",
            LeverageType::Long => "long",
            LeverageType::Short => "short",
            LeverageType::LsdLeverage => "lsd-leverage",
            LeverageType::VolatilePair => "volatile-pair",
            LeverageType::VolatilePairReverse => "volatile-pair-reverse",
        }
    }
}

impl fmt::Display for LeverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeverageType {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(LeverageType::None),
            "long" => Ok(LeverageType::Long),
            "short" => Ok(LeverageType::Short),
            "lsd-leverage" => Ok(LeverageType::LsdLeverage),
            "volatile-pair" => Ok(LeverageType::VolatilePair),
            "volatile-pair-reverse" => Ok(LeverageType::VolatilePairReverse),
            other => Err(RiskError::UnknownLeverageType(other.to_string())),
        }
    }
}

/// Non-dust exposure counters collected in one pass.
#[derive(Debug, Default)]
struct ExposureCounts<'a> {
    supply_stable_collateral: usize,
    borrow_stable: usize,
    supply_volatile_collateral: usize,
    borrow_volatile: usize,
    long_asset: Option<&'a str>,
    short_asset: Option<&'a str>,
}

/// Classifies positions into leverage archetypes.
///
/// Exposure at or below the dust threshold is ignored. Any position with more
/// than one volatile collateral or more than one volatile debt is `None`.
pub struct LeverageClassifier<'a> {
    stable_assets: &'a BTreeSet<String>,
    dust_threshold_usd: Decimal,
    lsd_assets: Option<&'a BTreeSet<String>>,
    eth_symbol: &'a str,
    volatile_pairs: bool,
}

impl<'a> LeverageClassifier<'a> {
    /// Classifier recognizing long and short positions only.
    pub fn new(stable_assets: &'a BTreeSet<String>, dust_threshold_usd: Decimal) -> Self {
        Self {
            stable_assets,
            dust_threshold_usd,
            lsd_assets: None,
            eth_symbol: "ETH",
            volatile_pairs: false,
        }
    }

    /// Classifier with every rule the profile enables.
    pub fn from_config(config: &'a AnalysisConfig) -> Self {
        Self::new(&config.stable_assets, config.dust_threshold_usd)
            .with_lsd(&config.lsd_assets, &config.eth_symbol)
            .with_volatile_pairs(config.classify_volatile_pairs)
    }

    /// Recognize `lsd_assets` looped against `eth_symbol`.
    pub fn with_lsd(mut self, lsd_assets: &'a BTreeSet<String>, eth_symbol: &'a str) -> Self {
        self.lsd_assets = Some(lsd_assets);
        self.eth_symbol = eth_symbol;
        self
    }

    pub fn with_volatile_pairs(mut self, enabled: bool) -> Self {
        self.volatile_pairs = enabled;
        self
    }

    fn counts<'u>(&self, used_assets: &'u UsedAssets) -> ExposureCounts<'u> {
        let mut counts = ExposureCounts::default();

        for used in used_assets.values() {
            let stable = self.stable_assets.contains(&used.symbol);
            let supplied = used.is_collateral() && used.supplied_usd > self.dust_threshold_usd;
            let borrowed = used.is_borrowed() && used.borrowed_usd > self.dust_threshold_usd;

            if supplied {
                if stable {
                    counts.supply_stable_collateral += 1;
                } else {
                    counts.supply_volatile_collateral += 1;
                    counts.long_asset = Some(&used.symbol);
                }
            }

            if borrowed {
                if stable {
                    counts.borrow_stable += 1;
                } else {
                    counts.borrow_volatile += 1;
                    counts.short_asset = Some(&used.symbol);
                }
            }
        }

        counts
    }

    /// Classify a position. First matching rule wins.
    pub fn classify(&self, used_assets: &UsedAssets) -> LeverageClassification {
        let c = self.counts(used_assets);

        // Single volatile asset on the side that defines the archetype
        let long_asset = c.long_asset.filter(|_| c.supply_volatile_collateral == 1);
        let short_asset = c.short_asset.filter(|_| c.borrow_volatile == 1);

        let classification = if c.borrow_stable >= 1
            && c.borrow_volatile == 0
            && c.supply_stable_collateral == 0
        {
            long_asset.map_or(LeverageClassification::None, |asset| {
                LeverageClassification::Long {
                    asset: asset.to_string(),
                }
            })
        } else if c.supply_stable_collateral >= 1
            && c.supply_volatile_collateral == 0
            && c.borrow_stable == 0
        {
            short_asset.map_or(LeverageClassification::None, |asset| {
                LeverageClassification::Short {
                    asset: asset.to_string(),
                }
            })
        } else {
            match (long_asset, short_asset) {
                (Some(long), Some(short)) if self.is_lsd_loop(long, short) => {
                    LeverageClassification::LsdLeverage {
                        asset: long.to_string(),
                        counter: short.to_string(),
                    }
                }
                (Some(long), Some(short))
                    if self.volatile_pairs
                        && long != short
                        && c.supply_stable_collateral == 0
                        && c.borrow_stable == 0 =>
                {
                    LeverageClassification::VolatilePair {
                        asset: long.to_string(),
                        counter: short.to_string(),
                    }
                }
                _ => LeverageClassification::None,
            }
        };

        debug!(
            supply_stable = c.supply_stable_collateral,
            supply_volatile = c.supply_volatile_collateral,
            borrow_stable = c.borrow_stable,
            borrow_volatile = c.borrow_volatile,
            leverage = %classification.leverage_type(),
            "Classified position"
        );

        classification
    }

    fn is_lsd_loop(&self, long: &str, short: &str) -> bool {
        short == self.eth_symbol && self.lsd_assets.is_some_and(|lsd| lsd.contains(long))
    }
}
