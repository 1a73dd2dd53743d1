//! Configuration for position analysis.
//!
//! Loads per-protocol analysis profiles from an optional config file and
//! environment variables. Profiles are injected into every call; the risk
//! layer holds no module-level thresholds or asset lists.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::risk::{CompoundingFrequency, ZeroWeightScope};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Profile used when none is requested explicitly
    #[serde(default = "default_profile_name")]
    pub default_profile: String,
    /// Analysis profiles by name (e.g. "aave_v3", "compound_v3")
    #[serde(default)]
    pub profiles: BTreeMap<String, AnalysisConfig>,
}

/// How collateral weight is resolved for a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    /// Risk categories override base factors
    Category,
    /// Base asset factors only
    Base,
}

/// Parameters injected into a single aggregation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Exposure at or below this USD value is ignored for leverage classification
    #[serde(default = "default_dust_threshold")]
    pub dust_threshold_usd: Decimal,
    /// Symbols treated as USD-stable
    #[serde(default = "default_stable_assets")]
    pub stable_assets: BTreeSet<String>,
    /// Liquid staking derivatives recognized for LSD loops
    #[serde(default = "default_lsd_assets")]
    pub lsd_assets: BTreeSet<String>,
    /// Symbol of the asset LSD loops borrow
    #[serde(default = "default_eth_symbol")]
    pub eth_symbol: String,
    /// Classify one-volatile-vs-one-volatile positions as volatile pairs
    #[serde(default)]
    pub classify_volatile_pairs: bool,
    #[serde(default = "default_resolution")]
    pub resolution: ResolutionKind,
    #[serde(default)]
    pub zero_weight_scope: ZeroWeightScope,
    /// Accrual frequency used to convert reported APRs to APY
    #[serde(default)]
    pub compounding: CompoundingFrequency,
}

// Default value functions
fn default_profile_name() -> String {
    "default".to_string()
}

fn default_dust_threshold() -> Decimal {
    Decimal::new(5, 0) // $5
}

fn default_stable_assets() -> BTreeSet<String> {
    [
        "DAI", "USDC", "USDC.e", "USDbC", "USDT", "TUSD", "USDP", "GUSD", "BUSD", "sUSD",
        "FRAX", "LUSD", "GHO", "crvUSD", "PYUSD", "USDe", "sUSDe", "sDAI", "USDS", "sUSDS",
        "RLUSD", "EURC",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_lsd_assets() -> BTreeSet<String> {
    [
        "stETH", "wstETH", "cbETH", "rETH", "weETH", "ezETH", "osETH", "sfrxETH", "rsETH",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_eth_symbol() -> String {
    "ETH".to_string()
}

fn default_resolution() -> ResolutionKind {
    ResolutionKind::Category
}

/// Built-in profiles for the supported protocol families.
fn builtin_profiles() -> BTreeMap<String, AnalysisConfig> {
    let base = AnalysisConfig::default();

    let aave_v3 = AnalysisConfig {
        compounding: CompoundingFrequency::PerSecond,
        ..base.clone()
    };
    let aave_v2 = AnalysisConfig {
        resolution: ResolutionKind::Base,
        ..aave_v3.clone()
    };
    let compound_v3 = AnalysisConfig {
        dust_threshold_usd: Decimal::new(1, 3), // $0.001
        resolution: ResolutionKind::Base,
        compounding: CompoundingFrequency::PerSecond,
        ..base.clone()
    };
    let morpho_blue = AnalysisConfig {
        classify_volatile_pairs: true,
        ..compound_v3.clone()
    };
    let spark = aave_v3.clone();

    BTreeMap::from([
        ("default".to_string(), base),
        ("aave_v2".to_string(), aave_v2),
        ("aave_v3".to_string(), aave_v3),
        ("spark".to_string(), spark),
        ("compound_v3".to_string(), compound_v3),
        ("morpho_blue".to_string(), morpho_blue),
    ])
}

impl Config {
    /// Load configuration from environment variables and config files.
    ///
    /// Built-in profiles are kept unless the file overrides them by name.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("risk").required(false))
            .add_source(config::Environment::default().separator("__").prefix("MMR"))
            .build()
            .context("Failed to build configuration")?;

        let mut loaded: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        for (name, profile) in builtin_profiles() {
            loaded.profiles.entry(name).or_insert(profile);
        }

        Ok(loaded)
    }

    /// Look up a profile, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<&AnalysisConfig> {
        let name = name.unwrap_or(self.default_profile.as_str());
        self.profiles
            .get(name)
            .with_context(|| format!("Unknown analysis profile: {name}"))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.profiles.contains_key(&self.default_profile),
            "default_profile {} is not defined",
            self.default_profile
        );

        for (name, profile) in &self.profiles {
            profile
                .validate()
                .with_context(|| format!("Invalid profile {name}"))?;
        }

        Ok(())
    }
}

impl AnalysisConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.dust_threshold_usd >= Decimal::ZERO,
            "dust_threshold_usd must not be negative"
        );

        anyhow::ensure!(!self.eth_symbol.is_empty(), "eth_symbol must not be empty");

        anyhow::ensure!(
            self.stable_assets.is_disjoint(&self.lsd_assets),
            "an asset cannot be both stable and an LSD"
        );

        anyhow::ensure!(
            self.compounding.periods_per_year() > 0,
            "compounding frequency must be positive"
        );

        Ok(())
    }

    pub fn is_stable(&self, symbol: &str) -> bool {
        self.stable_assets.contains(symbol)
    }

    pub fn is_lsd(&self, symbol: &str) -> bool {
        self.lsd_assets.contains(symbol)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: default_profile_name(),
            profiles: builtin_profiles(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dust_threshold_usd: default_dust_threshold(),
            stable_assets: default_stable_assets(),
            lsd_assets: default_lsd_assets(),
            eth_symbol: default_eth_symbol(),
            classify_volatile_pairs: false,
            resolution: default_resolution(),
            zero_weight_scope: ZeroWeightScope::default(),
            compounding: CompoundingFrequency::default(),
        }
    }
}
