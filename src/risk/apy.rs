//! Blended yield of a position.

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Result, RiskError};
use crate::position::{Asset, PositionChange, PositionSnapshot, UsedAsset};
use crate::utils::decimal::{apply_rate, safe_percent};

/// Accrual frequency of a protocol that reports simple per-period rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingFrequency {
    #[default]
    Daily,
    Hourly,
    PerSecond,
    /// Chains accruing per block, with the given blocks per year
    PerBlock(u64),
}

impl CompoundingFrequency {
    pub fn periods_per_year(&self) -> u64 {
        match self {
            CompoundingFrequency::Daily => 365,
            CompoundingFrequency::Hourly => 365 * 24,
            CompoundingFrequency::PerSecond => 365 * 24 * 60 * 60,
            CompoundingFrequency::PerBlock(blocks) => *blocks,
        }
    }
}

impl fmt::Display for CompoundingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompoundingFrequency::Daily => f.write_str("daily"),
            CompoundingFrequency::Hourly => f.write_str("hourly"),
            CompoundingFrequency::PerSecond => f.write_str("per-second"),
            CompoundingFrequency::PerBlock(blocks) => write!(f, "{blocks}"),
        }
    }
}

impl FromStr for CompoundingFrequency {
    type Err = String;

    /// Accepts `daily`, `hourly`, `per-second`, or a number of periods per year.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(CompoundingFrequency::Daily),
            "hourly" => Ok(CompoundingFrequency::Hourly),
            "per-second" | "second" => Ok(CompoundingFrequency::PerSecond),
            other => other
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .map(CompoundingFrequency::PerBlock)
                .ok_or_else(|| format!("invalid compounding frequency: {other}")),
        }
    }
}

/// Convert a simple APR (percent) to APY (percent) at the given frequency.
///
/// `apy = ((1 + apr / 100 / n)^n - 1) * 100`
pub fn apr_to_apy(apr: Decimal, frequency: CompoundingFrequency) -> Result<Decimal> {
    let periods = frequency.periods_per_year();
    if periods == 0 {
        return Ok(Decimal::ZERO);
    }

    let per_period = apr / Decimal::ONE_HUNDRED / Decimal::from(periods);
    let growth = (Decimal::ONE + per_period)
        .checked_powu(periods)
        .ok_or(RiskError::ArithmeticOverflow {
            context: "APR to APY compounding",
        })?;

    Ok((growth - Decimal::ONE) * Decimal::ONE_HUNDRED)
}

/// Net yield of a position in USD per year and as a percent of net worth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetApy {
    pub net_apy: Decimal,
    pub incentive_usd: Decimal,
    pub total_interest_usd: Decimal,
}

/// Combines base interest, incentives and borrowing cost.
pub struct YieldAggregator;

impl YieldAggregator {
    /// Net APY over used assets paired with their market data.
    pub fn net_apy<'a, I>(assets: I) -> Result<NetApy>
    where
        I: IntoIterator<Item = (&'a UsedAsset, &'a Asset)>,
    {
        let mut supplied_usd = Decimal::ZERO;
        let mut borrowed_usd = Decimal::ZERO;
        let mut interest_usd = Decimal::ZERO;
        let mut incentive_usd = Decimal::ZERO;

        for (used, asset) in assets {
            if used.is_supplied() {
                supplied_usd += used.supplied_usd;
                interest_usd += apply_rate(used.supplied_usd, asset.supply_apy)?;
                for incentive in &asset.supply_incentives {
                    incentive_usd += apply_rate(used.supplied_usd, incentive.apy)?;
                }
            }

            if used.is_borrowed() {
                borrowed_usd += used.borrowed_usd;

                let stable_apy = asset.stable_borrow_apy.unwrap_or(asset.borrow_apy);
                interest_usd -= apply_rate(used.borrowed_variable_usd(), asset.borrow_apy)?;
                interest_usd -= apply_rate(used.borrowed_stable_usd, stable_apy)?;

                // Negative incentive APY means the debt itself appreciates
                for incentive in &asset.borrow_incentives {
                    incentive_usd += apply_rate(used.borrowed_usd, incentive.apy)?;
                }
            }
        }

        let total_interest_usd = interest_usd + incentive_usd;
        let net_apy = safe_percent(total_interest_usd, supplied_usd - borrowed_usd)?;

        debug!(
            %supplied_usd,
            %borrowed_usd,
            %incentive_usd,
            %total_interest_usd,
            %net_apy,
            "Computed net APY"
        );

        Ok(NetApy {
            net_apy,
            incentive_usd,
            total_interest_usd,
        })
    }

    /// Net APY of a snapshot. Fails if any used asset lacks market data.
    pub fn for_snapshot(snapshot: &PositionSnapshot) -> Result<NetApy> {
        Self::net_apy(snapshot.joined()?)
    }

    /// Net APY the position would have after `changes`.
    pub fn apy_after(snapshot: &PositionSnapshot, changes: &[PositionChange]) -> Result<NetApy> {
        Self::for_snapshot(&snapshot.with_changes(changes)?)
    }
}
