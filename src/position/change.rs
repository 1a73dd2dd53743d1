//! Hypothetical position changes for "after" estimates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::utils::decimal::floor_zero;

use super::{PositionSnapshot, UsedAsset};

/// Kind of change applied to one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionAction {
    Supply,
    Withdraw,
    Borrow,
    Payback,
}

/// A supply/withdraw/borrow/payback of `amount` asset units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionChange {
    pub action: PositionAction,
    pub symbol: String,
    pub amount: Decimal,
}

impl PositionChange {
    pub fn new(action: PositionAction, symbol: impl Into<String>, amount: Decimal) -> Self {
        Self {
            action,
            symbol: symbol.into(),
            amount,
        }
    }
}

impl PositionSnapshot {
    /// Copy of this snapshot with `changes` applied at current market prices.
    ///
    /// Newly supplied assets are enabled as collateral when their market
    /// allows it. Withdrawals and paybacks never drive balances below zero.
    pub fn with_changes(&self, changes: &[PositionChange]) -> Result<PositionSnapshot> {
        let mut next = self.clone();

        for change in changes {
            if change.amount < Decimal::ZERO {
                return Err(RiskError::NegativeAmount {
                    symbol: change.symbol.clone(),
                    field: "amount",
                });
            }

            let asset = self.asset(&change.symbol)?;
            let usd = change.amount * asset.price_usd;
            let used = next
                .used_assets
                .entry(change.symbol.clone())
                .or_insert_with(|| UsedAsset {
                    collateral: asset.collateral_factor > Decimal::ZERO,
                    ..UsedAsset::new(change.symbol.clone())
                });

            match change.action {
                PositionAction::Supply => {
                    used.supplied_amount += change.amount;
                    used.supplied_usd += usd;
                }
                PositionAction::Withdraw => {
                    used.supplied_amount = floor_zero(used.supplied_amount - change.amount);
                    used.supplied_usd = if used.supplied_amount == Decimal::ZERO {
                        Decimal::ZERO
                    } else {
                        floor_zero(used.supplied_usd - usd)
                    };
                }
                PositionAction::Borrow => {
                    used.borrowed_amount += change.amount;
                    used.borrowed_usd += usd;
                }
                PositionAction::Payback => {
                    used.borrowed_amount = floor_zero(used.borrowed_amount - change.amount);
                    used.borrowed_usd = if used.borrowed_amount == Decimal::ZERO {
                        Decimal::ZERO
                    } else {
                        floor_zero(used.borrowed_usd - usd)
                    };
                    used.borrowed_stable_usd = used.borrowed_stable_usd.min(used.borrowed_usd);
                }
            }
        }

        Ok(next)
    }
}
