//! Price-at-liquidation for leveraged positions.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::position::PositionSnapshot;
use crate::risk::LeverageClassification;
use crate::utils::decimal::{checked_mul, safe_div};

/// Liquidation price of a leveraged position.
///
/// For LSD loops and volatile pairs the price is a ratio between the two
/// assets, not a USD price; `pair_ratio` carries the live ratio in the same
/// units so callers can show "ratio at liquidation".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationEstimate {
    /// Classification after pair normalization (may become the reverse pair)
    pub classification: LeverageClassification,
    pub price: Decimal,
    pub pair_ratio: Option<Decimal>,
}

/// Leveraged asset falls: `price * borrowed / liquidation_limit`.
pub fn long_liquidation_price(
    asset_price: Decimal,
    borrowed_usd: Decimal,
    liquidation_limit_usd: Decimal,
) -> Result<Decimal> {
    safe_div(checked_mul(asset_price, borrowed_usd)?, liquidation_limit_usd)
}

/// Borrowed asset rises: `price / borrowed * liquidation_limit`.
pub fn short_liquidation_price(
    asset_price: Decimal,
    borrowed_usd: Decimal,
    liquidation_limit_usd: Decimal,
) -> Result<Decimal> {
    safe_div(checked_mul(asset_price, liquidation_limit_usd)?, borrowed_usd)
}

/// Computes liquidation prices per leverage archetype.
pub struct LiquidationPriceCalculator;

impl LiquidationPriceCalculator {
    /// Liquidation price for an already-normalized asset price.
    ///
    /// `asset_price` is the USD price for long/short positions and the pair
    /// ratio (in the classification's own units) for LSD loops and pairs.
    /// Returns `None` for unleveraged positions.
    pub fn liquidation_price(
        classification: &LeverageClassification,
        asset_price: Decimal,
        borrowed_usd: Decimal,
        liquidation_limit_usd: Decimal,
    ) -> Result<Option<Decimal>> {
        let price = match classification {
            LeverageClassification::None => return Ok(None),
            LeverageClassification::Long { .. }
            | LeverageClassification::LsdLeverage { .. }
            | LeverageClassification::VolatilePair { .. } => {
                long_liquidation_price(asset_price, borrowed_usd, liquidation_limit_usd)?
            }
            // Reverse pairs are quoted counter/leveraged, so the long
            // threshold inverts into the short formula.
            LeverageClassification::Short { .. }
            | LeverageClassification::VolatilePairReverse { .. } => {
                short_liquidation_price(asset_price, borrowed_usd, liquidation_limit_usd)?
            }
        };
        Ok(Some(price))
    }

    /// Normalize prices from market data and compute the estimate.
    ///
    /// Fails if an asset named by the classification has no market data.
    pub fn estimate(
        classification: &LeverageClassification,
        snapshot: &PositionSnapshot,
        borrowed_usd: Decimal,
        liquidation_limit_usd: Decimal,
    ) -> Result<Option<LiquidationEstimate>> {
        let (classification, asset_price, pair_ratio) = match classification {
            LeverageClassification::None => return Ok(None),
            LeverageClassification::Long { asset } | LeverageClassification::Short { asset } => {
                (classification.clone(), snapshot.asset(asset)?.price_usd, None)
            }
            LeverageClassification::LsdLeverage { asset, counter } => {
                // Quote the LSD in the asset it stakes
                let ratio = safe_div(
                    snapshot.asset(asset)?.price_usd,
                    snapshot.asset(counter)?.price_usd,
                )?;
                (classification.clone(), ratio, Some(ratio))
            }
            LeverageClassification::VolatilePair { asset, counter }
            | LeverageClassification::VolatilePairReverse { asset, counter } => {
                let leveraged_price = snapshot.asset(asset)?.price_usd;
                let counter_price = snapshot.asset(counter)?.price_usd;

                if leveraged_price < counter_price {
                    let ratio = safe_div(counter_price, leveraged_price)?;
                    let reversed = LeverageClassification::VolatilePairReverse {
                        asset: asset.clone(),
                        counter: counter.clone(),
                    };
                    (reversed, ratio, Some(ratio))
                } else {
                    let ratio = safe_div(leveraged_price, counter_price)?;
                    let forward = LeverageClassification::VolatilePair {
                        asset: asset.clone(),
                        counter: counter.clone(),
                    };
                    (forward, ratio, Some(ratio))
                }
            }
        };

        if liquidation_limit_usd == Decimal::ZERO || borrowed_usd == Decimal::ZERO {
            warn!(
                leverage = %classification.leverage_type(),
                %borrowed_usd,
                %liquidation_limit_usd,
                "Leveraged position without debt or liquidation limit"
            );
        }

        let price = Self::liquidation_price(
            &classification,
            asset_price,
            borrowed_usd,
            liquidation_limit_usd,
        )?
        .unwrap_or(Decimal::ZERO);

        Ok(Some(LiquidationEstimate {
            classification,
            price,
            pair_ratio,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;
    use crate::position::{market_data, Asset, UsedAssets};
    use rust_decimal_macros::dec;

    fn snapshot(assets: Vec<Asset>) -> PositionSnapshot {
        PositionSnapshot::new(UsedAssets::new(), market_data(assets))
    }

    fn long(asset: &str) -> LeverageClassification {
        LeverageClassification::Long {
            asset: asset.into(),
        }
    }

    #[test]
    fn test_long_formula() {
        // 10 ETH at $2000 with 0.825 threshold = $16500 liquidation limit,
        // $8250 debt liquidates at half the price
        let price = LiquidationPriceCalculator::liquidation_price(
            &long("ETH"),
            dec!(2000),
            dec!(8250),
            dec!(16500),
        );
        assert_eq!(price, Ok(Some(dec!(1000))));
    }

    #[test]
    fn test_short_formula() {
        let short = LeverageClassification::Short {
            asset: "ETH".into(),
        };
        // $40000 USDC at 0.8 = $32000 limit, 8 ETH borrowed ($16000)
        let price =
            LiquidationPriceCalculator::liquidation_price(&short, dec!(2000), dec!(16000), dec!(32000));
        assert_eq!(price, Ok(Some(dec!(4000))));
    }

    #[test]
    fn test_none_has_no_price() {
        let price = LiquidationPriceCalculator::liquidation_price(
            &LeverageClassification::None,
            dec!(2000),
            dec!(1),
            dec!(1),
        );
        assert_eq!(price, Ok(None));
    }

    #[test]
    fn test_zero_denominators_are_zero() {
        assert_eq!(long_liquidation_price(dec!(2000), dec!(100), Decimal::ZERO), Ok(Decimal::ZERO));
        assert_eq!(short_liquidation_price(dec!(2000), Decimal::ZERO, dec!(100)), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_out_of_range_price_is_error() {
        // price times limit exceeds the decimal range
        assert_eq!(
            short_liquidation_price(Decimal::MAX, dec!(100), dec!(2)),
            Err(RiskError::ArithmeticOverflow {
                context: "multiplication"
            })
        );
        // dust debt against a large limit
        assert!(short_liquidation_price(dec!(2000), Decimal::new(1, 23), dec!(825000)).is_err());
    }

    #[test]
    fn test_lsd_priced_in_eth() {
        let snap = snapshot(vec![
            Asset::new("wstETH", dec!(2300), dec!(0.8), dec!(0.9)),
            Asset::new("ETH", dec!(2000), dec!(0.8), dec!(0.85)),
        ]);
        let lsd = LeverageClassification::LsdLeverage {
            asset: "wstETH".into(),
            counter: "ETH".into(),
        };
        let estimate = LiquidationPriceCalculator::estimate(&lsd, &snap, dec!(18000), dec!(20700))
            .unwrap()
            .unwrap();

        // ratio 1.15, liquidates at 1.15 * 18000 / 20700 = 1.0
        assert_eq!(estimate.pair_ratio, Some(dec!(1.15)));
        assert_eq!(estimate.price, dec!(1));
        assert_eq!(estimate.classification, lsd);
    }

    #[test]
    fn test_volatile_pair_forward() {
        let snap = snapshot(vec![
            Asset::new("WBTC", dec!(60000), dec!(0.7), dec!(0.75)),
            Asset::new("LINK", dec!(15), dec!(0.6), dec!(0.7)),
        ]);
        let pair = LeverageClassification::VolatilePair {
            asset: "WBTC".into(),
            counter: "LINK".into(),
        };
        let estimate = LiquidationPriceCalculator::estimate(&pair, &snap, dec!(22500), dec!(45000))
            .unwrap()
            .unwrap();

        assert_eq!(estimate.pair_ratio, Some(dec!(4000)));
        assert_eq!(estimate.price, dec!(2000));
        assert_eq!(estimate.classification, pair);
    }

    #[test]
    fn test_volatile_pair_reverses_when_cheaper() {
        let snap = snapshot(vec![
            Asset::new("LINK", dec!(15), dec!(0.6), dec!(0.7)),
            Asset::new("WBTC", dec!(60000), dec!(0.7), dec!(0.75)),
        ]);
        let pair = LeverageClassification::VolatilePair {
            asset: "LINK".into(),
            counter: "WBTC".into(),
        };
        let estimate = LiquidationPriceCalculator::estimate(&pair, &snap, dec!(7000), dec!(14000))
            .unwrap()
            .unwrap();

        assert_eq!(
            estimate.classification,
            LeverageClassification::VolatilePairReverse {
                asset: "LINK".into(),
                counter: "WBTC".into()
            }
        );
        // WBTC/LINK = 4000 today; LINK falling 50% doubles the ratio
        assert_eq!(estimate.pair_ratio, Some(dec!(4000)));
        assert_eq!(estimate.price, dec!(8000));
    }

    #[test]
    fn test_missing_price_fails() {
        let snap = snapshot(vec![]);
        assert_eq!(
            LiquidationPriceCalculator::estimate(&long("ETH"), &snap, dec!(1), dec!(1)),
            Err(RiskError::MissingAssetData {
                symbol: "ETH".into()
            })
        );
    }
}
