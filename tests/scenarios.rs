//! End-to-end aggregation of realistic positions through the public API.

use money_market_risk::config::{AnalysisConfig, Config};
use money_market_risk::position::{
    market_data, used_assets, Asset, PositionAction, PositionChange, PositionSnapshot,
    RiskCategory, UsedAsset,
};
use money_market_risk::risk::{
    AggregationEngine, LeverageClassification, LeverageType, ModeConstraintEngine,
    ZeroWeightScope,
};
use money_market_risk::RiskError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn eth() -> Asset {
    Asset::new("ETH", dec!(2000), dec!(0.8), dec!(0.825))
}

fn usdc() -> Asset {
    Asset::new("USDC", dec!(1), dec!(0.77), dec!(0.8))
}

fn wsteth() -> Asset {
    Asset::new("wstETH", dec!(2300), dec!(0.75), dec!(0.79))
}

fn aggregate(snapshot: &PositionSnapshot) -> money_market_risk::AggregatedPositionResult {
    let config = AnalysisConfig::default();
    AggregationEngine::from_config(&config)
        .aggregate(snapshot, &config)
        .unwrap()
}

#[test]
fn basic_borrow_limit_and_ratio() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("ETH").collateral(dec!(10), dec!(20000)),
            UsedAsset::new("USDC").borrowed(dec!(5000), dec!(5000)),
        ]),
        market_data([eth(), usdc()]),
    );
    let result = aggregate(&snap);

    assert_eq!(result.supplied_usd, dec!(20000));
    assert_eq!(result.borrow_limit_usd, dec!(16000));
    assert_eq!(result.ratio, dec!(320));
    assert_eq!(result.left_to_borrow_usd, dec!(11000));
}

#[test]
fn single_volatile_collateral_against_stable_debt_is_long() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("ETH").collateral(dec!(10), dec!(20000)),
            UsedAsset::new("USDC").borrowed(dec!(5000), dec!(5000)),
        ]),
        market_data([eth(), usdc()]),
    );
    let result = aggregate(&snap);

    assert_eq!(result.leverage.leverage_type(), LeverageType::Long);
    assert_eq!(result.leverage.leveraged_asset(), Some("ETH"));
    // 2000 * 5000 / 16500
    assert_eq!(result.liquidation_price_usd.map(|p| p.round_dp(2)), Some(dec!(606.06)));
}

#[test]
fn stable_collateral_against_one_volatile_debt_is_short() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("USDC").collateral(dec!(10000), dec!(10000)),
            UsedAsset::new("ETH").borrowed(dec!(2), dec!(4000)),
        ]),
        market_data([eth(), usdc()]),
    );
    let result = aggregate(&snap);

    assert_eq!(
        result.leverage,
        LeverageClassification::Short {
            asset: "ETH".into()
        }
    );
    // 2000 * 8000 / 4000
    assert_eq!(result.liquidation_price_usd, Some(dec!(4000)));
}

#[test]
fn lsd_loop_is_priced_against_eth() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("wstETH").collateral(dec!(10), dec!(23000)),
            UsedAsset::new("ETH").borrowed(dec!(9), dec!(18000)),
        ]),
        market_data([eth(), wsteth()]),
    );
    let result = aggregate(&snap);

    assert_eq!(result.leverage.leverage_type(), LeverageType::LsdLeverage);
    assert_eq!(result.leverage.leveraged_asset(), Some("wstETH"));
    assert_eq!(result.current_pair_ratio, Some(dec!(1.15)));
    // 1.15 * 18000 / 18170
    assert_eq!(
        result.liquidation_price_usd.map(|p| p.round_dp(4)),
        Some(dec!(1.1392))
    );
}

#[test]
fn dust_counts_toward_totals_but_not_classification() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("ETH").collateral(dec!(10), dec!(20000)),
            UsedAsset::new("UNI").collateral(dec!(0.5), dec!(3)),
            UsedAsset::new("USDC").borrowed(dec!(5000), dec!(5000)),
        ]),
        market_data([
            eth(),
            usdc(),
            Asset::new("UNI", dec!(6), dec!(0.65), dec!(0.77)),
        ]),
    );
    let result = aggregate(&snap);

    assert_eq!(result.supplied_usd, dec!(20003));
    assert_eq!(
        result.leverage,
        LeverageClassification::Long {
            asset: "ETH".into()
        }
    );
}

#[test]
fn category_excluding_current_debt_is_not_eligible() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("wstETH").collateral(dec!(10), dec!(23000)),
            UsedAsset::new("USDC").borrowed(dec!(1000), dec!(1000)),
        ]),
        market_data([eth(), usdc(), wsteth()]),
    )
    .with_categories([RiskCategory::new(1, dec!(0.93), dec!(0.95))
        .with_label("ETH correlated")
        .with_collateral(&["wstETH", "ETH"])
        .with_borrowable(&["ETH"])]);

    let config = AnalysisConfig::default();
    let engine = AggregationEngine::from_config(&config);
    let check = ModeConstraintEngine::new(&engine, &config)
        .can_enter_category(&snap, 1)
        .unwrap();

    assert!(!check.eligible);
    assert!(check.would_stay_overcollateralized);
    assert!(!check.can_enter());
}

#[test]
fn borrow_limit_bounded_by_highest_factor() {
    let category = RiskCategory::new(1, dec!(0.93), dec!(0.95)).with_collateral(&["wstETH", "ETH"]);
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("wstETH").collateral(dec!(10), dec!(23000)),
            UsedAsset::new("USDC").collateral(dec!(5000), dec!(5000)),
        ]),
        market_data([eth(), usdc(), wsteth()]),
    )
    .with_categories([category])
    .with_active_category(1);
    let result = aggregate(&snap);

    let ceiling = snap
        .used_assets
        .values()
        .map(|used| used.supplied_usd * dec!(0.93))
        .sum::<Decimal>();
    assert!(result.borrow_limit_usd <= ceiling);
    assert!(result.liquidation_limit_usd >= result.borrow_limit_usd);
}

#[test]
fn ratio_is_zero_exactly_when_debt_free() {
    let supplied = PositionSnapshot::new(
        used_assets([UsedAsset::new("ETH").collateral(dec!(1), dec!(2000))]),
        market_data([eth(), usdc()]),
    );
    let result = aggregate(&supplied);
    assert_eq!(result.ratio, Decimal::ZERO);
    assert_eq!(result.health_ratio, Decimal::ZERO);
    assert!(!result.has_debt());

    let config = AnalysisConfig::default();
    let borrowed = AggregationEngine::from_config(&config)
        .aggregate_after(
            &supplied,
            &[PositionChange::new(PositionAction::Borrow, "USDC", dec!(100))],
            &config,
        )
        .unwrap();
    assert!(borrowed.ratio > Decimal::ZERO);
}

#[test]
fn aggregation_is_idempotent() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("wstETH").collateral(dec!(10), dec!(23000)),
            UsedAsset::new("ETH").borrowed(dec!(9), dec!(18000)),
        ]),
        market_data([eth(), wsteth()]),
    );
    assert_eq!(aggregate(&snap), aggregate(&snap));
}

#[test]
fn missing_market_data_is_an_error() {
    let snap = PositionSnapshot::new(
        used_assets([UsedAsset::new("ETH").collateral(dec!(1), dec!(2000))]),
        market_data([usdc()]),
    );
    let config = AnalysisConfig::default();
    let err = AggregationEngine::from_config(&config)
        .aggregate(&snap, &config)
        .unwrap_err();
    assert_eq!(
        err,
        RiskError::MissingAssetData {
            symbol: "ETH".into()
        }
    );
}

#[test]
fn base_factor_profile_ignores_categories() {
    let snap = PositionSnapshot::new(
        used_assets([UsedAsset::new("wstETH").collateral(dec!(10), dec!(23000))]),
        market_data([eth(), wsteth()]),
    )
    .with_categories([RiskCategory::new(1, dec!(0.93), dec!(0.95)).with_collateral(&["wstETH"])])
    .with_active_category(1);

    let profiles = Config::default();
    let compound = profiles.profile(Some("compound_v3")).unwrap();
    let result = AggregationEngine::from_config(compound)
        .aggregate(&snap, compound)
        .unwrap();
    assert_eq!(result.borrow_limit_usd, dec!(17250));

    let aave = profiles.profile(Some("aave_v3")).unwrap();
    let result = AggregationEngine::from_config(aave)
        .aggregate(&snap, aave)
        .unwrap();
    assert_eq!(result.borrow_limit_usd, dec!(21390));
}

#[test]
fn snapshot_json_round_trip_through_engine() {
    let json = r#"{
        "usedAssets": {
            "ETH": { "symbol": "ETH", "suppliedAmount": "10", "suppliedUsd": "20000", "collateral": true },
            "USDC": { "symbol": "USDC", "borrowedAmount": "5000", "borrowedUsd": "5000" }
        },
        "market": {
            "ETH": { "symbol": "ETH", "priceUsd": "2000", "collateralFactor": "0.8", "liquidationThreshold": "0.825" },
            "USDC": { "symbol": "USDC", "priceUsd": "1", "collateralFactor": "0.77", "liquidationThreshold": "0.8" }
        }
    }"#;
    let snap: PositionSnapshot = serde_json::from_str(json).unwrap();
    let output = serde_json::to_value(aggregate(&snap)).unwrap();

    let borrow_limit: Decimal = output["borrowLimitUsd"].as_str().unwrap().parse().unwrap();
    assert_eq!(borrow_limit, dec!(16000));
    assert_eq!(output["leverage"]["type"], "long");
    assert_eq!(output["leverage"]["asset"], "ETH");
}

fn wbtc() -> Asset {
    Asset::new("WBTC", dec!(60000), dec!(0.7), dec!(0.75))
}

fn link() -> Asset {
    Asset::new("LINK", dec!(15), dec!(0.6), dec!(0.7))
}

fn aggregate_with_profile(snapshot: &PositionSnapshot, name: &str) -> money_market_risk::AggregatedPositionResult {
    let profiles = Config::default();
    let profile = profiles.profile(Some(name)).unwrap();
    AggregationEngine::from_config(profile)
        .aggregate(snapshot, profile)
        .unwrap()
}

#[test]
fn volatile_pair_priced_in_counter_units() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("WBTC").collateral(dec!(1), dec!(60000)),
            UsedAsset::new("LINK").borrowed(dec!(1000), dec!(15000)),
        ]),
        market_data([wbtc(), link()]),
    );

    // Pairs are opt-in; the default rules leave this unclassified
    assert_eq!(aggregate(&snap).leverage, LeverageClassification::None);

    let result = aggregate_with_profile(&snap, "morpho_blue");
    assert_eq!(
        result.leverage,
        LeverageClassification::VolatilePair {
            asset: "WBTC".into(),
            counter: "LINK".into()
        }
    );
    assert_eq!(result.current_pair_ratio, Some(dec!(4000)));
    // 4000 * 15000 / 45000
    assert_eq!(
        result.liquidation_price_usd.map(|p| p.round_dp(2)),
        Some(dec!(1333.33))
    );
}

#[test]
fn cheaper_leveraged_asset_becomes_reverse_pair() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("LINK").collateral(dec!(3000), dec!(45000)),
            UsedAsset::new("WBTC").borrowed(dec!(0.25), dec!(15000)),
        ]),
        market_data([wbtc(), link()]),
    );
    let result = aggregate_with_profile(&snap, "morpho_blue");

    assert_eq!(
        result.leverage,
        LeverageClassification::VolatilePairReverse {
            asset: "LINK".into(),
            counter: "WBTC".into()
        }
    );
    assert_eq!(result.current_pair_ratio, Some(dec!(4000)));
    // 4000 * 31500 / 15000
    assert_eq!(result.liquidation_price_usd, Some(dec!(8400)));
}

fn zero_weight_snapshot() -> PositionSnapshot {
    PositionSnapshot::new(
        used_assets([
            UsedAsset::new("wstETH").collateral(dec!(10), dec!(23000)),
            UsedAsset::new("ETH").collateral(dec!(10), dec!(20000)),
        ]),
        market_data([eth(), wsteth()]),
    )
    .with_categories([RiskCategory::new(1, dec!(0.93), dec!(0.95))
        .with_collateral(&["wstETH", "ETH"])
        .with_zero_weight(&["ETH"])])
    .with_active_category(1)
}

#[test]
fn zero_weight_asset_adds_nothing_inside_category() {
    let result = aggregate_with_profile(&zero_weight_snapshot(), "aave_v3");

    assert_eq!(result.supplied_collateral_usd, dec!(43000));
    // only wstETH carries weight: 23000 * 0.93 and 23000 * 0.95
    assert_eq!(result.borrow_limit_usd, dec!(21390));
    assert_eq!(result.liquidation_limit_usd, dec!(21850));
}

#[test]
fn zero_weight_scope_can_keep_liquidation_threshold() {
    let config = AnalysisConfig {
        zero_weight_scope: ZeroWeightScope::CollateralOnly,
        ..AnalysisConfig::default()
    };
    let result = AggregationEngine::from_config(&config)
        .aggregate(&zero_weight_snapshot(), &config)
        .unwrap();

    assert_eq!(result.borrow_limit_usd, dec!(21390));
    // 21850 + 20000 * 0.95
    assert_eq!(result.liquidation_limit_usd, dec!(40850));
}

#[test]
fn dust_debt_beyond_decimal_range_is_an_error() {
    let snap = PositionSnapshot::new(
        used_assets([
            UsedAsset::new("ETH").collateral(dec!(500), dec!(1000000)),
            UsedAsset::new("SHIB").borrowed(Decimal::new(1, 18), Decimal::new(1, 23)),
        ]),
        market_data([eth(), Asset::new("SHIB", dec!(0.00001), dec!(0.4), dec!(0.5))]),
    );
    let config = AnalysisConfig::default();
    let err = AggregationEngine::from_config(&config)
        .aggregate(&snap, &config)
        .unwrap_err();
    assert!(matches!(err, RiskError::ArithmeticOverflow { .. }));
}

#[test]
fn json_numbers_keep_full_precision() {
    let json = r#"{
        "usedAssets": {
            "WBTC": { "symbol": "WBTC", "suppliedAmount": 1, "suppliedUsd": 1234567890.123456789012, "collateral": true }
        },
        "market": {
            "WBTC": { "symbol": "WBTC", "priceUsd": 1234567890.123456789012, "collateralFactor": 0.5, "liquidationThreshold": 0.75 }
        }
    }"#;
    let snap: PositionSnapshot = serde_json::from_str(json).unwrap();
    let result = aggregate(&snap);

    assert_eq!(result.supplied_usd, dec!(1234567890.123456789012));
    assert_eq!(result.borrow_limit_usd, dec!(617283945.061728394506));
}
