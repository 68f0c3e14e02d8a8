mod common;

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;

use defi_workbench::abi::IPoolDataProvider;
use defi_workbench::liquidation::{
    LiquidationAggregator, RiskBand, UserReserveRow, summarize_chain,
};
use defi_workbench::positions::AdapterContext;
use defi_workbench::registry::{self, PriceBook};

use common::*;

// ── S6: wstETH collateral with USDC debt ─────────────────────────────

fn s6_rows() -> Vec<UserReserveRow> {
    vec![
        UserReserveRow {
            token: "WSTETH".to_string(),
            atoken_balance: 5.0,
            debt_balance: 0.0,
            liquidation_threshold: 0.75,
            usage_as_collateral: true,
        },
        UserReserveRow {
            token: "USDC".to_string(),
            atoken_balance: 0.0,
            debt_balance: 3_000.0,
            liquidation_threshold: 0.78,
            usage_as_collateral: false,
        },
    ]
}

#[test]
fn liquidation_summary_numbers() {
    let summary = summarize_chain(1, &s6_rows(), &PriceBook::with_defaults());

    assert!((summary.total_collateral_usd - 15_000.0).abs() < 1e-9);
    assert!((summary.total_debt_usd - 3_000.0).abs() < 1e-9);

    // HF = 15_000 · 0.75 / 3_000 = 3.75 -> safe.
    let hf = summary.health_factor.unwrap();
    assert!((hf - 3.75).abs() < 1e-9);
    assert_eq!(summary.risk, RiskBand::Safe);

    // liquidation_price = 3_000 / (5 · 0.75) = 800.
    assert_eq!(summary.collaterals.len(), 1);
    let collateral = &summary.collaterals[0];
    assert!((collateral.liquidation_price - 800.0).abs() < 1e-9);
    assert!((collateral.price_drop_to_liquidation - (1.0 - 800.0 / 3_000.0)).abs() < 1e-9);
}

#[test]
fn debt_free_wallet_is_safe_with_no_health_factor() {
    let rows = vec![UserReserveRow {
        token: "WETH".to_string(),
        atoken_balance: 2.0,
        debt_balance: 0.0,
        liquidation_threshold: 0.8,
        usage_as_collateral: true,
    }];
    let summary = summarize_chain(1, &rows, &PriceBook::with_defaults());
    assert_eq!(summary.health_factor, None);
    assert_eq!(summary.risk, RiskBand::Safe);
}

#[test]
fn critical_band_below_threshold() {
    let rows = vec![
        UserReserveRow {
            token: "WETH".to_string(),
            atoken_balance: 1.0,
            debt_balance: 0.0,
            liquidation_threshold: 0.8,
            usage_as_collateral: true,
        },
        UserReserveRow {
            token: "USDC".to_string(),
            atoken_balance: 0.0,
            debt_balance: 2_300.0,
            liquidation_threshold: 0.78,
            usage_as_collateral: false,
        },
    ];
    let summary = summarize_chain(1, &rows, &PriceBook::with_defaults());
    // HF = 3_000 · 0.8 / 2_300 ≈ 1.043.
    assert_eq!(summary.risk, RiskBand::Critical);
}

// ── End-to-end over the adapter ──────────────────────────────────────

fn wallet() -> Address {
    "0x000000000000000000000000000000000000bEEF"
        .parse()
        .unwrap()
}

#[tokio::test]
async fn aggregator_reads_reserves_through_the_adapter() {
    let provider = registry::contract(1, "aave-v3-data-provider").unwrap();
    let wsteth = registry::token_address(1, "WSTETH").unwrap();
    let usdc = registry::token_address(1, "USDC").unwrap();

    let client = FakeChainClient::new()
        .respond_exact(
            provider,
            IPoolDataProvider::getUserReserveDataCall {
                asset: wsteth,
                user: wallet(),
            }
            .abi_encode(),
            ret_user_reserve(
                U256::from(5u128 * 10u128.pow(18)),
                U256::ZERO,
                U256::ZERO,
                U256::ZERO,
                true,
            ),
        )
        .respond_exact(
            provider,
            IPoolDataProvider::getReserveConfigurationDataCall { asset: wsteth }.abi_encode(),
            ret_reserve_config(7_500),
        )
        .respond_exact(
            provider,
            IPoolDataProvider::getUserReserveDataCall {
                asset: usdc,
                user: wallet(),
            }
            .abi_encode(),
            ret_user_reserve(
                U256::ZERO,
                U256::ZERO,
                U256::from(3_000_000_000u64), // 3000 USDC, 6 decimals
                U256::ZERO,
                false,
            ),
        )
        .respond_selector(
            provider,
            selector::<IPoolDataProvider::getUserReserveDataCall>(),
            ret_user_reserve(U256::ZERO, U256::ZERO, U256::ZERO, U256::ZERO, false),
        )
        .respond_selector(
            provider,
            selector::<IPoolDataProvider::getReserveConfigurationDataCall>(),
            ret_reserve_config(8_000),
        );

    let aggregator = LiquidationAggregator::new(AdapterContext::new(Arc::new(client)));
    let summaries = aggregator.assess(wallet(), &[1]).await;

    let summary = summaries.get(&1).expect("mainnet summary");
    assert!((summary.total_collateral_usd - 15_000.0).abs() < 1e-9);
    assert!((summary.total_debt_usd - 3_000.0).abs() < 1e-9);
    assert!((summary.health_factor.unwrap() - 3.75).abs() < 1e-9);
    assert_eq!(summary.risk, RiskBand::Safe);
}
