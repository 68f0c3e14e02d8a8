mod common;

use defi_workbench::model::{RiskLevel, Strategy, YieldKind};
use defi_workbench::registry::PriceBook;
use defi_workbench::simulate::simulate;

use common::*;

const GAS_PRICE_GWEI: f64 = 20.0;

fn prices() -> PriceBook {
    PriceBook::with_defaults()
}

// ── S1: conservative LST ─────────────────────────────────────────────

#[test]
fn conservative_lst_numbers() {
    let result = simulate(&conservative_lst_strategy(), &prices(), GAS_PRICE_GWEI);

    assert!(result.is_valid);
    assert_eq!(result.error, None);
    assert!((result.initial_value - 3_000.0).abs() < 1e-9);
    assert!((result.gross_apy - 3.2).abs() < 1e-9);
    // Net is gross minus one-time gas amortised over the year.
    let expected_net = 3.2 - result.gas_cost_usd / 3_000.0 * 100.0;
    assert!((result.net_apy - expected_net).abs() < 1e-9);
    assert!(result.net_apy < result.gross_apy);
    assert!((result.leverage - 1.0).abs() < 1e-12);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert!((result.max_drawdown - 10.0).abs() < 1e-12);
    assert_eq!(result.yield_sources.len(), 1);
    assert!(
        (result.projected_value_1y - 3_000.0 * (1.0 + result.net_apy / 100.0)).abs() < 1e-9
    );
}

// ── Property 5: simulation roundtrip ─────────────────────────────────

#[test]
fn stake_lend_borrow_roundtrip() {
    let ltv = 70.0;
    let result = simulate(&borrow_strategy(ltv), &prices(), GAS_PRICE_GWEI);
    assert!(result.is_valid, "error: {:?}", result.error);

    // leverage = 1 + borrow_value / initial_value
    let leverage_contribution = ltv / 100.0;
    assert!((result.leverage - (1.0 + leverage_contribution)).abs() < 1e-9);

    // gross = stake + supply − borrow · contribution
    let expected_gross = 3.0 + 1.0 - 2.0 * leverage_contribution;
    assert!((result.gross_apy - expected_gross).abs() < 1e-9);

    // HF = collateral · LT / debt, with collateral = initial here.
    let hf = result.health_factor.expect("borrow sets HF");
    assert!((hf - 0.75 / leverage_contribution).abs() < 1e-9);

    // liquidation_price = spot · debt / (collateral · LT)
    let liq = result.liquidation_price.expect("borrow sets liq price");
    assert!((liq - 3_000.0 * leverage_contribution / 0.75).abs() < 1e-6);

    // Risk: lido 10·0.3 + aave 12·0.25 + 70% LTV band (+20) = 26, leverage 1.7.
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert!((result.max_drawdown - 20.0 * result.leverage).abs() < 1e-9);

    let borrow_source = result
        .yield_sources
        .iter()
        .find(|s| s.kind == YieldKind::Borrow)
        .expect("borrow yield source");
    assert!(borrow_source.apy < 0.0);
    assert!((borrow_source.weight - 70.0).abs() < 1e-9);
}

// ── Leverage loops ───────────────────────────────────────────────────

#[test]
fn leverage_loop_compounds_through_unrolling() {
    let result = simulate(&leverage_loop_strategy(), &prices(), GAS_PRICE_GWEI);
    assert!(result.is_valid, "error: {:?}", result.error);

    // Three iterations at 70% LTV: borrows of 0.7 + 0.49 + 0.343.
    let expected_leverage = 1.0 + 0.7 + 0.49 + 0.343;
    assert!(
        (result.leverage - expected_leverage).abs() < 1e-9,
        "leverage = {}",
        result.leverage
    );
    // Three unrolled borrows at 70% LTV push the risk score past 70.
    assert_eq!(result.risk_level, RiskLevel::Extreme);
    // The deepest borrow dominates the minimum health factor.
    assert!(result.health_factor.is_some());
}

// ── Failure semantics: populated defaults, never a throw ─────────────

#[test]
fn missing_input_returns_populated_default() {
    let mut strategy = Strategy::new();
    strategy.add_block(stake_block("stake", defi_workbench::model::ProtocolId::Lido, "stETH", None));

    let result = simulate(&strategy, &prices(), GAS_PRICE_GWEI);
    assert!(!result.is_valid);
    assert_eq!(result.error.as_deref(), Some("Strategy needs an Input block"));
    assert_eq!(result.leverage, 1.0);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert!(result.yield_sources.is_empty());
}

#[test]
fn non_leverage_cycle_returns_cycle_error() {
    let mut strategy = Strategy::new();
    strategy.add_block(input_block(1.0));
    strategy.add_block(defi_workbench::model::StrategyBlock::new(
        "swap_a",
        "a",
        defi_workbench::model::BlockKind::Swap {
            from: "ETH".to_string(),
            to: "USDC".to_string(),
            slippage_bps: 30,
        },
    ));
    strategy.add_block(defi_workbench::model::StrategyBlock::new(
        "swap_b",
        "b",
        defi_workbench::model::BlockKind::Swap {
            from: "USDC".to_string(),
            to: "ETH".to_string(),
            slippage_bps: 30,
        },
    ));
    strategy.connect("input", "swap_a", 100.0);
    strategy.connect("swap_a", "swap_b", 100.0);
    strategy.connect("swap_b", "swap_a", 100.0);

    let result = simulate(&strategy, &prices(), GAS_PRICE_GWEI);
    assert!(!result.is_valid);
    assert_eq!(result.error.as_deref(), Some("Strategy contains cycles"));
}

// ── Swap economics ───────────────────────────────────────────────────

#[test]
fn swap_applies_slippage_and_fee() {
    let mut strategy = Strategy::new();
    strategy.add_block(input_block(1.0));
    strategy.add_block(defi_workbench::model::StrategyBlock::new(
        "swap",
        "ETH->USDC",
        defi_workbench::model::BlockKind::Swap {
            from: "ETH".to_string(),
            to: "USDC".to_string(),
            slippage_bps: 100,
        },
    ));
    strategy.connect("input", "swap", 100.0);

    let result = simulate(&strategy, &prices(), GAS_PRICE_GWEI);
    assert!(result.is_valid);
    // 1% slippage on $3000.
    let swap_value = result.per_block_values.get("swap").unwrap();
    assert!((swap_value - 2_970.0).abs() < 1e-9);
    // 30 bps protocol fee on input value.
    assert!((result.protocol_fees - 9.0).abs() < 1e-9);
}
