//! Yield/risk simulator: a single pass over the topological order,
//! propagating USD value, cumulative APY, leverage and liquidation state.
//!
//! Non-throwing contract: every error path returns a populated default
//! `SimulationResult` so the UI never branches on a missing body.

use std::collections::HashMap;

use crate::graph::{detect_loops, topological_order, unroll_loops};
use crate::model::plan::gas_to_usd;
use crate::model::{
    BlockId, BlockKind, ProtocolId, RiskLevel, SimulationResult, Strategy, WrapDirection,
    YieldKind, YieldSource,
};
use crate::registry::apy::{fallback_borrow_apy, fallback_stake_apy, fallback_supply_apy};
use crate::registry::gas::{gas_units, stake_gas};
use crate::registry::{PriceBook, risk_score};
use crate::route::wrapped_form;

/// Liquidation threshold assumed when the lend block does not carry one.
const DEFAULT_LIQUIDATION_THRESHOLD: f64 = 0.825;

/// Swap protocol fee fraction charged on input value.
const SWAP_FEE_RATE: f64 = 0.003;

/// Per-block simulation state.
#[derive(Debug, Clone)]
struct BlockState {
    value_usd: f64,
    asset: String,
    leverage: f64,
    is_collateral: bool,
    /// Liquidation threshold carried from a Lend block to its Borrow.
    liquidation_threshold: Option<f64>,
}

#[derive(Debug, Default)]
struct SimContext {
    initial_value: f64,
    states: HashMap<BlockId, BlockState>,
    yield_sources: Vec<YieldSource>,
    gas_units_total: u64,
    fees_total: f64,
    risk_score: f64,
    leverage: f64,
    health_factor_min: Option<f64>,
    liquidation_price: Option<f64>,
}

/// Simulate a strategy at the given prices and gas price assumption.
pub fn simulate(strategy: &Strategy, prices: &PriceBook, gas_price_gwei: f64) -> SimulationResult {
    let loops = detect_loops(&strategy.blocks, &strategy.edges);
    if loops.iter().any(|l| !l.is_leverage_loop) {
        return SimulationResult::invalid("Strategy contains cycles");
    }

    match strategy.input_blocks().len() {
        0 => return SimulationResult::invalid("Strategy needs an Input block"),
        1 => {}
        _ => return SimulationResult::invalid("Strategy must contain exactly one Input block"),
    }

    let work = unroll_loops(strategy);
    let order = match topological_order(&work.blocks, &work.edges) {
        Ok(order) => order,
        Err(_) => return SimulationResult::invalid("Strategy contains cycles"),
    };

    let mut ctx = SimContext {
        leverage: 1.0,
        ..SimContext::default()
    };

    for block_id in &order {
        let Some(block) = work.block(block_id) else {
            continue;
        };
        let incoming = incoming_value(&work, &ctx, block_id);

        match &block.kind {
            BlockKind::Input { asset, amount } => {
                let value = amount * prices.price_or_one(asset);
                ctx.initial_value = value;
                ctx.states.insert(
                    block_id.clone(),
                    BlockState {
                        value_usd: value,
                        asset: asset.clone(),
                        leverage: 1.0,
                        is_collateral: false,
                        liquidation_threshold: None,
                    },
                );
            }
            BlockKind::Stake {
                protocol,
                out_asset,
                apy,
                wrap,
                ..
            } => {
                let apy = apy.unwrap_or_else(|| fallback_stake_apy(*protocol));
                push_yield(&mut ctx, *protocol, YieldKind::Stake, apy, incoming);
                ctx.risk_score += risk_score(*protocol) * 0.3;
                ctx.gas_units_total += stake_gas(*protocol);

                let asset = if *wrap {
                    wrapped_form(out_asset)
                        .map(str::to_string)
                        .unwrap_or_else(|| out_asset.clone())
                } else {
                    out_asset.clone()
                };
                if *wrap {
                    ctx.gas_units_total += gas_units::APPROVE + gas_units::WRAP;
                }
                ctx.states.insert(
                    block_id.clone(),
                    BlockState {
                        value_usd: incoming,
                        asset,
                        leverage: ctx.leverage,
                        is_collateral: false,
                        liquidation_threshold: None,
                    },
                );
            }
            BlockKind::Lend {
                protocol,
                chain_id: _,
                asset,
                supply_apy,
                liquidation_threshold,
                ..
            } => {
                let in_asset = incoming_asset(&work, &ctx, block_id);
                let asset = asset.clone().or(in_asset).unwrap_or_default();
                let apy = supply_apy.unwrap_or_else(|| fallback_supply_apy(*protocol, &asset));
                push_yield(&mut ctx, *protocol, YieldKind::Supply, apy, incoming);
                ctx.risk_score += risk_score(*protocol) * 0.25;
                ctx.gas_units_total += gas_units::APPROVE + gas_units::SUPPLY;

                ctx.states.insert(
                    block_id.clone(),
                    BlockState {
                        value_usd: incoming,
                        asset,
                        leverage: ctx.leverage,
                        is_collateral: true,
                        liquidation_threshold: *liquidation_threshold,
                    },
                );
            }
            BlockKind::Borrow {
                protocol,
                asset,
                ltv_percent,
                borrow_apy,
            } => {
                let Some((liq_threshold, collateral_asset)) =
                    collateral_predecessor(&work, &ctx, block_id).map(|s| {
                        (
                            s.liquidation_threshold
                                .unwrap_or(DEFAULT_LIQUIDATION_THRESHOLD),
                            s.asset.clone(),
                        )
                    })
                else {
                    return SimulationResult::invalid(
                        "Borrow block must draw against supplied collateral",
                    );
                };
                let collateral = incoming;
                if collateral <= 0.0 {
                    continue;
                }

                let borrow_value = collateral * ltv_percent / 100.0;
                let health_factor = collateral * liq_threshold / borrow_value;
                let spot = prices.price_or_one(&collateral_asset);
                let liquidation_price = spot * borrow_value / (collateral * liq_threshold);

                let apy = borrow_apy.unwrap_or_else(|| fallback_borrow_apy(*protocol, asset));
                push_yield(&mut ctx, *protocol, YieldKind::Borrow, -apy, borrow_value);

                ctx.leverage += borrow_value / ctx.initial_value;
                ctx.health_factor_min = Some(match ctx.health_factor_min {
                    Some(min) => min.min(health_factor),
                    None => health_factor,
                });
                ctx.liquidation_price = Some(match ctx.liquidation_price {
                    Some(worst) => worst.max(liquidation_price),
                    None => liquidation_price,
                });

                ctx.risk_score += if *ltv_percent >= 80.0 {
                    30.0
                } else if *ltv_percent >= 70.0 {
                    20.0
                } else if *ltv_percent >= 60.0 {
                    10.0
                } else {
                    0.0
                };
                ctx.gas_units_total += gas_units::BORROW;

                ctx.states.insert(
                    block_id.clone(),
                    BlockState {
                        value_usd: borrow_value,
                        asset: asset.clone(),
                        leverage: ctx.leverage,
                        is_collateral: false,
                        liquidation_threshold: None,
                    },
                );
            }
            BlockKind::Swap {
                to, slippage_bps, ..
            } => {
                let output = incoming * (1.0 - *slippage_bps as f64 / 10_000.0);
                ctx.fees_total += incoming * SWAP_FEE_RATE;
                ctx.gas_units_total += gas_units::APPROVE + gas_units::SWAP;
                ctx.states.insert(
                    block_id.clone(),
                    BlockState {
                        value_usd: output,
                        asset: to.clone(),
                        leverage: ctx.leverage,
                        is_collateral: false,
                        liquidation_threshold: None,
                    },
                );
            }
            BlockKind::AutoWrap { to, wrap_step, .. } => {
                ctx.gas_units_total += match wrap_step.direction {
                    WrapDirection::Wrap => gas_units::APPROVE + gas_units::WRAP,
                    WrapDirection::Unwrap => gas_units::UNWRAP,
                };
                ctx.states.insert(
                    block_id.clone(),
                    BlockState {
                        value_usd: incoming,
                        asset: to.clone(),
                        leverage: ctx.leverage,
                        is_collateral: false,
                        liquidation_threshold: None,
                    },
                );
            }
        }
    }

    finalize(ctx, prices, gas_price_gwei)
}

fn incoming_value(strategy: &Strategy, ctx: &SimContext, block_id: &str) -> f64 {
    strategy
        .incoming(block_id)
        .filter_map(|e| {
            ctx.states
                .get(&e.source_id)
                .map(|s| s.value_usd * e.flow_percent / 100.0)
        })
        .sum()
}

/// Asset flowing in from the first resolved predecessor.
fn incoming_asset(strategy: &Strategy, ctx: &SimContext, block_id: &str) -> Option<String> {
    strategy
        .incoming(block_id)
        .filter_map(|e| ctx.states.get(&e.source_id))
        .map(|s| s.asset.clone())
        .next()
}

fn collateral_predecessor<'a>(
    strategy: &Strategy,
    ctx: &'a SimContext,
    block_id: &str,
) -> Option<&'a BlockState> {
    strategy
        .incoming(block_id)
        .filter_map(|e| ctx.states.get(&e.source_id))
        .find(|s| s.is_collateral)
}

fn push_yield(
    ctx: &mut SimContext,
    protocol: ProtocolId,
    kind: YieldKind,
    apy: f64,
    value: f64,
) {
    if ctx.initial_value <= 0.0 {
        return;
    }
    ctx.yield_sources.push(YieldSource {
        protocol,
        kind,
        apy,
        weight: value / ctx.initial_value * 100.0,
    });
}

fn finalize(ctx: SimContext, prices: &PriceBook, gas_price_gwei: f64) -> SimulationResult {
    if ctx.initial_value <= 0.0 {
        return SimulationResult::invalid("Input block has no value");
    }

    let gas_cost_usd = gas_to_usd(ctx.gas_units_total, prices.eth_price(), gas_price_gwei);

    let gross_apy: f64 = ctx
        .yield_sources
        .iter()
        .map(|s| s.apy * s.weight / 100.0)
        .sum();
    // One-time gas and fees amortised over a year against the initial value.
    let gas_pct = gas_cost_usd / ctx.initial_value * 100.0;
    let fees_pct = ctx.fees_total / ctx.initial_value * 100.0;
    let net_apy = gross_apy - gas_pct - fees_pct;

    let risk_score = ctx.risk_score.clamp(0.0, 100.0);
    let leverage = ctx.leverage.max(1.0);
    let max_drawdown = if leverage > 1.0 {
        (20.0 * leverage).min(100.0)
    } else {
        10.0
    };

    SimulationResult {
        is_valid: true,
        error: None,
        gross_apy,
        net_apy,
        initial_value: ctx.initial_value,
        projected_value_1y: ctx.initial_value * (1.0 + net_apy / 100.0),
        gas_cost_usd,
        protocol_fees: ctx.fees_total,
        risk_level: RiskLevel::classify(risk_score, leverage),
        risk_score,
        liquidation_price: ctx.liquidation_price,
        health_factor: ctx.health_factor_min,
        max_drawdown,
        leverage,
        yield_sources: ctx.yield_sources,
        per_block_values: ctx
            .states
            .iter()
            .map(|(id, s)| (id.clone(), s.value_usd))
            .collect(),
        failed_at_step: None,
    }
}
