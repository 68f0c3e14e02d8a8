//! Transaction plan builder: lowers an ordered strategy graph into
//! protocol-specific calls, ready to be signed and executed in order.

use std::collections::HashMap;

use alloy::primitives::aliases::U160;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use chrono::Utc;

use crate::abi::{IAavePool, IERC20, IEtherFiLiquidityPool, ILido, ISwapRouter02, IWeEth, IWstEth};
use crate::graph::{topological_order, unroll_loops, validate};
use crate::model::plan::PLAN_TTL_MS;
use crate::model::units::{apply_bps, from_base_units, to_base_units};
use crate::model::{
    BlockId, BlockKind, ProtocolId, StepAction, Strategy, TokenAmount, TransactionPlan,
    TransactionStep, WrapDirection, WrapStep,
};
use crate::registry::gas::{gas_units, stake_gas};
use crate::registry::{self, PriceBook};

use super::PlanError;

/// Default Uniswap v3 fee tier (0.3 %).
const DEFAULT_SWAP_FEE: u32 = 3_000;

/// Inputs for plan construction.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub strategy: Strategy,
    pub chain_id: u64,
    pub from_address: Address,
    /// Overrides block-level swap slippage when set.
    pub slippage_bps: Option<u32>,
}

/// Build an executable plan from a strategy.
///
/// The step sequence follows the topological order of source blocks, with
/// auto-inserted wraps and approves immediately preceding their consumers.
pub fn build_plan(
    request: &PlanRequest,
    prices: &PriceBook,
    gas_price_gwei: f64,
) -> Result<TransactionPlan, PlanError> {
    if registry::chain(request.chain_id).is_none() {
        return Err(PlanError::UnsupportedChain(request.chain_id));
    }

    let report = validate(&request.strategy);
    if !report.is_valid() {
        return Err(PlanError::GraphInvalid(report.errors));
    }

    let work = unroll_loops(&request.strategy);
    let order = topological_order(&work.blocks, &work.edges)?;

    let mut lowerer = Lowerer {
        strategy: &work,
        chain_id: request.chain_id,
        from: request.from_address,
        prices,
        slippage_override: request.slippage_bps,
        steps: Vec::new(),
        next_step: 1,
        flows: HashMap::new(),
    };

    for block_id in &order {
        lowerer.lower_block(block_id)?;
    }

    let estimated_total_gas: u64 = lowerer.steps.iter().map(|s| s.estimated_gas).sum();
    let created_at = Utc::now().timestamp_millis();
    let total_steps = lowerer.steps.len();

    Ok(TransactionPlan {
        id: uuid::Uuid::new_v4().to_string(),
        chain_id: request.chain_id,
        from_address: request.from_address,
        steps: lowerer.steps,
        total_steps,
        estimated_total_gas,
        estimated_total_gas_usd: crate::model::plan::gas_to_usd(
            estimated_total_gas,
            prices.eth_price(),
            gas_price_gwei,
        ),
        strategy_id: Some(request.strategy.id.clone()),
        created_at,
        expires_at: created_at + PLAN_TTL_MS,
    })
}

/// Amount flowing out of a lowered block, in base units of `symbol`.
#[derive(Debug, Clone)]
struct Flow {
    symbol: String,
    raw: U256,
}

struct Lowerer<'a> {
    strategy: &'a Strategy,
    chain_id: u64,
    from: Address,
    prices: &'a PriceBook,
    slippage_override: Option<u32>,
    steps: Vec<TransactionStep>,
    next_step: usize,
    flows: HashMap<BlockId, Flow>,
}

impl Lowerer<'_> {
    fn lower_block(&mut self, block_id: &str) -> Result<(), PlanError> {
        let block = match self.strategy.block(block_id) {
            Some(block) => block,
            None => return Ok(()),
        };

        match &block.kind {
            BlockKind::Input { asset, amount } => {
                let raw = to_base_units(*amount, registry::token_decimals(asset));
                self.flows.insert(
                    block_id.to_string(),
                    Flow {
                        symbol: asset.clone(),
                        raw,
                    },
                );
                Ok(())
            }
            BlockKind::Stake {
                protocol,
                out_asset,
                wrap,
                ..
            } => self.lower_stake(block_id, *protocol, out_asset, *wrap),
            BlockKind::AutoWrap { wrap_step, .. } => {
                self.lower_wrap(block_id, wrap_step.clone())
            }
            BlockKind::Lend {
                protocol, asset, ..
            } => self.lower_supply(block_id, *protocol, asset.clone()),
            BlockKind::Borrow {
                protocol,
                asset,
                ltv_percent,
                ..
            } => self.lower_borrow(block_id, *protocol, asset, *ltv_percent),
            BlockKind::Swap {
                from,
                to,
                slippage_bps,
            } => self.lower_swap(block_id, from, to, *slippage_bps),
        }
    }

    // ── Per-protocol lowerers ───────────────────────────────────────

    fn lower_stake(
        &mut self,
        block_id: &str,
        protocol: ProtocolId,
        out_asset: &str,
        wrap: bool,
    ) -> Result<(), PlanError> {
        let raw = self.incoming_raw(block_id)?;
        let display = from_base_units(raw, 18);

        let (target, calldata) = match protocol {
            ProtocolId::Lido => (
                self.contract("lido-steth", protocol)?,
                ILido::submitCall {
                    _referral: Address::ZERO,
                }
                .abi_encode(),
            ),
            ProtocolId::EtherFi => (
                self.contract("etherfi-liquidity-pool", protocol)?,
                IEtherFiLiquidityPool::depositCall {
                    _referral: Address::ZERO,
                }
                .abi_encode(),
            ),
            other => {
                return Err(PlanError::ProtocolUnknown {
                    protocol: other,
                    chain_id: self.chain_id,
                });
            }
        };

        let token_in = self.token_amount("ETH", raw)?;
        let token_out = self.token_amount(out_asset, raw)?;
        self.push_step(StepBlueprint {
            action: StepAction::Stake,
            protocol,
            description: format!("Stake {display} ETH for {out_asset} via {protocol}"),
            to: target,
            calldata: calldata.into(),
            value: raw,
            token_in: Some(token_in),
            token_out: Some(token_out),
            estimated_gas: stake_gas(protocol),
            source_block_id: block_id.to_string(),
        });

        let mut out_flow = Flow {
            symbol: out_asset.to_string(),
            raw,
        };

        if wrap {
            if let Some(wrapped) = crate::route::wrapped_form(out_asset) {
                let step = WrapStep {
                    from: out_asset.to_string(),
                    to: wrapped.to_string(),
                    protocol,
                    direction: WrapDirection::Wrap,
                };
                out_flow = self.emit_wrap_steps(block_id, &step, raw)?;
            }
        }

        self.flows.insert(block_id.to_string(), out_flow);
        Ok(())
    }

    fn lower_wrap(&mut self, block_id: &str, wrap_step: WrapStep) -> Result<(), PlanError> {
        let raw = self.incoming_raw(block_id)?;
        let out_flow = self.emit_wrap_steps(block_id, &wrap_step, raw)?;
        self.flows.insert(block_id.to_string(), out_flow);
        Ok(())
    }

    /// Emit approve + wrap (or a bare unwrap) and return the estimated
    /// output flow. The exact post-wrap balance is only known at execution
    /// time, so the wrapped estimate is deliberately conservative.
    fn emit_wrap_steps(
        &mut self,
        block_id: &str,
        wrap_step: &WrapStep,
        raw: U256,
    ) -> Result<Flow, PlanError> {
        let wrapper = self.wrapper_contract(wrap_step)?;
        let underlying = self.token_address(&wrap_step.from)?;

        match wrap_step.direction {
            WrapDirection::Wrap => {
                self.emit_approve(
                    block_id,
                    wrap_step.protocol,
                    &wrap_step.from,
                    underlying,
                    wrapper,
                    raw,
                )?;

                let calldata = match wrap_step.protocol {
                    ProtocolId::EtherFi => IWeEth::wrapCall { _eETHAmount: raw }.abi_encode(),
                    _ => IWstEth::wrapCall { _stETHAmount: raw }.abi_encode(),
                };
                let out_raw = apply_bps(raw, wrap_ratio_bps(&wrap_step.to, raw));
                let token_in = self.token_amount(&wrap_step.from, raw)?;
                let token_out = self.token_amount(&wrap_step.to, out_raw)?;
                self.push_step(StepBlueprint {
                    action: StepAction::Wrap,
                    protocol: wrap_step.protocol,
                    description: format!("Wrap {} into {}", wrap_step.from, wrap_step.to),
                    to: wrapper,
                    calldata: calldata.into(),
                    value: U256::ZERO,
                    token_in: Some(token_in),
                    token_out: Some(token_out),
                    estimated_gas: gas_units::WRAP,
                    source_block_id: block_id.to_string(),
                });

                Ok(Flow {
                    symbol: wrap_step.to.clone(),
                    raw: out_raw,
                })
            }
            WrapDirection::Unwrap => {
                let calldata = match wrap_step.protocol {
                    ProtocolId::EtherFi => IWeEth::unwrapCall { _weETHAmount: raw }.abi_encode(),
                    _ => IWstEth::unwrapCall { _wstETHAmount: raw }.abi_encode(),
                };
                // Unwrapping only grows the balance; 1:1 is the safe floor.
                let token_in = self.token_amount(&wrap_step.from, raw)?;
                let token_out = self.token_amount(&wrap_step.to, raw)?;
                self.push_step(StepBlueprint {
                    action: StepAction::Unwrap,
                    protocol: wrap_step.protocol,
                    description: format!("Unwrap {} into {}", wrap_step.from, wrap_step.to),
                    to: wrapper,
                    calldata: calldata.into(),
                    value: U256::ZERO,
                    token_in: Some(token_in),
                    token_out: Some(token_out),
                    estimated_gas: gas_units::UNWRAP,
                    source_block_id: block_id.to_string(),
                });

                Ok(Flow {
                    symbol: wrap_step.to.clone(),
                    raw,
                })
            }
        }
    }

    fn lower_supply(
        &mut self,
        block_id: &str,
        protocol: ProtocolId,
        asset: Option<String>,
    ) -> Result<(), PlanError> {
        let pool = self.lending_pool(protocol)?;
        let incoming = self.incoming_flow(block_id)?;
        let symbol = asset.unwrap_or_else(|| incoming.symbol.clone());
        let token = self.token_address(&symbol)?;
        let raw = incoming.raw;

        self.emit_approve(block_id, protocol, &symbol, token, pool, raw)?;

        let calldata = IAavePool::supplyCall {
            asset: token,
            amount: raw,
            onBehalfOf: self.from,
            referralCode: 0,
        }
        .abi_encode();
        let token_in = self.token_amount(&symbol, raw)?;
        self.push_step(StepBlueprint {
            action: StepAction::Deposit,
            protocol,
            description: format!(
                "Supply {} {symbol} to {protocol}",
                from_base_units(raw, registry::token_decimals(&symbol))
            ),
            to: pool,
            calldata: calldata.into(),
            value: U256::ZERO,
            token_in: Some(token_in),
            token_out: None,
            estimated_gas: gas_units::SUPPLY,
            source_block_id: block_id.to_string(),
        });

        // Collateral stays in the market; downstream borrows size off it.
        self.flows.insert(
            block_id.to_string(),
            Flow {
                symbol,
                raw,
            },
        );
        Ok(())
    }

    fn lower_borrow(
        &mut self,
        block_id: &str,
        protocol: ProtocolId,
        asset: &str,
        ltv_percent: f64,
    ) -> Result<(), PlanError> {
        let pool = self.lending_pool(protocol)?;
        let collateral = self.incoming_flow(block_id)?;
        let token = self.token_address(asset)?;

        // Size the draw in USD, then truncate into borrow-asset units.
        let collateral_decimals = registry::token_decimals(&collateral.symbol);
        let collateral_usd = from_base_units(collateral.raw, collateral_decimals)
            * self.prices.price_or_one(&collateral.symbol);
        let borrow_usd = collateral_usd * ltv_percent / 100.0;
        let decimals = registry::token_decimals(asset);
        let raw = to_base_units(borrow_usd / self.prices.price_or_one(asset), decimals);

        let calldata = IAavePool::borrowCall {
            asset: token,
            amount: raw,
            interestRateMode: U256::from(2),
            referralCode: 0,
            onBehalfOf: self.from,
        }
        .abi_encode();
        let token_out = self.token_amount(asset, raw)?;
        self.push_step(StepBlueprint {
            action: StepAction::Borrow,
            protocol,
            description: format!(
                "Borrow {} {asset} from {protocol} at {ltv_percent}% LTV",
                from_base_units(raw, decimals)
            ),
            to: pool,
            calldata: calldata.into(),
            value: U256::ZERO,
            token_in: None,
            token_out: Some(token_out),
            estimated_gas: gas_units::BORROW,
            source_block_id: block_id.to_string(),
        });

        self.flows.insert(
            block_id.to_string(),
            Flow {
                symbol: asset.to_string(),
                raw,
            },
        );
        Ok(())
    }

    fn lower_swap(
        &mut self,
        block_id: &str,
        from_asset: &str,
        to_asset: &str,
        slippage_bps: u32,
    ) -> Result<(), PlanError> {
        let router = self.contract("uniswap-v3-router", ProtocolId::UniswapV3)?;
        let raw = self.incoming_raw(block_id)?;
        let slippage = self.slippage_override.unwrap_or(slippage_bps).min(10_000);

        // Uniswap pools trade the wrapped native, never the sentinel.
        let token_in_addr = self.pool_token(from_asset)?;
        let token_out_addr = self.pool_token(to_asset)?;

        let dec_in = registry::token_decimals(from_asset);
        let dec_out = registry::token_decimals(to_asset);
        let in_display = from_base_units(raw, dec_in);
        let out_display = in_display * self.prices.price_or_one(from_asset)
            / self.prices.price_or_one(to_asset)
            * (1.0 - slippage as f64 / 10_000.0);
        let min_out = to_base_units(out_display, dec_out);

        self.emit_approve(
            block_id,
            ProtocolId::UniswapV3,
            from_asset,
            token_in_addr,
            router,
            raw,
        )?;

        let calldata = ISwapRouter02::exactInputSingleCall {
            params: ISwapRouter02::ExactInputSingleParams {
                tokenIn: token_in_addr,
                tokenOut: token_out_addr,
                fee: alloy::primitives::Uint::<24, 1>::from(DEFAULT_SWAP_FEE),
                recipient: self.from,
                amountIn: raw,
                amountOutMinimum: min_out,
                sqrtPriceLimitX96: U160::ZERO,
            },
        }
        .abi_encode();
        let token_in = self.token_amount(from_asset, raw)?;
        let token_out = self.token_amount(to_asset, min_out)?;
        self.push_step(StepBlueprint {
            action: StepAction::Swap,
            protocol: ProtocolId::UniswapV3,
            description: format!("Swap {in_display} {from_asset} for {to_asset}"),
            to: router,
            calldata: calldata.into(),
            value: U256::ZERO,
            token_in: Some(token_in),
            token_out: Some(token_out),
            estimated_gas: gas_units::SWAP,
            source_block_id: block_id.to_string(),
        });

        self.flows.insert(
            block_id.to_string(),
            Flow {
                symbol: to_asset.to_string(),
                raw: min_out,
            },
        );
        Ok(())
    }

    // ── Shared pieces ───────────────────────────────────────────────

    fn emit_approve(
        &mut self,
        block_id: &str,
        protocol: ProtocolId,
        symbol: &str,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), PlanError> {
        let calldata = IERC20::approveCall { spender, amount }.abi_encode();
        let token_in = self.token_amount(symbol, amount)?;
        self.push_step(StepBlueprint {
            action: StepAction::Approve,
            protocol,
            description: format!("Approve {symbol} for {protocol}"),
            to: token,
            calldata: calldata.into(),
            value: U256::ZERO,
            token_in: Some(token_in),
            token_out: None,
            estimated_gas: gas_units::APPROVE,
            source_block_id: block_id.to_string(),
        });
        Ok(())
    }

    fn push_step(&mut self, blueprint: StepBlueprint) {
        let id = format!("step-{}", self.next_step);
        self.next_step += 1;
        self.steps.push(TransactionStep {
            id,
            action: blueprint.action,
            protocol: blueprint.protocol,
            chain_id: self.chain_id,
            description: blueprint.description,
            to: blueprint.to,
            calldata: blueprint.calldata,
            value: blueprint.value,
            token_in: blueprint.token_in,
            token_out: blueprint.token_out,
            estimated_gas: blueprint.estimated_gas,
            source_block_id: blueprint.source_block_id,
            approval_status: None,
            batch_info: None,
        });
    }

    /// Sum of predecessor flows weighted by edge percentage.
    fn incoming_flow(&self, block_id: &str) -> Result<Flow, PlanError> {
        let mut symbol: Option<String> = None;
        let mut total = U256::ZERO;
        for edge in self.strategy.incoming(block_id) {
            if let Some(flow) = self.flows.get(&edge.source_id) {
                let share = apply_bps(flow.raw, (edge.flow_percent * 100.0) as u64);
                total += share;
                symbol.get_or_insert_with(|| flow.symbol.clone());
            }
        }
        match symbol {
            Some(symbol) if total > U256::ZERO => Ok(Flow { symbol, raw: total }),
            _ => Err(PlanError::EmptyFlow {
                block_id: block_id.to_string(),
            }),
        }
    }

    fn incoming_raw(&self, block_id: &str) -> Result<U256, PlanError> {
        self.incoming_flow(block_id).map(|f| f.raw)
    }

    fn token_address(&self, symbol: &str) -> Result<Address, PlanError> {
        registry::token_address(self.chain_id, symbol).ok_or_else(|| PlanError::UnknownToken {
            symbol: symbol.to_string(),
            chain_id: self.chain_id,
        })
    }

    /// Token address with the native sentinel resolved to wrapped native.
    fn pool_token(&self, symbol: &str) -> Result<Address, PlanError> {
        if registry::is_native(symbol) {
            Ok(registry::chain(self.chain_id)
                .expect("validated chain")
                .wrapped_native)
        } else {
            self.token_address(symbol)
        }
    }

    fn token_amount(&self, symbol: &str, amount: U256) -> Result<TokenAmount, PlanError> {
        Ok(TokenAmount {
            symbol: symbol.to_string(),
            address: self.token_address(symbol)?,
            amount,
        })
    }

    fn contract(&self, key: &str, protocol: ProtocolId) -> Result<Address, PlanError> {
        registry::contract(self.chain_id, key).ok_or(PlanError::ProtocolUnknown {
            protocol,
            chain_id: self.chain_id,
        })
    }

    fn lending_pool(&self, protocol: ProtocolId) -> Result<Address, PlanError> {
        let key = match protocol {
            ProtocolId::AaveV3 => "aave-v3-pool",
            ProtocolId::Spark => "spark-pool",
            other => {
                return Err(PlanError::ProtocolUnknown {
                    protocol: other,
                    chain_id: self.chain_id,
                });
            }
        };
        self.contract(key, protocol)
    }

    fn wrapper_contract(&self, wrap_step: &WrapStep) -> Result<Address, PlanError> {
        let wrapped = match wrap_step.direction {
            WrapDirection::Wrap => &wrap_step.to,
            WrapDirection::Unwrap => &wrap_step.from,
        };
        self.token_address(wrapped)
    }
}

struct StepBlueprint {
    action: StepAction,
    protocol: ProtocolId,
    description: String,
    to: Address,
    calldata: Bytes,
    value: U256,
    token_in: Option<TokenAmount>,
    token_out: Option<TokenAmount>,
    estimated_gas: u64,
    source_block_id: String,
}

/// Conservative wrapped-per-underlying ratio in basis points, with an extra
/// 1 % buffer for small amounts where rounding bites harder.
fn wrap_ratio_bps(wrapped: &str, underlying_raw: U256) -> u64 {
    let small = underlying_raw < to_base_units(10.0, 18);
    match wrapped.to_uppercase().as_str() {
        "WEETH" => {
            if small {
                8_400
            } else {
                8_500
            }
        }
        "WSTETH" => {
            if small {
                7_800
            } else {
                7_900
            }
        }
        _ => 10_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_amounts_get_the_extra_buffer() {
        let one_eth = to_base_units(1.0, 18);
        let fifty_eth = to_base_units(50.0, 18);
        assert_eq!(wrap_ratio_bps("weETH", one_eth), 8_400);
        assert_eq!(wrap_ratio_bps("weETH", fifty_eth), 8_500);
        assert_eq!(wrap_ratio_bps("wstETH", one_eth), 7_800);
        assert_eq!(wrap_ratio_bps("wstETH", fifty_eth), 7_900);
    }
}
