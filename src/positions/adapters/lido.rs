//! Lido adapter: stETH and wstETH balances on mainnet.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use crate::abi::IERC20;
use crate::model::units::from_base_units;
use crate::model::{Position, PositionKind, ProtocolId};
use crate::registry;
use crate::registry::apy::fallback_stake_apy;
use crate::rpc::try_aggregate;

use super::super::{AdapterContext, PositionReader, ReadError};

const TRACKED_TOKENS: &[&str] = &["stETH", "wstETH"];

pub struct LidoAdapter {
    ctx: AdapterContext,
}

impl LidoAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        LidoAdapter { ctx }
    }
}

#[async_trait]
impl PositionReader for LidoAdapter {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Lido
    }

    fn supported_chains(&self) -> Vec<u64> {
        registry::protocol(ProtocolId::Lido).supported_chains.to_vec()
    }

    async fn read_positions(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        read_balance_positions(
            &self.ctx,
            wallet,
            chain_id,
            ProtocolId::Lido,
            TRACKED_TOKENS,
            fallback_stake_apy(ProtocolId::Lido),
        )
        .await
    }
}

/// Shared balance-scan used by the staking-receipt adapters: one multicall
/// of `balanceOf` over the tracked tokens, non-zero balances become stake
/// positions.
pub(super) async fn read_balance_positions(
    ctx: &AdapterContext,
    wallet: Address,
    chain_id: u64,
    protocol: ProtocolId,
    tokens: &[&str],
    apy: f64,
) -> Result<Vec<Position>, ReadError> {
    let mut calls: Vec<(Address, Bytes)> = Vec::new();
    let mut resolved: Vec<(&str, Address)> = Vec::new();
    for symbol in tokens {
        let Some(token) = registry::token_address(chain_id, symbol) else {
            continue;
        };
        resolved.push((symbol, token));
        calls.push((
            token,
            IERC20::balanceOfCall { account: wallet }.abi_encode().into(),
        ));
    }
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let results = try_aggregate(ctx.client.as_ref(), chain_id, &calls).await?;

    let mut positions = Vec::new();
    for ((symbol, _), slot) in resolved.iter().zip(results) {
        let balance_raw = slot
            .and_then(|bytes| IERC20::balanceOfCall::abi_decode_returns(&bytes).ok())
            .unwrap_or(U256::ZERO);
        if balance_raw == U256::ZERO {
            continue;
        }
        let decimals = registry::token_decimals(symbol);
        let balance = from_base_units(balance_raw, decimals);
        positions.push(Position {
            protocol,
            chain_id,
            kind: PositionKind::Stake,
            token: symbol.to_string(),
            balance_raw,
            balance,
            balance_usd: ctx.prices.price(symbol).map(|p| balance * p),
            apy: Some(apy),
            rewards: Vec::new(),
            metadata: serde_json::Map::new(),
        });
    }
    Ok(positions)
}
