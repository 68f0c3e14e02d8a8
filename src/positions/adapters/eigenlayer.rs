//! EigenLayer adapter: restaked strategy shares via the strategy manager.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use crate::abi::IStrategyManager;
use crate::model::units::from_base_units;
use crate::model::{Position, PositionKind, ProtocolId};
use crate::registry;
use crate::registry::apy::fallback_stake_apy;
use crate::rpc::try_aggregate;

use super::super::{AdapterContext, PositionReader, ReadError};

/// Tracked strategies: `(registry key, receipt symbol)`.
const STRATEGIES: &[(&str, &str)] = &[("eigenlayer-strategy-steth", "stETH")];

pub struct EigenLayerAdapter {
    ctx: AdapterContext,
}

impl EigenLayerAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        EigenLayerAdapter { ctx }
    }
}

#[async_trait]
impl PositionReader for EigenLayerAdapter {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::EigenLayer
    }

    fn supported_chains(&self) -> Vec<u64> {
        registry::protocol(ProtocolId::EigenLayer)
            .supported_chains
            .to_vec()
    }

    async fn read_positions(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        let Some(manager) = registry::contract(chain_id, "eigenlayer-strategy-manager") else {
            return Ok(Vec::new());
        };

        let mut calls: Vec<(Address, Bytes)> = Vec::new();
        let mut resolved: Vec<&str> = Vec::new();
        for (key, symbol) in STRATEGIES {
            let Some(strategy) = registry::contract(chain_id, key) else {
                continue;
            };
            resolved.push(symbol);
            calls.push((
                manager,
                IStrategyManager::stakerStrategySharesCall {
                    staker: wallet,
                    strategy,
                }
                .abi_encode()
                .into(),
            ));
        }
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let results = try_aggregate(self.ctx.client.as_ref(), chain_id, &calls).await?;

        let mut positions = Vec::new();
        for (symbol, slot) in resolved.iter().zip(results) {
            let shares = slot
                .and_then(|bytes| {
                    IStrategyManager::stakerStrategySharesCall::abi_decode_returns(&bytes).ok()
                })
                .unwrap_or(U256::ZERO);
            if shares == U256::ZERO {
                continue;
            }
            // Strategy shares track the underlying receipt 1:1 closely
            // enough for dashboard display.
            let balance = from_base_units(shares, 18);
            positions.push(Position {
                protocol: ProtocolId::EigenLayer,
                chain_id,
                kind: PositionKind::Stake,
                token: symbol.to_string(),
                balance_raw: shares,
                balance,
                balance_usd: self.ctx.prices.price(symbol).map(|p| balance * p),
                apy: Some(fallback_stake_apy(ProtocolId::EigenLayer)),
                rewards: Vec::new(),
                metadata: serde_json::Map::new(),
            });
        }
        Ok(positions)
    }
}
