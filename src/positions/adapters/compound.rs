//! Compound v3 (comet) adapter. Each comet holds one base asset; supply
//! and borrow balances are direct reads, the supply rate is per-second
//! scaled by 1e18.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::debug;

use crate::abi::IComet;
use crate::model::units::from_base_units;
use crate::model::{Position, PositionKind, ProtocolId};
use crate::registry;
use crate::registry::apy::fallback_borrow_apy;
use crate::rpc::try_aggregate;

use super::super::{AdapterContext, PositionReader, ReadError};

const SECONDS_PER_YEAR: f64 = 31_536_000.0;

/// Comet deployments: `(chain, registry key, base asset)`.
const COMETS: &[(u64, &str, &str)] = &[
    (1, "compound-v3-cusdcv3", "USDC"),
    (1, "compound-v3-cwethv3", "WETH"),
    (8453, "compound-v3-cusdcv3", "USDC"),
    (42161, "compound-v3-cusdcv3", "USDC"),
];

pub struct CompoundAdapter {
    ctx: AdapterContext,
}

impl CompoundAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        CompoundAdapter { ctx }
    }

    async fn read_comet(
        &self,
        wallet: Address,
        chain_id: u64,
        comet: Address,
        base_asset: &str,
    ) -> Result<Vec<Position>, ReadError> {
        let calls: Vec<(Address, Bytes)> = vec![
            (comet, IComet::balanceOfCall { account: wallet }.abi_encode().into()),
            (
                comet,
                IComet::borrowBalanceOfCall { account: wallet }.abi_encode().into(),
            ),
            (comet, IComet::getUtilizationCall {}.abi_encode().into()),
        ];
        let results = try_aggregate(self.ctx.client.as_ref(), chain_id, &calls).await?;

        let supply_raw = decode_u256::<IComet::balanceOfCall>(results.first());
        let borrow_raw = decode_u256::<IComet::borrowBalanceOfCall>(results.get(1));
        if supply_raw == U256::ZERO && borrow_raw == U256::ZERO {
            return Ok(Vec::new());
        }

        // Supply rate needs the current utilization, so it is a second
        // dependent read rather than part of the batch.
        let supply_apy = match results.get(2).and_then(|r| r.as_ref()) {
            Some(bytes) => {
                let utilization = IComet::getUtilizationCall::abi_decode_returns(bytes)
                    .unwrap_or(U256::ZERO);
                self.read_supply_apy(chain_id, comet, utilization).await
            }
            None => None,
        };

        let decimals = registry::token_decimals(base_asset);
        let price = self.ctx.prices.price(base_asset);
        let mut positions = Vec::new();

        if supply_raw > U256::ZERO {
            let balance = from_base_units(supply_raw, decimals);
            positions.push(Position {
                protocol: ProtocolId::CompoundV3,
                chain_id,
                kind: PositionKind::Supply,
                token: base_asset.to_string(),
                balance_raw: supply_raw,
                balance,
                balance_usd: price.map(|p| balance * p),
                apy: supply_apy,
                rewards: Vec::new(),
                metadata: serde_json::Map::new(),
            });
        }
        if borrow_raw > U256::ZERO {
            let balance = from_base_units(borrow_raw, decimals);
            positions.push(Position {
                protocol: ProtocolId::CompoundV3,
                chain_id,
                kind: PositionKind::Borrow,
                token: base_asset.to_string(),
                balance_raw: borrow_raw,
                balance,
                balance_usd: price.map(|p| balance * p),
                apy: Some(fallback_borrow_apy(ProtocolId::CompoundV3, base_asset)),
                rewards: Vec::new(),
                metadata: serde_json::Map::new(),
            });
        }
        Ok(positions)
    }

    async fn read_supply_apy(
        &self,
        chain_id: u64,
        comet: Address,
        utilization: U256,
    ) -> Option<f64> {
        let data = IComet::getSupplyRateCall { utilization }.abi_encode();
        let raw = match self.ctx.client.call(chain_id, comet, data.into()).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(chain_id, error = %e, "comet supply rate read skipped");
                return None;
            }
        };
        let rate = IComet::getSupplyRateCall::abi_decode_returns(&raw).ok()?;
        // Per-second rate scaled by 1e18, annualised here.
        Some(rate as f64 / 1e18 * SECONDS_PER_YEAR * 100.0)
    }
}

fn decode_u256<C>(slot: Option<&Option<Bytes>>) -> U256
where
    C: SolCall<Return = U256>,
{
    slot.and_then(|r| r.as_ref())
        .and_then(|bytes| C::abi_decode_returns(bytes).ok())
        .unwrap_or(U256::ZERO)
}

#[async_trait]
impl PositionReader for CompoundAdapter {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::CompoundV3
    }

    fn supported_chains(&self) -> Vec<u64> {
        registry::protocol(ProtocolId::CompoundV3)
            .supported_chains
            .to_vec()
    }

    async fn read_positions(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        let mut positions = Vec::new();
        for (comet_chain, key, base_asset) in COMETS {
            if *comet_chain != chain_id {
                continue;
            }
            let Some(comet) = registry::contract(chain_id, key) else {
                continue;
            };
            let mut read = self.read_comet(wallet, chain_id, comet, base_asset).await?;
            positions.append(&mut read);
        }
        Ok(positions)
    }
}
