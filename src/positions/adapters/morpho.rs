//! Morpho vault adapter (ERC-4626): share balance converted to underlying
//! assets via a dependent `convertToAssets` read.

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::debug;

use crate::abi::IErc4626;
use crate::model::units::from_base_units;
use crate::model::{Position, PositionKind, ProtocolId};
use crate::registry;
use crate::registry::apy::fallback_supply_apy;

use super::super::{AdapterContext, PositionReader, ReadError};

/// Tracked vaults: `(chain, registry key, underlying symbol)`.
const VAULTS: &[(u64, &str, &str)] = &[(1, "morpho-steakhouse-usdc-vault", "USDC")];

pub struct MorphoAdapter {
    ctx: AdapterContext,
}

impl MorphoAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        MorphoAdapter { ctx }
    }

    async fn read_vault(
        &self,
        wallet: Address,
        chain_id: u64,
        vault: Address,
        underlying: &str,
    ) -> Result<Option<Position>, ReadError> {
        let data = IErc4626::balanceOfCall { account: wallet }.abi_encode();
        let raw = self.ctx.client.call(chain_id, vault, data.into()).await?;
        let shares = IErc4626::balanceOfCall::abi_decode_returns(&raw)
            .map_err(|e| ReadError::failed(ProtocolId::Morpho, chain_id, e.to_string()))?;
        if shares == U256::ZERO {
            return Ok(None);
        }

        // Share price conversion is a dependent read; degrade to shares
        // when it fails rather than dropping the position.
        let assets = match self.read_assets(chain_id, vault, shares).await {
            Some(assets) => assets,
            None => shares,
        };

        let decimals = registry::token_decimals(underlying);
        let balance = from_base_units(assets, decimals);
        Ok(Some(Position {
            protocol: ProtocolId::Morpho,
            chain_id,
            kind: PositionKind::Vault,
            token: underlying.to_string(),
            balance_raw: assets,
            balance,
            balance_usd: self.ctx.prices.price(underlying).map(|p| balance * p),
            apy: Some(fallback_supply_apy(ProtocolId::Morpho, underlying)),
            rewards: Vec::new(),
            metadata: serde_json::Map::new(),
        }))
    }

    async fn read_assets(&self, chain_id: u64, vault: Address, shares: U256) -> Option<U256> {
        let data = IErc4626::convertToAssetsCall { shares }.abi_encode();
        match self.ctx.client.call(chain_id, vault, data.into()).await {
            Ok(raw) => IErc4626::convertToAssetsCall::abi_decode_returns(&raw).ok(),
            Err(e) => {
                debug!(chain_id, error = %e, "convertToAssets read skipped");
                None
            }
        }
    }
}

#[async_trait]
impl PositionReader for MorphoAdapter {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Morpho
    }

    fn supported_chains(&self) -> Vec<u64> {
        registry::protocol(ProtocolId::Morpho)
            .supported_chains
            .to_vec()
    }

    async fn read_positions(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        let mut positions = Vec::new();
        for (vault_chain, key, underlying) in VAULTS {
            if *vault_chain != chain_id {
                continue;
            }
            let Some(vault) = registry::contract(chain_id, key) else {
                continue;
            };
            if let Some(position) = self.read_vault(wallet, chain_id, vault, underlying).await? {
                positions.push(position);
            }
        }
        Ok(positions)
    }
}
