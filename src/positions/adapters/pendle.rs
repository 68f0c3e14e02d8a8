//! Pendle adapter: principal-token balances for a configured market list.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::json;

use crate::abi::IERC20;
use crate::model::units::from_base_units;
use crate::model::{Position, PositionKind, ProtocolId};
use crate::registry;
use crate::rpc::try_aggregate;

use super::super::{AdapterContext, PositionReader, ReadError};

/// A tracked Pendle market: the PT token and the underlying it redeems to.
#[derive(Debug, Clone)]
pub struct PendleMarket {
    pub chain_id: u64,
    pub pt_token: Address,
    pub symbol: String,
    pub underlying: String,
}

pub struct PendleAdapter {
    ctx: AdapterContext,
    markets: Vec<PendleMarket>,
}

impl PendleAdapter {
    /// Default market list; callers with fresher listings inject their own
    /// via [`PendleAdapter::with_markets`].
    pub fn new(ctx: AdapterContext) -> Self {
        let markets = vec![PendleMarket {
            chain_id: 1,
            pt_token: "0xc69Ad9baB1dEE23F4605a82b3354F8E40d1E5966"
                .parse()
                .unwrap(),
            symbol: "PT-weETH".to_string(),
            underlying: "weETH".to_string(),
        }];
        Self::with_markets(ctx, markets)
    }

    pub fn with_markets(ctx: AdapterContext, markets: Vec<PendleMarket>) -> Self {
        PendleAdapter { ctx, markets }
    }
}

#[async_trait]
impl PositionReader for PendleAdapter {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Pendle
    }

    fn supported_chains(&self) -> Vec<u64> {
        registry::protocol(ProtocolId::Pendle)
            .supported_chains
            .to_vec()
    }

    async fn read_positions(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        let markets: Vec<&PendleMarket> = self
            .markets
            .iter()
            .filter(|m| m.chain_id == chain_id)
            .collect();
        if markets.is_empty() {
            return Ok(Vec::new());
        }

        let calls: Vec<(Address, Bytes)> = markets
            .iter()
            .map(|m| {
                (
                    m.pt_token,
                    IERC20::balanceOfCall { account: wallet }.abi_encode().into(),
                )
            })
            .collect();
        let results = try_aggregate(self.ctx.client.as_ref(), chain_id, &calls).await?;

        let mut positions = Vec::new();
        for (market, slot) in markets.iter().zip(results) {
            let balance_raw = slot
                .and_then(|bytes| IERC20::balanceOfCall::abi_decode_returns(&bytes).ok())
                .unwrap_or(U256::ZERO);
            if balance_raw == U256::ZERO {
                continue;
            }
            let balance = from_base_units(balance_raw, 18);
            let mut metadata = serde_json::Map::new();
            metadata.insert("underlying".to_string(), json!(market.underlying));

            positions.push(Position {
                protocol: ProtocolId::Pendle,
                chain_id,
                kind: PositionKind::Vault,
                token: market.symbol.clone(),
                balance_raw,
                balance,
                // PT trades below the underlying until maturity; its
                // underlying price is the upper bound used here.
                balance_usd: self
                    .ctx
                    .prices
                    .price(&market.underlying)
                    .map(|p| balance * p),
                apy: None,
                rewards: Vec::new(),
                metadata,
            });
        }
        Ok(positions)
    }
}
