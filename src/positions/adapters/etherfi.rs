//! EtherFi adapter: eETH and weETH balances on mainnet.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::model::{Position, ProtocolId};
use crate::registry;
use crate::registry::apy::fallback_stake_apy;

use super::super::{AdapterContext, PositionReader, ReadError};
use super::lido::read_balance_positions;

const TRACKED_TOKENS: &[&str] = &["eETH", "weETH"];

pub struct EtherFiAdapter {
    ctx: AdapterContext,
}

impl EtherFiAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        EtherFiAdapter { ctx }
    }
}

#[async_trait]
impl PositionReader for EtherFiAdapter {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::EtherFi
    }

    fn supported_chains(&self) -> Vec<u64> {
        registry::protocol(ProtocolId::EtherFi)
            .supported_chains
            .to_vec()
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
            ProtocolId::EtherFi,
            TRACKED_TOKENS,
            fallback_stake_apy(ProtocolId::EtherFi),
        )
        .await
    }
}
