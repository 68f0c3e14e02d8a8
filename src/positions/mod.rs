pub mod adapters;
pub mod cache;
pub mod indexer;

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::model::{Position, ProtocolId};
use crate::registry::PriceBook;
use crate::rpc::{ChainClient, RpcError};

pub use cache::PositionCache;
pub use indexer::{GraphClient, Indexer};

#[derive(Debug, Clone, Error)]
pub enum ReadError {
    #[error("position read failed for {protocol} on chain {chain_id}: {reason}")]
    PositionReadFailed {
        protocol: ProtocolId,
        chain_id: u64,
        reason: String,
    },

    #[error("indexer request failed: {0}")]
    IndexerUnavailable(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl ReadError {
    pub fn failed(protocol: ProtocolId, chain_id: u64, reason: impl Into<String>) -> Self {
        ReadError::PositionReadFailed {
            protocol,
            chain_id,
            reason: reason.into(),
        }
    }
}

/// Shared dependencies handed to every adapter.
///
/// `prefer_indexer` switches an adapter to its subgraph path where one
/// exists; the RPC path remains the fallback either way.
#[derive(Clone)]
pub struct AdapterContext {
    pub client: Arc<dyn ChainClient>,
    pub indexer: Option<Arc<dyn Indexer>>,
    pub prefer_indexer: bool,
    pub prices: PriceBook,
}

impl AdapterContext {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        AdapterContext {
            client,
            indexer: None,
            prefer_indexer: false,
            prices: PriceBook::with_defaults(),
        }
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn Indexer>, prefer: bool) -> Self {
        self.indexer = Some(indexer);
        self.prefer_indexer = prefer;
        self
    }
}

/// Uniform read contract every protocol adapter implements.
#[async_trait]
pub trait PositionReader: Send + Sync {
    fn protocol(&self) -> ProtocolId;

    fn supported_chains(&self) -> Vec<u64>;

    /// Read a wallet's positions on one chain. Per-asset failures degrade
    /// inside the adapter; a returned error means the whole read failed.
    async fn read_positions(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError>;

    /// Fan out over the adapter's supported chains, dropping failed chains.
    async fn read_all_positions(&self, wallet: Address) -> Vec<Position> {
        let mut out = Vec::new();
        for chain_id in self.supported_chains() {
            match self.read_positions(wallet, chain_id).await {
                Ok(mut positions) => out.append(&mut positions),
                Err(e) => {
                    warn!(protocol = %self.protocol(), chain_id, error = %e, "chain read dropped");
                }
            }
        }
        out
    }
}

/// The multi-protocol registry: exposes the union of all adapters with a
/// short-lived cache keyed by `(wallet, sorted chains)`.
pub struct PositionRegistry {
    readers: Vec<Arc<dyn PositionReader>>,
    cache: PositionCache,
}

impl PositionRegistry {
    pub fn new(readers: Vec<Arc<dyn PositionReader>>) -> Self {
        PositionRegistry {
            readers,
            cache: PositionCache::default(),
        }
    }

    /// All required adapters wired against the shared context.
    pub fn with_default_adapters(ctx: AdapterContext) -> Self {
        Self::new(vec![
            Arc::new(adapters::aave_like::AaveLikeAdapter::aave_v3(ctx.clone())),
            Arc::new(adapters::aave_like::AaveLikeAdapter::spark(ctx.clone())),
            Arc::new(adapters::compound::CompoundAdapter::new(ctx.clone())),
            Arc::new(adapters::lido::LidoAdapter::new(ctx.clone())),
            Arc::new(adapters::etherfi::EtherFiAdapter::new(ctx.clone())),
            Arc::new(adapters::morpho::MorphoAdapter::new(ctx.clone())),
            Arc::new(adapters::pendle::PendleAdapter::new(ctx.clone())),
            Arc::new(adapters::eigenlayer::EigenLayerAdapter::new(ctx)),
        ])
    }

    pub fn readers(&self) -> &[Arc<dyn PositionReader>] {
        &self.readers
    }

    /// Union of all adapters over the requested chains. Reads run
    /// concurrently and settle independently; failures are dropped.
    /// Results are cached for about two minutes.
    pub async fn read_positions(&self, wallet: Address, chains: &[u64]) -> Vec<Position> {
        let key = PositionCache::key(wallet, chains);
        if let Some(hit) = self.cache.get(&key) {
            debug!(%wallet, "position cache hit");
            return hit;
        }

        let mut set: JoinSet<Result<Vec<Position>, ReadError>> = JoinSet::new();
        for reader in &self.readers {
            for &chain_id in chains {
                if !reader.supported_chains().contains(&chain_id) {
                    continue;
                }
                let reader = Arc::clone(reader);
                set.spawn(async move { reader.read_positions(wallet, chain_id).await });
            }
        }

        let mut positions = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(mut read)) => positions.append(&mut read),
                Ok(Err(e)) => warn!(error = %e, "position read dropped"),
                Err(e) => warn!(error = %e, "position read task failed"),
            }
        }

        // Settled order is nondeterministic; merge by key for stable output.
        positions.sort_by(|a, b| {
            (a.protocol.as_str(), a.chain_id, a.token.clone())
                .cmp(&(b.protocol.as_str(), b.chain_id, b.token.clone()))
        });

        self.cache.set(key, positions.clone());
        positions
    }

    /// Union across every chain any adapter supports.
    pub async fn read_all_positions(&self, wallet: Address) -> Vec<Position> {
        let mut chains: Vec<u64> = self
            .readers
            .iter()
            .flat_map(|r| r.supported_chains())
            .collect();
        chains.sort_unstable();
        chains.dedup();
        self.read_positions(wallet, &chains).await
    }
}
