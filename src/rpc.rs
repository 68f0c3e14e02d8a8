//! Chain read transport. All on-chain reads go through [`ChainClient`] so
//! the approval checker, position adapters and liquidation aggregator can
//! run against a fake client in tests.

use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::abi::IMulticall3;
use crate::config::Settings;
use crate::registry;

/// Per-call timeout for chain RPC reads.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("unsupported chain {0}")]
    UnsupportedChain(u64),

    #[error("rpc transport failed: {0}")]
    Transport(String),

    #[error("rpc call timed out after {0:?}")]
    Timeout(Duration),

    #[error("abi decode failed: {0}")]
    Decode(String),
}

/// A read-only `eth_call` transport for one or more chains.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn call(&self, chain_id: u64, to: Address, data: Bytes) -> Result<Bytes, RpcError>;
}

/// Issue a batch of reads as one Multicall3 `aggregate3` with
/// `allowFailure = true`: an individual sub-call failure yields `None`
/// for that slot instead of failing the batch.
pub async fn try_aggregate(
    client: &dyn ChainClient,
    chain_id: u64,
    calls: &[(Address, Bytes)],
) -> Result<Vec<Option<Bytes>>, RpcError> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let call3s: Vec<IMulticall3::Call3> = calls
        .iter()
        .map(|(target, data)| IMulticall3::Call3 {
            target: *target,
            allowFailure: true,
            callData: data.clone(),
        })
        .collect();

    let encoded = IMulticall3::aggregate3Call { calls: call3s }.abi_encode();
    let raw = client
        .call(chain_id, registry::multicall3(), encoded.into())
        .await?;

    let results = IMulticall3::aggregate3Call::abi_decode_returns(&raw)
        .map_err(|e| RpcError::Decode(e.to_string()))?;

    Ok(results
        .into_iter()
        .map(|r| r.success.then_some(r.returnData))
        .collect())
}

/// JSON-RPC `eth_call` client over HTTP, walking the chain's endpoint
/// fallback list (env override first, then keyed, then public).
pub struct HttpChainClient {
    http: reqwest::Client,
    settings: Settings,
    timeout: Duration,
}

impl HttpChainClient {
    pub fn new(settings: Settings) -> Self {
        HttpChainClient {
            http: reqwest::Client::new(),
            settings,
            timeout: RPC_TIMEOUT,
        }
    }

    async fn call_endpoint(
        &self,
        url: &str,
        to: Address,
        data: &Bytes,
    ) -> Result<Bytes, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{"to": format!("{to}"), "data": format!("{data}")}, "latest"],
        });

        let send = self.http.post(url).json(&body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| RpcError::Timeout(self.timeout))?
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if let Some(error) = payload.get("error") {
            return Err(RpcError::Transport(error.to_string()));
        }
        let result = payload
            .get("result")
            .and_then(|r| r.as_str())
            .ok_or_else(|| RpcError::Transport("missing result field".to_string()))?;
        result
            .parse::<Bytes>()
            .map_err(|e| RpcError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn call(&self, chain_id: u64, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        let urls = registry::rpc_urls(chain_id, &self.settings);
        if urls.is_empty() {
            return Err(RpcError::UnsupportedChain(chain_id));
        }

        let mut last_error = RpcError::UnsupportedChain(chain_id);
        for url in &urls {
            match self.call_endpoint(url, to, &data).await {
                Ok(bytes) => {
                    debug!(chain_id, url, "eth_call ok");
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(chain_id, url, error = %e, "eth_call failed, trying next endpoint");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
