mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::json;

use defi_workbench::abi::IPoolDataProvider;
use defi_workbench::model::{Position, PositionKind, ProtocolId};
use defi_workbench::positions::adapters::AaveLikeAdapter;
use defi_workbench::positions::{
    AdapterContext, PositionReader, PositionRegistry, ReadError,
};
use defi_workbench::registry;

use common::*;

fn wallet() -> Address {
    "0x000000000000000000000000000000000000bEEF"
        .parse()
        .unwrap()
}

/// RAY-scaled 2.5% annual liquidity rate.
fn liquidity_rate_2_5_pct() -> U256 {
    U256::from(25u128) * U256::from(10u128).pow(U256::from(24u64))
}

fn rpc_client_with_weth_supply() -> FakeChainClient {
    let provider = registry::contract(1, "aave-v3-data-provider").unwrap();
    let weth = registry::token_address(1, "WETH").unwrap();

    FakeChainClient::new()
        .respond_exact(
            provider,
            IPoolDataProvider::getUserReserveDataCall {
                asset: weth,
                user: wallet(),
            }
            .abi_encode(),
            ret_user_reserve(
                U256::from(2u128 * 10u128.pow(18)), // 2 aWETH
                U256::ZERO,
                U256::from(10u128.pow(18)), // 1 WETH variable debt
                liquidity_rate_2_5_pct(),
                true,
            ),
        )
        .respond_exact(
            provider,
            IPoolDataProvider::getReserveConfigurationDataCall { asset: weth }.abi_encode(),
            ret_reserve_config(8_000),
        )
        // Every other reserve reads as empty.
        .respond_selector(
            provider,
            selector::<IPoolDataProvider::getUserReserveDataCall>(),
            ret_user_reserve(U256::ZERO, U256::ZERO, U256::ZERO, U256::ZERO, false),
        )
        .respond_selector(
            provider,
            selector::<IPoolDataProvider::getReserveConfigurationDataCall>(),
            ret_reserve_config(8_000),
        )
}

// ── RPC path ─────────────────────────────────────────────────────────

#[tokio::test]
async fn aave_rpc_path_reads_supply_and_debt() {
    let ctx = AdapterContext::new(Arc::new(rpc_client_with_weth_supply()));
    let adapter = AaveLikeAdapter::aave_v3(ctx);

    let positions = adapter.read_positions(wallet(), 1).await.unwrap();
    assert_eq!(positions.len(), 2);

    let supply = positions
        .iter()
        .find(|p| p.kind == PositionKind::Supply)
        .unwrap();
    assert_eq!(supply.token, "WETH");
    assert!((supply.balance - 2.0).abs() < 1e-9);
    assert_eq!(supply.balance_usd, Some(6_000.0));
    // liquidityRate 2.5e25 RAY -> 2.5%.
    assert!((supply.apy.unwrap() - 2.5).abs() < 1e-9);
    assert_eq!(
        supply.metadata.get("liquidation_threshold").unwrap().as_f64(),
        Some(0.8)
    );

    let borrow = positions
        .iter()
        .find(|p| p.kind == PositionKind::Borrow)
        .unwrap();
    assert!((borrow.balance - 1.0).abs() < 1e-9);
}

// ── Indexer path + fallback contract ─────────────────────────────────

fn subgraph_body() -> serde_json::Value {
    json!({
        "userReserves": [{
            "currentATokenBalance": "3000000000000000000",
            "currentTotalDebt": "0",
            "reserve": {
                "symbol": "WSTETH",
                "decimals": 18,
                "liquidityRate": "10000000000000000000000000",
                "reserveLiquidationThreshold": "7500",
                "usageAsCollateralEnabled": true
            }
        }]
    })
}

#[tokio::test]
async fn indexer_path_is_preferred_when_enabled() {
    // RPC client would fail loudly; the indexer must answer first.
    let ctx = AdapterContext::new(Arc::new(FakeChainClient::new()))
        .with_indexer(Arc::new(FakeIndexer::returning(subgraph_body())), true);
    let adapter = AaveLikeAdapter::aave_v3(ctx);

    let positions = adapter.read_positions(wallet(), 1).await.unwrap();
    assert_eq!(positions.len(), 1);
    let supply = &positions[0];
    assert_eq!(supply.token, "WSTETH");
    assert!((supply.balance - 3.0).abs() < 1e-9);
    // 1e25 RAY -> 1%.
    assert!((supply.apy.unwrap() - 1.0).abs() < 1e-9);
    // 7500 bps normalised to a fraction.
    assert_eq!(
        supply.metadata.get("liquidation_threshold").unwrap().as_f64(),
        Some(0.75)
    );
}

#[tokio::test]
async fn indexer_failure_falls_back_to_rpc() {
    let ctx = AdapterContext::new(Arc::new(rpc_client_with_weth_supply()))
        .with_indexer(Arc::new(FakeIndexer::failing()), true);
    let adapter = AaveLikeAdapter::aave_v3(ctx);

    let positions = adapter.read_positions(wallet(), 1).await.unwrap();
    assert_eq!(positions.len(), 2);
    assert!(positions.iter().any(|p| p.token == "WETH"));
}

#[tokio::test]
async fn schema_mismatch_falls_back_to_rpc() {
    let ctx = AdapterContext::new(Arc::new(rpc_client_with_weth_supply())).with_indexer(
        Arc::new(FakeIndexer::returning(json!({"unexpected": "shape"}))),
        true,
    );
    let adapter = AaveLikeAdapter::aave_v3(ctx);

    let positions = adapter.read_positions(wallet(), 1).await.unwrap();
    assert!(!positions.is_empty());
}

// ── Registry: fan-out, union, cache ──────────────────────────────────

struct CountingReader {
    calls: AtomicU32,
}

#[async_trait]
impl PositionReader for CountingReader {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Lido
    }

    fn supported_chains(&self) -> Vec<u64> {
        vec![1]
    }

    async fn read_positions(
        &self,
        _wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Position {
            protocol: ProtocolId::Lido,
            chain_id,
            kind: PositionKind::Stake,
            token: "stETH".to_string(),
            balance_raw: U256::from(10u128.pow(18)),
            balance: 1.0,
            balance_usd: Some(3_000.0),
            apy: Some(3.1),
            rewards: Vec::new(),
            metadata: serde_json::Map::new(),
        }])
    }
}

struct FailingReader;

#[async_trait]
impl PositionReader for FailingReader {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Pendle
    }

    fn supported_chains(&self) -> Vec<u64> {
        vec![1]
    }

    async fn read_positions(
        &self,
        _wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        Err(ReadError::failed(ProtocolId::Pendle, chain_id, "boom"))
    }
}

#[tokio::test]
async fn registry_unions_and_drops_failures() {
    let counting = Arc::new(CountingReader {
        calls: AtomicU32::new(0),
    });
    let registry = PositionRegistry::new(vec![counting.clone(), Arc::new(FailingReader)]);

    let positions = registry.read_positions(wallet(), &[1, 8453]).await;
    // The failing reader is dropped, the good one contributes.
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].token, "stETH");
    // Chain 8453 is unsupported by both readers: one call total.
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn registry_caches_by_wallet_and_chain_set() {
    let counting = Arc::new(CountingReader {
        calls: AtomicU32::new(0),
    });
    let registry = PositionRegistry::new(vec![counting.clone()]);

    let first = registry.read_positions(wallet(), &[1]).await;
    let second = registry.read_positions(wallet(), &[1]).await;
    assert_eq!(first, second);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    // A different chain set is a different key.
    registry.read_positions(wallet(), &[1, 8453]).await;
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
}
