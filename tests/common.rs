#![allow(dead_code)]

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use defi_workbench::abi::IMulticall3;
use defi_workbench::model::{BlockKind, ProtocolId, Strategy, StrategyBlock};
use defi_workbench::positions::{Indexer, ReadError};
use defi_workbench::registry;
use defi_workbench::rpc::{ChainClient, RpcError};

// ── Strategy fixtures ────────────────────────────────────────────────

pub fn input_block(amount: f64) -> StrategyBlock {
    StrategyBlock::new(
        "input",
        "ETH in",
        BlockKind::Input {
            asset: "ETH".to_string(),
            amount,
        },
    )
}

pub fn stake_block(id: &str, protocol: ProtocolId, out_asset: &str, apy: Option<f64>) -> StrategyBlock {
    StrategyBlock::new(
        id,
        format!("Stake via {protocol}"),
        BlockKind::Stake {
            protocol,
            in_asset: "ETH".to_string(),
            out_asset: out_asset.to_string(),
            apy,
            wrap: false,
        },
    )
}

pub fn lend_block(id: &str, liquidation_threshold: Option<f64>) -> StrategyBlock {
    StrategyBlock::new(
        id,
        "Supply to Aave",
        BlockKind::Lend {
            protocol: ProtocolId::AaveV3,
            chain_id: 1,
            asset: None,
            dynamic_asset: false,
            supply_apy: None,
            max_ltv: 80.0,
            liquidation_threshold,
        },
    )
}

pub fn borrow_block(id: &str, asset: &str, ltv_percent: f64, borrow_apy: Option<f64>) -> StrategyBlock {
    StrategyBlock::new(
        id,
        "Borrow",
        BlockKind::Borrow {
            protocol: ProtocolId::AaveV3,
            asset: asset.to_string(),
            ltv_percent,
            borrow_apy,
        },
    )
}

/// S1: `Input{ETH, 1} → Stake{etherfi, apy=3.2}`.
pub fn conservative_lst_strategy() -> Strategy {
    let mut strategy = Strategy::new();
    strategy.add_block(input_block(1.0));
    strategy.add_block(stake_block("stake", ProtocolId::EtherFi, "eETH", Some(3.2)));
    strategy.connect("input", "stake", 100.0);
    strategy
}

/// S2: `Input{ETH, 1} → Stake{etherfi} → Lend{aave-v3, chain=1}`.
pub fn lst_lend_strategy() -> Strategy {
    let mut strategy = conservative_lst_strategy();
    strategy.add_block(lend_block("lend", Some(0.75)));
    strategy.connect("stake", "lend", 100.0);
    strategy
}

/// `Input → Stake → Lend → Borrow` with explicit rates for roundtrip checks.
pub fn borrow_strategy(ltv_percent: f64) -> Strategy {
    let mut strategy = Strategy::new();
    strategy.add_block(input_block(1.0));
    strategy.add_block(stake_block("stake", ProtocolId::Lido, "stETH", Some(3.0)));
    let mut lend = lend_block("lend", Some(0.75));
    if let BlockKind::Lend {
        asset, supply_apy, ..
    } = &mut lend.kind
    {
        *asset = Some("wstETH".to_string());
        *supply_apy = Some(1.0);
    }
    strategy.add_block(lend);
    strategy.add_block(borrow_block("borrow", "WETH", ltv_percent, Some(2.0)));
    strategy.connect("input", "stake", 100.0);
    strategy.connect("stake", "lend", 100.0);
    strategy.connect("lend", "borrow", 100.0);
    strategy
}

/// A stake/lend/borrow cycle: the borrow refeeds the stake.
pub fn leverage_loop_strategy() -> Strategy {
    let mut strategy = borrow_strategy(70.0);
    strategy.connect("borrow", "stake", 100.0);
    strategy
}

// ── Fake chain client ────────────────────────────────────────────────

/// In-memory `ChainClient`. Sub-calls routed through Multicall3 are
/// decoded and answered individually, so adapters exercise their real
/// batching path. Lookup order: exact `(target, calldata)`, then
/// `(target, selector)`, then failure.
#[derive(Default)]
pub struct FakeChainClient {
    exact: HashMap<(Address, Bytes), Bytes>,
    by_selector: HashMap<(Address, [u8; 4]), Bytes>,
}

impl FakeChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_exact(mut self, target: Address, calldata: Vec<u8>, ret: Vec<u8>) -> Self {
        self.exact.insert((target, calldata.into()), ret.into());
        self
    }

    pub fn respond_selector(mut self, target: Address, selector: [u8; 4], ret: Vec<u8>) -> Self {
        self.by_selector.insert((target, selector), ret.into());
        self
    }

    fn lookup(&self, target: Address, data: &[u8]) -> Option<Bytes> {
        if let Some(ret) = self.exact.get(&(target, Bytes::from(data.to_vec()))) {
            return Some(ret.clone());
        }
        if data.len() >= 4 {
            let selector: [u8; 4] = data[..4].try_into().unwrap();
            if let Some(ret) = self.by_selector.get(&(target, selector)) {
                return Some(ret.clone());
            }
        }
        None
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn call(&self, _chain_id: u64, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        if to == registry::multicall3() {
            let decoded = IMulticall3::aggregate3Call::abi_decode(&data)
                .map_err(|e| RpcError::Decode(e.to_string()))?;
            let results: Vec<IMulticall3::Result> = decoded
                .calls
                .iter()
                .map(|call| match self.lookup(call.target, &call.callData) {
                    Some(ret) => IMulticall3::Result {
                        success: true,
                        returnData: ret,
                    },
                    None => IMulticall3::Result {
                        success: false,
                        returnData: Bytes::new(),
                    },
                })
                .collect();
            return Ok(results.abi_encode().into());
        }

        self.lookup(to, &data)
            .ok_or_else(|| RpcError::Transport(format!("no canned response for {to}")))
    }
}

/// Encode a `uint256` return word.
pub fn ret_u256(value: U256) -> Vec<u8> {
    value.abi_encode()
}

/// Encode an Aave `getUserReserveData` nine-tuple return.
pub fn ret_user_reserve(
    atoken_balance: U256,
    stable_debt: U256,
    variable_debt: U256,
    liquidity_rate_ray: U256,
    usage_as_collateral: bool,
) -> Vec<u8> {
    (
        atoken_balance,
        stable_debt,
        variable_debt,
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
        liquidity_rate_ray,
        0u64,
        usage_as_collateral,
    )
        .abi_encode()
}

/// Encode an Aave `getReserveConfigurationData` ten-tuple return.
/// Threshold is in basis points, as on chain.
pub fn ret_reserve_config(liquidation_threshold_bps: u64) -> Vec<u8> {
    (
        U256::from(18u64),
        U256::from(8_000u64),
        U256::from(liquidation_threshold_bps),
        U256::from(10_500u64),
        U256::from(1_000u64),
        true,
        true,
        false,
        true,
        false,
    )
        .abi_encode()
}

pub fn selector<C: SolCall>() -> [u8; 4] {
    C::SELECTOR
}

// ── Fake indexer ─────────────────────────────────────────────────────

/// Indexer stub: either a canned response or a forced failure.
pub struct FakeIndexer {
    response: Option<serde_json::Value>,
}

impl FakeIndexer {
    pub fn returning(response: serde_json::Value) -> Self {
        FakeIndexer {
            response: Some(response),
        }
    }

    pub fn failing() -> Self {
        FakeIndexer { response: None }
    }
}

#[async_trait]
impl Indexer for FakeIndexer {
    async fn request(
        &self,
        _subgraph_id: &str,
        _query: &str,
        _variables: serde_json::Value,
    ) -> Result<serde_json::Value, ReadError> {
        match &self.response {
            Some(value) => Ok(value.clone()),
            None => Err(ReadError::IndexerUnavailable("stubbed outage".to_string())),
        }
    }
}
