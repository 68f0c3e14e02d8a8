use std::sync::LazyLock;

use alloy::primitives::Address;

use crate::model::{ProtocolCategory, ProtocolId};

/// Registry descriptor for a protocol.
#[derive(Debug, Clone)]
pub struct Protocol {
    pub id: ProtocolId,
    pub category: ProtocolCategory,
    pub supported_chains: &'static [u64],
    /// 0 (safest) – 100. Feeds the simulator's risk score.
    pub risk_score: f64,
}

static PROTOCOLS: LazyLock<Vec<Protocol>> = LazyLock::new(|| {
    use ProtocolCategory::*;
    use ProtocolId::*;
    vec![
        Protocol { id: Lido, category: Staking, supported_chains: &[1], risk_score: 10.0 },
        Protocol { id: EtherFi, category: Restaking, supported_chains: &[1], risk_score: 15.0 },
        Protocol { id: AaveV3, category: Lending, supported_chains: &[1, 10, 8453, 42161], risk_score: 12.0 },
        Protocol { id: Spark, category: Lending, supported_chains: &[1], risk_score: 18.0 },
        Protocol { id: CompoundV3, category: Lending, supported_chains: &[1, 8453, 42161], risk_score: 12.0 },
        Protocol { id: Morpho, category: Yield, supported_chains: &[1, 8453], risk_score: 20.0 },
        Protocol { id: Pendle, category: Yield, supported_chains: &[1, 42161], risk_score: 35.0 },
        Protocol { id: EigenLayer, category: Restaking, supported_chains: &[1], risk_score: 30.0 },
        Protocol { id: UniswapV3, category: Dex, supported_chains: &[1, 10, 8453, 42161], risk_score: 8.0 },
    ]
});

pub fn protocol(id: ProtocolId) -> &'static Protocol {
    PROTOCOLS.iter().find(|p| p.id == id).expect("closed set")
}

pub fn risk_score(id: ProtocolId) -> f64 {
    protocol(id).risk_score
}

pub fn supports_chain(id: ProtocolId, chain_id: u64) -> bool {
    protocol(id).supported_chains.contains(&chain_id)
}

/// Protocol contract lookup, keyed by chain and a contract role name.
/// Same shape as the token registry: a closed match over known deployments.
pub fn contract(chain_id: u64, key: &str) -> Option<Address> {
    let addr = match (chain_id, key) {
        // ── Lido (Ethereum only) ──
        (1, "lido-steth") => "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84",
        (1, "lido-wsteth") => "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0",

        // ── EtherFi (Ethereum only) ──
        (1, "etherfi-liquidity-pool") => "0x308861A430be4cce5502d0A12724771Fc6DaF216",
        (1, "etherfi-eeth") => "0x35fA164735182de50811E8e2E824cFb9B6118ac2",
        (1, "etherfi-weeth") => "0xCd5fE23C85820F7B72D0926FC9b05b43E359b7ee",

        // ── Aave v3 ──
        (1, "aave-v3-pool") => "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2",
        (1, "aave-v3-data-provider") => "0x7B4EB56E7CD4b454BA8ff71E4518426369a138a3",
        (1, "aave-v3-rewards-controller") => "0x8164Cc65827dcFe994AB23944CBC90e0aa80bFcb",
        (10, "aave-v3-pool") => "0x794a61358D6845594F94dc1DB02A252b5b4814aD",
        (10, "aave-v3-data-provider") => "0x7F23D86Ee20D869112572136221e173428DD740B",
        (8453, "aave-v3-pool") => "0xA238Dd80C259a72e81d7e4664a9801593F98d1c5",
        (8453, "aave-v3-data-provider") => "0x793177a6Cf520C7fE5B2E45660EBB48132184BBC",
        (42161, "aave-v3-pool") => "0x794a61358D6845594F94dc1DB02A252b5b4814aD",
        (42161, "aave-v3-data-provider") => "0x7F23D86Ee20D869112572136221e173428DD740B",

        // ── Spark (Ethereum only) ──
        (1, "spark-pool") => "0xC13e21B648A5Ee794902342038FF3aDAB66BE987",
        (1, "spark-data-provider") => "0xFc21d6d146E6086B8359705C8b28512a983db0cb",

        // ── Compound v3 (base-asset comets) ──
        (1, "compound-v3-cusdcv3") => "0xc3d688B66703497DAA19211EEdff47f25384cdc3",
        (1, "compound-v3-cwethv3") => "0xA17581A9E3356d9A858b789D68B4d866e593aE94",
        (8453, "compound-v3-cusdcv3") => "0xb125E6687d4313864e53df431d5425969c15Eb2F",
        (42161, "compound-v3-cusdcv3") => "0x9c4ec768c28520B50860ea7a15bd7213a9fF58bf",

        // ── Morpho ──
        (1, "morpho-blue") => "0xBBBBBbbBBb9cC5e90e3b3Af64bdAF62C37EEFFCb",
        (1, "morpho-steakhouse-usdc-vault") => "0xBEEF01735c132Ada46AA9aA4c54623cAA92A64CB",

        // ── Pendle ──
        (1, "pendle-router") => "0x00000000005BBB0EF59571E58418F9a4357b68A0",
        (42161, "pendle-router") => "0x00000000005BBB0EF59571E58418F9a4357b68A0",

        // ── EigenLayer (Ethereum only) ──
        (1, "eigenlayer-strategy-manager") => "0x858646372CC42E1A627fcE94aa7A7033e7CF075A",
        (1, "eigenlayer-strategy-steth") => "0x93c4b944D05dfe6df7645A86cd2206016c51564D",

        // ── Uniswap v3 SwapRouter02 ──
        (1, "uniswap-v3-router") => "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45",
        (10, "uniswap-v3-router") => "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45",
        (8453, "uniswap-v3-router") => "0x2626664c2603336E57B271c5C0b26F421741e481",
        (42161, "uniswap-v3-router") => "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45",

        _ => return None,
    };
    Some(addr.parse::<Address>().unwrap())
}

/// Reserve assets the lending adapters enumerate per `(protocol, chain)`.
pub fn reserve_assets(id: ProtocolId, chain_id: u64) -> &'static [&'static str] {
    match (id, chain_id) {
        (ProtocolId::AaveV3, 1) => &["WETH", "WSTETH", "WEETH", "USDC", "USDT", "DAI", "WBTC"],
        (ProtocolId::AaveV3, 10) => &["WETH", "WSTETH", "USDC"],
        (ProtocolId::AaveV3, 8453) => &["WETH", "WSTETH", "WEETH", "USDC"],
        (ProtocolId::AaveV3, 42161) => &["WETH", "WSTETH", "WEETH", "USDC"],
        (ProtocolId::Spark, 1) => &["WETH", "WSTETH", "USDC", "DAI"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_set_has_descriptors() {
        for id in [
            ProtocolId::Lido,
            ProtocolId::EtherFi,
            ProtocolId::AaveV3,
            ProtocolId::Spark,
            ProtocolId::CompoundV3,
            ProtocolId::Morpho,
            ProtocolId::Pendle,
            ProtocolId::EigenLayer,
            ProtocolId::UniswapV3,
        ] {
            let p = protocol(id);
            assert!(p.risk_score >= 0.0 && p.risk_score <= 100.0);
            assert!(!p.supported_chains.is_empty());
        }
    }

    #[test]
    fn aave_pool_known_on_mainnet() {
        assert!(contract(1, "aave-v3-pool").is_some());
        assert!(contract(5000, "aave-v3-pool").is_none());
    }
}
