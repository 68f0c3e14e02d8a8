use alloy::primitives::Address;
use std::sync::LazyLock;

use crate::config::Settings;

/// Multicall3 is deployed at the same address on every supported chain.
pub const MULTICALL3_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

pub fn multicall3() -> Address {
    static ADDR: LazyLock<Address> =
        LazyLock::new(|| MULTICALL3_ADDRESS.parse::<Address>().unwrap());
    *ADDR
}

/// A supported chain.
#[derive(Debug, Clone)]
pub struct ChainSpec {
    pub id: u64,
    pub name: &'static str,
    /// Wrapped-native token (WETH) address.
    pub wrapped_native: Address,
    pub multicall: Address,
}

static CHAINS: LazyLock<Vec<ChainSpec>> = LazyLock::new(|| {
    let spec = |id, name, weth: &str| ChainSpec {
        id,
        name,
        wrapped_native: weth.parse::<Address>().unwrap(),
        multicall: multicall3(),
    };
    vec![
        spec(1, "ethereum", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
        spec(10, "optimism", "0x4200000000000000000000000000000000000006"),
        spec(8453, "base", "0x4200000000000000000000000000000000000006"),
        spec(42161, "arbitrum", "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
    ]
});

pub fn chain(id: u64) -> Option<&'static ChainSpec> {
    CHAINS.iter().find(|c| c.id == id)
}

pub fn supported_chain_ids() -> Vec<u64> {
    CHAINS.iter().map(|c| c.id).collect()
}

/// RPC endpoints for a chain, most preferred first: explicit env override,
/// then a keyed Alchemy endpoint, then public endpoints.
pub fn rpc_urls(chain_id: u64, settings: &Settings) -> Vec<String> {
    let mut urls = Vec::new();

    if let Some(url) = settings.rpc_overrides.get(&chain_id) {
        urls.push(url.clone());
    }

    if let Some(key) = &settings.alchemy_api_key {
        let host = match chain_id {
            1 => Some("eth-mainnet"),
            10 => Some("opt-mainnet"),
            8453 => Some("base-mainnet"),
            42161 => Some("arb-mainnet"),
            _ => None,
        };
        if let Some(host) = host {
            urls.push(format!("https://{host}.g.alchemy.com/v2/{key}"));
        }
    }

    let public: &[&str] = match chain_id {
        1 => &["https://eth.llamarpc.com", "https://rpc.ankr.com/eth"],
        10 => &["https://mainnet.optimism.io"],
        8453 => &["https://mainnet.base.org"],
        42161 => &["https://arb1.arbitrum.io/rpc"],
        _ => &[],
    };
    urls.extend(public.iter().map(|s| s.to_string()));

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multicall_shared_across_chains() {
        for id in supported_chain_ids() {
            assert_eq!(chain(id).unwrap().multicall, multicall3());
        }
    }

    #[test]
    fn override_comes_first() {
        let mut settings = Settings::default();
        settings
            .rpc_overrides
            .insert(1, "http://localhost:8545".to_string());
        let urls = rpc_urls(1, &settings);
        assert_eq!(urls[0], "http://localhost:8545");
        assert!(urls.len() > 1);
    }
}
