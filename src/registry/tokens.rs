use std::collections::HashMap;

use alloy::primitives::Address;

/// The chain-native coin is addressed by the zero sentinel.
pub fn native_sentinel() -> Address {
    Address::ZERO
}

pub fn is_native(symbol: &str) -> bool {
    symbol.eq_ignore_ascii_case("ETH")
}

/// Token address on a chain. The native coin resolves to the zero sentinel.
pub fn token_address(chain_id: u64, symbol: &str) -> Option<Address> {
    if is_native(symbol) {
        return Some(native_sentinel());
    }
    let key = (chain_id, symbol.to_uppercase());
    TOKEN_REGISTRY.get(&key).copied()
}

/// Full asset handle for a `(chain, symbol)` pair.
pub fn asset(chain_id: u64, symbol: &str) -> Option<crate::model::Asset> {
    Some(crate::model::Asset {
        symbol: symbol.to_string(),
        chain_id,
        address: token_address(chain_id, symbol)?,
        decimals: token_decimals(symbol),
        price_feed_id: None,
    })
}

pub fn token_decimals(symbol: &str) -> u8 {
    match symbol.to_uppercase().as_str() {
        "USDC" | "USDT" => 6,
        "WBTC" | "CBBTC" => 8,
        _ => 18,
    }
}

lazy_static_token_registry! {
    // ── Ethereum ──
    (1, "WETH") => "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
    (1, "STETH") => "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84",
    (1, "WSTETH") => "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0",
    (1, "EETH") => "0x35fA164735182de50811E8e2E824cFb9B6118ac2",
    (1, "WEETH") => "0xCd5fE23C85820F7B72D0926FC9b05b43E359b7ee",
    (1, "USDC") => "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
    (1, "USDT") => "0xdAC17F958D2ee523a2206206994597C13D831ec7",
    (1, "DAI") => "0x6B175474E89094C44Da98b954EedeAC495271d0F",
    (1, "WBTC") => "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599",

    // ── Optimism ──
    (10, "WETH") => "0x4200000000000000000000000000000000000006",
    (10, "WSTETH") => "0x1F32b1c2345538c0c6f582fCB022739c4A194Ebb",
    (10, "USDC") => "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85",

    // ── Base ──
    (8453, "WETH") => "0x4200000000000000000000000000000000000006",
    (8453, "WSTETH") => "0xc1CBa3fCea344f92D9239c08C0568f6F2F0ee452",
    (8453, "WEETH") => "0x04C0599Ae5A44757c0af6F9eC3b93da8976c150A",
    (8453, "USDC") => "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",

    // ── Arbitrum ──
    (42161, "WETH") => "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
    (42161, "WSTETH") => "0x5979D7b546E38E414F7E9822514be443A4800529",
    (42161, "WEETH") => "0x35751007a407ca6FEFfE80b3cB397736D2cf4dbe",
    (42161, "USDC") => "0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
}

// ── Token registry implementation ──────────────────────────────────

macro_rules! lazy_static_token_registry {
    ( $( ($chain:expr, $sym:expr) => $addr:expr ),* $(,)? ) => {
        fn build_token_registry() -> HashMap<(u64, String), Address> {
            let mut m = HashMap::new();
            $(
                m.insert(($chain, $sym.to_string()), $addr.parse::<Address>().unwrap());
            )*
            m
        }

        use std::sync::LazyLock;
        static TOKEN_REGISTRY: LazyLock<HashMap<(u64, String), Address>> =
            LazyLock::new(|| build_token_registry());
    };
}
use lazy_static_token_registry;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_resolves_to_zero_sentinel() {
        assert_eq!(token_address(1, "ETH"), Some(Address::ZERO));
        assert_eq!(token_address(42161, "eth"), Some(Address::ZERO));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(token_address(1, "steth"), token_address(1, "STETH"));
        assert!(token_address(1, "STETH").is_some());
    }

    #[test]
    fn unknown_token_is_none() {
        assert_eq!(token_address(1, "NOPE"), None);
        assert_eq!(token_address(999, "USDC"), None);
    }
}
