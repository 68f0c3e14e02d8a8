use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// A token handle on a specific chain. The chain-native coin uses the
/// zero-address sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    /// External price-feed identifier, when one is wired up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_feed_id: Option<String>,
}

impl Asset {
    pub fn is_native(&self) -> bool {
        self.address == Address::ZERO
    }
}

/// Identity is the on-chain token, not its display symbol: two handles for
/// the same `(chain, address)` are the same asset. Addresses are byte-wise
/// canonical, which subsumes case-insensitive hex comparison.
impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Asset {}

impl std::hash::Hash for Asset {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_symbol_spelling() {
        let addr: Address = "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84"
            .parse()
            .unwrap();
        let a = Asset {
            symbol: "stETH".to_string(),
            chain_id: 1,
            address: addr,
            decimals: 18,
            price_feed_id: None,
        };
        let b = Asset {
            symbol: "STETH".to_string(),
            chain_id: 1,
            address: addr,
            decimals: 18,
            price_feed_id: None,
        };
        assert_eq!(a, b);

        let other_chain = Asset {
            chain_id: 10,
            ..a.clone()
        };
        assert_ne!(a, other_chain);
    }
}
