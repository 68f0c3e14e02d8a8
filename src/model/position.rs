use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use super::protocol::ProtocolId;
use super::units::u256_decimal;

/// What kind of position a protocol holds for a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Supply,
    Borrow,
    Stake,
    Lp,
    Vault,
}

/// An unclaimed reward attached to a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub token: String,
    pub amount: f64,
}

/// A wallet's position in one protocol on one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub protocol: ProtocolId,
    pub chain_id: u64,
    pub kind: PositionKind,
    /// Token symbol of the position's denomination.
    pub token: String,
    /// Raw balance in base units.
    #[serde(with = "u256_decimal")]
    pub balance_raw: U256,
    /// Display balance.
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apy: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rewards: Vec<Reward>,
    /// Adapter-specific extras (market id, threshold, collateral flag, …).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
