use crate::model::ProtocolId;

/// Fallback annual yields in percent, used when a block carries no explicit
/// APY and no live read is available.
pub fn fallback_stake_apy(protocol: ProtocolId) -> f64 {
    match protocol {
        ProtocolId::Lido => 3.1,
        ProtocolId::EtherFi => 3.2,
        ProtocolId::EigenLayer => 4.0,
        _ => 0.0,
    }
}

pub fn fallback_supply_apy(protocol: ProtocolId, asset: &str) -> f64 {
    let asset = asset.to_uppercase();
    match protocol {
        ProtocolId::AaveV3 | ProtocolId::Spark => match asset.as_str() {
            "USDC" | "USDT" | "DAI" => 5.2,
            "WETH" => 1.9,
            "WSTETH" => 0.1,
            "WEETH" => 0.1,
            _ => 0.5,
        },
        ProtocolId::CompoundV3 => match asset.as_str() {
            "USDC" => 4.8,
            "WETH" => 1.6,
            _ => 0.5,
        },
        ProtocolId::Morpho => 6.0,
        _ => 0.0,
    }
}

pub fn fallback_borrow_apy(protocol: ProtocolId, asset: &str) -> f64 {
    let asset = asset.to_uppercase();
    match protocol {
        ProtocolId::AaveV3 | ProtocolId::Spark => match asset.as_str() {
            "USDC" | "USDT" | "DAI" => 6.5,
            "WETH" => 2.6,
            _ => 3.0,
        },
        ProtocolId::CompoundV3 => 5.9,
        _ => 3.0,
    }
}
