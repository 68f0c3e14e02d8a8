use crate::model::ProtocolId;

/// Default gas unit costs per step kind. Deliberately generous; a signer
/// re-estimates before broadcast.
pub mod gas_units {
    pub const APPROVE: u64 = 50_000;
    pub const WRAP: u64 = 100_000;
    pub const UNWRAP: u64 = 100_000;
    pub const SUPPLY: u64 = 300_000;
    pub const BORROW: u64 = 350_000;
    pub const SWAP: u64 = 180_000;
    /// Base cost of any standalone transaction.
    pub const TX_BASE: u64 = 21_000;
    /// Overhead of routing one sub-call through Multicall3.
    pub const MULTICALL_INNER: u64 = 2_500;
    /// A skipped approve saves roughly this much.
    pub const APPROVE_SKIP_SAVING: u64 = 46_000;
}

/// Stake gas differs by protocol: EtherFi's deposit path mints through
/// the liquidity pool and costs more than Lido's submit.
pub fn stake_gas(protocol: ProtocolId) -> u64 {
    match protocol {
        ProtocolId::EtherFi => 200_000,
        _ => 150_000,
    }
}
