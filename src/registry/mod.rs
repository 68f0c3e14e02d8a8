pub mod apy;
pub mod chain;
pub mod gas;
pub mod prices;
pub mod protocol;
pub mod tokens;

pub use chain::{ChainSpec, chain, multicall3, rpc_urls, supported_chain_ids};
pub use prices::PriceBook;
pub use protocol::{Protocol, contract, protocol, reserve_assets, risk_score, supports_chain};
pub use tokens::{asset, is_native, native_sentinel, token_address, token_decimals};
