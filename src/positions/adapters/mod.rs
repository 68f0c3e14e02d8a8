pub mod aave_like;
pub mod compound;
pub mod eigenlayer;
pub mod etherfi;
pub mod lido;
pub mod morpho;
pub mod pendle;

pub use aave_like::AaveLikeAdapter;
pub use compound::CompoundAdapter;
pub use eigenlayer::EigenLayerAdapter;
pub use etherfi::EtherFiAdapter;
pub use lido::LidoAdapter;
pub use morpho::MorphoAdapter;
pub use pendle::{PendleAdapter, PendleMarket};
