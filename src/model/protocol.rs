use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Protocols the workbench can plan against.
/// Closed set; adding a protocol means adding registry tables and a lowerer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ProtocolId {
    #[serde(rename = "lido")]
    Lido,
    #[serde(rename = "etherfi")]
    EtherFi,
    #[serde(rename = "aave-v3")]
    AaveV3,
    #[serde(rename = "spark")]
    Spark,
    #[serde(rename = "compound-v3")]
    CompoundV3,
    #[serde(rename = "morpho")]
    Morpho,
    #[serde(rename = "pendle")]
    Pendle,
    #[serde(rename = "eigenlayer")]
    EigenLayer,
    #[serde(rename = "uniswap-v3")]
    UniswapV3,
}

impl ProtocolId {
    /// The lowercase wire identifier, also used in step descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolId::Lido => "lido",
            ProtocolId::EtherFi => "etherfi",
            ProtocolId::AaveV3 => "aave-v3",
            ProtocolId::Spark => "spark",
            ProtocolId::CompoundV3 => "compound-v3",
            ProtocolId::Morpho => "morpho",
            ProtocolId::Pendle => "pendle",
            ProtocolId::EigenLayer => "eigenlayer",
            ProtocolId::UniswapV3 => "uniswap-v3",
        }
    }
}

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a protocol fundamentally does. Drives risk weighting and
/// which adapter family reads its positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolCategory {
    Staking,
    Lending,
    Restaking,
    Yield,
    Dex,
}
