use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::protocol::ProtocolId;

/// A unique identifier for a block within a strategy.
pub type BlockId = String;

/// Direction of a token wrapper conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WrapDirection {
    Wrap,
    Unwrap,
}

/// A single wrapper conversion (e.g. stETH → wstETH via Lido).
/// Carried by auto-inserted wrap blocks so the builder knows what to encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WrapStep {
    /// Token consumed by the conversion.
    pub from: String,
    /// Token produced by the conversion.
    pub to: String,
    /// Protocol owning the wrapper contract.
    pub protocol: ProtocolId,
    pub direction: WrapDirection,
}

/// Block payload, discriminated by the "type" field in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// Entry point: the capital the user brings.
    Input {
        /// Token symbol (e.g. "ETH", "USDC").
        asset: String,
        /// Display amount (e.g. 1.5 for 1.5 ETH).
        amount: f64,
    },
    /// Liquid (re)staking deposit.
    Stake {
        protocol: ProtocolId,
        /// Token consumed (e.g. "ETH").
        in_asset: String,
        /// Receipt token produced (e.g. "stETH", "eETH").
        out_asset: String,
        /// Expected staking APY in percent. Falls back to the registry when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        apy: Option<f64>,
        /// Also wrap the receipt token into its non-rebasing form.
        #[serde(default)]
        wrap: bool,
    },
    /// Supply collateral to a lending market.
    Lend {
        protocol: ProtocolId,
        chain_id: u64,
        /// Asset supplied. May be rewritten by the route optimiser when the
        /// upstream producer emits a token the market does not accept.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset: Option<String>,
        /// Set when `asset` was annotated by the route optimiser; the builder
        /// then estimates the supply amount conservatively (the exact
        /// post-wrap balance is only known at execution time).
        #[serde(default)]
        dynamic_asset: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        supply_apy: Option<f64>,
        /// Maximum loan-to-value in percent.
        max_ltv: f64,
        /// Liquidation threshold as a fraction (e.g. 0.825).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        liquidation_threshold: Option<f64>,
    },
    /// Borrow against collateral supplied upstream.
    Borrow {
        protocol: ProtocolId,
        /// Asset borrowed.
        asset: String,
        /// Fraction of collateral value to draw, in percent.
        ltv_percent: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        borrow_apy: Option<f64>,
    },
    /// Same-chain token conversion through a DEX.
    Swap {
        from: String,
        to: String,
        /// Max acceptable slippage in basis points.
        slippage_bps: u32,
    },
    /// Wrapper conversion inserted by the route optimiser. Never authored
    /// directly and never removed by subsequent edits.
    AutoWrap {
        from: String,
        to: String,
        wrap_step: WrapStep,
    },
}

impl BlockKind {
    /// Human-readable type name, matching the serde tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            BlockKind::Input { .. } => "input",
            BlockKind::Stake { .. } => "stake",
            BlockKind::Lend { .. } => "lend",
            BlockKind::Borrow { .. } => "borrow",
            BlockKind::Swap { .. } => "swap",
            BlockKind::AutoWrap { .. } => "auto_wrap",
        }
    }
}

/// A strategy block: common identity fields plus the typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StrategyBlock {
    pub id: BlockId,
    /// Display label for the canvas.
    pub label: String,
    /// Whether the author finished configuring the block.
    #[serde(default = "default_true")]
    pub is_configured: bool,
    /// Last validation verdict for the block.
    #[serde(default = "default_true")]
    pub is_valid: bool,
    #[serde(flatten)]
    pub kind: BlockKind,
}

fn default_true() -> bool {
    true
}

impl StrategyBlock {
    pub fn new(id: impl Into<BlockId>, label: impl Into<String>, kind: BlockKind) -> Self {
        StrategyBlock {
            id: id.into(),
            label: label.into(),
            is_configured: true,
            is_valid: true,
            kind,
        }
    }

    /// The token this block emits downstream, if it produces one.
    /// Lend blocks are sinks: their receipt token stays in the market.
    pub fn emitted_asset(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Input { asset, .. } => Some(asset),
            BlockKind::Stake { out_asset, .. } => Some(out_asset),
            BlockKind::Borrow { asset, .. } => Some(asset),
            BlockKind::Swap { to, .. } => Some(to),
            BlockKind::AutoWrap { to, .. } => Some(to),
            BlockKind::Lend { .. } => None,
        }
    }

    pub fn protocol(&self) -> Option<ProtocolId> {
        match &self.kind {
            BlockKind::Stake { protocol, .. }
            | BlockKind::Lend { protocol, .. }
            | BlockKind::Borrow { protocol, .. } => Some(*protocol),
            BlockKind::AutoWrap { wrap_step, .. } => Some(wrap_step.protocol),
            BlockKind::Swap { .. } => Some(ProtocolId::UniswapV3),
            BlockKind::Input { .. } => None,
        }
    }
}
