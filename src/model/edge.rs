use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::block::BlockId;

/// A directed edge routing a share of the source block's output
/// into the target block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StrategyEdge {
    pub id: String,
    pub source_id: BlockId,
    pub target_id: BlockId,
    /// Share of the source output flowing along this edge, 0–100.
    pub flow_percent: f64,
}

impl StrategyEdge {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<BlockId>,
        target_id: impl Into<BlockId>,
        flow_percent: f64,
    ) -> Self {
        StrategyEdge {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            flow_percent,
        }
    }
}
