use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::block::BlockId;

/// A cycle found in the authored graph.
///
/// `blocks` lists the cycle members in DFS-path order, entry first.
/// `edges` lists the edge ids along the cycle, including the closing edge
/// from the exit block back to the entry block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedLoop {
    pub blocks: Vec<BlockId>,
    pub edges: Vec<String>,
    /// How many times the loop unrolls before simulation/planning.
    pub iterations: u32,
    pub entry_block_id: BlockId,
    pub exit_block_id: BlockId,
    /// True iff the cycle's block types contain {stake, lend, borrow}.
    pub is_leverage_loop: bool,
}

/// Projection of a leverage loop's geometric value series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopProjection {
    /// Value entering each iteration, first entry = initial value.
    pub per_iteration: Vec<f64>,
    /// Total deployed across all iterations.
    pub total_value: f64,
    /// `total_value / initial_value`.
    pub effective_leverage: f64,
}

/// Collateral/debt/health-factor state after each loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationHealth {
    pub collateral: f64,
    pub debt: f64,
    /// `collateral * liquidation_threshold / debt`; infinite while debt is zero.
    pub health_factor: f64,
}
