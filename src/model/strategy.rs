use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::block::{BlockId, BlockKind, StrategyBlock};
use super::edge::StrategyEdge;

/// A user-authored strategy: blocks connected by flow edges.
///
/// The authored graph is allowed to contain cycles — they are leverage
/// loops and are classified and unrolled before simulation or planning.
/// Strategies are process-local edit buffers; nothing here persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Strategy {
    pub id: String,
    pub blocks: Vec<StrategyBlock>,
    pub edges: Vec<StrategyEdge>,
    /// Milliseconds since epoch.
    pub created_at: i64,
    pub updated_at: i64,
}

impl Strategy {
    pub fn new() -> Self {
        let now = Utc::now().timestamp_millis();
        Strategy {
            id: uuid::Uuid::new_v4().to_string(),
            blocks: Vec::new(),
            edges: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_block(&mut self, block: StrategyBlock) -> &mut Self {
        self.blocks.push(block);
        self.touch();
        self
    }

    /// Connect `source` to `target` with a generated edge id.
    pub fn connect(
        &mut self,
        source: impl Into<BlockId>,
        target: impl Into<BlockId>,
        flow_percent: f64,
    ) -> &mut Self {
        let id = format!("edge-{}", self.edges.len() + 1);
        self.edges
            .push(StrategyEdge::new(id, source, target, flow_percent));
        self.touch();
        self
    }

    pub fn block(&self, id: &str) -> Option<&StrategyBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut StrategyBlock> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Edges leaving `id`, in insertion order.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &StrategyEdge> {
        self.edges.iter().filter(move |e| e.source_id == id)
    }

    /// Edges entering `id`, in insertion order.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &StrategyEdge> {
        self.edges.iter().filter(move |e| e.target_id == id)
    }

    pub fn input_blocks(&self) -> Vec<&StrategyBlock> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Input { .. }))
            .collect()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp_millis();
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON schema for the authored strategy model, for external authoring tools.
pub fn strategy_schema() -> schemars::Schema {
    schemars::schema_for!(Strategy)
}
