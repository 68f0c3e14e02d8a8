pub mod asset;
pub mod block;
pub mod edge;
pub mod loops;
pub mod plan;
pub mod position;
pub mod protocol;
pub mod simulation;
pub mod strategy;
pub mod units;

pub use asset::Asset;
pub use block::{BlockId, BlockKind, StrategyBlock, WrapDirection, WrapStep};
pub use edge::StrategyEdge;
pub use loops::{DetectedLoop, IterationHealth, LoopProjection};
pub use plan::{
    ApprovalStatus, BatchInfo, PLAN_TTL_MS, PlanExpired, StepAction, TokenAmount, TransactionPlan,
    TransactionStep,
};
pub use position::{Position, PositionKind, Reward};
pub use protocol::{ProtocolCategory, ProtocolId};
pub use simulation::{RiskLevel, SimulationResult, YieldKind, YieldSource};
pub use strategy::{Strategy, strategy_schema};
