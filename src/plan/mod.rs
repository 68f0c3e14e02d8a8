pub mod approvals;
pub mod batching;
pub mod builder;

use thiserror::Error;

use crate::graph::{GraphError, ValidationIssue};
use crate::model::{PlanExpired, ProtocolId};

pub use approvals::{
    ApprovalCheckResult, ApprovalRequest, check_approvals, extract_approval_requests,
    filter_approved_steps,
};
pub use batching::{BatchAnalysis, BatchGroup, analyze, optimize_plan_with_batching};
pub use builder::{PlanRequest, build_plan};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("strategy failed validation with {} error(s)", .0.len())]
    GraphInvalid(Vec<ValidationIssue>),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("unsupported chain {0}")]
    UnsupportedChain(u64),

    #[error("protocol `{protocol}` has no deployment on chain {chain_id}")]
    ProtocolUnknown {
        protocol: ProtocolId,
        chain_id: u64,
    },

    #[error("token `{symbol}` has no address on chain {chain_id}")]
    UnknownToken { symbol: String, chain_id: u64 },

    #[error("block `{block_id}` has no incoming amount to lower")]
    EmptyFlow { block_id: String },

    #[error(transparent)]
    Expired(#[from] PlanExpired),
}
