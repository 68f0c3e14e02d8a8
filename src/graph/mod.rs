pub mod loops;
pub mod topo;

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{BlockKind, Strategy};

pub use loops::{
    DEFAULT_LOOP_ITERATIONS, calculate_health_factors, calculate_loop_iterations, detect_loops,
    unroll_loops,
};
pub use topo::{GraphError, topological_order};

/// A single validation finding. Errors abort planning; warnings do not.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("Strategy needs an Input block")]
    MissingInput,

    #[error("Strategy has {count} Input blocks; exactly one is required")]
    MultipleInputs { count: usize },

    #[error("Duplicate block id `{block_id}`")]
    DuplicateBlockId { block_id: String },

    #[error("Edge `{edge_id}` references unknown block `{block_id}`")]
    UnknownBlock { edge_id: String, block_id: String },

    #[error("Duplicate edge {source_id}->{target_id}")]
    DuplicateEdge { source_id: String, target_id: String },

    #[error("Self-loop on block `{block_id}`")]
    SelfLoop { block_id: String },

    #[error("Block `{block_id}` is not connected to the graph")]
    OrphanBlock { block_id: String },

    #[error("Borrow block `{block_id}` must be fed by a Lend block")]
    BorrowWithoutLend { block_id: String },

    #[error("Block `{block_id}` has no incoming flow")]
    NoIncomingFlow { block_id: String },

    #[error("Block `{block_id}`: LTV {value}% must be within (0, 100)")]
    InvalidLtv { block_id: String, value: f64 },

    #[error("Block `{block_id}`: slippage {value} bps must be within [0, 10000]")]
    InvalidSlippage { block_id: String, value: u32 },

    #[error("Input block `{block_id}`: amount must be positive")]
    NonPositiveAmount { block_id: String },

    #[error("Block `{block_id}`: outgoing flow sums to {total}%, exceeding 100%")]
    FlowOverflow { block_id: String, total: f64 },

    // ── Warnings ────────────────────────────────────────────────────
    #[error("Borrow block `{block_id}`: {value}% LTV leaves little liquidation margin")]
    HighLtv { block_id: String, value: f64 },

    #[error("Swap block `{block_id}`: {value} bps slippage tolerance is high")]
    HighSlippage { block_id: String, value: u32 },

    #[error("Block `{block_id}`: only {total}% of output is routed; the rest is stranded")]
    UnroutedFlow { block_id: String, total: f64 },
}

/// Outcome of validating a strategy. Cycles are not findings here — the
/// authored graph may contain leverage loops; the simulator and planner
/// classify and unroll them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a strategy, collecting all findings.
pub fn validate(strategy: &Strategy) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_structure(strategy, &mut report);
    check_inputs(strategy, &mut report);
    check_params(strategy, &mut report);
    check_edges(strategy, &mut report);

    report
}

/// Per-block incoming-edge requirements.
fn check_structure(strategy: &Strategy, report: &mut ValidationReport) {
    for block in &strategy.blocks {
        let has_incoming = strategy.incoming(&block.id).next().is_some();

        match &block.kind {
            BlockKind::Input { .. } => {}
            BlockKind::Borrow { .. } => {
                let fed_by_lend = strategy.incoming(&block.id).any(|e| {
                    strategy
                        .block(&e.source_id)
                        .is_some_and(|b| matches!(b.kind, BlockKind::Lend { .. }))
                });
                if !fed_by_lend {
                    report.errors.push(ValidationIssue::BorrowWithoutLend {
                        block_id: block.id.clone(),
                    });
                }
            }
            _ => {
                if !has_incoming {
                    report.errors.push(ValidationIssue::NoIncomingFlow {
                        block_id: block.id.clone(),
                    });
                }
            }
        }
    }
}

fn check_inputs(strategy: &Strategy, report: &mut ValidationReport) {
    let inputs = strategy.input_blocks();
    match inputs.len() {
        0 => report.errors.push(ValidationIssue::MissingInput),
        1 => {}
        count => report
            .errors
            .push(ValidationIssue::MultipleInputs { count }),
    }
}

/// Per-variant parameter constraints.
fn check_params(strategy: &Strategy, report: &mut ValidationReport) {
    for block in &strategy.blocks {
        match &block.kind {
            BlockKind::Input { amount, .. } => {
                if *amount <= 0.0 || !amount.is_finite() {
                    report.errors.push(ValidationIssue::NonPositiveAmount {
                        block_id: block.id.clone(),
                    });
                }
            }
            BlockKind::Borrow { ltv_percent, .. } => {
                if *ltv_percent <= 0.0 || *ltv_percent >= 100.0 {
                    report.errors.push(ValidationIssue::InvalidLtv {
                        block_id: block.id.clone(),
                        value: *ltv_percent,
                    });
                } else if *ltv_percent >= 80.0 {
                    report.warnings.push(ValidationIssue::HighLtv {
                        block_id: block.id.clone(),
                        value: *ltv_percent,
                    });
                }
            }
            BlockKind::Lend { max_ltv, .. } => {
                if *max_ltv <= 0.0 || *max_ltv >= 100.0 {
                    report.errors.push(ValidationIssue::InvalidLtv {
                        block_id: block.id.clone(),
                        value: *max_ltv,
                    });
                }
            }
            BlockKind::Swap { slippage_bps, .. } => {
                if *slippage_bps > 10_000 {
                    report.errors.push(ValidationIssue::InvalidSlippage {
                        block_id: block.id.clone(),
                        value: *slippage_bps,
                    });
                } else if *slippage_bps > 300 {
                    report.warnings.push(ValidationIssue::HighSlippage {
                        block_id: block.id.clone(),
                        value: *slippage_bps,
                    });
                }
            }
            BlockKind::Stake { .. } | BlockKind::AutoWrap { .. } => {}
        }
    }
}

/// Edge-set invariants: referential integrity, no duplicates or self-loops,
/// no orphan blocks, outgoing flow ≤ 100 % per non-input block.
fn check_edges(strategy: &Strategy, report: &mut ValidationReport) {
    let mut ids = HashSet::new();
    for block in &strategy.blocks {
        if !ids.insert(block.id.as_str()) {
            report.errors.push(ValidationIssue::DuplicateBlockId {
                block_id: block.id.clone(),
            });
        }
    }

    let mut pairs = HashSet::new();
    for edge in &strategy.edges {
        for endpoint in [&edge.source_id, &edge.target_id] {
            if strategy.block(endpoint).is_none() {
                report.errors.push(ValidationIssue::UnknownBlock {
                    edge_id: edge.id.clone(),
                    block_id: endpoint.clone(),
                });
            }
        }
        if edge.source_id == edge.target_id {
            report.errors.push(ValidationIssue::SelfLoop {
                block_id: edge.source_id.clone(),
            });
            continue;
        }
        if !pairs.insert((edge.source_id.clone(), edge.target_id.clone())) {
            report.errors.push(ValidationIssue::DuplicateEdge {
                source_id: edge.source_id.clone(),
                target_id: edge.target_id.clone(),
            });
        }
    }

    if strategy.blocks.len() > 1 {
        for block in &strategy.blocks {
            let connected = strategy.incoming(&block.id).next().is_some()
                || strategy.outgoing(&block.id).next().is_some();
            if !connected {
                report.errors.push(ValidationIssue::OrphanBlock {
                    block_id: block.id.clone(),
                });
            }
        }
    }

    for block in &strategy.blocks {
        if matches!(block.kind, BlockKind::Input { .. }) {
            continue;
        }
        let total: f64 = strategy.outgoing(&block.id).map(|e| e.flow_percent).sum();
        if total > 100.0 + 1e-9 {
            report.errors.push(ValidationIssue::FlowOverflow {
                block_id: block.id.clone(),
                total,
            });
        } else if total > 0.0 && total < 100.0 - 1e-9 {
            report.warnings.push(ValidationIssue::UnroutedFlow {
                block_id: block.id.clone(),
                total,
            });
        }
    }
}
