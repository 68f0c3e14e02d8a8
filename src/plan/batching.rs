//! Batch analyser: groups adjacent steps that share a protocol and chain
//! and have no intra-group data dependency, packing each group into a
//! single Multicall3 aggregate call.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;

use crate::abi::IMulticall3;
use crate::model::{BatchInfo, ProtocolId, StepAction, TransactionPlan, TransactionStep};
use crate::registry;
use crate::registry::gas::gas_units;

/// A packed group of steps executed as one Multicall3 call.
#[derive(Debug, Clone, Serialize)]
pub struct BatchGroup {
    pub batch_id: String,
    pub protocol: ProtocolId,
    pub chain_id: u64,
    pub step_ids: Vec<String>,
    /// The Multicall3 contract on the group's chain.
    pub to: Address,
    /// `aggregate3` when value-less, otherwise `aggregate3Value`.
    pub calldata: Bytes,
    #[serde(with = "crate::model::units::u256_decimal")]
    pub value: U256,
    pub is_valueless: bool,
    pub gas_savings: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchAnalysis {
    pub groups: Vec<BatchGroup>,
    /// Step ids that stay standalone transactions.
    pub unbatchable: Vec<String>,
    pub gas_savings: u64,
    pub original_tx_count: usize,
    pub final_tx_count: usize,
}

/// Single left-to-right grouping pass. Skippable approve steps are treated
/// as absent. Groups appear in first-step order; relative step order is
/// preserved throughout.
pub fn analyze(plan: &TransactionPlan) -> BatchAnalysis {
    let steps: Vec<&TransactionStep> = plan.steps.iter().filter(|s| !s.can_skip()).collect();

    let mut analysis = BatchAnalysis {
        original_tx_count: steps.len(),
        ..BatchAnalysis::default()
    };

    let mut i = 0;
    while i < steps.len() {
        let step = steps[i];

        // An approve followed by the action consuming the same token forms
        // a natural pair.
        if step.action == StepAction::Approve {
            if let Some(next) = steps.get(i + 1) {
                if next.action != StepAction::Approve
                    && next.chain_id == step.chain_id
                    && same_token_in(step, next)
                {
                    push_group(&mut analysis, &[step, next]);
                    i += 2;
                    continue;
                }
            }
        }

        // Greedy run: extend while protocol and chain match and the next
        // step does not consume the previous step's output.
        let mut run = vec![step];
        let mut k = i + 1;
        while let Some(next) = steps.get(k) {
            let prev = run[run.len() - 1];
            if next.protocol != prev.protocol
                || next.chain_id != prev.chain_id
                || depends_on_output(prev, next)
            {
                break;
            }
            run.push(next);
            k += 1;
        }

        if run.len() >= 2 {
            push_group(&mut analysis, &run);
        } else {
            analysis.unbatchable.push(step.id.clone());
        }
        i = k;
    }

    analysis.gas_savings = analysis.groups.iter().map(|g| g.gas_savings).sum();
    analysis.final_tx_count = analysis.groups.len() + analysis.unbatchable.len();
    analysis
}

/// Apply the analysis to the plan: tag every grouped step with its batch
/// membership. Step order is untouched so progress UIs stay coherent.
pub fn optimize_plan_with_batching(plan: &mut TransactionPlan) -> BatchAnalysis {
    let analysis = analyze(plan);

    for group in &analysis.groups {
        let total = group.step_ids.len();
        for (index, step_id) in group.step_ids.iter().enumerate() {
            let batched_with: Vec<String> = group
                .step_ids
                .iter()
                .filter(|id| *id != step_id)
                .cloned()
                .collect();
            if let Some(step) = plan.steps.iter_mut().find(|s| &s.id == step_id) {
                step.batch_info = Some(BatchInfo {
                    batch_id: group.batch_id.clone(),
                    index_in_batch: index,
                    total_in_batch: total,
                    batched_with,
                });
            }
        }
    }

    analysis
}

/// The next step consumes the previous step's emitted token, or the
/// previous step is a wrap/unwrap whose output the next step needs.
/// Such pairs are never packed together: the second call would observe a
/// balance the first call has not produced yet.
fn depends_on_output(prev: &TransactionStep, next: &TransactionStep) -> bool {
    let Some(out) = &prev.token_out else {
        return false;
    };
    let consumes = next.token_in.as_ref().is_some_and(|token_in| {
        token_in.address == out.address || token_in.symbol.eq_ignore_ascii_case(&out.symbol)
    });
    if consumes {
        return true;
    }
    matches!(prev.action, StepAction::Wrap | StepAction::Unwrap)
        && next
            .token_in
            .as_ref()
            .is_some_and(|t| t.symbol.eq_ignore_ascii_case(&out.symbol))
}

fn same_token_in(a: &TransactionStep, b: &TransactionStep) -> bool {
    match (&a.token_in, &b.token_in) {
        (Some(ta), Some(tb)) => ta.address == tb.address,
        _ => false,
    }
}

fn push_group(analysis: &mut BatchAnalysis, steps: &[&TransactionStep]) {
    let n = steps.len() as u64;
    // Each merged call drops one base transaction but pays the multicall
    // routing overhead.
    let savings = ((n - 1) * gas_units::TX_BASE).saturating_sub(n * gas_units::MULTICALL_INNER);

    let total_value: U256 = steps.iter().map(|s| s.value).sum();
    let is_valueless = total_value == U256::ZERO;

    // allowFailure = false: a group either lands atomically or reverts.
    let calldata: Bytes = if is_valueless {
        IMulticall3::aggregate3Call {
            calls: steps
                .iter()
                .map(|s| IMulticall3::Call3 {
                    target: s.to,
                    allowFailure: false,
                    callData: s.calldata.clone(),
                })
                .collect(),
        }
        .abi_encode()
        .into()
    } else {
        IMulticall3::aggregate3ValueCall {
            calls: steps
                .iter()
                .map(|s| IMulticall3::Call3Value {
                    target: s.to,
                    allowFailure: false,
                    value: s.value,
                    callData: s.calldata.clone(),
                })
                .collect(),
        }
        .abi_encode()
        .into()
    };

    analysis.groups.push(BatchGroup {
        batch_id: format!("batch-{}", analysis.groups.len() + 1),
        protocol: steps[0].protocol,
        chain_id: steps[0].chain_id,
        step_ids: steps.iter().map(|s| s.id.clone()).collect(),
        to: registry::multicall3(),
        calldata,
        value: total_value,
        is_valueless,
        gas_savings: savings,
    });
}
