//! Approval checker: batches on-chain allowance reads for a plan's approve
//! steps and marks the ones the wallet can skip.
//!
//! Reads are always recoverable: a failed allowance read is treated as a
//! zero allowance (the approve stays required) rather than aborting.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;
use tracing::warn;

use crate::abi::IERC20;
use crate::model::{ApprovalStatus, StepAction, TransactionPlan};
use crate::registry::PriceBook;
use crate::registry::gas::gas_units;
use crate::rpc::{ChainClient, try_aggregate};

/// One allowance read derived from a plan's approve step.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest {
    pub step_id: String,
    pub token: Address,
    pub token_symbol: String,
    pub spender: Address,
    #[serde(with = "crate::model::units::u256_decimal")]
    pub required_amount: U256,
}

/// Derive allowance reads from a plan. For every approve step the token is
/// the step's target, the spender is the target of the step that consumes
/// the allowance (the next step), and the required amount is the approved
/// amount. This matches the builder's emission pattern: approve always
/// immediately precedes its consumer.
pub fn extract_approval_requests(plan: &TransactionPlan) -> Vec<ApprovalRequest> {
    let mut requests = Vec::new();
    for (i, step) in plan.steps.iter().enumerate() {
        if step.action != StepAction::Approve {
            continue;
        }
        let Some(consumer) = plan.steps.get(i + 1) else {
            continue;
        };
        let Some(token_in) = &step.token_in else {
            continue;
        };
        requests.push(ApprovalRequest {
            step_id: step.id.clone(),
            token: step.to,
            token_symbol: token_in.symbol.clone(),
            spender: consumer.to,
            required_amount: token_in.amount,
        });
    }
    requests
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApprovalCheckResult {
    /// Allowance verdict per approve step id.
    pub statuses: HashMap<String, ApprovalStatus>,
    pub skippable_step_ids: Vec<String>,
    pub estimated_gas_savings: u64,
}

/// Read every requested allowance in one multicall and classify.
///
/// Never fails: a failed batch or sub-call degrades to zero allowance for
/// the affected requests.
pub async fn check_approvals(
    client: &dyn ChainClient,
    chain_id: u64,
    owner: Address,
    requests: &[ApprovalRequest],
) -> ApprovalCheckResult {
    let calls: Vec<(Address, alloy::primitives::Bytes)> = requests
        .iter()
        .map(|r| {
            (
                r.token,
                IERC20::allowanceCall {
                    owner,
                    spender: r.spender,
                }
                .abi_encode()
                .into(),
            )
        })
        .collect();

    let raw_results = match try_aggregate(client, chain_id, &calls).await {
        Ok(results) => results,
        Err(e) => {
            warn!(chain_id, error = %e, "allowance multicall failed; treating all as unapproved");
            vec![None; requests.len()]
        }
    };

    let mut result = ApprovalCheckResult::default();
    for (request, raw) in requests.iter().zip(raw_results) {
        let current_allowance = raw
            .and_then(|bytes| IERC20::allowanceCall::abi_decode_returns(&bytes).ok())
            .unwrap_or(U256::ZERO);

        let is_approved = current_allowance >= request.required_amount;
        let status = ApprovalStatus {
            current_allowance,
            required_amount: request.required_amount,
            is_approved,
            is_partially_approved: current_allowance > U256::ZERO && !is_approved,
            can_skip: is_approved,
        };
        if is_approved {
            result.skippable_step_ids.push(request.step_id.clone());
        }
        result.statuses.insert(request.step_id.clone(), status);
    }
    result.estimated_gas_savings =
        gas_units::APPROVE_SKIP_SAVING * result.skippable_step_ids.len() as u64;
    result
}

/// Attach the check result to the plan's approve steps.
/// Re-annotating with the same snapshot is idempotent.
pub fn annotate_plan(plan: &mut TransactionPlan, result: &ApprovalCheckResult) {
    for step in &mut plan.steps {
        if let Some(status) = result.statuses.get(&step.id) {
            step.approval_status = Some(status.clone());
        }
    }
}

/// Convenience path: extract, read, annotate.
pub async fn check_and_annotate(
    client: &dyn ChainClient,
    owner: Address,
    plan: &mut TransactionPlan,
) -> ApprovalCheckResult {
    let requests = extract_approval_requests(plan);
    let result = check_approvals(client, plan.chain_id, owner, &requests).await;
    annotate_plan(plan, &result);
    result
}

/// Strip skippable approve steps and recompute totals. Optional — the UI
/// decides; batch analysis treats skippable steps as absent either way.
pub fn filter_approved_steps(
    plan: &TransactionPlan,
    prices: &PriceBook,
    gas_price_gwei: f64,
) -> TransactionPlan {
    let mut filtered = plan.clone();
    filtered
        .steps
        .retain(|step| !(step.action == StepAction::Approve && step.can_skip()));
    filtered.recompute_totals(prices.eth_price(), gas_price_gwei);
    filtered
}
