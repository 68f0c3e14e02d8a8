use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use super::block::BlockId;
use super::protocol::ProtocolId;
use super::units::u256_decimal;

/// Plans expire five minutes after creation; consumers must rebuild after.
pub const PLAN_TTL_MS: i64 = 5 * 60 * 1000;

/// Low-level action a step performs on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Approve,
    Deposit,
    Withdraw,
    Borrow,
    Repay,
    Stake,
    Unstake,
    Wrap,
    Unwrap,
    Swap,
    Claim,
}

/// A token amount attached to a step's input or output side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAmount {
    /// Token symbol for display.
    pub symbol: String,
    pub address: Address,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
}

/// On-chain allowance state for an approve step, attached by the
/// approval checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStatus {
    #[serde(with = "u256_decimal")]
    pub current_allowance: U256,
    #[serde(with = "u256_decimal")]
    pub required_amount: U256,
    pub is_approved: bool,
    pub is_partially_approved: bool,
    /// The step can be elided: the spender already holds enough allowance.
    pub can_skip: bool,
}

/// Batch membership tag attached by the batch analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInfo {
    pub batch_id: String,
    pub index_in_batch: usize,
    pub total_in_batch: usize,
    /// Ids of the other steps sharing the batch.
    pub batched_with: Vec<String>,
}

/// One ordered call in a transaction plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStep {
    pub id: String,
    pub action: StepAction,
    pub protocol: ProtocolId,
    pub chain_id: u64,
    pub description: String,
    pub to: Address,
    pub calldata: Bytes,
    /// Native value sent with the call. Non-zero only for payable targets.
    #[serde(with = "u256_decimal")]
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_in: Option<TokenAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_out: Option<TokenAmount>,
    pub estimated_gas: u64,
    /// The strategy block this step was lowered from.
    pub source_block_id: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_info: Option<BatchInfo>,
}

impl TransactionStep {
    /// Whether the approval checker marked this step skippable.
    pub fn can_skip(&self) -> bool {
        self.approval_status.as_ref().is_some_and(|s| s.can_skip)
    }
}

/// An ordered, signable sequence of calls on a single chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPlan {
    pub id: String,
    pub chain_id: u64,
    pub from_address: Address,
    pub steps: Vec<TransactionStep>,
    pub total_steps: usize,
    pub estimated_total_gas: u64,
    pub estimated_total_gas_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    /// Milliseconds since epoch.
    pub created_at: i64,
    pub expires_at: i64,
}

impl TransactionPlan {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    /// Guard used by downstream consumers before acting on a plan.
    pub fn ensure_fresh(&self, now_ms: i64) -> Result<(), PlanExpired> {
        if self.is_expired(now_ms) {
            Err(PlanExpired {
                plan_id: self.id.clone(),
                expired_at: self.expires_at,
            })
        } else {
            Ok(())
        }
    }

    /// Recompute totals after steps were added, removed or filtered.
    pub fn recompute_totals(&mut self, eth_price_usd: f64, gas_price_gwei: f64) {
        self.total_steps = self.steps.len();
        self.estimated_total_gas = self.steps.iter().map(|s| s.estimated_gas).sum();
        self.estimated_total_gas_usd =
            gas_to_usd(self.estimated_total_gas, eth_price_usd, gas_price_gwei);
    }
}

/// Convert a gas unit total into USD at the given native price and gas price.
pub fn gas_to_usd(gas_units: u64, eth_price_usd: f64, gas_price_gwei: f64) -> f64 {
    gas_units as f64 * gas_price_gwei * 1e-9 * eth_price_usd
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("plan `{plan_id}` expired at {expired_at}; rebuild before signing")]
pub struct PlanExpired {
    pub plan_id: String,
    pub expired_at: i64,
}
