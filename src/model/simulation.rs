use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::block::BlockId;
use super::protocol::ProtocolId;

/// Coarse risk bucket derived from the risk score and leverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// Banding rule shared by the simulator and the dashboard.
    pub fn classify(risk_score: f64, leverage: f64) -> Self {
        if risk_score >= 70.0 || leverage >= 4.0 {
            RiskLevel::Extreme
        } else if risk_score >= 50.0 || leverage >= 3.0 {
            RiskLevel::High
        } else if risk_score >= 30.0 || leverage >= 2.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Kind of a yield contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YieldKind {
    Stake,
    Supply,
    Borrow,
    Reward,
}

/// One APY contribution. `apy` is negative for borrow costs;
/// `weight` is the contributing value as a percent of the initial value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldSource {
    pub protocol: ProtocolId,
    pub kind: YieldKind,
    pub apy: f64,
    pub weight: f64,
}

/// Outcome of simulating a strategy. Non-throwing contract: error paths
/// still return a fully populated default so the UI never branches on
/// a missing body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub gross_apy: f64,
    pub net_apy: f64,
    pub initial_value: f64,
    pub projected_value_1y: f64,
    pub gas_cost_usd: f64,
    pub protocol_fees: f64,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidation_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_factor: Option<f64>,
    pub max_drawdown: f64,
    /// Unitless, ≥ 1.
    pub leverage: f64,
    pub yield_sources: Vec<YieldSource>,
    /// USD value observed at each block.
    pub per_block_values: HashMap<BlockId, f64>,
    /// Index of the failing step when an external preview reverted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at_step: Option<usize>,
}

impl SimulationResult {
    /// The populated default returned on every error path.
    pub fn invalid(error: impl Into<String>) -> Self {
        SimulationResult {
            is_valid: false,
            error: Some(error.into()),
            gross_apy: 0.0,
            net_apy: 0.0,
            initial_value: 0.0,
            projected_value_1y: 0.0,
            gas_cost_usd: 0.0,
            protocol_fees: 0.0,
            risk_level: RiskLevel::Low,
            risk_score: 0.0,
            liquidation_price: None,
            health_factor: None,
            max_drawdown: 0.0,
            leverage: 1.0,
            yield_sources: Vec::new(),
            per_block_values: HashMap::new(),
            failed_at_step: None,
        }
    }
}
