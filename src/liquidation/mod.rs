//! Liquidation risk aggregator: per-wallet, per-chain Aave-style
//! health-factor summary with per-collateral liquidation prices.

use std::collections::HashMap;

use alloy::primitives::Address;
use serde::Serialize;

use crate::model::{Position, PositionKind};
use crate::positions::adapters::AaveLikeAdapter;
use crate::positions::{AdapterContext, PositionReader};
use crate::registry::PriceBook;

/// Liquidation threshold assumed when a reserve does not report one.
const DEFAULT_LIQUIDATION_THRESHOLD: f64 = 0.825;

/// One user reserve, normalised to display units and fractions.
#[derive(Debug, Clone)]
pub struct UserReserveRow {
    pub token: String,
    pub atoken_balance: f64,
    pub debt_balance: f64,
    /// Fraction (e.g. 0.75). Basis-point inputs are normalised upstream.
    pub liquidation_threshold: f64,
    pub usage_as_collateral: bool,
}

/// Risk band by overall health factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskBand {
    Safe,
    Moderate,
    AtRisk,
    Critical,
}

impl RiskBand {
    pub fn classify(health_factor: Option<f64>) -> Self {
        match health_factor {
            None => RiskBand::Safe,
            Some(hf) if hf >= 2.0 => RiskBand::Safe,
            Some(hf) if hf >= 1.5 => RiskBand::Moderate,
            Some(hf) if hf >= 1.1 => RiskBand::AtRisk,
            Some(_) => RiskBand::Critical,
        }
    }
}

/// Per-collateral liquidation exposure.
#[derive(Debug, Clone, Serialize)]
pub struct CollateralRisk {
    pub token: String,
    pub amount: f64,
    pub value_usd: f64,
    pub liquidation_threshold: f64,
    /// Collateral price at which the position becomes liquidatable.
    pub liquidation_price: f64,
    /// Fraction the price can fall before liquidation, floored at zero.
    pub price_drop_to_liquidation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainLiquidationSummary {
    pub chain_id: u64,
    pub total_collateral_usd: f64,
    pub total_debt_usd: f64,
    /// Collateral-weighted liquidation threshold, as a fraction.
    pub weighted_liquidation_threshold: f64,
    /// `None` while the wallet has no debt.
    pub health_factor: Option<f64>,
    pub risk: RiskBand,
    pub collaterals: Vec<CollateralRisk>,
}

/// Pure summary over a chain's user reserves.
pub fn summarize_chain(
    chain_id: u64,
    rows: &[UserReserveRow],
    prices: &PriceBook,
) -> ChainLiquidationSummary {
    let mut total_collateral_usd = 0.0;
    let mut weighted_lt_sum = 0.0;
    let mut total_debt_usd = 0.0;
    let mut collateral_rows: Vec<&UserReserveRow> = Vec::new();

    for row in rows {
        let price = prices.price_or_one(&row.token);
        if row.usage_as_collateral && row.atoken_balance > 0.0 {
            let value_usd = row.atoken_balance * price;
            total_collateral_usd += value_usd;
            weighted_lt_sum += value_usd * row.liquidation_threshold;
            collateral_rows.push(row);
        }
        total_debt_usd += row.debt_balance * price;
    }

    let weighted_liquidation_threshold = if total_collateral_usd > 0.0 {
        weighted_lt_sum / total_collateral_usd
    } else {
        0.0
    };
    let health_factor = if total_debt_usd > 0.0 && total_collateral_usd > 0.0 {
        Some(total_collateral_usd * weighted_liquidation_threshold / total_debt_usd)
    } else {
        None
    };

    let collaterals = collateral_rows
        .iter()
        .map(|row| {
            let price = prices.price_or_one(&row.token);
            let liquidation_price = if row.atoken_balance > 0.0 && total_debt_usd > 0.0 {
                total_debt_usd / (row.atoken_balance * row.liquidation_threshold)
            } else {
                0.0
            };
            CollateralRisk {
                token: row.token.clone(),
                amount: row.atoken_balance,
                value_usd: row.atoken_balance * price,
                liquidation_threshold: row.liquidation_threshold,
                liquidation_price,
                price_drop_to_liquidation: if price > 0.0 {
                    (1.0 - liquidation_price / price).max(0.0)
                } else {
                    0.0
                },
            }
        })
        .collect();

    ChainLiquidationSummary {
        chain_id,
        total_collateral_usd,
        total_debt_usd,
        weighted_liquidation_threshold,
        health_factor,
        risk: RiskBand::classify(health_factor),
        collaterals,
    }
}

/// Read-side aggregator over the Aave-family adapter.
pub struct LiquidationAggregator {
    adapter: AaveLikeAdapter,
    prices: PriceBook,
}

impl LiquidationAggregator {
    pub fn new(ctx: AdapterContext) -> Self {
        let prices = ctx.prices.clone();
        LiquidationAggregator {
            adapter: AaveLikeAdapter::aave_v3(ctx),
            prices,
        }
    }

    /// Summaries per chain. Chains whose read fails are omitted; chains
    /// with no positions yield an empty summary.
    pub async fn assess(
        &self,
        wallet: Address,
        chains: &[u64],
    ) -> HashMap<u64, ChainLiquidationSummary> {
        let mut out = HashMap::new();
        for &chain_id in chains {
            let Ok(positions) = self.adapter.read_positions(wallet, chain_id).await else {
                continue;
            };
            let rows = rows_from_positions(&positions);
            out.insert(chain_id, summarize_chain(chain_id, &rows, &self.prices));
        }
        out
    }
}

/// Convert adapter positions into reserve rows, merging supply and debt
/// sides by token.
pub fn rows_from_positions(positions: &[Position]) -> Vec<UserReserveRow> {
    let mut by_token: HashMap<String, UserReserveRow> = HashMap::new();
    for position in positions {
        let row = by_token
            .entry(position.token.clone())
            .or_insert_with(|| UserReserveRow {
                token: position.token.clone(),
                atoken_balance: 0.0,
                debt_balance: 0.0,
                liquidation_threshold: DEFAULT_LIQUIDATION_THRESHOLD,
                usage_as_collateral: false,
            });
        match position.kind {
            PositionKind::Supply => {
                row.atoken_balance += position.balance;
                if let Some(lt) = position
                    .metadata
                    .get("liquidation_threshold")
                    .and_then(|v| v.as_f64())
                {
                    row.liquidation_threshold = lt;
                }
                row.usage_as_collateral = position
                    .metadata
                    .get("usage_as_collateral")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(true);
            }
            PositionKind::Borrow => {
                row.debt_balance += position.balance;
            }
            _ => {}
        }
    }
    let mut rows: Vec<UserReserveRow> = by_token.into_values().collect();
    rows.sort_by(|a, b| a.token.cmp(&b.token));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_bands() {
        assert_eq!(RiskBand::classify(None), RiskBand::Safe);
        assert_eq!(RiskBand::classify(Some(2.5)), RiskBand::Safe);
        assert_eq!(RiskBand::classify(Some(1.7)), RiskBand::Moderate);
        assert_eq!(RiskBand::classify(Some(1.2)), RiskBand::AtRisk);
        assert_eq!(RiskBand::classify(Some(1.05)), RiskBand::Critical);
    }
}
