//! Aave-v3-family adapter. Spark shares the ABI and subgraph schema, so
//! one adapter parameterised by deployment covers both.

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::abi::{IPoolDataProvider, IRewardsController};
use crate::model::units::from_base_units;
use crate::model::{Position, PositionKind, ProtocolId, Reward};
use crate::registry;
use crate::registry::apy::fallback_borrow_apy;
use crate::rpc::try_aggregate;

use super::super::{AdapterContext, PositionReader, ReadError};

pub struct AaveLikeAdapter {
    protocol: ProtocolId,
    data_provider_key: &'static str,
    rewards_controller_key: Option<&'static str>,
    /// Subgraph deployment ids per chain; chains without one always use RPC.
    subgraphs: HashMap<u64, &'static str>,
    ctx: AdapterContext,
}

impl AaveLikeAdapter {
    pub fn aave_v3(ctx: AdapterContext) -> Self {
        let mut subgraphs = HashMap::new();
        subgraphs.insert(1u64, "Cd2gEDVeqnjBn1hSeqFMitw8Q1iiyV9FYUZkLNRcL87g");
        AaveLikeAdapter {
            protocol: ProtocolId::AaveV3,
            data_provider_key: "aave-v3-data-provider",
            rewards_controller_key: Some("aave-v3-rewards-controller"),
            subgraphs,
            ctx,
        }
    }

    pub fn spark(ctx: AdapterContext) -> Self {
        AaveLikeAdapter {
            protocol: ProtocolId::Spark,
            data_provider_key: "spark-data-provider",
            rewards_controller_key: None,
            subgraphs: HashMap::new(),
            ctx,
        }
    }

    // ── RPC path ────────────────────────────────────────────────────

    /// One multicall per `(wallet, chain)`: user reserve data plus reserve
    /// configuration for every listed asset. Per-asset failures degrade.
    pub async fn read_via_rpc(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        let assets = registry::reserve_assets(self.protocol, chain_id);
        if assets.is_empty() {
            return Ok(Vec::new());
        }
        let provider = registry::contract(chain_id, self.data_provider_key).ok_or_else(|| {
            ReadError::failed(self.protocol, chain_id, "no data provider deployment")
        })?;

        let mut calls: Vec<(Address, Bytes)> = Vec::with_capacity(assets.len() * 2);
        let mut resolved: Vec<(&str, Address)> = Vec::with_capacity(assets.len());
        for symbol in assets {
            let Some(token) = registry::token_address(chain_id, symbol) else {
                continue;
            };
            resolved.push((symbol, token));
            calls.push((
                provider,
                IPoolDataProvider::getUserReserveDataCall {
                    asset: token,
                    user: wallet,
                }
                .abi_encode()
                .into(),
            ));
            calls.push((
                provider,
                IPoolDataProvider::getReserveConfigurationDataCall { asset: token }
                    .abi_encode()
                    .into(),
            ));
        }

        let results = try_aggregate(self.ctx.client.as_ref(), chain_id, &calls).await?;

        let mut positions = Vec::new();
        for (i, (symbol, _token)) in resolved.iter().enumerate() {
            let user_data = results
                .get(i * 2)
                .and_then(|r| r.as_ref())
                .and_then(|bytes| {
                    IPoolDataProvider::getUserReserveDataCall::abi_decode_returns(bytes).ok()
                });
            let Some(user_data) = user_data else {
                // allowFailure read miss: drop the asset, keep the rest.
                continue;
            };
            let config = results
                .get(i * 2 + 1)
                .and_then(|r| r.as_ref())
                .and_then(|bytes| {
                    IPoolDataProvider::getReserveConfigurationDataCall::abi_decode_returns(bytes)
                        .ok()
                });

            let decimals = registry::token_decimals(symbol);
            let price = self.ctx.prices.price(symbol);

            if user_data.currentATokenBalance > U256::ZERO {
                let balance = from_base_units(user_data.currentATokenBalance, decimals);
                // liquidityRate is RAY (1e27), already annualised.
                let apy = from_base_units(user_data.liquidityRate, 27) * 100.0;

                let mut metadata = serde_json::Map::new();
                metadata.insert(
                    "usage_as_collateral".to_string(),
                    json!(user_data.usageAsCollateralEnabled),
                );
                if let Some(config) = &config {
                    let lt = normalize_bps(from_base_units(config.liquidationThreshold, 0));
                    metadata.insert("liquidation_threshold".to_string(), json!(lt));
                }

                positions.push(Position {
                    protocol: self.protocol,
                    chain_id,
                    kind: PositionKind::Supply,
                    token: symbol.to_string(),
                    balance_raw: user_data.currentATokenBalance,
                    balance,
                    balance_usd: price.map(|p| balance * p),
                    apy: Some(apy),
                    rewards: Vec::new(),
                    metadata,
                });
            }

            let debt_raw = user_data.currentStableDebt + user_data.currentVariableDebt;
            if debt_raw > U256::ZERO {
                let balance = from_base_units(debt_raw, decimals);
                positions.push(Position {
                    protocol: self.protocol,
                    chain_id,
                    kind: PositionKind::Borrow,
                    token: symbol.to_string(),
                    balance_raw: debt_raw,
                    balance,
                    balance_usd: price.map(|p| balance * p),
                    apy: Some(fallback_borrow_apy(self.protocol, symbol)),
                    rewards: Vec::new(),
                    metadata: serde_json::Map::new(),
                });
            }
        }

        if let Some(first_supply) = positions
            .iter()
            .position(|p| p.kind == PositionKind::Supply)
        {
            let rewards = self.read_rewards(wallet, chain_id, &resolved).await;
            positions[first_supply].rewards = rewards;
        }

        Ok(positions)
    }

    /// Best-effort unclaimed-rewards read; failures yield an empty list.
    async fn read_rewards(
        &self,
        wallet: Address,
        chain_id: u64,
        resolved: &[(&str, Address)],
    ) -> Vec<Reward> {
        let Some(key) = self.rewards_controller_key else {
            return Vec::new();
        };
        let Some(controller) = registry::contract(chain_id, key) else {
            return Vec::new();
        };

        let assets: Vec<Address> = resolved.iter().map(|(_, addr)| *addr).collect();
        let data = IRewardsController::getAllUserRewardsCall {
            assets,
            user: wallet,
        }
        .abi_encode();

        let raw = match self.ctx.client.call(chain_id, controller, data.into()).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(chain_id, error = %e, "rewards read skipped");
                return Vec::new();
            }
        };
        let Ok(decoded) = IRewardsController::getAllUserRewardsCall::abi_decode_returns(&raw)
        else {
            return Vec::new();
        };

        decoded
            .rewardsList
            .iter()
            .zip(decoded.unclaimedAmounts.iter())
            .filter(|(_, amount)| **amount > U256::ZERO)
            .map(|(token, amount)| Reward {
                token: format!("{token}"),
                amount: from_base_units(*amount, 18),
            })
            .collect()
    }

    // ── Indexer path ────────────────────────────────────────────────

    pub async fn read_via_indexer(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        let indexer = self
            .ctx
            .indexer
            .as_ref()
            .ok_or_else(|| ReadError::IndexerUnavailable("no indexer configured".to_string()))?;
        let subgraph = self
            .subgraphs
            .get(&chain_id)
            .ok_or_else(|| ReadError::IndexerUnavailable("no subgraph for chain".to_string()))?;

        let query = r#"
            query ($user: String!) {
                userReserves(where: { user: $user }) {
                    currentATokenBalance
                    currentTotalDebt
                    reserve {
                        symbol
                        decimals
                        liquidityRate
                        reserveLiquidationThreshold
                        usageAsCollateralEnabled
                    }
                }
            }
        "#;
        let variables = json!({ "user": format!("{wallet:?}").to_lowercase() });
        let data = indexer.request(subgraph, query, variables).await?;

        let parsed: UserReservesData = serde_json::from_value(data)
            .map_err(|e| ReadError::IndexerUnavailable(format!("schema mismatch: {e}")))?;
        let rows = parsed
            .user_reserves
            .ok_or_else(|| ReadError::IndexerUnavailable("userReserves missing".to_string()))?;

        let mut positions = Vec::new();
        for row in rows {
            let reserve = row.reserve;
            let decimals = reserve.decimals.unwrap_or(18);
            let price = self.ctx.prices.price(&reserve.symbol);

            let supply_raw = parse_raw(row.current_atoken_balance.as_deref());
            if supply_raw > U256::ZERO {
                let balance = from_base_units(supply_raw, decimals);
                let apy = reserve
                    .liquidity_rate
                    .as_deref()
                    .and_then(|r| r.parse::<U256>().ok())
                    .map(|rate| from_base_units(rate, 27) * 100.0);

                let mut metadata = serde_json::Map::new();
                if let Some(lt) = reserve
                    .liquidation_threshold
                    .as_deref()
                    .and_then(|v| v.parse::<f64>().ok())
                {
                    metadata.insert(
                        "liquidation_threshold".to_string(),
                        json!(normalize_bps(lt)),
                    );
                }
                metadata.insert(
                    "usage_as_collateral".to_string(),
                    json!(reserve.usage_as_collateral.unwrap_or(false)),
                );

                positions.push(Position {
                    protocol: self.protocol,
                    chain_id,
                    kind: PositionKind::Supply,
                    token: reserve.symbol.clone(),
                    balance_raw: supply_raw,
                    balance,
                    balance_usd: price.map(|p| balance * p),
                    apy,
                    rewards: Vec::new(),
                    metadata: metadata.clone(),
                });
            }

            let debt_raw = parse_raw(row.current_total_debt.as_deref());
            if debt_raw > U256::ZERO {
                let balance = from_base_units(debt_raw, decimals);
                positions.push(Position {
                    protocol: self.protocol,
                    chain_id,
                    kind: PositionKind::Borrow,
                    token: reserve.symbol.clone(),
                    balance_raw: debt_raw,
                    balance,
                    balance_usd: price.map(|p| balance * p),
                    apy: Some(fallback_borrow_apy(self.protocol, &reserve.symbol)),
                    rewards: Vec::new(),
                    metadata: serde_json::Map::new(),
                });
            }
        }

        Ok(positions)
    }
}

#[async_trait]
impl PositionReader for AaveLikeAdapter {
    fn protocol(&self) -> ProtocolId {
        self.protocol
    }

    fn supported_chains(&self) -> Vec<u64> {
        registry::protocol(self.protocol).supported_chains.to_vec()
    }

    async fn read_positions(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> Result<Vec<Position>, ReadError> {
        if self.ctx.prefer_indexer {
            match self.read_via_indexer(wallet, chain_id).await {
                Ok(positions) => return Ok(positions),
                Err(e) => {
                    warn!(protocol = %self.protocol, chain_id, error = %e,
                        "indexer path failed; falling back to RPC");
                }
            }
        }
        self.read_via_rpc(wallet, chain_id).await
    }
}

/// Subgraph basis-point fields arrive as values > 1; normalise to fractions.
fn normalize_bps(value: f64) -> f64 {
    if value > 1.0 { value / 10_000.0 } else { value }
}

fn parse_raw(value: Option<&str>) -> U256 {
    value
        .and_then(|v| v.parse::<U256>().ok())
        .unwrap_or(U256::ZERO)
}

// ── Subgraph response shapes ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UserReservesData {
    #[serde(rename = "userReserves")]
    user_reserves: Option<Vec<UserReserveRow>>,
}

#[derive(Debug, Deserialize)]
struct UserReserveRow {
    #[serde(rename = "currentATokenBalance")]
    current_atoken_balance: Option<String>,
    #[serde(rename = "currentTotalDebt")]
    current_total_debt: Option<String>,
    reserve: ReserveInfo,
}

#[derive(Debug, Deserialize)]
struct ReserveInfo {
    symbol: String,
    decimals: Option<u8>,
    #[serde(rename = "liquidityRate")]
    liquidity_rate: Option<String>,
    #[serde(rename = "reserveLiquidationThreshold")]
    liquidation_threshold: Option<String>,
    #[serde(rename = "usageAsCollateralEnabled")]
    usage_as_collateral: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bps_normalisation() {
        assert!((normalize_bps(8000.0) - 0.8).abs() < 1e-12);
        assert!((normalize_bps(0.75) - 0.75).abs() < 1e-12);
    }
}
