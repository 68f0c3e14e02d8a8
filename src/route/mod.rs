//! Route optimiser: inserts wrap/unwrap conversions where a producer's
//! output token is not accepted by its consumer (e.g. Aave takes wstETH,
//! not rebasing stETH).

use std::sync::LazyLock;

use serde::Serialize;

use crate::model::{
    BlockId, BlockKind, ProtocolId, Strategy, StrategyBlock, StrategyEdge, WrapDirection, WrapStep,
};
use crate::registry;

/// A convertible token pair and the protocol owning the wrapper contract.
#[derive(Debug, Clone)]
pub struct TokenWrapper {
    pub underlying: &'static str,
    pub wrapped: &'static str,
    pub protocol: ProtocolId,
}

/// The closed set of wrapper conversions the optimiser may insert.
pub static TOKEN_WRAPPERS: LazyLock<Vec<TokenWrapper>> = LazyLock::new(|| {
    vec![
        TokenWrapper {
            underlying: "stETH",
            wrapped: "wstETH",
            protocol: ProtocolId::Lido,
        },
        TokenWrapper {
            underlying: "eETH",
            wrapped: "weETH",
            protocol: ProtocolId::EtherFi,
        },
    ]
});

fn wrapper_for(from: &str, to: &str) -> Option<WrapStep> {
    for w in TOKEN_WRAPPERS.iter() {
        if from.eq_ignore_ascii_case(w.underlying) && to.eq_ignore_ascii_case(w.wrapped) {
            return Some(WrapStep {
                from: w.underlying.to_string(),
                to: w.wrapped.to_string(),
                protocol: w.protocol,
                direction: WrapDirection::Wrap,
            });
        }
        if from.eq_ignore_ascii_case(w.wrapped) && to.eq_ignore_ascii_case(w.underlying) {
            return Some(WrapStep {
                from: w.wrapped.to_string(),
                to: w.underlying.to_string(),
                protocol: w.protocol,
                direction: WrapDirection::Unwrap,
            });
        }
    }
    None
}

/// The wrapped counterpart of a rebasing receipt, if one exists.
pub fn wrapped_form(symbol: &str) -> Option<&'static str> {
    TOKEN_WRAPPERS
        .iter()
        .find(|w| symbol.eq_ignore_ascii_case(w.underlying))
        .map(|w| w.wrapped)
}

/// The token a block actually emits, with the stake-and-wrap shortcut
/// resolved through the wrapper table.
pub fn emitted_asset(block: &StrategyBlock) -> Option<String> {
    match &block.kind {
        BlockKind::Stake {
            out_asset,
            wrap: true,
            ..
        } => Some(
            wrapped_form(out_asset)
                .map(str::to_string)
                .unwrap_or_else(|| out_asset.clone()),
        ),
        _ => block.emitted_asset().map(str::to_string),
    }
}

/// The tokens a block accepts on its input side. `None` means the block
/// consumes no token directly (Borrow draws against collateral) or accepts
/// anything (Input has no input side).
pub fn accepted_assets(block: &StrategyBlock) -> Option<Vec<String>> {
    match &block.kind {
        BlockKind::Stake { in_asset, .. } => Some(vec![in_asset.clone()]),
        BlockKind::Swap { from, .. } => Some(vec![from.clone()]),
        BlockKind::AutoWrap { from, .. } => Some(vec![from.clone()]),
        BlockKind::Lend {
            protocol,
            chain_id,
            asset,
            ..
        } => {
            if let Some(asset) = asset {
                Some(vec![asset.clone()])
            } else {
                Some(
                    registry::reserve_assets(*protocol, *chain_id)
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                )
            }
        }
        BlockKind::Borrow { .. } | BlockKind::Input { .. } => None,
    }
}

/// One incompatible edge and, when the wrapper table covers it, the
/// conversion that repairs it.
#[derive(Debug, Clone, Serialize)]
pub struct Incompatibility {
    pub edge_id: String,
    pub source_id: BlockId,
    pub target_id: BlockId,
    pub emitted: String,
    pub expected: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<WrapStep>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteAnalysis {
    pub incompatibilities: Vec<Incompatibility>,
    /// How many conversions `optimize_strategy` would insert.
    pub inserted_count: usize,
}

/// Walk every edge and compare the emitted asset against the consumer's
/// accepted set, matching case-insensitively.
pub fn analyze_route_compatibility(strategy: &Strategy) -> RouteAnalysis {
    let mut analysis = RouteAnalysis::default();

    for edge in &strategy.edges {
        let (Some(source), Some(target)) =
            (strategy.block(&edge.source_id), strategy.block(&edge.target_id))
        else {
            continue;
        };
        let Some(emitted) = emitted_asset(source) else {
            continue;
        };
        let Some(expected) = accepted_assets(target) else {
            continue;
        };
        if expected.iter().any(|a| a.eq_ignore_ascii_case(&emitted)) {
            continue;
        }

        let wrap = expected
            .iter()
            .find_map(|accepted| wrapper_for(&emitted, accepted));
        if wrap.is_some() {
            analysis.inserted_count += 1;
        }
        analysis.incompatibilities.push(Incompatibility {
            edge_id: edge.id.clone(),
            source_id: edge.source_id.clone(),
            target_id: edge.target_id.clone(),
            emitted,
            expected,
            wrap,
        });
    }

    analysis
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizeReport {
    /// Ids of the auto-wrap blocks added by this pass.
    pub inserted_blocks: Vec<BlockId>,
}

/// Rewrite the graph in place: every incompatible edge `u → v` with a known
/// conversion becomes `u → w → v` where `w` is a fresh auto-wrap block, and
/// the consumer is annotated with the converted asset so the builder encodes
/// the wrapped token rather than the original.
///
/// Re-running is a no-op once all edges are compatible; auto-wrap blocks are
/// never removed by later edits.
pub fn optimize_strategy(strategy: &mut Strategy) -> OptimizeReport {
    let analysis = analyze_route_compatibility(strategy);
    let mut report = OptimizeReport::default();

    for incompat in analysis.incompatibilities {
        let Some(wrap) = incompat.wrap else {
            continue;
        };

        let wrap_id = format!("auto-wrap-{}-{}", incompat.source_id, incompat.target_id);
        if strategy.block(&wrap_id).is_some() {
            continue;
        }

        let flow = strategy
            .edges
            .iter()
            .find(|e| e.id == incompat.edge_id)
            .map(|e| e.flow_percent)
            .unwrap_or(100.0);
        strategy.edges.retain(|e| e.id != incompat.edge_id);

        strategy.blocks.push(StrategyBlock::new(
            wrap_id.clone(),
            format!("{} → {}", wrap.from, wrap.to),
            BlockKind::AutoWrap {
                from: wrap.from.clone(),
                to: wrap.to.clone(),
                wrap_step: wrap.clone(),
            },
        ));
        strategy.edges.push(StrategyEdge::new(
            format!("{}-in", wrap_id),
            incompat.source_id.clone(),
            wrap_id.clone(),
            flow,
        ));
        strategy.edges.push(StrategyEdge::new(
            format!("{}-out", wrap_id),
            wrap_id.clone(),
            incompat.target_id.clone(),
            100.0,
        ));

        // Dynamic-asset annotation: the consumer now receives the converted
        // token; the builder sizes its amount conservatively at plan time.
        if let Some(consumer) = strategy.block_mut(&incompat.target_id) {
            if let BlockKind::Lend {
                asset,
                dynamic_asset,
                ..
            } = &mut consumer.kind
            {
                *asset = Some(wrap.to.clone());
                *dynamic_asset = true;
            }
        }

        report.inserted_blocks.push(wrap_id);
    }

    report
}
