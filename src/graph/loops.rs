use std::collections::{HashMap, HashSet};

use crate::model::{
    BlockId, DetectedLoop, IterationHealth, LoopProjection, Strategy, StrategyBlock, StrategyEdge,
};

/// Unroll depth applied when an authored loop carries no explicit count.
pub const DEFAULT_LOOP_ITERATIONS: u32 = 3;

/// Enumerate cycles in the authored graph by DFS.
///
/// The DFS keeps the current path and a recursion stack; meeting a block
/// already on the stack slices the path from its first occurrence to form
/// the cycle. Each cycle is classified: it is a leverage loop iff its
/// block-type multiset contains {stake, lend, borrow}.
pub fn detect_loops(blocks: &[StrategyBlock], edges: &[StrategyEdge]) -> Vec<DetectedLoop> {
    let mut adjacency: HashMap<&str, Vec<&StrategyEdge>> = HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.source_id.as_str())
            .or_default()
            .push(edge);
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: HashSet<String> = HashSet::new();
    let mut path: Vec<String> = Vec::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    for block in blocks {
        if !visited.contains(&block.id) {
            dfs(
                &block.id,
                &adjacency,
                &mut visited,
                &mut stack,
                &mut path,
                &mut cycles,
                &mut seen,
            );
        }
    }

    cycles
        .into_iter()
        .map(|cycle| build_loop(cycle, blocks, edges))
        .collect()
}

fn dfs(
    node: &str,
    adjacency: &HashMap<&str, Vec<&StrategyEdge>>,
    visited: &mut HashSet<String>,
    stack: &mut HashSet<String>,
    path: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
    seen: &mut HashSet<Vec<String>>,
) {
    visited.insert(node.to_string());
    stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(outgoing) = adjacency.get(node) {
        for edge in outgoing {
            let target = edge.target_id.as_str();
            if !visited.contains(target) {
                dfs(target, adjacency, visited, stack, path, cycles, seen);
            } else if stack.contains(target) {
                let start = path
                    .iter()
                    .position(|id| id.as_str() == target)
                    .expect("on path");
                let cycle: Vec<String> = path[start..].to_vec();

                // The same simple cycle can be met from several back-edges;
                // canonicalise by member set.
                let mut key = cycle.clone();
                key.sort();
                if seen.insert(key) {
                    cycles.push(cycle);
                }
            }
        }
    }

    stack.remove(node);
    path.pop();
}

fn build_loop(
    cycle: Vec<String>,
    blocks: &[StrategyBlock],
    edges: &[StrategyEdge],
) -> DetectedLoop {
    let edge_between = |source: &str, target: &str| {
        edges
            .iter()
            .find(|e| e.source_id == source && e.target_id == target)
            .map(|e| e.id.clone())
    };

    // Path edges between consecutive members, then the closing edge
    // from the exit back to the entry.
    let mut loop_edges = Vec::with_capacity(cycle.len());
    for pair in cycle.windows(2) {
        if let Some(id) = edge_between(&pair[0], &pair[1]) {
            loop_edges.push(id);
        }
    }
    let entry = cycle.first().expect("non-empty cycle").clone();
    let exit = cycle.last().expect("non-empty cycle").clone();
    if let Some(id) = edge_between(&exit, &entry) {
        loop_edges.push(id);
    }

    let kind_of = |id: &str| {
        blocks
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.kind.type_name())
    };
    let kinds: Vec<&str> = cycle.iter().filter_map(|id| kind_of(id)).collect();
    let is_leverage_loop = ["stake", "lend", "borrow"]
        .iter()
        .all(|needed| kinds.contains(needed));

    DetectedLoop {
        blocks: cycle,
        edges: loop_edges,
        iterations: DEFAULT_LOOP_ITERATIONS,
        entry_block_id: entry,
        exit_block_id: exit,
        is_leverage_loop,
    }
}

/// Geometric value series of a leverage loop:
/// each iteration redeploys `ltv_percent` of the previous one.
pub fn calculate_loop_iterations(
    initial_value: f64,
    ltv_percent: f64,
    iterations: u32,
) -> LoopProjection {
    let ratio = ltv_percent / 100.0;
    let mut per_iteration = Vec::with_capacity(iterations as usize);
    let mut value = initial_value;
    for _ in 0..iterations {
        per_iteration.push(value);
        value *= ratio;
    }
    let total_value: f64 = per_iteration.iter().sum();
    let effective_leverage = if initial_value > 0.0 {
        total_value / initial_value
    } else {
        1.0
    };
    LoopProjection {
        per_iteration,
        total_value,
        effective_leverage,
    }
}

/// Collateral/debt/health-factor after each iteration.
///
/// Iteration i stakes v_i; the borrow against it funds iteration i+1, so
/// debt at iteration i is the sum of v_2..v_i. Health factor is infinite
/// until the first borrow lands.
pub fn calculate_health_factors(
    initial_value: f64,
    ltv_percent: f64,
    liquidation_threshold: f64,
    iterations: u32,
) -> Vec<IterationHealth> {
    let projection = calculate_loop_iterations(initial_value, ltv_percent, iterations);
    let mut out = Vec::with_capacity(iterations as usize);
    let mut collateral = 0.0;
    let mut debt = 0.0;
    for (i, value) in projection.per_iteration.iter().enumerate() {
        collateral += value;
        if i > 0 {
            debt += value;
        }
        let health_factor = if debt > 0.0 {
            collateral * liquidation_threshold / debt
        } else {
            f64::INFINITY
        };
        out.push(IterationHealth {
            collateral,
            debt,
            health_factor,
        });
    }
    out
}

/// Expand every leverage loop into an acyclic chain of per-iteration clones.
///
/// The closing edge is removed; iterations 2..=n get cloned blocks wired
/// in sequence, each fed from the previous iteration's exit block with the
/// closing edge's flow percentage. Cycles that are not leverage loops are
/// left in place for the topological sort to reject.
pub fn unroll_loops(strategy: &Strategy) -> Strategy {
    let loops = detect_loops(&strategy.blocks, &strategy.edges);
    let mut unrolled = strategy.clone();

    for lp in loops.iter().filter(|l| l.is_leverage_loop) {
        let Some(closing_id) = lp.edges.last() else {
            continue;
        };
        let closing = match strategy.edges.iter().find(|e| &e.id == closing_id) {
            Some(edge) => edge.clone(),
            None => continue,
        };
        unrolled.edges.retain(|e| e.id != closing.id);

        let member = |id: &str| lp.blocks.iter().any(|b| b.as_str() == id);
        let intra_edges: Vec<StrategyEdge> = strategy
            .edges
            .iter()
            .filter(|e| e.id != closing.id && member(&e.source_id) && member(&e.target_id))
            .cloned()
            .collect();

        let mut previous_exit: BlockId = lp.exit_block_id.clone();
        for iteration in 2..=lp.iterations {
            let clone_id = |id: &str| format!("{id}__i{iteration}");

            for block_id in &lp.blocks {
                if let Some(block) = strategy.block(block_id) {
                    let mut clone = block.clone();
                    clone.id = clone_id(block_id);
                    clone.label = format!("{} (iteration {iteration})", block.label);
                    unrolled.blocks.push(clone);
                }
            }
            for edge in &intra_edges {
                unrolled.edges.push(StrategyEdge::new(
                    clone_id(&edge.id),
                    clone_id(&edge.source_id),
                    clone_id(&edge.target_id),
                    edge.flow_percent,
                ));
            }
            unrolled.edges.push(StrategyEdge::new(
                format!("{}__i{iteration}", closing.id),
                previous_exit.clone(),
                clone_id(&lp.entry_block_id),
                closing.flow_percent,
            ));
            previous_exit = clone_id(&lp.exit_block_id);
        }
    }

    unrolled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_series_matches_hand_numbers() {
        let p = calculate_loop_iterations(10.0, 70.0, 3);
        assert_eq!(p.per_iteration.len(), 3);
        assert!((p.per_iteration[0] - 10.0).abs() < 1e-9);
        assert!((p.per_iteration[1] - 7.0).abs() < 1e-9);
        assert!((p.per_iteration[2] - 4.9).abs() < 1e-9);
        assert!((p.total_value - 21.9).abs() < 1e-9);
        assert!((p.effective_leverage - 2.19).abs() < 1e-9);
    }

    #[test]
    fn health_factors_track_lagged_debt() {
        let hf = calculate_health_factors(10.0, 70.0, 0.75, 3);
        assert_eq!(hf.len(), 3);
        assert!(hf[0].health_factor.is_infinite());
        let last = &hf[2];
        assert!((last.collateral - 21.9).abs() < 1e-9);
        assert!((last.debt - 11.9).abs() < 1e-9);
        assert!((last.health_factor - 21.9 * 0.75 / 11.9).abs() < 1e-9);
    }
}
