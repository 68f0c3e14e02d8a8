use std::collections::{HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::model::{BlockId, StrategyBlock, StrategyEdge};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Cycles survived loop classification and unrolling.
    #[error("strategy graph contains cycles")]
    GraphHasCycles,
}

/// Kahn's algorithm over the block graph.
///
/// Ties break by block insertion order, so the result is deterministic for
/// a given authoring sequence. Edges referencing unknown blocks are ignored
/// here; validation reports them separately.
pub fn topological_order(
    blocks: &[StrategyBlock],
    edges: &[StrategyEdge],
) -> Result<Vec<BlockId>, GraphError> {
    let mut graph = DiGraph::<&str, ()>::new();
    let mut index_map: HashMap<&str, NodeIndex> = HashMap::new();

    for block in blocks {
        let idx = graph.add_node(block.id.as_str());
        index_map.insert(block.id.as_str(), idx);
    }

    for edge in edges {
        if let (Some(&from), Some(&to)) = (
            index_map.get(edge.source_id.as_str()),
            index_map.get(edge.target_id.as_str()),
        ) {
            graph.add_edge(from, to, ());
        }
    }

    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|idx| {
            (
                idx,
                graph
                    .neighbors_directed(idx, petgraph::Direction::Incoming)
                    .count(),
            )
        })
        .collect();

    // Node indices follow insertion order, so seeding in index order keeps
    // the output deterministic.
    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|idx| in_degree[idx] == 0)
        .collect();

    let mut order = Vec::with_capacity(blocks.len());
    while let Some(idx) = queue.pop_front() {
        order.push(graph[idx].to_string());

        let mut successors: Vec<NodeIndex> = graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        // petgraph yields neighbors newest-edge-first; restore insertion order.
        successors.reverse();

        for succ in successors {
            let degree = in_degree.get_mut(&succ).expect("known node");
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(succ);
            }
        }
    }

    if order.len() != blocks.len() {
        return Err(GraphError::GraphHasCycles);
    }
    Ok(order)
}
