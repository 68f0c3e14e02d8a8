mod common;

use defi_workbench::model::{BlockKind, WrapDirection};
use defi_workbench::route::{analyze_route_compatibility, optimize_strategy};

use common::*;

#[test]
fn detects_rebasing_token_incompatibility() {
    let strategy = lst_lend_strategy();
    let analysis = analyze_route_compatibility(&strategy);

    assert_eq!(analysis.incompatibilities.len(), 1);
    assert_eq!(analysis.inserted_count, 1);

    let incompat = &analysis.incompatibilities[0];
    assert_eq!(incompat.source_id, "stake");
    assert_eq!(incompat.target_id, "lend");
    assert_eq!(incompat.emitted, "eETH");

    let wrap = incompat.wrap.as_ref().expect("wrapper known");
    assert_eq!(wrap.from, "eETH");
    assert_eq!(wrap.to, "weETH");
    assert_eq!(wrap.direction, WrapDirection::Wrap);
}

#[test]
fn optimize_inserts_auto_wrap_and_annotates_consumer() {
    let mut strategy = lst_lend_strategy();
    let authored_ids: Vec<String> = strategy.blocks.iter().map(|b| b.id.clone()).collect();

    let report = optimize_strategy(&mut strategy);
    assert_eq!(report.inserted_blocks.len(), 1);

    // Authored blocks are a subset of the post-optimisation set.
    for id in &authored_ids {
        assert!(strategy.block(id).is_some());
    }

    // The new block sits between stake and lend.
    let wrap_id = &report.inserted_blocks[0];
    let wrap = strategy.block(wrap_id).unwrap();
    assert!(matches!(wrap.kind, BlockKind::AutoWrap { .. }));
    assert!(
        strategy
            .edges
            .iter()
            .any(|e| e.source_id == "stake" && e.target_id == *wrap_id)
    );
    assert!(
        strategy
            .edges
            .iter()
            .any(|e| e.source_id == *wrap_id && e.target_id == "lend")
    );
    assert!(
        !strategy
            .edges
            .iter()
            .any(|e| e.source_id == "stake" && e.target_id == "lend")
    );

    // Dynamic-asset annotation on the consumer.
    let lend = strategy.block("lend").unwrap();
    match &lend.kind {
        BlockKind::Lend {
            asset,
            dynamic_asset,
            ..
        } => {
            assert_eq!(asset.as_deref(), Some("weETH"));
            assert!(dynamic_asset);
        }
        other => panic!("expected lend, got {other:?}"),
    }
}

#[test]
fn no_edge_connects_incompatible_assets_after_optimisation() {
    let mut strategy = lst_lend_strategy();
    optimize_strategy(&mut strategy);
    let analysis = analyze_route_compatibility(&strategy);
    assert!(analysis.incompatibilities.is_empty());
}

#[test]
fn rerunning_optimisation_is_a_no_op() {
    let mut strategy = lst_lend_strategy();
    optimize_strategy(&mut strategy);
    let blocks_after_first = strategy.blocks.len();
    let edges_after_first = strategy.edges.len();

    let report = optimize_strategy(&mut strategy);
    assert!(report.inserted_blocks.is_empty());
    assert_eq!(strategy.blocks.len(), blocks_after_first);
    assert_eq!(strategy.edges.len(), edges_after_first);
}

#[test]
fn compatible_routes_are_untouched() {
    let mut strategy = conservative_lst_strategy();
    let report = optimize_strategy(&mut strategy);
    assert!(report.inserted_blocks.is_empty());
    assert_eq!(strategy.blocks.len(), 2);
}
