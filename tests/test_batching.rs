use alloy::primitives::{Address, Bytes, U256};

use defi_workbench::model::{
    ApprovalStatus, ProtocolId, StepAction, TokenAmount, TransactionPlan, TransactionStep,
};
use defi_workbench::plan::batching::{analyze, optimize_plan_with_batching};
use defi_workbench::registry;

fn token(sym: &str) -> TokenAmount {
    TokenAmount {
        symbol: sym.to_string(),
        address: registry::token_address(1, sym).unwrap(),
        amount: U256::from(10u128.pow(18)),
    }
}

fn step(
    id: &str,
    action: StepAction,
    protocol: ProtocolId,
    token_in: Option<TokenAmount>,
    token_out: Option<TokenAmount>,
) -> TransactionStep {
    TransactionStep {
        id: id.to_string(),
        action,
        protocol,
        chain_id: 1,
        description: format!("{id}"),
        to: registry::contract(1, "aave-v3-pool").unwrap(),
        calldata: Bytes::from(vec![0xab, 0xcd]),
        value: U256::ZERO,
        token_in,
        token_out,
        estimated_gas: 100_000,
        source_block_id: "block".to_string(),
        approval_status: None,
        batch_info: None,
    }
}

fn approve(id: &str, sym: &str) -> TransactionStep {
    let mut s = step(id, StepAction::Approve, ProtocolId::AaveV3, Some(token(sym)), None);
    s.to = registry::token_address(1, sym).unwrap();
    s
}

fn plan_of(steps: Vec<TransactionStep>) -> TransactionPlan {
    TransactionPlan {
        id: "plan".to_string(),
        chain_id: 1,
        from_address: Address::ZERO,
        total_steps: steps.len(),
        estimated_total_gas: steps.iter().map(|s| s.estimated_gas).sum(),
        estimated_total_gas_usd: 0.0,
        steps,
        strategy_id: None,
        created_at: 0,
        expires_at: 300_000,
    }
}

// ── S5: two approve/action pairs ─────────────────────────────────────

#[test]
fn groups_approve_action_pairs() {
    let plan = plan_of(vec![
        approve("step-1", "USDC"),
        step(
            "step-2",
            StepAction::Deposit,
            ProtocolId::AaveV3,
            Some(token("USDC")),
            None,
        ),
        approve("step-3", "WETH"),
        step(
            "step-4",
            StepAction::Borrow,
            ProtocolId::AaveV3,
            Some(token("WETH")),
            None,
        ),
    ]);

    let analysis = analyze(&plan);
    assert_eq!(analysis.groups.len(), 2);
    assert!(analysis.unbatchable.is_empty());
    assert_eq!(analysis.original_tx_count, 4);
    assert_eq!(analysis.final_tx_count, 2);
    // Per pair: 21_000 - 2·2_500 = 16_000.
    assert_eq!(analysis.gas_savings, 32_000);

    assert_eq!(analysis.groups[0].step_ids, vec!["step-1", "step-2"]);
    assert_eq!(analysis.groups[1].step_ids, vec!["step-3", "step-4"]);
    for group in &analysis.groups {
        assert_eq!(group.to, registry::multicall3());
        assert!(group.is_valueless);
        assert_eq!(group.value, U256::ZERO);
    }
}

// ── Output dependencies split groups ─────────────────────────────────

#[test]
fn output_dependency_breaks_a_group() {
    // wrap produces weETH; the next step consumes it -> never same group.
    let wrap = step(
        "step-1",
        StepAction::Wrap,
        ProtocolId::EtherFi,
        Some(token("eETH")),
        Some(token("weETH")),
    );
    let consume = step(
        "step-2",
        StepAction::Deposit,
        ProtocolId::EtherFi,
        Some(token("weETH")),
        None,
    );
    let analysis = analyze(&plan_of(vec![wrap, consume]));
    assert!(analysis.groups.is_empty());
    assert_eq!(analysis.unbatchable, vec!["step-1", "step-2"]);
    assert_eq!(analysis.final_tx_count, 2);
}

#[test]
fn protocol_change_breaks_a_group() {
    let stake = step(
        "step-1",
        StepAction::Stake,
        ProtocolId::EtherFi,
        Some(token("WETH")),
        None,
    );
    let supply = step(
        "step-2",
        StepAction::Deposit,
        ProtocolId::AaveV3,
        Some(token("USDC")),
        None,
    );
    let analysis = analyze(&plan_of(vec![stake, supply]));
    assert!(analysis.groups.is_empty());
    assert_eq!(analysis.final_tx_count, 2);
}

// ── Property 8: ordering stability ───────────────────────────────────

#[test]
fn batching_preserves_relative_step_order() {
    let mut plan = plan_of(vec![
        approve("step-1", "USDC"),
        step(
            "step-2",
            StepAction::Deposit,
            ProtocolId::AaveV3,
            Some(token("USDC")),
            None,
        ),
        approve("step-3", "WETH"),
        step(
            "step-4",
            StepAction::Borrow,
            ProtocolId::AaveV3,
            Some(token("WETH")),
            None,
        ),
    ]);
    let ids_before: Vec<String> = plan.steps.iter().map(|s| s.id.clone()).collect();

    let analysis = optimize_plan_with_batching(&mut plan);

    let ids_after: Vec<String> = plan.steps.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids_before, ids_after);

    // Every grouped step carries its batch tag.
    for group in &analysis.groups {
        for (index, step_id) in group.step_ids.iter().enumerate() {
            let step = plan.steps.iter().find(|s| &s.id == step_id).unwrap();
            let info = step.batch_info.as_ref().unwrap();
            assert_eq!(info.batch_id, group.batch_id);
            assert_eq!(info.index_in_batch, index);
            assert_eq!(info.total_in_batch, group.step_ids.len());
            assert_eq!(info.batched_with.len(), group.step_ids.len() - 1);
        }
    }
}

// ── Property 9: gas-saving monotonicity ──────────────────────────────

#[test]
fn larger_groups_never_save_less() {
    let borrow = |id: &str| {
        step(
            id,
            StepAction::Borrow,
            ProtocolId::AaveV3,
            None,
            Some(token("WETH")),
        )
    };

    let two = analyze(&plan_of(vec![borrow("step-1"), borrow("step-2")]));
    let three = analyze(&plan_of(vec![
        borrow("step-1"),
        borrow("step-2"),
        borrow("step-3"),
    ]));

    assert_eq!(two.gas_savings, 16_000);
    assert_eq!(three.gas_savings, 34_500);
    assert!(three.gas_savings >= two.gas_savings);
}

// ── Skippable approves are treated as absent ─────────────────────────

#[test]
fn skippable_approves_are_invisible_to_batching() {
    let mut skipped = approve("step-1", "USDC");
    skipped.approval_status = Some(ApprovalStatus {
        current_allowance: U256::MAX,
        required_amount: U256::from(1u64),
        is_approved: true,
        is_partially_approved: false,
        can_skip: true,
    });
    let plan = plan_of(vec![
        skipped,
        step(
            "step-2",
            StepAction::Deposit,
            ProtocolId::AaveV3,
            Some(token("USDC")),
            None,
        ),
        step(
            "step-3",
            StepAction::Borrow,
            ProtocolId::AaveV3,
            None,
            Some(token("WETH")),
        ),
    ]);

    let analysis = analyze(&plan);
    assert_eq!(analysis.original_tx_count, 2);
    // The surviving supply+borrow pair still batches.
    assert_eq!(analysis.groups.len(), 1);
    assert_eq!(analysis.groups[0].step_ids, vec!["step-2", "step-3"]);
}
