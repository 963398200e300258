//! Export/import of full player states.

use finlife_core::{
    config::GameConfig,
    engine::Engine,
    error::GameError,
    generator::OfflineGenerator,
    investments::{FixedDepositRequest, MutualFundRequest},
    month_flow::MonthFlow,
    snapshot::{export_state, import_state, replace_from_import},
    state::{FinancialState, FundingSource, MutualFundType},
    store::MemoryStore,
};

/// A state with something in every section: history, investments,
/// an open batch and a finished month.
fn busy_state() -> FinancialState {
    let engine = Engine::for_test();
    let mut flow = MonthFlow::new(engine.clone(), OfflineGenerator::new(GameConfig::default_test()), MemoryStore::new());
    let (state, _) = flow.hydrate("u1");
    let mut state = flow.start_month(&state).unwrap().state;
    while state.month_in_progress() {
        let choice = state.current_batch.as_ref().unwrap().current_scenario().unwrap().choices[0].clone();
        state = flow.handle_choice(&state, &choice).unwrap().state;
    }
    let state = engine.start_insurance(&state, 400, 200_000).unwrap();
    let state = engine
        .start_fixed_deposit(
            &state,
            &FixedDepositRequest { amount: 10_000, tenure_months: 6, source: FundingSource::Balance, interest_rate: 6.5 },
        )
        .unwrap();
    let state = engine
        .start_mutual_fund(
            &state,
            &MutualFundRequest { amount: 7_000, fund_type: MutualFundType::Hybrid, source: FundingSource::Balance },
        )
        .unwrap();
    let state = engine.update_investments(&state);
    flow.start_month(&state).unwrap().state
}

#[test]
fn export_then_import_is_lossless() {
    let state = busy_state();
    assert!(state.current_batch.is_some());
    assert_eq!(state.month_summaries.len(), 1);

    for pretty in [false, true] {
        let json = export_state(&state, pretty).unwrap();
        assert_eq!(import_state(&json).unwrap(), state);
    }
}

#[test]
fn export_uses_camel_case_field_names() {
    let json = export_state(&busy_state(), false).unwrap();
    for field in ["\"userId\"", "\"riskScore\"", "\"currentBatch\"", "\"fixedDeposits\"", "\"balanceChange\""] {
        assert!(json.contains(field), "missing {field}");
    }
}

#[test]
fn malformed_json_is_rejected() {
    let err = import_state("{ not json").unwrap_err();
    assert!(matches!(err, GameError::Validation(ref reason) if reason.starts_with("import rejected")));
}

#[test]
fn unknown_fields_are_rejected() {
    let mut value: serde_json::Value =
        serde_json::from_str(&export_state(&busy_state(), false).unwrap()).unwrap();
    value["cheatCode"] = serde_json::json!(true);
    assert!(matches!(import_state(&value.to_string()), Err(GameError::Validation(_))));
}

#[test]
fn states_breaking_invariants_are_rejected() {
    let base: serde_json::Value =
        serde_json::from_str(&export_state(&busy_state(), false).unwrap()).unwrap();

    let mut risky = base.clone();
    risky["riskScore"] = serde_json::json!(140);
    assert!(matches!(import_state(&risky.to_string()), Err(GameError::Validation(_))));

    let mut overdrawn = base.clone();
    overdrawn["savings"] = serde_json::json!(-1);
    assert!(matches!(import_state(&overdrawn.to_string()), Err(GameError::Validation(_))));

    let mut anonymous = base;
    anonymous["userId"] = serde_json::json!("  ");
    assert!(matches!(import_state(&anonymous.to_string()), Err(GameError::Validation(_))));
}

#[test]
fn failed_import_keeps_the_live_state() {
    let live = busy_state();

    let (kept, result) = replace_from_import(&live, "{\"userId\": 5}");
    assert!(result.is_err());
    assert_eq!(kept, live);

    let fresh = Engine::for_test().initialize("u1");
    let (replaced, result) = replace_from_import(&live, &export_state(&fresh, false).unwrap());
    assert!(result.is_ok());
    assert_eq!(replaced, fresh);
}

#[test]
fn import_of_another_players_file_is_rejected() {
    let live = busy_state();
    let stranger = Engine::for_test().initialize("intruder");

    let (kept, result) = replace_from_import(&live, &export_state(&stranger, false).unwrap());

    assert!(matches!(result, Err(GameError::Validation(ref reason)) if reason.contains("intruder")));
    assert_eq!(kept.user_id, "u1");
    assert_eq!(kept, live);
}

#[test]
fn month_records_from_the_future_are_rejected() {
    let base: serde_json::Value =
        serde_json::from_str(&export_state(&busy_state(), false).unwrap()).unwrap();
    let month = base["month"].as_u64().unwrap();

    let mut tracker = base.clone();
    tracker["monthTracker"]["month"] = serde_json::json!(month + 1);
    assert!(matches!(import_state(&tracker.to_string()), Err(GameError::Validation(_))));

    let mut summary = base;
    summary["monthSummaries"][0]["month"] = serde_json::json!(month + 3);
    assert!(matches!(import_state(&summary.to_string()), Err(GameError::Validation(_))));
}
