//! Insurance, fixed deposit and mutual fund transitions.

use finlife_core::{
    engine::Engine,
    error::GameError,
    history::EntryKind,
    investments::{maturity_amount, FixedDepositRequest, MutualFundRequest},
    state::{FinancialState, FundingSource, MutualFundType},
};

fn engine() -> Engine {
    Engine::for_test()
}

fn with_balance(engine: &Engine, balance: i64) -> FinancialState {
    let mut state = engine.initialize("u1");
    state.balance = balance;
    state
}

fn fd(amount: i64, tenure_months: u32, interest_rate: f64) -> FixedDepositRequest {
    FixedDepositRequest { amount, tenure_months, source: FundingSource::Balance, interest_rate }
}

#[test]
fn fixed_deposit_debits_balance_and_precomputes_maturity() {
    let engine = engine();
    let state = with_balance(&engine, 5_000);

    let next = engine.start_fixed_deposit(&state, &fd(5_000, 12, 7.5)).unwrap();

    assert_eq!(next.balance, 0);
    assert_eq!(next.investments.fixed_deposits.len(), 1);
    let deposit = &next.investments.fixed_deposits[0];
    assert_eq!(deposit.maturity_amount, 5_375);
    assert_eq!(deposit.remaining_months, 12);
    assert_eq!(next.history.last().unwrap().balance_change, -5_000);
}

#[test]
fn maturity_formula_is_simple_interest() {
    assert_eq!(maturity_amount(10_000, 6.0, 6), 10_300);
    assert_eq!(maturity_amount(20_000, 0.0, 24), 20_000);
    assert_eq!(maturity_amount(1_000, 9.0, 36), 1_270);
}

#[test]
fn fixed_deposit_from_empty_savings_fails() {
    let engine = engine();
    let state = with_balance(&engine, 100_000);
    let request = FixedDepositRequest { source: FundingSource::Savings, ..fd(5_000, 12, 7.5) };

    let err = engine.start_fixed_deposit(&state, &request).unwrap_err();

    match err {
        GameError::InsufficientFunds { account, required, available } => {
            assert_eq!(account, "savings");
            assert_eq!(required, 5_000);
            assert_eq!(available, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn fixed_deposit_rejects_bad_terms() {
    let engine = engine();
    let state = with_balance(&engine, 100_000);
    assert!(matches!(
        engine.start_fixed_deposit(&state, &fd(0, 12, 7.5)),
        Err(GameError::InvalidAmount { .. })
    ));
    assert!(matches!(
        engine.start_fixed_deposit(&state, &fd(1_000, 0, 7.5)),
        Err(GameError::Validation(_))
    ));
    assert!(matches!(
        engine.start_fixed_deposit(&state, &fd(1_000, 12, f64::NAN)),
        Err(GameError::Validation(_))
    ));
}

#[test]
fn fixed_deposit_matures_after_its_tenure() {
    let engine = engine();
    let state = with_balance(&engine, 5_000);
    let mut state = engine.start_fixed_deposit(&state, &fd(5_000, 12, 7.5)).unwrap();

    for _ in 0..11 {
        state = engine.update_investments(&state);
    }
    assert_eq!(state.investments.fixed_deposits.len(), 1);
    assert_eq!(state.investments.fixed_deposits[0].remaining_months, 1);
    assert_eq!(state.balance, 0);

    state = engine.update_investments(&state);
    assert!(state.investments.fixed_deposits.is_empty());
    assert_eq!(state.balance, 5_375);
    let entry = state.history.last().unwrap();
    assert_eq!(entry.kind, EntryKind::Investment);
    assert_eq!(entry.balance_change, 5_375);
}

#[test]
fn breaking_a_deposit_pays_accrued_interest_minus_penalty() {
    let engine = engine();
    let state = with_balance(&engine, 12_000);
    let mut state = engine.start_fixed_deposit(&state, &fd(12_000, 12, 10.0)).unwrap();
    for _ in 0..6 {
        state = engine.update_investments(&state);
    }

    let broken = engine.break_fixed_deposit(&state, 0).unwrap();

    // 600 accrued over six months, 120 penalty at 1%.
    assert_eq!(broken.balance, 12_480);
    assert!(broken.investments.fixed_deposits.is_empty());
    assert!(matches!(engine.break_fixed_deposit(&broken, 0), Err(GameError::Validation(_))));
}

#[test]
fn mutual_fund_grows_within_its_return_band() {
    let engine = engine();
    let state = with_balance(&engine, 20_000);
    let state = engine
        .start_mutual_fund(
            &state,
            &MutualFundRequest { amount: 10_000, fund_type: MutualFundType::Equity, source: FundingSource::Balance },
        )
        .unwrap();
    let state = engine
        .start_mutual_fund(
            &state,
            &MutualFundRequest { amount: 10_000, fund_type: MutualFundType::Debt, source: FundingSource::Balance },
        )
        .unwrap();
    assert_eq!(state.balance, 0);
    assert_eq!(state.investments.mutual_funds[0].current_value, 10_000);

    let next = engine.update_investments(&state);

    let equity = next.investments.mutual_funds[0].current_value;
    let debt = next.investments.mutual_funds[1].current_value;
    assert!((10_094..=10_118).contains(&equity), "equity moved to {equity}");
    assert!((10_048..=10_065).contains(&debt), "debt moved to {debt}");
    assert_eq!(next.history.len(), state.history.len(), "valuation moves are not history");
}

#[test]
fn market_moves_replay_identically() {
    let engine = engine();
    let state = with_balance(&engine, 50_000);
    let state = engine
        .start_mutual_fund(
            &state,
            &MutualFundRequest { amount: 50_000, fund_type: MutualFundType::Hybrid, source: FundingSource::Balance },
        )
        .unwrap();
    assert_eq!(engine.update_investments(&state), engine.update_investments(&state));
}

#[test]
fn redeeming_a_fund_credits_its_current_value() {
    let engine = engine();
    let state = with_balance(&engine, 10_000);
    let state = engine
        .start_mutual_fund(
            &state,
            &MutualFundRequest { amount: 10_000, fund_type: MutualFundType::Equity, source: FundingSource::Balance },
        )
        .unwrap();
    let grown = engine.update_investments(&state);
    let value = grown.investments.mutual_funds[0].current_value;

    let redeemed = engine.redeem_mutual_fund(&grown, 0).unwrap();

    assert_eq!(redeemed.balance, value);
    assert!(redeemed.investments.mutual_funds.is_empty());
}

#[test]
fn insurance_lifecycle() {
    let engine = engine();
    let state = with_balance(&engine, 100);

    let insured = engine.start_insurance(&state, 500, 100_000).unwrap();
    assert!(insured.investments.insurance.active);
    assert!(insured.insurance_opted);

    // Premiums may overdraw, like choices.
    let charged = engine.deduct_insurance_premium(&insured);
    assert_eq!(charged.balance, -400);
    assert_eq!(charged.history.last().unwrap().balance_change, -500);

    let cancelled = engine.cancel_insurance(&charged);
    assert!(!cancelled.investments.insurance.active);
    assert!(!cancelled.insurance_opted);
    assert_eq!(cancelled.investments.insurance.monthly_premium, 0);

    assert_eq!(engine.deduct_insurance_premium(&cancelled), cancelled);
    assert_eq!(engine.cancel_insurance(&cancelled), cancelled);

    assert!(matches!(engine.start_insurance(&state, 0, 1_000), Err(GameError::InvalidAmount { .. })));
}

#[test]
fn net_worth_counts_every_holding() {
    let engine = engine();
    let state = with_balance(&engine, 30_000);
    let state = engine.deposit_to_savings(&state, 5_000).unwrap();
    let state = engine.start_fixed_deposit(&state, &fd(10_000, 6, 6.0)).unwrap();
    let state = engine
        .start_mutual_fund(
            &state,
            &MutualFundRequest { amount: 5_000, fund_type: MutualFundType::Debt, source: FundingSource::Balance },
        )
        .unwrap();
    assert_eq!(state.net_worth(), 30_000);
}
