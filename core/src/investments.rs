//! Investment transitions: insurance, fixed deposits, mutual funds.
//!
//! Same rules as engine.rs: pure, one history entry per money movement.
//! Starting an instrument checks that the funding source can cover it;
//! insurance premiums do not, and may push the balance negative.

use crate::{
    engine::Engine,
    error::{GameError, GameResult},
    history::{EntryKind, HistoryEntry},
    rng::{GameRng, RngBank, RngSlot},
    state::{FinancialState, FixedDeposit, FundingSource, MutualFund, MutualFundType},
    types::Money,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedDepositRequest {
    pub amount:        Money,
    pub tenure_months: u32,
    pub source:        FundingSource,
    /// Annual simple interest, in percent.
    pub interest_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutualFundRequest {
    pub amount:    Money,
    pub fund_type: MutualFundType,
    pub source:    FundingSource,
}

/// `amount * (1 + rate/100 * tenure/12)`, rounded.
pub fn maturity_amount(amount: Money, interest_rate: f64, tenure_months: u32) -> Money {
    let factor = 1.0 + interest_rate / 100.0 * f64::from(tenure_months) / 12.0;
    (amount as f64 * factor).round() as Money
}

/// Convert an annual return to its monthly compounding step.
pub fn monthly_rate(annual_pct: f64) -> f64 {
    (1.0 + annual_pct / 100.0).powf(1.0 / 12.0) - 1.0
}

impl Engine {
    // ── Insurance ──────────────────────────────────────────────

    pub fn start_insurance(
        &self,
        state: &FinancialState,
        monthly_premium: Money,
        coverage: Money,
    ) -> GameResult<FinancialState> {
        if monthly_premium <= 0 {
            return Err(GameError::InvalidAmount { operation: "insurance premium", amount: monthly_premium });
        }
        if coverage <= 0 {
            return Err(GameError::InvalidAmount { operation: "insurance coverage", amount: coverage });
        }
        let mut next = state.clone();
        let insurance = &mut next.investments.insurance;
        insurance.active = true;
        insurance.monthly_premium = monthly_premium;
        insurance.coverage = coverage;
        next.insurance_opted = true;
        self.record(
            &mut next,
            HistoryEntry::new(
                EntryKind::Investment,
                state.month,
                0,
                format!("Insurance started: premium {monthly_premium}/month, coverage {coverage}"),
                self.clock.now(),
            ),
        );
        Ok(next)
    }

    /// Cancelling without an active policy returns the state unchanged.
    pub fn cancel_insurance(&self, state: &FinancialState) -> FinancialState {
        if !state.investments.insurance.active {
            return state.clone();
        }
        let mut next = state.clone();
        next.investments.insurance = Default::default();
        next.insurance_opted = false;
        self.record(
            &mut next,
            HistoryEntry::new(EntryKind::Investment, state.month, 0, "Insurance cancelled", self.clock.now()),
        );
        next
    }

    /// Charge this month's premium. Never fails on balance.
    pub fn deduct_insurance_premium(&self, state: &FinancialState) -> FinancialState {
        let insurance = &state.investments.insurance;
        if !insurance.active || insurance.monthly_premium == 0 {
            return state.clone();
        }
        let premium = insurance.monthly_premium;
        let mut next = state.clone();
        next.balance = next.balance.saturating_sub(premium);
        self.record(
            &mut next,
            HistoryEntry::new(
                EntryKind::Investment,
                state.month,
                -premium,
                format!("Insurance premium of {premium} paid"),
                self.clock.now(),
            ),
        );
        next
    }

    // ── Fixed deposits ─────────────────────────────────────────

    pub fn start_fixed_deposit(
        &self,
        state: &FinancialState,
        request: &FixedDepositRequest,
    ) -> GameResult<FinancialState> {
        if request.amount <= 0 {
            return Err(GameError::InvalidAmount { operation: "fixed deposit", amount: request.amount });
        }
        if request.tenure_months == 0 {
            return Err(GameError::Validation("fixed deposit tenure must be at least one month".into()));
        }
        if !request.interest_rate.is_finite() || request.interest_rate < 0.0 {
            return Err(GameError::Validation(format!(
                "fixed deposit interest rate {} is not a valid percentage",
                request.interest_rate
            )));
        }

        let mut next = state.clone();
        next.debit(request.source, request.amount)?;
        let deposit = FixedDeposit {
            amount:           request.amount,
            interest_rate:    request.interest_rate,
            tenure_months:    request.tenure_months,
            remaining_months: request.tenure_months,
            maturity_amount:  maturity_amount(request.amount, request.interest_rate, request.tenure_months),
        };
        let description = format!(
            "Fixed deposit of {} for {} months at {}% (matures at {})",
            deposit.amount, deposit.tenure_months, deposit.interest_rate, deposit.maturity_amount
        );
        next.investments.fixed_deposits.push(deposit);
        let entry = self.funding_entry(state, request.source, request.amount, description);
        self.record(&mut next, entry);
        Ok(next)
    }

    /// Close a deposit before maturity: principal plus interest accrued
    /// so far, minus the early-break penalty on the principal.
    pub fn break_fixed_deposit(&self, state: &FinancialState, index: usize) -> GameResult<FinancialState> {
        let fd = state
            .investments
            .fixed_deposits
            .get(index)
            .ok_or_else(|| GameError::Validation(format!("no fixed deposit at index {index}")))?;

        let accrued = (fd.amount as f64 * fd.interest_rate / 100.0 * f64::from(fd.elapsed_months()) / 12.0)
            .round() as Money;
        let penalty = (fd.amount as f64 * self.config.fd_break_penalty_pct / 100.0).round() as Money;
        let payout = (fd.amount + accrued - penalty).max(0);

        let mut next = state.clone();
        next.investments.fixed_deposits.remove(index);
        next.balance = next.balance.saturating_add(payout);
        self.record(
            &mut next,
            HistoryEntry::new(
                EntryKind::Investment,
                state.month,
                payout,
                format!("Fixed deposit of {} broken early: {payout} paid out after a {penalty} penalty", fd.amount),
                self.clock.now(),
            ),
        );
        Ok(next)
    }

    // ── Mutual funds ───────────────────────────────────────────

    pub fn start_mutual_fund(
        &self,
        state: &FinancialState,
        request: &MutualFundRequest,
    ) -> GameResult<FinancialState> {
        if request.amount <= 0 {
            return Err(GameError::InvalidAmount { operation: "mutual fund", amount: request.amount });
        }
        let mut next = state.clone();
        next.debit(request.source, request.amount)?;
        next.investments.mutual_funds.push(MutualFund {
            fund_type:     request.fund_type,
            amount:        request.amount,
            current_value: request.amount,
        });
        let description = format!("Invested {} in a {} mutual fund", request.amount, request.fund_type.name());
        let entry = self.funding_entry(state, request.source, request.amount, description);
        self.record(&mut next, entry);
        Ok(next)
    }

    /// Sell a fund at its current value.
    pub fn redeem_mutual_fund(&self, state: &FinancialState, index: usize) -> GameResult<FinancialState> {
        let fund = state
            .investments
            .mutual_funds
            .get(index)
            .ok_or_else(|| GameError::Validation(format!("no mutual fund at index {index}")))?;
        let value = fund.current_value;
        let gain = value - fund.amount;

        let mut next = state.clone();
        next.investments.mutual_funds.remove(index);
        next.balance = next.balance.saturating_add(value);
        self.record(
            &mut next,
            HistoryEntry::new(
                EntryKind::Investment,
                state.month,
                value,
                format!("Redeemed {} mutual fund for {value} ({gain:+} on {})", fund.fund_type.name(), fund.amount),
                self.clock.now(),
            ),
        );
        Ok(next)
    }

    // ── Monthly progression ────────────────────────────────────

    /// Age every deposit by one month and move every fund by one
    /// month of market return. Returns are drawn from the player's
    /// market stream for the state's month, so replays are identical.
    pub fn update_investments(&self, state: &FinancialState) -> FinancialState {
        let mut rng = RngBank::for_user(&state.user_id)
            .for_slot_at_month(RngSlot::MarketReturns, state.month);
        self.update_investments_with(state, &mut rng)
    }

    pub fn update_investments_with(&self, state: &FinancialState, rng: &mut GameRng) -> FinancialState {
        let mut next = state.clone();

        let mut matured = Vec::new();
        next.investments.fixed_deposits.retain_mut(|fd| {
            fd.remaining_months = fd.remaining_months.saturating_sub(1);
            if fd.remaining_months == 0 {
                matured.push(fd.clone());
                false
            } else {
                true
            }
        });
        for fd in matured {
            next.balance = next.balance.saturating_add(fd.maturity_amount);
            self.record(
                &mut next,
                HistoryEntry::new(
                    EntryKind::Investment,
                    state.month,
                    fd.maturity_amount,
                    format!(
                        "Fixed deposit of {} matured after {} months: {} credited",
                        fd.amount, fd.tenure_months, fd.maturity_amount
                    ),
                    self.clock.now(),
                ),
            );
        }

        for fund in &mut next.investments.mutual_funds {
            let range = self.config.fund_returns.range_for(fund.fund_type);
            let annual = rng.uniform(range.annual_low_pct, range.annual_high_pct);
            let step = monthly_rate(annual);
            fund.current_value = (fund.current_value as f64 * (1.0 + step)).round() as Money;
        }

        next
    }

    /// History entry for money leaving `source` into an instrument.
    fn funding_entry(
        &self,
        state: &FinancialState,
        source: FundingSource,
        amount: Money,
        description: String,
    ) -> HistoryEntry {
        let entry = HistoryEntry::new(EntryKind::Investment, state.month, 0, description, self.clock.now());
        match source {
            FundingSource::Balance => HistoryEntry { balance_change: -amount, ..entry },
            FundingSource::Savings => entry.with_savings(-amount),
        }
    }
}
