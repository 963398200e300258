//! The state transition engine.
//!
//! RULES:
//!   - Every transition takes `&FinancialState` and returns a new state.
//!     The input is never modified.
//!   - No transition performs I/O. Time comes from the injected clock,
//!     randomness from the player's own RNG streams.
//!   - Income and choices never fail on balance: narrative shocks may
//!     drive the player into debt. Explicit money movements (savings,
//!     FD, MF) check sufficiency and fail with InsufficientFunds.
//!   - Every change to balance, savings or risk appends one history entry.

use crate::{
    batch::Choice,
    clock::GameClock,
    command::Action,
    config::GameConfig,
    error::{GameError, GameResult},
    history::{EntryKind, HistoryEntry},
    modifiers::{BehavioralAnswer, PrimaryDrive, RiskLevel},
    state::{FinancialState, MonthSummary, MonthTracker, RISK_MAX, RISK_MIN},
    types::Money,
};

#[derive(Debug, Clone)]
pub struct Engine {
    pub config: GameConfig,
    pub clock:  GameClock,
}

impl Engine {
    pub fn new(config: GameConfig, clock: GameClock) -> Self {
        Self { config, clock }
    }

    /// Engine over the built-in configuration and a fixed clock.
    pub fn for_test() -> Self {
        Self::new(GameConfig::default_test(), GameClock::test_epoch())
    }

    pub fn initialize(&self, user_id: &str) -> FinancialState {
        FinancialState::initialize(user_id, &self.config)
    }

    /// Dispatch a tagged action to its transition.
    pub fn apply(&self, state: &FinancialState, action: &Action) -> GameResult<FinancialState> {
        log::debug!("user={} month={} action={}", state.user_id, state.month, action.name());
        match action {
            Action::ApplyIncome { amount } => self.apply_income(state, *amount),
            Action::ApplyChoice { choice } => Ok(self.apply_choice(state, choice)),
            Action::DepositToSavings { amount } => self.deposit_to_savings(state, *amount),
            Action::WithdrawFromSavings { amount } => self.withdraw_from_savings(state, *amount),
            Action::StartInsurance { monthly_premium, coverage } => {
                self.start_insurance(state, *monthly_premium, *coverage)
            }
            Action::CancelInsurance => Ok(self.cancel_insurance(state)),
            Action::DeductInsurancePremium => Ok(self.deduct_insurance_premium(state)),
            Action::StartFixedDeposit(request) => self.start_fixed_deposit(state, request),
            Action::BreakFixedDeposit { index } => self.break_fixed_deposit(state, *index),
            Action::StartMutualFund(request) => self.start_mutual_fund(state, request),
            Action::RedeemMutualFund { index } => self.redeem_mutual_fund(state, *index),
            Action::ApplyBehavioralDecisions { answers } => {
                self.apply_behavioral_decisions(state, answers)
            }
            Action::InitializeModifiers { primary_drive, risk_level } => {
                Ok(self.initialize_modifiers(state, *primary_drive, *risk_level))
            }
            Action::ResetToInitial => Ok(self.reset_to_initial(state)),
        }
    }

    // ── Income ─────────────────────────────────────────────────

    /// Gross income minus the flat income tax, rounded to whole units.
    pub fn net_income(&self, gross: Money) -> Money {
        let tax = (gross as f64 * self.config.income_tax_pct / 100.0).round() as Money;
        gross - tax
    }

    /// Credit monthly income (configured amount when `amount` is None).
    pub fn apply_income(&self, state: &FinancialState, amount: Option<Money>) -> GameResult<FinancialState> {
        let gross = amount.unwrap_or(self.config.monthly_income);
        if gross < 0 {
            return Err(GameError::InvalidAmount { operation: "income", amount: gross });
        }
        let net = self.net_income(gross);

        let mut next = state.clone();
        next.balance = next.balance.saturating_add(net);
        self.record(
            &mut next,
            HistoryEntry::new(
                EntryKind::Income,
                state.month,
                net,
                format!("Monthly income of {gross} credited ({} after tax)", net),
                self.clock.now(),
            ),
        );
        Ok(next)
    }

    // ── Choices ────────────────────────────────────────────────

    /// Apply a scenario choice. Never fails: balance may go negative.
    ///
    /// A savings withdrawal larger than the savings held empties savings
    /// and takes the shortfall from balance, so savings stay non-negative.
    pub fn apply_choice(&self, state: &FinancialState, choice: &Choice) -> FinancialState {
        let mut next = state.clone();

        let mut balance_delta = choice.balance_change;
        let mut savings_delta = 0;
        if let Some(requested) = choice.savings_change {
            let after = next.savings.saturating_add(requested);
            if after < 0 {
                savings_delta = -next.savings;
                balance_delta = balance_delta.saturating_add(after);
            } else {
                savings_delta = requested;
            }
        }

        next.balance = next.balance.saturating_add(balance_delta);
        next.savings += savings_delta;

        let old_risk = next.risk_score;
        next.risk_score = clamp_risk(old_risk.saturating_add(choice.risk_change));
        let applied_risk = next.risk_score - old_risk;

        if choice.is_insurance {
            next.insurance_opted = true;
        }
        if let Some(tracker) = next.month_tracker.as_mut() {
            tracker.choices_made += 1;
        }

        let description = match &choice.description {
            Some(d) => format!("{}: {d}", choice.label),
            None    => choice.label.clone(),
        };
        let mut entry = HistoryEntry::new(
            EntryKind::Choice,
            state.month,
            balance_delta,
            description,
            self.clock.now(),
        )
        .with_risk(applied_risk);
        if choice.savings_change.is_some() {
            entry = entry.with_savings(savings_delta);
        }
        self.record(&mut next, entry);
        next
    }

    // ── Savings ────────────────────────────────────────────────

    pub fn deposit_to_savings(&self, state: &FinancialState, amount: Money) -> GameResult<FinancialState> {
        if amount <= 0 {
            return Err(GameError::InvalidAmount { operation: "deposit", amount });
        }
        if state.balance < amount {
            return Err(GameError::InsufficientFunds {
                account: "balance".into(),
                required: amount,
                available: state.balance,
            });
        }
        let mut next = state.clone();
        next.balance -= amount;
        next.savings += amount;
        self.record(
            &mut next,
            HistoryEntry::new(
                EntryKind::Investment,
                state.month,
                -amount,
                format!("Deposited {amount} into savings"),
                self.clock.now(),
            )
            .with_savings(amount),
        );
        Ok(next)
    }

    pub fn withdraw_from_savings(&self, state: &FinancialState, amount: Money) -> GameResult<FinancialState> {
        if amount <= 0 {
            return Err(GameError::InvalidAmount { operation: "withdrawal", amount });
        }
        if state.savings < amount {
            return Err(GameError::InsufficientFunds {
                account: "savings".into(),
                required: amount,
                available: state.savings,
            });
        }
        let mut next = state.clone();
        next.savings -= amount;
        next.balance += amount;
        self.record(
            &mut next,
            HistoryEntry::new(
                EntryKind::Investment,
                state.month,
                amount,
                format!("Withdrew {amount} from savings"),
                self.clock.now(),
            )
            .with_savings(-amount),
        );
        Ok(next)
    }

    // ── Modifiers ──────────────────────────────────────────────

    /// Setup-time calibration. Repeat calls overwrite, never compound.
    pub fn initialize_modifiers(
        &self,
        state: &FinancialState,
        drive: PrimaryDrive,
        level: RiskLevel,
    ) -> FinancialState {
        let mut next = state.clone();
        next.modifiers = state.modifiers.calibrated(drive, level);
        next
    }

    /// Nudge modifiers by this month's behavioral answers. Cumulative.
    pub fn apply_behavioral_decisions(
        &self,
        state: &FinancialState,
        answers: &[BehavioralAnswer],
    ) -> GameResult<FinancialState> {
        let mut next = state.clone();
        next.modifiers = state.modifiers.with_answers(answers)?;
        Ok(next)
    }

    // ── Month boundaries ───────────────────────────────────────

    /// Move to the next month and open its tracker.
    pub fn advance_month(&self, state: &FinancialState) -> FinancialState {
        let mut next = state.clone();
        next.month += 1;
        next.month_tracker = Some(MonthTracker {
            month:           next.month,
            opening_balance: next.balance,
            opening_savings: next.savings,
            opening_risk:    next.risk_score,
            choices_made:    0,
        });
        next
    }

    /// Record the month's net effect and close its tracker.
    ///
    /// Does not change `month` and leaves `current_batch` for the caller
    /// to clear. Finalizing an already finalized month is a no-op.
    pub fn finalize_month(&self, state: &FinancialState) -> FinancialState {
        if state.month_summaries.last().is_some_and(|s| s.month == state.month) {
            return state.clone();
        }

        let mut next = state.clone();
        let tracker = next.month_tracker.take().unwrap_or(MonthTracker {
            month:           state.month,
            opening_balance: state.balance,
            opening_savings: state.savings,
            opening_risk:    state.risk_score,
            choices_made:    0,
        });
        let summary = MonthSummary {
            month:          state.month,
            balance_change: state.balance - tracker.opening_balance,
            savings_change: state.savings - tracker.opening_savings,
            risk_change:    state.risk_score - tracker.opening_risk,
            choices_made:   tracker.choices_made,
            net_worth:      state.net_worth(),
        };
        let description = format!(
            "Month {} closed: balance {:+}, savings {:+}, risk {:+} over {} choices",
            summary.month,
            summary.balance_change,
            summary.savings_change,
            summary.risk_change,
            summary.choices_made,
        );
        next.month_summaries.push(summary);
        self.record(
            &mut next,
            HistoryEntry::new(EntryKind::System, state.month, 0, description, self.clock.now()),
        );
        log::info!("user={} month {} finalized", state.user_id, state.month);
        next
    }

    /// Back to a freshly initialized state. The only way `month` decreases.
    pub fn reset_to_initial(&self, state: &FinancialState) -> FinancialState {
        log::info!("user={} reset to initial state", state.user_id);
        self.initialize(&state.user_id)
    }

    pub(crate) fn record(&self, state: &mut FinancialState, entry: HistoryEntry) {
        log::debug!(
            "user={} month={} {}: {}",
            state.user_id,
            entry.month,
            entry.kind.name(),
            entry.description
        );
        state.history.push(entry);
    }
}

pub fn clamp_risk(score: i32) -> i32 {
    score.clamp(RISK_MIN, RISK_MAX)
}
