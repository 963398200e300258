//! The financial state model: one immutable snapshot of a player's life.
//!
//! RULE: Nothing mutates a FinancialState in place once it has been
//! handed out. Every transition clones, changes the clone, and returns it.

use crate::{
    batch::ScenarioBatch,
    config::GameConfig,
    error::{GameError, GameResult},
    history::HistoryEntry,
    modifiers::Modifiers,
    types::{Money, Month, UserId},
};
use serde::{Deserialize, Serialize};

pub const RISK_MIN: i32 = 0;
pub const RISK_MAX: i32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FinancialState {
    pub user_id:          UserId,
    pub month:            Month,
    pub balance:          Money,
    pub savings:          Money,
    pub risk_score:       i32,
    pub insurance_opted:  bool,
    pub investments:      Investments,
    pub modifiers:        Modifiers,
    pub current_batch:    Option<ScenarioBatch>,
    pub history:          Vec<HistoryEntry>,
    #[serde(default)]
    pub month_summaries:  Vec<MonthSummary>,
    #[serde(default)]
    pub month_tracker:    Option<MonthTracker>,
    /// Set once hydrated or freshly initialized. Never persisted.
    #[serde(skip)]
    pub is_loaded:        bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Investments {
    pub insurance:      Insurance,
    pub fixed_deposits: Vec<FixedDeposit>,
    pub mutual_funds:   Vec<MutualFund>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Insurance {
    pub active:          bool,
    pub monthly_premium: Money,
    pub coverage:        Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixedDeposit {
    pub amount:           Money,
    /// Annual simple interest, in percent.
    pub interest_rate:    f64,
    pub tenure_months:    u32,
    pub remaining_months: u32,
    pub maturity_amount:  Money,
}

impl FixedDeposit {
    pub fn elapsed_months(&self) -> u32 {
        self.tenure_months.saturating_sub(self.remaining_months)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutualFundType {
    Equity,
    Debt,
    Hybrid,
}

impl MutualFundType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Debt   => "debt",
            Self::Hybrid => "hybrid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MutualFund {
    #[serde(rename = "type")]
    pub fund_type:     MutualFundType,
    pub amount:        Money,
    pub current_value: Money,
}

/// Where money for a new investment comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    Balance,
    Savings,
}

impl FundingSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Savings => "savings",
        }
    }
}

/// Transient per-month bookkeeping, opened at month start and closed
/// by month finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MonthTracker {
    pub month:           Month,
    pub opening_balance: Money,
    pub opening_savings: Money,
    pub opening_risk:    i32,
    pub choices_made:    u32,
}

/// The recorded net effect of one finished month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MonthSummary {
    pub month:          Month,
    pub balance_change: Money,
    pub savings_change: Money,
    pub risk_change:    i32,
    pub choices_made:   u32,
    pub net_worth:      Money,
}

impl FinancialState {
    /// A fresh state for `user_id`. Deterministic: only the id varies.
    pub fn initialize(user_id: impl Into<UserId>, config: &GameConfig) -> Self {
        Self {
            user_id:         user_id.into(),
            month:           0,
            balance:         config.starting_balance,
            savings:         0,
            risk_score:      config.default_risk_score.clamp(RISK_MIN, RISK_MAX),
            insurance_opted: false,
            investments:     Investments::default(),
            modifiers:       Modifiers::neutral(),
            current_batch:   None,
            history:         Vec::new(),
            month_summaries: Vec::new(),
            month_tracker:   None,
            is_loaded:       true,
        }
    }

    /// Balance + savings + FD principal + MF current value.
    pub fn net_worth(&self) -> Money {
        let fd: Money = self.investments.fixed_deposits.iter().map(|f| f.amount).sum();
        let mf: Money = self.investments.mutual_funds.iter().map(|m| m.current_value).sum();
        self.balance
            .saturating_add(self.savings)
            .saturating_add(fd)
            .saturating_add(mf)
    }

    /// Funds available in `source`.
    pub fn available(&self, source: FundingSource) -> Money {
        match source {
            FundingSource::Balance => self.balance,
            FundingSource::Savings => self.savings,
        }
    }

    /// Debit `amount` from `source`, failing if it holds less.
    pub(crate) fn debit(&mut self, source: FundingSource, amount: Money) -> GameResult<()> {
        let available = self.available(source);
        if available < amount {
            return Err(GameError::InsufficientFunds {
                account: source.name().to_string(),
                required: amount,
                available,
            });
        }
        match source {
            FundingSource::Balance => self.balance -= amount,
            FundingSource::Savings => self.savings -= amount,
        }
        Ok(())
    }

    /// True while a month's scenarios are still being played.
    pub fn month_in_progress(&self) -> bool {
        self.current_batch
            .as_ref()
            .is_some_and(|b| b.month == self.month && !b.is_complete())
    }

    /// Structural invariants. Used to vet imported or loaded states.
    pub fn check_invariants(&self) -> GameResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(GameError::Validation("user id is empty".into()));
        }
        if !(RISK_MIN..=RISK_MAX).contains(&self.risk_score) {
            return Err(GameError::Validation(format!(
                "risk score {} outside [{RISK_MIN}, {RISK_MAX}]",
                self.risk_score
            )));
        }
        if self.savings < 0 {
            return Err(GameError::Validation("savings are negative".into()));
        }
        let insurance = &self.investments.insurance;
        if insurance.monthly_premium < 0 || insurance.coverage < 0 {
            return Err(GameError::Validation("insurance terms are negative".into()));
        }
        for fd in &self.investments.fixed_deposits {
            if fd.amount <= 0
                || fd.tenure_months == 0
                || fd.remaining_months > fd.tenure_months
                || !fd.interest_rate.is_finite()
                || fd.interest_rate < 0.0
            {
                return Err(GameError::Validation("malformed fixed deposit record".into()));
            }
        }
        if self.investments.mutual_funds.iter().any(|m| m.amount <= 0 || m.current_value < 0) {
            return Err(GameError::Validation("malformed mutual fund record".into()));
        }
        if let Some(batch) = &self.current_batch {
            if batch.current_index > batch.scenarios.len() {
                return Err(GameError::Validation("batch index past its scenarios".into()));
            }
            if batch.month > self.month {
                return Err(GameError::Validation("batch belongs to a future month".into()));
            }
            if let Some(bad) = batch.scenarios.iter().find_map(|s| s.validate().err()) {
                return Err(GameError::Validation(bad.to_string()));
            }
        }
        if self.history.iter().any(|e| e.month > self.month) {
            return Err(GameError::Validation("history entry from a future month".into()));
        }
        if self.month_tracker.as_ref().is_some_and(|t| t.month > self.month) {
            return Err(GameError::Validation("month tracker belongs to a future month".into()));
        }
        if self.month_summaries.iter().any(|s| s.month > self.month) {
            return Err(GameError::Validation("month summary from a future month".into()));
        }
        self.modifiers.check()
    }
}
