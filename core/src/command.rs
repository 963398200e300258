use crate::{
    batch::Choice,
    investments::{FixedDepositRequest, MutualFundRequest},
    modifiers::{BehavioralAnswer, PrimaryDrive, RiskLevel},
    types::Money,
};
use serde::{Deserialize, Serialize};

/// Every player-issued state transition.
/// Variants are only ever appended; unknown tags fail to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    // ── Income and scenario choices ───────────────
    ApplyIncome {
        #[serde(default)]
        amount: Option<Money>,
    },
    ApplyChoice {
        choice: Choice,
    },

    // ── Savings ───────────────────────────────────
    DepositToSavings { amount: Money },
    WithdrawFromSavings { amount: Money },

    // ── Insurance ─────────────────────────────────
    StartInsurance {
        monthly_premium: Money,
        coverage:        Money,
    },
    CancelInsurance,
    DeductInsurancePremium,

    // ── Fixed deposits and mutual funds ───────────
    StartFixedDeposit(FixedDepositRequest),
    BreakFixedDeposit { index: usize },
    StartMutualFund(MutualFundRequest),
    RedeemMutualFund { index: usize },

    // ── Behavioral calibration ────────────────────
    ApplyBehavioralDecisions {
        answers: Vec<BehavioralAnswer>,
    },
    InitializeModifiers {
        primary_drive: PrimaryDrive,
        risk_level:    RiskLevel,
    },

    ResetToInitial,
}

impl Action {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApplyIncome { .. }              => "apply_income",
            Self::ApplyChoice { .. }              => "apply_choice",
            Self::DepositToSavings { .. }         => "deposit_to_savings",
            Self::WithdrawFromSavings { .. }      => "withdraw_from_savings",
            Self::StartInsurance { .. }           => "start_insurance",
            Self::CancelInsurance                 => "cancel_insurance",
            Self::DeductInsurancePremium          => "deduct_insurance_premium",
            Self::StartFixedDeposit(_)            => "start_fixed_deposit",
            Self::BreakFixedDeposit { .. }        => "break_fixed_deposit",
            Self::StartMutualFund(_)              => "start_mutual_fund",
            Self::RedeemMutualFund { .. }         => "redeem_mutual_fund",
            Self::ApplyBehavioralDecisions { .. } => "apply_behavioral_decisions",
            Self::InitializeModifiers { .. }      => "initialize_modifiers",
            Self::ResetToInitial                  => "reset_to_initial",
        }
    }
}
