//! Scenario generator contract.
//!
//! RULE: The game core never depends on how content is produced.
//! Generators receive the current state (including modifiers) as
//! context and return structured batches or plain text. Any error they
//! return is absorbed by the month flow and replaced with fallback
//! content.

use crate::{
    batch::ScenarioBatch,
    config::GameConfig,
    error::GameResult,
    fallback,
    state::FinancialState,
};

/// The contract every content generator must fulfill.
pub trait ScenarioGenerator {
    /// Unique stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Scenarios for `state.month`. The month flow validates the shape.
    fn generate_monthly_scenarios(&mut self, state: &FinancialState) -> GameResult<ScenarioBatch>;

    /// A short reflection on the month just played.
    fn generate_reflection(&mut self, state: &FinancialState) -> GameResult<String>;

    /// Numbered questions, each followed by `A)` and `B)` option lines.
    fn generate_decision_questions(
        &mut self,
        state: &FinancialState,
        reflection: &str,
    ) -> GameResult<String>;
}

/// Generator that never leaves the process: serves the pre-authored pool.
pub struct OfflineGenerator {
    config: GameConfig,
}

impl OfflineGenerator {
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }
}

impl ScenarioGenerator for OfflineGenerator {
    fn name(&self) -> &'static str { "offline" }

    fn generate_monthly_scenarios(&mut self, state: &FinancialState) -> GameResult<ScenarioBatch> {
        Ok(fallback::fallback_batch(&self.config, &state.user_id, state.month))
    }

    fn generate_reflection(&mut self, state: &FinancialState) -> GameResult<String> {
        Ok(fallback::fallback_reflection(&self.config, state))
    }

    fn generate_decision_questions(
        &mut self,
        _state: &FinancialState,
        _reflection: &str,
    ) -> GameResult<String> {
        Ok(fallback::fallback_decision_questions())
    }
}
