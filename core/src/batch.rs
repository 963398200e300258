//! Scenario batch controller: the ordered set of scenarios for one month.
//!
//! A batch is replaced wholesale each month. Its `current_index` only
//! moves forward, one step per resolved scenario, and never passes
//! `scenarios.len()`.

use crate::{
    error::{GameError, GameResult},
    types::{Money, Month},
};
use serde::{Deserialize, Serialize};

/// Every scenario offers exactly this many choices.
pub const CHOICES_PER_SCENARIO: usize = 3;

/// One selectable option within a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Choice {
    pub id:             String,
    pub label:          String,
    pub balance_change: Money,
    pub risk_change:    i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_change: Option<Money>,
    #[serde(default)]
    pub is_insurance:   bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scenario {
    pub id:        String,
    pub situation: String,
    pub choices:   Vec<Choice>,
}

impl Scenario {
    /// A scenario is playable iff it has a non-empty situation and
    /// exactly three choices.
    pub fn validate(&self) -> GameResult<()> {
        if self.situation.trim().is_empty() {
            return Err(GameError::InvalidScenarioShape {
                reason: format!("scenario '{}' has an empty situation", self.id),
            });
        }
        if self.choices.len() != CHOICES_PER_SCENARIO {
            return Err(GameError::InvalidScenarioShape {
                reason: format!(
                    "scenario '{}' has {} choices, expected {CHOICES_PER_SCENARIO}",
                    self.id,
                    self.choices.len()
                ),
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn find_choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScenarioBatch {
    pub month:         Month,
    pub scenarios:     Vec<Scenario>,
    pub current_index: usize,
}

impl ScenarioBatch {
    /// An empty batch for `month`. Scenarios are filled in by a generator.
    pub fn new(month: Month) -> Self {
        Self { month, scenarios: Vec::new(), current_index: 0 }
    }

    pub fn with_scenarios(month: Month, scenarios: Vec<Scenario>) -> Self {
        Self { month, scenarios, current_index: 0 }
    }

    /// The scenario awaiting a choice, or None once the batch is complete.
    pub fn current_scenario(&self) -> Option<&Scenario> {
        self.scenarios.get(self.current_index)
    }

    /// A copy of this batch moved one scenario forward.
    /// Advancing a complete batch returns it unchanged.
    pub fn advanced(&self) -> Self {
        let mut next = self.clone();
        next.current_index = (self.current_index + 1).min(self.scenarios.len());
        next
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.scenarios.len()
    }

    pub fn remaining(&self) -> usize {
        self.scenarios.len().saturating_sub(self.current_index)
    }
}

/// Start an empty batch for `month`.
pub fn initialize_monthly_batch(month: Month) -> ScenarioBatch {
    ScenarioBatch::new(month)
}

/// The current scenario of an optional batch.
pub fn current_scenario(batch: Option<&ScenarioBatch>) -> Option<&Scenario> {
    batch.and_then(ScenarioBatch::current_scenario)
}

pub fn advance_scenario_index(batch: &ScenarioBatch) -> ScenarioBatch {
    batch.advanced()
}

/// A missing batch counts as a completed month.
pub fn is_month_complete(batch: Option<&ScenarioBatch>) -> bool {
    batch.map_or(true, ScenarioBatch::is_complete)
}
