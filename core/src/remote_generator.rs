//! Generator adapter over a remote text-completion service.
//!
//! The transport is injected as a CompletionClient; this module only
//! owns key rotation, prompt assembly and response parsing. Any
//! malformed response surfaces as GameError::Generator so the month
//! flow can substitute fallback content.

use crate::{
    batch::{Choice, Scenario, ScenarioBatch},
    clock::GameClock,
    error::{GameError, GameResult},
    generator::ScenarioGenerator,
    history,
    key_rotation::KeyRotator,
    state::FinancialState,
    types::Money,
};
use serde::Deserialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The provider refused this key for rate; another key may work.
    RateLimited,
    /// Any other failure. Not retried.
    Failed(String),
}

/// A blocking text-completion transport.
pub trait CompletionClient {
    fn complete(&mut self, api_key: &str, prompt: &str) -> Result<String, CompletionError>;
}

pub struct RemoteGenerator<C> {
    client:              C,
    rotator:             KeyRotator,
    clock:               GameClock,
    scenarios_per_month: usize,
}

impl<C: CompletionClient> RemoteGenerator<C> {
    pub fn new(client: C, rotator: KeyRotator, clock: GameClock, scenarios_per_month: usize) -> Self {
        Self { client, rotator, clock, scenarios_per_month }
    }

    pub fn rotator(&self) -> &KeyRotator {
        &self.rotator
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Send `prompt`, moving to the next key whenever one is rate limited.
    fn call(&mut self, prompt: &str) -> GameResult<String> {
        for _ in 0..self.rotator.len() {
            let now = self.clock.now();
            let (index, key) = self
                .rotator
                .next_key(now)
                .ok_or_else(|| GameError::Generator("all API keys are cooling down".into()))?;
            match self.client.complete(&key, prompt) {
                Ok(text) => return Ok(text),
                Err(CompletionError::RateLimited) => self.rotator.mark_rate_limited(index, now),
                Err(CompletionError::Failed(msg)) => return Err(GameError::Generator(msg)),
            }
        }
        Err(GameError::Generator("no API key accepted the request".into()))
    }
}

impl<C: CompletionClient> ScenarioGenerator for RemoteGenerator<C> {
    fn name(&self) -> &'static str { "remote" }

    fn generate_monthly_scenarios(&mut self, state: &FinancialState) -> GameResult<ScenarioBatch> {
        let prompt = scenario_prompt(state, self.scenarios_per_month);
        let text = self.call(&prompt)?;
        parse_batch(&text, state.month)
    }

    fn generate_reflection(&mut self, state: &FinancialState) -> GameResult<String> {
        let text = self.call(&reflection_prompt(state))?;
        non_empty(text, "reflection")
    }

    fn generate_decision_questions(
        &mut self,
        state: &FinancialState,
        reflection: &str,
    ) -> GameResult<String> {
        let text = self.call(&questions_prompt(state, reflection))?;
        non_empty(text, "decision questions")
    }
}

// ── Prompts ────────────────────────────────────────────────────────

fn state_summary(state: &FinancialState) -> String {
    let m = &state.modifiers;
    format!(
        "Month {}. Balance {}, savings {}, risk score {}/100, insurance {}. \
         Fixed deposits: {}, mutual funds: {}. \
         Behavioral bias: risk band {}-{}, impulse {}, discipline {}, social pressure {}, \
         investment appetite {}.",
        state.month,
        state.balance,
        state.savings,
        state.risk_score,
        if state.insurance_opted { "yes" } else { "no" },
        state.investments.fixed_deposits.len(),
        state.investments.mutual_funds.len(),
        m.risk_floor,
        m.risk_ceiling,
        m.impulse_spending,
        m.saving_discipline,
        m.social_pressure,
        m.investment_appetite,
    )
}

fn scenario_prompt(state: &FinancialState, count: usize) -> String {
    format!(
        "Player: {}\n\
         Write {count} realistic personal-finance scenarios for this month. \
         Reply with JSON only: {{\"scenarios\": [{{\"id\": string, \"situation\": string, \
         \"choices\": [exactly 3 of {{\"id\": string, \"label\": string, \"balanceChange\": integer, \
         \"riskChange\": integer, \"savingsChange\"?: integer, \"isInsurance\"?: boolean, \
         \"description\"?: string}}]}}]}}",
        state_summary(state)
    )
}

fn reflection_prompt(state: &FinancialState) -> String {
    let mut prompt = format!("Player: {}\nThis month's events:\n", state_summary(state));
    for entry in history::entries_for_month(&state.history, state.month) {
        let _ = writeln!(prompt, "- [{}] {} ({:+})", entry.kind.name(), entry.description, entry.balance_change);
    }
    prompt.push_str("Write a short, encouraging reflection on these decisions in plain text.");
    prompt
}

fn questions_prompt(state: &FinancialState, reflection: &str) -> String {
    format!(
        "Player: {}\nReflection: {reflection}\n\
         Ask 3 behavioral questions. Number each question (\"1.\") and follow it \
         with exactly two options on their own lines starting \"A)\" and \"B)\".",
        state_summary(state)
    )
}

// ── Response parsing ───────────────────────────────────────────────

#[derive(Deserialize)]
struct RawBatch {
    scenarios: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScenario {
    #[serde(default)]
    id:        Option<String>,
    situation: String,
    choices:   Vec<RawChoice>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChoice {
    #[serde(default)]
    id:             Option<String>,
    #[serde(alias = "text")]
    label:          String,
    balance_change: f64,
    risk_change:    f64,
    #[serde(default)]
    savings_change: Option<f64>,
    #[serde(default)]
    is_insurance:   Option<bool>,
    #[serde(default)]
    description:    Option<String>,
}

/// Parse a generated batch. Only unparseable JSON or a missing
/// `scenarios` array fails the whole response. A scenario that does not
/// decode (non-numeric deltas, missing fields) becomes an empty
/// placeholder that validation rejects, so only its slot is replaced.
pub fn parse_batch(text: &str, month: crate::types::Month) -> GameResult<ScenarioBatch> {
    let json = extract_json(text)
        .ok_or_else(|| GameError::Generator("response contains no JSON object".into()))?;
    let raw: RawBatch = serde_json::from_str(json)
        .map_err(|e| GameError::Generator(format!("malformed scenario batch: {e}")))?;

    let scenarios = raw
        .scenarios
        .into_iter()
        .enumerate()
        .map(|(slot, value)| match serde_json::from_value::<RawScenario>(value) {
            Ok(s) => Scenario {
                id:        s.id.unwrap_or_else(new_id),
                situation: s.situation,
                choices:   s.choices.into_iter().map(into_choice).collect(),
            },
            Err(e) => {
                log::warn!("month={month} slot={slot}: undecodable generated scenario: {e}");
                Scenario { id: new_id(), situation: String::new(), choices: Vec::new() }
            }
        })
        .collect();
    Ok(ScenarioBatch::with_scenarios(month, scenarios))
}

fn into_choice(raw: RawChoice) -> Choice {
    Choice {
        id:             raw.id.unwrap_or_else(new_id),
        label:          raw.label,
        balance_change: raw.balance_change.round() as Money,
        risk_change:    raw.risk_change.round() as i32,
        savings_change: raw.savings_change.map(|s| s.round() as Money),
        is_insurance:   raw.is_insurance.unwrap_or(false),
        description:    raw.description,
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The outermost `{ ... }` span, ignoring code fences and chatter.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn non_empty(text: String, what: &str) -> GameResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GameError::Generator(format!("empty {what}")));
    }
    Ok(trimmed.to_string())
}
