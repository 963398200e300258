//! The month flow: start month / make choice / end month.
//!
//! PROTOCOL (per month):
//!   1. start_month: advance month, credit income, charge premium,
//!      age investments, attach a validated batch, persist.
//!      If the current month's batch is still open, resume it instead:
//!      no income, no new batch.
//!   2. handle_choice (once per scenario): apply the choice, advance
//!      the batch, persist.
//!   3. On the last choice: reflection and decision questions from the
//!      generator, finalize the month, clear the batch, persist.
//!
//! RULES:
//!   - Generator and persistence failures never escape. Generation
//!     falls back to pre-authored content; failed saves are logged and
//!     reported through `persisted`.
//!   - Only caller-actionable errors are returned: insufficient funds,
//!     bad amounts, a choice that is not on offer, no month in progress.

use crate::{
    batch::{Choice, Scenario, ScenarioBatch},
    command::Action,
    engine::Engine,
    error::{GameError, GameResult},
    fallback,
    generator::ScenarioGenerator,
    modifiers::BehavioralAnswer,
    questions::{parse_decision_questions, DecisionQuestion},
    state::FinancialState,
    store::Persistence,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationSource {
    /// Loaded from the store.
    Loaded,
    /// Nothing stored yet; freshly initialized.
    Fresh,
    /// The store failed; freshly initialized. Saving will overwrite
    /// whatever the store could not read.
    StoreFailed,
}

#[derive(Debug, Clone)]
pub struct MonthStart {
    pub state:    FinancialState,
    pub scenario: Scenario,
    /// True when an open batch was resumed rather than a new month begun.
    pub resumed:  bool,
    /// Batch positions filled from the fallback pool.
    pub fallback_scenarios: usize,
    pub persisted: bool,
}

#[derive(Debug, Clone)]
pub struct ChoiceOutcome {
    pub state:              FinancialState,
    pub next_scenario:      Option<Scenario>,
    pub is_month_end:       bool,
    pub reflection:         Option<String>,
    pub decision_questions: Vec<DecisionQuestion>,
    pub persisted:          bool,
}

#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub state:     FinancialState,
    pub persisted: bool,
}

pub struct MonthFlow<G, P> {
    engine:    Engine,
    generator: G,
    store:     P,
}

impl<G: ScenarioGenerator, P: Persistence> MonthFlow<G, P> {
    pub fn new(engine: Engine, generator: G, store: P) -> Self {
        Self { engine, generator, store }
    }

    pub fn engine(&self) -> &Engine { &self.engine }
    pub fn generator(&self) -> &G { &self.generator }
    pub fn store(&self) -> &P { &self.store }

    /// Load a player's state, or initialize one if none can be loaded.
    pub fn hydrate(&self, user_id: &str) -> (FinancialState, HydrationSource) {
        match self.store.load_user_data(user_id) {
            Ok(Some(state)) => {
                log::info!("Hydrated user={user_id} at month {}", state.month);
                (state, HydrationSource::Loaded)
            }
            Ok(None) => (self.engine.initialize(user_id), HydrationSource::Fresh),
            Err(e) => {
                log::error!("Loading user={user_id} failed, starting fresh: {e}");
                (self.engine.initialize(user_id), HydrationSource::StoreFailed)
            }
        }
    }

    // ── Stage 1: generate → validate/fallback ──────────────────

    /// A playable batch for `state.month`, never failing.
    pub fn prepare_batch(&mut self, state: &FinancialState) -> (ScenarioBatch, usize) {
        let config = &self.engine.config;
        match self.generator.generate_monthly_scenarios(state) {
            Ok(generated) => {
                let (batch, replaced) = fallback::repair_batch(config, &state.user_id, state.month, generated);
                if replaced > 0 {
                    log::warn!(
                        "user={} month={}: {replaced} generated scenarios replaced by fallback",
                        state.user_id,
                        state.month
                    );
                }
                (batch, replaced)
            }
            Err(e) => {
                log::warn!(
                    "user={} month={}: generator '{}' failed, using fallback batch: {e}",
                    state.user_id,
                    state.month,
                    self.generator.name()
                );
                let batch = fallback::fallback_batch(config, &state.user_id, state.month);
                let replaced = batch.scenarios.len();
                (batch, replaced)
            }
        }
    }

    // ── Stage 2: commit ────────────────────────────────────────

    pub fn start_month(&mut self, state: &FinancialState) -> GameResult<MonthStart> {
        if state.month_in_progress() {
            let scenario = first_open_scenario(state)?;
            log::debug!("user={} resuming month {}", state.user_id, state.month);
            return Ok(MonthStart {
                state: state.clone(),
                scenario,
                resumed: true,
                fallback_scenarios: 0,
                persisted: false,
            });
        }

        // A finished batch that was never finalized is closed first.
        let mut next = if state.current_batch.is_some() {
            let mut closed = self.engine.finalize_month(state);
            closed.current_batch = None;
            closed
        } else {
            state.clone()
        };

        next = self.engine.advance_month(&next);
        next = self.engine.apply_income(&next, None)?;
        next = self.engine.deduct_insurance_premium(&next);
        next = self.engine.update_investments(&next);

        let (batch, fallback_scenarios) = self.prepare_batch(&next);
        next.current_batch = Some(batch);
        let scenario = first_open_scenario(&next)?;
        let persisted = self.persist(&next);

        log::info!(
            "user={} started month {} (balance {}, risk {})",
            next.user_id,
            next.month,
            next.balance,
            next.risk_score
        );
        Ok(MonthStart { state: next, scenario, resumed: false, fallback_scenarios, persisted })
    }

    /// Apply `choice` to the open scenario and move the batch forward.
    pub fn handle_choice(&mut self, state: &FinancialState, choice: &Choice) -> GameResult<ChoiceOutcome> {
        if !state.month_in_progress() {
            return Err(GameError::NoActiveMonth);
        }
        let scenario = first_open_scenario(state)?;
        if !scenario.choices.contains(choice) {
            return Err(GameError::InvalidChoice { choice_id: choice.id.clone() });
        }
        let batch = state.current_batch.as_ref().ok_or(GameError::NoActiveMonth)?;

        let mut next = self.engine.apply_choice(state, choice);
        let advanced = batch.advanced();
        let month_complete = advanced.is_complete();
        next.current_batch = Some(advanced);

        if !month_complete {
            let next_scenario = next.current_batch.as_ref().and_then(|b| b.current_scenario()).cloned();
            let persisted = self.persist(&next);
            return Ok(ChoiceOutcome {
                state: next,
                next_scenario,
                is_month_end: false,
                reflection: None,
                decision_questions: Vec::new(),
                persisted,
            });
        }

        let reflection = self.reflection_for(&next);
        let decision_questions = self.questions_for(&next, &reflection);

        next = self.engine.finalize_month(&next);
        next.current_batch = None;
        let persisted = self.persist(&next);

        Ok(ChoiceOutcome {
            state: next,
            next_scenario: None,
            is_month_end: true,
            reflection: Some(reflection),
            decision_questions,
            persisted,
        })
    }

    /// Look up `choice_id` in the open scenario and apply it.
    pub fn handle_choice_by_id(&mut self, state: &FinancialState, choice_id: &str) -> GameResult<ChoiceOutcome> {
        if !state.month_in_progress() {
            return Err(GameError::NoActiveMonth);
        }
        let choice = first_open_scenario(state)?
            .find_choice(choice_id)
            .cloned()
            .ok_or_else(|| GameError::InvalidChoice { choice_id: choice_id.to_string() })?;
        self.handle_choice(state, &choice)
    }

    /// Apply the month-end behavioral answers and persist.
    pub fn apply_decisions(
        &mut self,
        state: &FinancialState,
        answers: &[BehavioralAnswer],
    ) -> GameResult<ActionOutcome> {
        let next = self.engine.apply_behavioral_decisions(state, answers)?;
        let persisted = self.persist(&next);
        Ok(ActionOutcome { state: next, persisted })
    }

    /// Apply a player-initiated action and persist on success.
    ///
    /// Income, scenario choices and premium charges belong to the month
    /// protocol and are refused here.
    pub fn perform(&mut self, state: &FinancialState, action: &Action) -> GameResult<ActionOutcome> {
        if matches!(
            action,
            Action::ApplyIncome { .. } | Action::ApplyChoice { .. } | Action::DeductInsurancePremium
        ) {
            return Err(GameError::Validation(format!(
                "'{}' is applied by the month flow, not directly",
                action.name()
            )));
        }
        let next = self.engine.apply(state, action)?;
        let persisted = self.persist(&next);
        Ok(ActionOutcome { state: next, persisted })
    }

    fn reflection_for(&mut self, state: &FinancialState) -> String {
        match self.generator.generate_reflection(state) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("user={} month={}: reflection failed, using fallback: {e}", state.user_id, state.month);
                fallback::fallback_reflection(&self.engine.config, state)
            }
        }
    }

    fn questions_for(&mut self, state: &FinancialState, reflection: &str) -> Vec<DecisionQuestion> {
        let parsed = match self.generator.generate_decision_questions(state, reflection) {
            Ok(text) => parse_decision_questions(&text),
            Err(e) => {
                log::warn!("user={} month={}: decision questions failed: {e}", state.user_id, state.month);
                Vec::new()
            }
        };
        if parsed.is_empty() {
            parse_decision_questions(&fallback::fallback_decision_questions())
        } else {
            parsed
        }
    }

    /// Save, absorbing failures. Returns whether the state was stored.
    fn persist(&self, state: &FinancialState) -> bool {
        match self.store.save_user_data(&state.user_id, state) {
            Ok(true) => true,
            Ok(false) => {
                log::warn!("Store declined to save user={} at month {}", state.user_id, state.month);
                false
            }
            Err(e) => {
                log::warn!(
                    "Saving user={} at month {} failed; progress is kept in memory only: {e}",
                    state.user_id,
                    state.month
                );
                false
            }
        }
    }
}

fn first_open_scenario(state: &FinancialState) -> GameResult<Scenario> {
    state
        .current_batch
        .as_ref()
        .and_then(ScenarioBatch::current_scenario)
        .cloned()
        .ok_or_else(|| GameError::InvalidScenarioShape { reason: "batch has no open scenario".into() })
}
