//! Start month / make choice / end month, with generator and store faults.

use finlife_core::{
    batch::{Choice, Scenario, ScenarioBatch},
    command::Action,
    config::GameConfig,
    engine::Engine,
    error::{GameError, GameResult},
    generator::{OfflineGenerator, ScenarioGenerator},
    modifiers::BehavioralAnswer,
    month_flow::{HydrationSource, MonthFlow},
    state::FinancialState,
    store::{MemoryStore, Persistence, SqliteStore},
};

// ── Fakes ──────────────────────────────────────────────────────

/// Generator whose every call fails.
struct FailingGenerator;

impl ScenarioGenerator for FailingGenerator {
    fn name(&self) -> &'static str { "failing" }

    fn generate_monthly_scenarios(&mut self, _state: &FinancialState) -> GameResult<ScenarioBatch> {
        Err(GameError::Generator("upstream unavailable".into()))
    }

    fn generate_reflection(&mut self, _state: &FinancialState) -> GameResult<String> {
        Err(GameError::Generator("upstream unavailable".into()))
    }

    fn generate_decision_questions(&mut self, _state: &FinancialState, _reflection: &str) -> GameResult<String> {
        Err(GameError::Generator("upstream unavailable".into()))
    }
}

/// Generator that serves a fixed batch and fixed texts.
struct ScriptedGenerator {
    batch:     ScenarioBatch,
    questions: String,
}

impl ScenarioGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str { "scripted" }

    fn generate_monthly_scenarios(&mut self, _state: &FinancialState) -> GameResult<ScenarioBatch> {
        Ok(self.batch.clone())
    }

    fn generate_reflection(&mut self, _state: &FinancialState) -> GameResult<String> {
        Ok("A scripted month.".into())
    }

    fn generate_decision_questions(&mut self, _state: &FinancialState, _reflection: &str) -> GameResult<String> {
        Ok(self.questions.clone())
    }
}

/// Store whose every call fails.
struct BrokenStore;

impl Persistence for BrokenStore {
    fn save_user_data(&self, _user_id: &str, _state: &FinancialState) -> GameResult<bool> {
        Err(GameError::Persistence("disk full".into()))
    }

    fn load_user_data(&self, _user_id: &str) -> GameResult<Option<FinancialState>> {
        Err(GameError::Persistence("disk unreadable".into()))
    }

    fn clear_user_data(&self, _user_id: &str) -> GameResult<bool> {
        Err(GameError::Persistence("disk unreadable".into()))
    }
}

fn offline_flow() -> MonthFlow<OfflineGenerator, MemoryStore> {
    MonthFlow::new(Engine::for_test(), OfflineGenerator::new(GameConfig::default_test()), MemoryStore::new())
}

fn scenario(id: &str, choices: usize) -> Scenario {
    Scenario {
        id: id.into(),
        situation: format!("Situation {id}"),
        choices: (0..choices)
            .map(|i| Choice {
                id: format!("{id}-c{i}"),
                label: format!("Option {i}"),
                balance_change: -100 * (i as i64 + 1),
                risk_change: i as i32,
                savings_change: None,
                is_insurance: false,
                description: None,
            })
            .collect(),
    }
}

/// Pick the first choice of every open scenario until the month ends.
fn play_out<G: ScenarioGenerator, P: Persistence>(
    flow: &mut MonthFlow<G, P>,
    mut state: FinancialState,
) -> (FinancialState, usize, finlife_core::month_flow::ChoiceOutcome) {
    let mut picks = 0;
    loop {
        let scenario = state.current_batch.as_ref().and_then(|b| b.current_scenario()).cloned().unwrap();
        let outcome = flow.handle_choice(&state, &scenario.choices[0]).unwrap();
        picks += 1;
        state = outcome.state.clone();
        if outcome.is_month_end {
            return (state, picks, outcome);
        }
    }
}

// ── Happy path ─────────────────────────────────────────────────

#[test]
fn first_month_for_a_new_player() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut flow = offline_flow();

    let (state, source) = flow.hydrate("u1");
    assert_eq!(source, HydrationSource::Fresh);
    assert_eq!(state.month, 0);

    let start = flow.start_month(&state).unwrap();
    assert!(!start.resumed);
    assert!(start.persisted);
    assert_eq!(start.state.month, 1);
    assert_eq!(start.state.balance, 50_000 + 27_000);
    let batch = start.state.current_batch.as_ref().unwrap();
    assert_eq!(batch.month, 1);
    assert_eq!(batch.scenarios.len(), 5);
    assert_eq!(batch.current_index, 0);
    assert_eq!(start.scenario, batch.scenarios[0]);

    let (end_state, picks, outcome) = play_out(&mut flow, start.state);

    assert_eq!(picks, 5);
    assert!(outcome.is_month_end);
    assert!(outcome.next_scenario.is_none());
    assert!(outcome.reflection.as_deref().is_some_and(|r| !r.is_empty()));
    assert_eq!(outcome.decision_questions.len(), 3);
    assert!(end_state.current_batch.is_none());
    assert_eq!(end_state.month_summaries.len(), 1);
    assert_eq!(end_state.month_summaries[0].choices_made, 5);
    assert!(end_state.month_tracker.is_none());
}

#[test]
fn restarting_mid_month_resumes_the_open_scenario() {
    let mut flow = offline_flow();
    let (state, _) = flow.hydrate("u1");
    let start = flow.start_month(&state).unwrap();

    let again = flow.start_month(&start.state).unwrap();

    assert!(again.resumed);
    assert_eq!(again.scenario, start.scenario);
    assert_eq!(again.state.month, 1);
    assert_eq!(again.state.balance, 77_000);
    assert_eq!(again.state.history.len(), start.state.history.len());
}

#[test]
fn resume_after_one_choice_serves_the_second_scenario() {
    let mut flow = offline_flow();
    let (state, _) = flow.hydrate("u1");
    let start = flow.start_month(&state).unwrap();
    let after_one = flow.handle_choice(&start.state, &start.scenario.choices[1]).unwrap();

    let (reloaded, source) = flow.hydrate("u1");
    assert_eq!(source, HydrationSource::Loaded);
    assert_eq!(reloaded, after_one.state);

    let resumed = flow.start_month(&reloaded).unwrap();
    assert!(resumed.resumed);
    assert_eq!(Some(resumed.scenario), after_one.next_scenario);
}

#[test]
fn consecutive_months_credit_income_once_each() {
    let mut flow = offline_flow();
    let (state, _) = flow.hydrate("u1");

    let start = flow.start_month(&state).unwrap();
    let (state, _, _) = play_out(&mut flow, start.state);
    let start = flow.start_month(&state).unwrap();
    assert_eq!(start.state.month, 2);

    let incomes = start
        .state
        .history
        .iter()
        .filter(|e| e.kind == finlife_core::history::EntryKind::Income)
        .count();
    assert_eq!(incomes, 2);
}

#[test]
fn month_end_answers_update_modifiers() {
    let mut flow = offline_flow();
    let (state, _) = flow.hydrate("u1");
    let start = flow.start_month(&state).unwrap();
    let (state, _, _) = play_out(&mut flow, start.state);

    let outcome = flow
        .apply_decisions(&state, &[BehavioralAnswer::A, BehavioralAnswer::A, BehavioralAnswer::A])
        .unwrap();

    assert!(outcome.persisted);
    assert_eq!(outcome.state.modifiers.decisions_applied, 3);
    assert_eq!(outcome.state.modifiers.saving_discipline, 60);
}

// ── Rejections ─────────────────────────────────────────────────

#[test]
fn choice_outside_the_open_scenario_is_rejected() {
    let mut flow = offline_flow();
    let (state, _) = flow.hydrate("u1");
    let start = flow.start_month(&state).unwrap();

    let stranger = scenario("elsewhere", 3).choices.remove(0);
    let err = flow.handle_choice(&start.state, &stranger).unwrap_err();
    assert!(matches!(err, GameError::InvalidChoice { ref choice_id } if choice_id == "elsewhere-c0"));

    let err = flow.handle_choice_by_id(&start.state, "no-such-choice").unwrap_err();
    assert!(matches!(err, GameError::InvalidChoice { .. }));
}

#[test]
fn choice_without_an_open_month_is_rejected() {
    let mut flow = offline_flow();
    let (state, _) = flow.hydrate("u1");
    let choice = scenario("x", 3).choices.remove(0);

    assert!(matches!(flow.handle_choice(&state, &choice), Err(GameError::NoActiveMonth)));
    assert!(matches!(flow.handle_choice_by_id(&state, "x-c0"), Err(GameError::NoActiveMonth)));
}

#[test]
fn protocol_actions_cannot_be_performed_directly() {
    let mut flow = offline_flow();
    let (state, _) = flow.hydrate("u1");

    let err = flow.perform(&state, &Action::ApplyIncome { amount: Some(1_000) }).unwrap_err();
    assert!(matches!(err, GameError::Validation(_)));
    assert!(matches!(flow.perform(&state, &Action::DeductInsurancePremium), Err(GameError::Validation(_))));

    let ok = flow.perform(&state, &Action::DepositToSavings { amount: 1_000 }).unwrap();
    assert_eq!(ok.state.savings, 1_000);
    assert!(ok.persisted);
}

// ── Generator faults ───────────────────────────────────────────

#[test]
fn failing_generator_falls_back_everywhere() {
    let config = GameConfig::default_test();
    let mut flow = MonthFlow::new(Engine::for_test(), FailingGenerator, MemoryStore::new());
    let (state, _) = flow.hydrate("u1");

    let start = flow.start_month(&state).unwrap();
    assert_eq!(start.fallback_scenarios, 5);
    let batch = start.state.current_batch.clone().unwrap();
    assert!(batch.scenarios.iter().all(|s| config.fallback_scenarios.contains(s)));

    let (_, picks, outcome) = play_out(&mut flow, start.state);
    assert_eq!(picks, 5);
    assert!(outcome.reflection.is_some_and(|r| r.contains("Month 1")));
    assert_eq!(outcome.decision_questions.len(), 3);
}

#[test]
fn invalid_generated_scenarios_are_replaced_in_place() {
    let batch = ScenarioBatch::with_scenarios(7, vec![scenario("good", 3), scenario("short", 2)]);
    let generator = ScriptedGenerator { batch, questions: "no questions here".into() };
    let mut flow = MonthFlow::new(Engine::for_test(), generator, MemoryStore::new());
    let (state, _) = flow.hydrate("u1");

    let start = flow.start_month(&state).unwrap();

    // One malformed, three missing.
    assert_eq!(start.fallback_scenarios, 4);
    let batch = start.state.current_batch.as_ref().unwrap();
    assert_eq!(batch.month, 1, "month is stamped by the flow");
    assert_eq!(batch.scenarios.len(), 5);
    assert_eq!(batch.scenarios[0].id, "good");
    assert!(batch.scenarios.iter().all(Scenario::is_valid));

    let (_, _, outcome) = play_out(&mut flow, start.state);
    assert_eq!(outcome.reflection.as_deref(), Some("A scripted month."));
    // Unparseable questions fall back to the fixed set.
    assert_eq!(outcome.decision_questions.len(), 3);
}

#[test]
fn surplus_generated_scenarios_are_dropped() {
    let scenarios = (0..8).map(|i| scenario(&format!("s{i}"), 3)).collect();
    let questions = "1. Save or spend?\nA) Save\nB) Spend".to_string();
    let generator = ScriptedGenerator { batch: ScenarioBatch::with_scenarios(1, scenarios), questions };
    let mut flow = MonthFlow::new(Engine::for_test(), generator, MemoryStore::new());
    let (state, _) = flow.hydrate("u1");

    let start = flow.start_month(&state).unwrap();
    assert_eq!(start.fallback_scenarios, 0);
    assert_eq!(start.state.current_batch.as_ref().unwrap().scenarios.len(), 5);

    let (_, _, outcome) = play_out(&mut flow, start.state);
    assert_eq!(outcome.decision_questions.len(), 1);
    assert_eq!(outcome.decision_questions[0].option_b, "Spend");
}

// ── Store faults ───────────────────────────────────────────────

#[test]
fn broken_store_never_blocks_play() {
    let mut flow = MonthFlow::new(
        Engine::for_test(),
        OfflineGenerator::new(GameConfig::default_test()),
        BrokenStore,
    );

    let (state, source) = flow.hydrate("u1");
    assert_eq!(source, HydrationSource::StoreFailed);
    assert_eq!(state.month, 0);

    let start = flow.start_month(&state).unwrap();
    assert!(!start.persisted);
    assert_eq!(start.state.month, 1);

    let (state, _, outcome) = play_out(&mut flow, start.state);
    assert!(!outcome.persisted);
    assert_eq!(state.month_summaries.len(), 1);
}

#[test]
fn sqlite_backed_flow_survives_a_restart() {
    let store = SqliteStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut flow = MonthFlow::new(Engine::for_test(), OfflineGenerator::new(GameConfig::default_test()), store);

    let (state, _) = flow.hydrate("u1");
    let start = flow.start_month(&state).unwrap();
    let (played, _, _) = play_out(&mut flow, start.state);

    let (reloaded, source) = flow.hydrate("u1");
    assert_eq!(source, HydrationSource::Loaded);
    assert_eq!(reloaded, played);
    assert_eq!(flow.store().month_summaries("u1").unwrap().len(), 1);
    assert_eq!(flow.store().stored_month("u1").unwrap(), Some(1));
}
