//! life-runner: headless player for the personal-finance life game.
//!
//! Usage:
//!   life-runner --user u1 --months 12 --db life.db
//!   life-runner --user u1 --db life.db --ipc-mode

use anyhow::Result;
use finlife_core::{
    clock::GameClock,
    command::Action,
    config::GameConfig,
    engine::Engine,
    error::GameError,
    generator::OfflineGenerator,
    modifiers::BehavioralAnswer,
    month_flow::{HydrationSource, MonthFlow},
    questions::DecisionQuestion,
    snapshot,
    state::{FinancialState, MonthSummary},
    store::{Persistence, SqliteStore},
};
use std::env;
use std::io::{self, BufRead, Write};

type Flow = MonthFlow<OfflineGenerator, SqliteStore>;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    StartMonth,
    Choose {
        choice_id: String,
    },
    Action {
        command: Action,
    },
    Decisions {
        answers: Vec<BehavioralAnswer>,
    },
    Export,
    Import {
        json: String,
    },
    Quit,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UiState<'a> {
    user_id:         &'a str,
    month:           u32,
    balance:         i64,
    savings:         i64,
    risk_score:      i32,
    net_worth:       i64,
    insurance_opted: bool,
    month_open:      bool,
    scenario:        Option<&'a finlife_core::batch::Scenario>,
    persisted:       bool,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct MonthEnd<'a> {
    reflection:         &'a str,
    decision_questions: &'a [DecisionQuestion],
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let months = parse_arg(&args, "--months", 12u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let default_user = format!("player-{}", uuid::Uuid::new_v4());
    let user = str_arg(&args, "--user").unwrap_or(&default_user);
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");

    if !ipc_mode {
        println!("Life game runner");
        println!("  user:      {user}");
        println!("  months:    {months}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  started:   {}", chrono::Utc::now().to_rfc3339());
        println!();
    }

    let config = GameConfig::load(data_dir)?;
    let store = SqliteStore::open(db)?;
    store.migrate()?;

    let engine = Engine::new(config.clone(), GameClock::System);
    let mut flow = MonthFlow::new(engine, OfflineGenerator::new(config), store);

    let (state, source) = flow.hydrate(user);
    if source == HydrationSource::StoreFailed {
        log::warn!("Stored state for {user} could not be read; playing from a fresh start");
    }

    if ipc_mode {
        run_ipc_loop(&mut flow, state)?;
    } else {
        let state = autoplay(&mut flow, state, months)?;
        print_summary(&flow, &state)?;
    }

    Ok(())
}

/// Play `months` full months, always taking the first choice offered.
fn autoplay(flow: &mut Flow, mut state: FinancialState, months: u32) -> Result<FinancialState> {
    for _ in 0..months {
        let start = flow.start_month(&state)?;
        state = start.state;
        loop {
            let Some(scenario) = state.current_batch.as_ref().and_then(|b| b.current_scenario()).cloned() else {
                break;
            };
            let outcome = flow.handle_choice(&state, &scenario.choices[0])?;
            state = outcome.state;
            if outcome.is_month_end {
                if let Some(reflection) = outcome.reflection {
                    log::info!("month {} reflection: {reflection}", state.month);
                }
                break;
            }
        }
    }
    Ok(state)
}

fn run_ipc_loop(flow: &mut Flow, mut state: FinancialState) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(flow, &mut state, cmd) {
            Ok(response) => writeln!(stdout, "{response}")?,
            Err(e) => {
                if !e.is_recoverable() {
                    log::error!("Command failed: {e}");
                }
                write_error(&mut stdout, &e.to_string())?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

/// Run one command against the live state and build its response line.
fn handle_command(
    flow: &mut Flow,
    state: &mut FinancialState,
    cmd: IpcCommand,
) -> Result<serde_json::Value, GameError> {
    match cmd {
        IpcCommand::GetState => Ok(ui_state(state, false)),
        IpcCommand::StartMonth => {
            let start = flow.start_month(state)?;
            *state = start.state;
            let mut response = ui_state(state, start.persisted);
            response["resumed"] = start.resumed.into();
            response["fallbackScenarios"] = start.fallback_scenarios.into();
            Ok(response)
        }
        IpcCommand::Choose { choice_id } => {
            let outcome = flow.handle_choice_by_id(state, &choice_id)?;
            *state = outcome.state;
            let mut response = ui_state(state, outcome.persisted);
            if let Some(reflection) = &outcome.reflection {
                response["monthEnd"] = serde_json::to_value(MonthEnd {
                    reflection,
                    decision_questions: &outcome.decision_questions,
                })?;
            }
            Ok(response)
        }
        IpcCommand::Action { command } => {
            let outcome = flow.perform(state, &command)?;
            *state = outcome.state;
            Ok(ui_state(state, outcome.persisted))
        }
        IpcCommand::Decisions { answers } => {
            let outcome = flow.apply_decisions(state, &answers)?;
            *state = outcome.state;
            let mut response = ui_state(state, outcome.persisted);
            response["modifiers"] = serde_json::to_value(&state.modifiers)?;
            Ok(response)
        }
        IpcCommand::Export => {
            let json = snapshot::export_state(state, false)?;
            Ok(serde_json::json!({ "export": json }))
        }
        IpcCommand::Import { json } => {
            let (next, result) = snapshot::replace_from_import(state, &json);
            result?;
            *state = next;
            let persisted = flow.store().save_user_data(&state.user_id, state).unwrap_or_else(|e| {
                log::warn!("Imported state could not be saved: {e}");
                false
            });
            Ok(ui_state(state, persisted))
        }
        IpcCommand::Quit => Ok(serde_json::Value::Null),
    }
}

fn ui_state(state: &FinancialState, persisted: bool) -> serde_json::Value {
    let scenario = state.current_batch.as_ref().and_then(|b| b.current_scenario());
    let ui = UiState {
        user_id: &state.user_id,
        month: state.month,
        balance: state.balance,
        savings: state.savings,
        risk_score: state.risk_score,
        net_worth: state.net_worth(),
        insurance_opted: state.insurance_opted,
        month_open: state.month_in_progress(),
        scenario,
        persisted,
    };
    serde_json::to_value(ui).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
}

fn write_error(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", serde_json::json!({ "error": message }))?;
    out.flush()
}

fn print_summary(flow: &Flow, state: &FinancialState) -> Result<()> {
    println!("=== RUN SUMMARY ===");
    println!("  user:        {}", state.user_id);
    println!("  month:       {}", state.month);
    println!("  balance:     {}", state.balance);
    println!("  savings:     {}", state.savings);
    println!("  risk score:  {}", state.risk_score);
    println!("  net worth:   {}", state.net_worth());
    println!("  history:     {} entries", state.history.len());

    println!();
    println!("=== MONTHS (last 6) ===");
    let summaries: Vec<MonthSummary> = flow.store().month_summaries(&state.user_id).unwrap_or_default();
    if summaries.is_empty() {
        println!("  (No months completed yet)");
    } else {
        for s in summaries.iter().rev().take(6).rev() {
            println!(
                "  month {:>3} | balance {:+} | savings {:+} | risk {:+} | net worth {}",
                s.month, s.balance_change, s.savings_change, s.risk_change, s.net_worth
            );
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
