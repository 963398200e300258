//! Deterministic fallback content.
//!
//! Used whenever the external generator fails or returns a batch that
//! does not pass validation. Everything here is pre-authored; the only
//! variation is which slice of the pool a given player sees in a given
//! month, drawn from that player's own RNG stream.

use crate::{
    batch::{Choice, Scenario, ScenarioBatch},
    config::GameConfig,
    history,
    modifiers::BEHAVIORAL_QUESTIONS,
    rng::{RngBank, RngSlot},
    state::FinancialState,
    types::{Money, Month},
};

pub const BUILTIN_REFLECTION_TIP: &str =
    "Small, regular habits matter more than any single big decision.";

/// A full fallback batch for `month`: `scenarios_per_month` consecutive
/// pool entries starting at a per-player, per-month offset.
pub fn fallback_batch(config: &GameConfig, user_id: &str, month: Month) -> ScenarioBatch {
    let scenarios = (0..config.scenarios_per_month)
        .map(|slot| fallback_scenario(config, user_id, month, slot))
        .collect();
    ScenarioBatch::with_scenarios(month, scenarios)
}

/// The fallback scenario for position `slot` of `month`'s batch.
pub fn fallback_scenario(config: &GameConfig, user_id: &str, month: Month, slot: usize) -> Scenario {
    let pool = &config.fallback_scenarios;
    let offset = pool_offset(pool.len(), user_id, month);
    pool[(offset + slot) % pool.len()].clone()
}

fn pool_offset(pool_len: usize, user_id: &str, month: Month) -> usize {
    let mut rng = RngBank::for_user(user_id).for_slot_at_month(RngSlot::FallbackScenarios, month);
    rng.next_u64_below(pool_len as u64) as usize
}

/// Force a generated batch into shape: stamp the month, reset the
/// index, replace every invalid scenario with the fallback for its
/// position, and pad or truncate to the configured count.
///
/// Returns the repaired batch and how many positions were substituted.
pub fn repair_batch(
    config: &GameConfig,
    user_id: &str,
    month: Month,
    generated: ScenarioBatch,
) -> (ScenarioBatch, usize) {
    let wanted = config.scenarios_per_month;
    let mut replaced = 0;
    let mut scenarios = Vec::with_capacity(wanted);

    for slot in 0..wanted {
        match generated.scenarios.get(slot) {
            Some(s) if s.is_valid() => scenarios.push(s.clone()),
            Some(s) => {
                if let Err(e) = s.validate() {
                    log::warn!("month={month} slot={slot}: rejecting generated scenario: {e}");
                }
                replaced += 1;
                scenarios.push(fallback_scenario(config, user_id, month, slot));
            }
            None => {
                replaced += 1;
                scenarios.push(fallback_scenario(config, user_id, month, slot));
            }
        }
    }

    if generated.scenarios.len() > wanted {
        log::debug!(
            "month={month}: dropping {} surplus generated scenarios",
            generated.scenarios.len() - wanted
        );
    }

    (ScenarioBatch::with_scenarios(month, scenarios), replaced)
}

/// A plain-language reflection on the month just played.
pub fn fallback_reflection(config: &GameConfig, state: &FinancialState) -> String {
    let entries = history::entries_for_month(&state.history, state.month);
    let choices = entries
        .iter()
        .filter(|e| e.kind == history::EntryKind::Choice)
        .count();
    let balance_delta: Money = entries.iter().map(|e| e.balance_change).sum();

    let direction = if balance_delta >= 0 { "grew" } else { "shrank" };
    let risk_note = match state.risk_score {
        0..=33  => "Your risk exposure is low; you are playing it safe.",
        34..=66 => "Your risk exposure is moderate.",
        _       => "Your risk exposure is high; a single shock could hurt.",
    };

    format!(
        "Month {} is complete. You made {choices} decisions and your balance {direction} by {}. \
         Your net worth now stands at {}. {risk_note} {}",
        state.month,
        balance_delta.abs(),
        state.net_worth(),
        config.reflection_tip,
    )
}

/// The fixed behavioral questions in the numbered, lettered text format.
pub fn fallback_decision_questions() -> String {
    BEHAVIORAL_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}\nA) {}\nB) {}", i + 1, q.prompt, q.option_a, q.option_b))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn choice(
    id: &str,
    label: &str,
    balance_change: Money,
    risk_change: i32,
    savings_change: Option<Money>,
    is_insurance: bool,
    description: Option<String>,
) -> Choice {
    Choice {
        id: id.into(),
        label: label.into(),
        balance_change,
        risk_change,
        savings_change,
        is_insurance,
        description,
    }
}

/// The curated pool shipped with the game.
pub fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            id:        "fb-phone-screen".into(),
            situation: "Your phone screen cracks the week before a big job interview.".into(),
            choices: vec![
                choice("repair", "Repair the screen", -3000, 0, None, false, Some("A sensible fix that keeps you connected.".into())),
                choice("new-phone-emi", "Buy a new phone on EMI", -8000, 10, None, false, Some("Monthly instalments now follow you around.".into())),
                choice("live-with-it", "Keep using the cracked phone", 0, 5, None, false, Some("Free today, but it may fail at a bad moment.".into())),
            ],
        },
        Scenario {
            id:        "fb-cousin-wedding".into(),
            situation: "A cousin is getting married and the family expects gifts and travel.".into(),
            choices: vec![
                choice("modest-gift", "Attend with a modest gift", -5000, 0, None, false, None),
                choice("go-all-out", "Go all out with gifts and new clothes", -15000, 8, None, false, Some("Generous, but a big dent in the month.".into())),
                choice("gift-only", "Send a gift and skip the travel", -2000, -2, None, false, None),
            ],
        },
        Scenario {
            id:        "fb-hospital-visit".into(),
            situation: "A sudden fever puts you in hospital for two days.".into(),
            choices: vec![
                choice("pay-balance", "Pay the bill from your balance", -12000, 5, None, false, Some("The shock lands entirely on this month.".into())),
                choice("use-savings", "Pay the bill from savings", 0, 0, Some(-12000), false, Some("This is exactly what savings are for.".into())),
                choice("buy-health-cover", "Pay and buy a health policy for next time", -13500, -8, None, true, Some("Cover starts now for future emergencies.".into())),
            ],
        },
        Scenario {
            id:        "fb-festival-sale".into(),
            situation: "An online festival sale offers sixty percent off gadgets.".into(),
            choices: vec![
                choice("skip-sale", "Close the app and skip it", 0, -3, None, false, None),
                choice("headphones", "Buy the headphones you wanted", -4000, 3, None, false, None),
                choice("laptop-credit", "Buy a new laptop on a credit card", -35000, 15, None, false, Some("High interest if not paid in full.".into())),
            ],
        },
        Scenario {
            id:        "fb-side-gig".into(),
            situation: "A friend offers you paid freelance work over the weekend.".into(),
            choices: vec![
                choice("take-gig", "Take the work", 6000, -2, None, false, None),
                choice("rest", "Decline and rest", 0, 0, None, false, None),
                choice("take-and-save", "Take it and save every rupee earned", 0, -4, Some(6000), false, Some("Extra income straight into savings.".into())),
            ],
        },
        Scenario {
            id:        "fb-rent-hike".into(),
            situation: "Your landlord announces a ten percent rent increase.".into(),
            choices: vec![
                choice("accept-hike", "Accept the new rent", -2500, 0, None, false, None),
                choice("negotiate", "Negotiate a smaller increase", -1000, 2, None, false, Some("The landlord may not renew next year.".into())),
                choice("move-out", "Move to a cheaper flat", -6000, -5, None, false, Some("Moving costs now, lower rent later.".into())),
            ],
        },
        Scenario {
            id:        "fb-coin-tip".into(),
            situation: "A coworker swears a new crypto coin will grow tenfold this month.".into(),
            choices: vec![
                choice("ignore-tip", "Ignore the tip", 0, -2, None, false, None),
                choice("small-bet", "Put in a small amount", -3000, 10, None, false, None),
                choice("big-bet", "Invest heavily before it is too late", -20000, 25, None, false, Some("Speculation with money you may need.".into())),
            ],
        },
        Scenario {
            id:        "fb-scooter-repair".into(),
            situation: "Your scooter breaks down on the way to work.".into(),
            choices: vec![
                choice("service-centre", "Repair it at the authorised service centre", -4500, 0, None, false, None),
                choice("local-mechanic", "Use a cheaper local mechanic", -2000, 4, None, false, Some("Cheaper, but the fix may not last.".into())),
                choice("take-bus", "Leave it and take the bus for now", -800, 1, None, false, None),
            ],
        },
        Scenario {
            id:        "fb-emergency-fund".into(),
            situation: "A finance podcast urges listeners to build an emergency fund.".into(),
            choices: vec![
                choice("move-five-k", "Move 5,000 into savings today", -5000, -6, Some(5000), false, None),
                choice("later", "Plan to do it later", 0, 3, None, false, None),
                choice("move-two-k", "Move 2,000 into savings now", -2000, -4, Some(2000), false, None),
            ],
        },
        Scenario {
            id:        "fb-team-dinner".into(),
            situation: "Colleagues invite you to an expensive team dinner.".into(),
            choices: vec![
                choice("join", "Join and split the bill", -2500, 1, None, false, None),
                choice("join-light", "Join but order something light", -1000, 0, None, false, None),
                choice("skip-dinner", "Skip it this time", 0, 2, None, false, Some("You save money but miss time with the team.".into())),
            ],
        },
    ]
}
