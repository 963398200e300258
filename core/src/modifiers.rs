//! Behavioral modifiers: persistent biases read by scenario generators.
//!
//! Calibrated once from the player's stated preferences, then nudged by
//! the answers to the monthly behavioral questions. The engine stores and
//! updates these values; only generators interpret them.
//!
//! All values are whole points in [0, 100] so they serialize exactly.

use crate::error::{GameError, GameResult};
use serde::{Deserialize, Serialize};

const POINTS_MIN: i32 = 0;
const POINTS_MAX: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryDrive {
    Security,
    Growth,
    Lifestyle,
    Independence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// (floor, ceiling) of the risk band a generator should aim for.
    pub fn band(&self) -> (i32, i32) {
        match self {
            Self::Low    => (10, 40),
            Self::Medium => (30, 70),
            Self::High   => (55, 95),
        }
    }
}

/// Answer to one two-option behavioral question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehavioralAnswer {
    A,
    B,
}

impl BehavioralAnswer {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            _   => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Modifiers {
    pub risk_floor:          i32,
    pub risk_ceiling:        i32,
    pub impulse_spending:    i32,
    pub saving_discipline:   i32,
    pub social_pressure:     i32,
    pub investment_appetite: i32,
    #[serde(default)]
    pub primary_drive:       Option<PrimaryDrive>,
    #[serde(default)]
    pub risk_level:          Option<RiskLevel>,
    #[serde(default)]
    pub decisions_applied:   u32,
}

impl Default for Modifiers {
    fn default() -> Self { Self::neutral() }
}

/// One nudge: which modifier moves and by how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    RiskBand(i32),
    ImpulseSpending(i32),
    SavingDiscipline(i32),
    SocialPressure(i32),
    InvestmentAppetite(i32),
}

/// A fixed behavioral question and the nudges each answer applies.
#[derive(Debug, Clone, Copy)]
pub struct BehavioralQuestion {
    pub prompt:   &'static str,
    pub option_a: &'static str,
    pub option_b: &'static str,
    pub nudges_a: &'static [Nudge],
    pub nudges_b: &'static [Nudge],
}

/// The fixed question set answers are aligned to, in order.
pub const BEHAVIORAL_QUESTIONS: [BehavioralQuestion; 3] = [
    BehavioralQuestion {
        prompt:   "Friends plan an expensive weekend trip. What do you do?",
        option_a: "Politely decline and keep the money",
        option_b: "Go along, it's only one weekend",
        nudges_a: &[Nudge::SocialPressure(-5), Nudge::SavingDiscipline(5)],
        nudges_b: &[Nudge::SocialPressure(5), Nudge::ImpulseSpending(5)],
    },
    BehavioralQuestion {
        prompt:   "An unexpected bonus lands in your account. Where does it go?",
        option_a: "Savings or an investment",
        option_b: "A treat you have wanted for a while",
        nudges_a: &[Nudge::InvestmentAppetite(5), Nudge::SavingDiscipline(5)],
        nudges_b: &[Nudge::ImpulseSpending(5), Nudge::SavingDiscipline(-5)],
    },
    BehavioralQuestion {
        prompt:   "A colleague shares a hot, volatile investment tip.",
        option_a: "Pass, it sounds too good to be true",
        option_b: "Take a chance with part of your money",
        nudges_a: &[Nudge::RiskBand(-3)],
        nudges_b: &[Nudge::RiskBand(3), Nudge::InvestmentAppetite(5)],
    },
];

impl Modifiers {
    pub fn neutral() -> Self {
        Self {
            risk_floor:          30,
            risk_ceiling:        70,
            impulse_spending:    50,
            saving_discipline:   50,
            social_pressure:     50,
            investment_appetite: 50,
            primary_drive:       None,
            risk_level:          None,
            decisions_applied:   0,
        }
    }

    /// One-time calibration from setup preferences.
    ///
    /// Overwrites the baseline rather than compounding: calibrating twice
    /// with the same inputs yields the same modifiers. The running count
    /// of applied decisions is kept.
    pub fn calibrated(&self, drive: PrimaryDrive, level: RiskLevel) -> Self {
        let (risk_floor, risk_ceiling) = level.band();
        let (impulse, discipline, social, appetite) = match drive {
            PrimaryDrive::Security     => (35, 70, 45, 40),
            PrimaryDrive::Growth       => (40, 60, 45, 75),
            PrimaryDrive::Lifestyle    => (70, 35, 65, 45),
            PrimaryDrive::Independence => (45, 65, 35, 60),
        };
        Self {
            risk_floor,
            risk_ceiling,
            impulse_spending:    impulse,
            saving_discipline:   discipline,
            social_pressure:     social,
            investment_appetite: appetite,
            primary_drive:       Some(drive),
            risk_level:          Some(level),
            decisions_applied:   self.decisions_applied,
        }
    }

    /// Apply answers aligned to `BEHAVIORAL_QUESTIONS`. Cumulative.
    pub fn with_answers(&self, answers: &[BehavioralAnswer]) -> GameResult<Self> {
        if answers.len() > BEHAVIORAL_QUESTIONS.len() {
            return Err(GameError::Validation(format!(
                "{} behavioral answers given, only {} questions exist",
                answers.len(),
                BEHAVIORAL_QUESTIONS.len()
            )));
        }

        let mut next = self.clone();
        for (question, answer) in BEHAVIORAL_QUESTIONS.iter().zip(answers) {
            let nudges = match answer {
                BehavioralAnswer::A => question.nudges_a,
                BehavioralAnswer::B => question.nudges_b,
            };
            for nudge in nudges {
                next.apply_nudge(*nudge);
            }
        }
        next.decisions_applied += answers.len() as u32;
        Ok(next)
    }

    fn apply_nudge(&mut self, nudge: Nudge) {
        match nudge {
            Nudge::RiskBand(d) => {
                self.risk_floor   = clamp_points(self.risk_floor + d);
                self.risk_ceiling = clamp_points(self.risk_ceiling + d);
                if self.risk_floor > self.risk_ceiling {
                    self.risk_floor = self.risk_ceiling;
                }
            }
            Nudge::ImpulseSpending(d)    => self.impulse_spending = clamp_points(self.impulse_spending + d),
            Nudge::SavingDiscipline(d)   => self.saving_discipline = clamp_points(self.saving_discipline + d),
            Nudge::SocialPressure(d)     => self.social_pressure = clamp_points(self.social_pressure + d),
            Nudge::InvestmentAppetite(d) => self.investment_appetite = clamp_points(self.investment_appetite + d),
        }
    }

    /// Invariants an imported state must satisfy.
    pub fn check(&self) -> GameResult<()> {
        let all = [
            self.risk_floor,
            self.risk_ceiling,
            self.impulse_spending,
            self.saving_discipline,
            self.social_pressure,
            self.investment_appetite,
        ];
        if all.iter().any(|v| !(POINTS_MIN..=POINTS_MAX).contains(v)) {
            return Err(GameError::Validation("modifier outside [0, 100]".into()));
        }
        if self.risk_floor > self.risk_ceiling {
            return Err(GameError::Validation("risk floor above risk ceiling".into()));
        }
        Ok(())
    }
}

fn clamp_points(value: i32) -> i32 {
    value.clamp(POINTS_MIN, POINTS_MAX)
}
