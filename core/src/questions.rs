//! Parsing of generated behavioral decision questions.
//!
//! The generator returns free text. Questions are lines starting with
//! a number and a dot (`1.`); options are lines starting with `A)` or
//! `B)`. Anything else is ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionQuestion {
    pub number:   u32,
    pub prompt:   String,
    pub option_a: String,
    pub option_b: String,
}

#[derive(Default)]
struct Pending {
    number:   u32,
    prompt:   String,
    option_a: Option<String>,
    option_b: Option<String>,
}

impl Pending {
    fn finish(self) -> Option<DecisionQuestion> {
        Some(DecisionQuestion {
            number:   self.number,
            prompt:   self.prompt,
            option_a: self.option_a?,
            option_b: self.option_b?,
        })
    }
}

/// Extract complete questions. Questions missing either option are dropped.
pub fn parse_decision_questions(text: &str) -> Vec<DecisionQuestion> {
    let mut out = Vec::new();
    let mut pending: Option<Pending> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if let Some((number, prompt)) = split_numbered(line) {
            if let Some(done) = pending.take().and_then(Pending::finish) {
                out.push(done);
            }
            pending = Some(Pending { number, prompt: prompt.to_string(), ..Pending::default() });
        } else if let Some((letter, option)) = split_option(line) {
            if let Some(p) = pending.as_mut() {
                let slot = if letter == 'A' { &mut p.option_a } else { &mut p.option_b };
                if slot.is_none() {
                    *slot = Some(option.to_string());
                }
            }
        }
    }
    if let Some(done) = pending.and_then(Pending::finish) {
        out.push(done);
    }
    out
}

/// `"12. Some text"` -> `(12, "Some text")`.
fn split_numbered(line: &str) -> Option<(u32, &str)> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || line.as_bytes().get(digits) != Some(&b'.') {
        return None;
    }
    let number = line[..digits].parse().ok()?;
    Some((number, line[digits + 1..].trim()))
}

/// `"A) text"` -> `('A', "text")`.
fn split_option(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    let letter = chars.next()?;
    if !matches!(letter, 'A' | 'B') || chars.next()? != ')' {
        return None;
    }
    Some((letter, line[2..].trim()))
}
