//! The player's append-only financial history.
//!
//! RULE: Entries are never edited or removed. Every transition that
//! moves balance, savings or risk appends exactly one entry.

use crate::types::{Money, Month};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Choice,
    Investment,
    System,
}

impl EntryKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Income     => "income",
            Self::Choice     => "choice",
            Self::Investment => "investment",
            Self::System     => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind:           EntryKind,
    pub month:          Month,
    pub balance_change: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_change: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_change:    Option<i32>,
    pub description:    String,
    pub timestamp:      DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        kind: EntryKind,
        month: Month,
        balance_change: Money,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            month,
            balance_change,
            savings_change: None,
            risk_change: None,
            description: description.into(),
            timestamp,
        }
    }

    pub fn with_savings(mut self, delta: Money) -> Self {
        self.savings_change = Some(delta);
        self
    }

    pub fn with_risk(mut self, delta: i32) -> Self {
        self.risk_change = Some(delta);
        self
    }
}

/// Entries recorded during `month`, in order.
pub fn entries_for_month(history: &[HistoryEntry], month: Month) -> Vec<&HistoryEntry> {
    history.iter().filter(|e| e.month == month).collect()
}
