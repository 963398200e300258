//! Persistence layer.
//!
//! RULE: Only the store talks to storage.
//! The month flow calls Persistence methods and never executes SQL
//! or touches files directly.

use crate::{
    clock::GameClock,
    error::{GameError, GameResult},
    state::{FinancialState, MonthSummary},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

mod memory;

pub use memory::MemoryStore;

/// Load/save of a player's state by user id.
///
/// A save returns Ok(false) when the backend accepted the call but did
/// not store anything; hard failures are errors. Concurrent sessions for
/// one user are last-write-wins.
pub trait Persistence {
    fn save_user_data(&self, user_id: &str, state: &FinancialState) -> GameResult<bool>;
    fn load_user_data(&self, user_id: &str) -> GameResult<Option<FinancialState>>;
    fn clear_user_data(&self, user_id: &str) -> GameResult<bool>;
}

/// Decode and vet a stored state.
pub(crate) fn decode_state(user_id: &str, json: &str) -> GameResult<FinancialState> {
    let mut state: FinancialState = serde_json::from_str(json)?;
    if state.user_id != user_id {
        return Err(GameError::Persistence(format!(
            "stored state for '{user_id}' belongs to '{}'",
            state.user_id
        )));
    }
    state.check_invariants()?;
    state.is_loaded = true;
    Ok(state)
}

pub struct SqliteStore {
    conn:  Connection,
    clock: GameClock,
}

impl SqliteStore {
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn, clock: GameClock::System })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, clock: GameClock::System })
    }

    /// Stamp saves with `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: GameClock) -> Self {
        self.clock = clock;
        self
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Month summaries ────────────────────────────────────────

    pub fn month_summaries(&self, user_id: &str) -> GameResult<Vec<MonthSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT month, balance_change, savings_change, risk_change, choices_made, net_worth
             FROM month_summary WHERE user_id = ?1
             ORDER BY month ASC",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(MonthSummary {
                    month:          row.get::<_, i64>(0)? as u32,
                    balance_change: row.get(1)?,
                    savings_change: row.get(2)?,
                    risk_change:    row.get(3)?,
                    choices_made:   row.get::<_, i64>(4)? as u32,
                    net_worth:      row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Stored month of a user, without decoding the whole state.
    pub fn stored_month(&self, user_id: &str) -> GameResult<Option<u32>> {
        let month = self
            .conn
            .query_row(
                "SELECT month FROM user_state WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(month.map(|m| m as u32))
    }

    /// When a user's state was last saved.
    pub fn updated_at(&self, user_id: &str) -> GameResult<Option<DateTime<Utc>>> {
        let stamp: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM user_state WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        stamp
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| GameError::Persistence(format!("bad updated_at '{s}': {e}")))
            })
            .transpose()
    }
}

impl Persistence for SqliteStore {
    fn save_user_data(&self, user_id: &str, state: &FinancialState) -> GameResult<bool> {
        let json = serde_json::to_string(state)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO user_state (user_id, month, state_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                month = excluded.month,
                state_json = excluded.state_json,
                updated_at = excluded.updated_at",
            params![user_id, i64::from(state.month), json, self.clock.now().to_rfc3339()],
        )?;
        // The table mirrors the state's summaries; a reset empties both.
        tx.execute("DELETE FROM month_summary WHERE user_id = ?1", params![user_id])?;
        for s in &state.month_summaries {
            tx.execute(
                "INSERT INTO month_summary
                    (user_id, month, balance_change, savings_change, risk_change, choices_made, net_worth)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user_id,
                    i64::from(s.month),
                    s.balance_change,
                    s.savings_change,
                    s.risk_change,
                    i64::from(s.choices_made),
                    s.net_worth,
                ],
            )?;
        }
        tx.commit()?;
        log::debug!("Saved state for user={user_id} at month {}", state.month);
        Ok(true)
    }

    fn load_user_data(&self, user_id: &str) -> GameResult<Option<FinancialState>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM user_state WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| decode_state(user_id, &j)).transpose()
    }

    fn clear_user_data(&self, user_id: &str) -> GameResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM user_state WHERE user_id = ?1", params![user_id])?;
        self.conn
            .execute("DELETE FROM month_summary WHERE user_id = ?1", params![user_id])?;
        log::info!("Cleared stored data for user={user_id}");
        Ok(removed > 0)
    }
}
