//! API key rotation for remote generators.
//!
//! All rotation state (the round-robin cursor and per-key cooldowns)
//! lives in the KeyRotator instance that a generator owns. Nothing is
//! process-wide, so two generators never interfere and tests can seed
//! any rotation state they need.

use crate::error::{GameError, GameResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    /// Index tried first on the next call.
    pub next_index:    usize,
    /// Per key: rate-limited until this instant.
    pub cooling_until: Vec<Option<DateTime<Utc>>>,
}

pub struct KeyRotator {
    keys:     Vec<String>,
    cooldown: Duration,
    state:    RotationState,
}

impl KeyRotator {
    pub fn new(keys: Vec<String>, cooldown: Duration) -> Self {
        let state = RotationState { next_index: 0, cooling_until: vec![None; keys.len()] };
        Self { keys, cooldown, state }
    }

    /// Resume from a previously captured rotation state.
    pub fn with_state(keys: Vec<String>, cooldown: Duration, state: RotationState) -> GameResult<Self> {
        if state.cooling_until.len() != keys.len() {
            return Err(GameError::Validation(format!(
                "rotation state tracks {} keys, {} configured",
                state.cooling_until.len(),
                keys.len()
            )));
        }
        if !keys.is_empty() && state.next_index >= keys.len() {
            return Err(GameError::Validation("rotation cursor past the last key".into()));
        }
        Ok(Self { keys, cooldown, state })
    }

    pub fn rotation_state(&self) -> &RotationState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_available(&self, index: usize, now: DateTime<Utc>) -> bool {
        match self.state.cooling_until.get(index) {
            Some(Some(until)) => now >= *until,
            Some(None)        => true,
            None              => false,
        }
    }

    /// The next key not cooling down, starting from the cursor.
    /// Advances the cursor past the returned key.
    pub fn next_key(&mut self, now: DateTime<Utc>) -> Option<(usize, String)> {
        let n = self.keys.len();
        for offset in 0..n {
            let index = (self.state.next_index + offset) % n;
            if self.is_available(index, now) {
                self.state.next_index = (index + 1) % n;
                return Some((index, self.keys[index].clone()));
            }
        }
        None
    }

    /// Put a key on cooldown after the provider rejected it for rate.
    pub fn mark_rate_limited(&mut self, index: usize, now: DateTime<Utc>) {
        if let Some(slot) = self.state.cooling_until.get_mut(index) {
            *slot = Some(now + self.cooldown);
            log::warn!("API key #{index} rate limited; cooling down for {}s", self.cooldown.num_seconds());
        }
    }
}
