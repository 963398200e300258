//! In-process store: states held as JSON in a map.

use super::{decode_state, Persistence};
use crate::{error::GameResult, state::FinancialState};
use std::{cell::RefCell, collections::HashMap};

#[derive(Default)]
pub struct MemoryStore {
    states: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with stored state.
    pub fn len(&self) -> usize {
        self.states.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.borrow().is_empty()
    }
}

impl Persistence for MemoryStore {
    fn save_user_data(&self, user_id: &str, state: &FinancialState) -> GameResult<bool> {
        let json = serde_json::to_string(state)?;
        self.states.borrow_mut().insert(user_id.to_string(), json);
        Ok(true)
    }

    fn load_user_data(&self, user_id: &str) -> GameResult<Option<FinancialState>> {
        self.states
            .borrow()
            .get(user_id)
            .map(|json| decode_state(user_id, json))
            .transpose()
    }

    fn clear_user_data(&self, user_id: &str) -> GameResult<bool> {
        Ok(self.states.borrow_mut().remove(user_id).is_some())
    }
}
