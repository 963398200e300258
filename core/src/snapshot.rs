//! Export/import of a full player state as JSON.
//!
//! The export is the FinancialState serialized verbatim. Import checks
//! shape (unknown fields are rejected) and invariants before handing a
//! state back, so a malformed file can never replace a live state.

use crate::{
    error::{GameError, GameResult},
    state::FinancialState,
};

pub fn export_state(state: &FinancialState, pretty: bool) -> GameResult<String> {
    let json = if pretty {
        serde_json::to_string_pretty(state)?
    } else {
        serde_json::to_string(state)?
    };
    Ok(json)
}

/// Parse and vet an exported state. Every failure is a Validation error.
pub fn import_state(json: &str) -> GameResult<FinancialState> {
    let mut state: FinancialState = serde_json::from_str(json)
        .map_err(|e| GameError::Validation(format!("import rejected: {e}")))?;
    state.check_invariants().map_err(|e| match e {
        GameError::Validation(reason) => GameError::Validation(format!("import rejected: {reason}")),
        other => other,
    })?;
    state.is_loaded = true;
    log::info!("Imported state for user={} at month {}", state.user_id, state.month);
    Ok(state)
}

/// Import `json` in place of `live`, leaving `live` untouched on failure.
/// The imported state must belong to the same player.
pub fn replace_from_import(live: &FinancialState, json: &str) -> (FinancialState, GameResult<()>) {
    let imported = import_state(json).and_then(|imported| {
        if imported.user_id == live.user_id {
            Ok(imported)
        } else {
            Err(GameError::Validation(format!(
                "import rejected: file belongs to '{}', not '{}'",
                imported.user_id, live.user_id
            )))
        }
    });
    match imported {
        Ok(imported) => (imported, Ok(())),
        Err(e) => {
            log::warn!("Import for user={} rejected: {e}", live.user_id);
            (live.clone(), Err(e))
        }
    }
}
