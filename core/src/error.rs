use crate::types::Money;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account:   String,
        required:  Money,
        available: Money,
    },

    #[error("Invalid amount for {operation}: {amount}")]
    InvalidAmount { operation: &'static str, amount: Money },

    #[error("Invalid scenario shape: {reason}")]
    InvalidScenarioShape { reason: String },

    #[error("Generator failure: {0}")]
    Generator(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No month in progress")]
    NoActiveMonth,

    #[error("Choice '{choice_id}' is not offered by the current scenario")]
    InvalidChoice { choice_id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GameError {
    /// True for conditions the caller can correct by re-prompting the player.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::InvalidAmount { .. }
                | Self::InvalidChoice { .. }
                | Self::Validation(_)
        )
    }
}

pub type GameResult<T> = Result<T, GameError>;
