//! Wall-clock source for history timestamps and key cooldowns.
//!
//! The engine never calls `Utc::now()` directly. Tests inject a
//! fixed clock so every produced state is reproducible.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameClock {
    /// Real time.
    System,
    /// Always returns the same instant.
    Fixed(DateTime<Utc>),
}

impl GameClock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System       => Utc::now(),
            Self::Fixed(at)    => *at,
        }
    }

    /// A fixed clock advanced by `by`. System clocks are returned unchanged.
    pub fn advanced(&self, by: Duration) -> Self {
        match self {
            Self::System    => Self::System,
            Self::Fixed(at) => Self::Fixed(*at + by),
        }
    }

    /// The fixed epoch used by tests: 2024-01-01T00:00:00Z.
    pub fn test_epoch() -> Self {
        Self::Fixed(DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap_or_default())
    }
}

impl Default for GameClock {
    fn default() -> Self { Self::System }
}
