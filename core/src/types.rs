//! Shared primitive types used across the entire game.

/// A game month. Month 0 is the state before the first month starts.
pub type Month = u32;

/// Money in whole currency units. Signed: balance may go negative.
pub type Money = i64;

/// The opaque identifier of a player.
pub type UserId = String;
