//! finlife-core: the game state engine of a month-by-month personal
//! finance simulation.
//!
//! Layers, leaves first:
//!   - state / history / modifiers: the immutable financial state model
//!   - engine / investments: pure state transitions
//!   - batch / fallback: the monthly scenario batch and its fallbacks
//!   - month_flow: the start-month / choice / end-month protocol over
//!     an injected generator and store

pub mod batch;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod history;
pub mod investments;
pub mod key_rotation;
pub mod modifiers;
pub mod month_flow;
pub mod questions;
pub mod remote_generator;
pub mod rng;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod types;
