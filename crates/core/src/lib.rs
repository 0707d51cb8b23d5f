#![warn(clippy::all, missing_docs)]

//! Core domain logic for the tapmint economy simulation.
//!
//! This crate hosts the game state model, configuration handling,
//! the transition engine with its injectable time and randomness
//! sources, and the contract-shaped backend surface used by the
//! command-line frontend and any future frontends.

pub mod clock;
pub mod config;
pub mod contract;
pub mod engine;
pub mod luck;
pub mod outcome;
pub mod rollover;
pub mod state;
pub mod store;
pub mod wallet;

pub use config::AppConfig;
pub use contract::{GameBackend, GameEvent, LocalBackend};
pub use engine::GameEngine;
pub use outcome::TransitionError;
pub use rollover::{RolloverEvent, RolloverWatcher};
pub use state::{GameState, TokenAmount, Withdrawal};
pub use store::StateStore;
