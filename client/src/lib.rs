//! # Rewind Client
//! Client-side prediction with server reconciliation: player-controlled
//! subsystems simulate ahead on local input, ledger every predicted tick,
//! confirm them strictly in order against the server's authoritative echoes,
//! and deterministically replay recorded inputs after a prediction error.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod client;
mod input;
mod manager;
mod participant;
mod player_local;
mod replay_system;

pub use client::ReplayClient;
pub use input::{InputSource, PlayerInput, ScriptedInput};
pub use manager::ReplayManagerSystem;
pub use participant::ReplayParticipant;
pub use player_local::{PlayerGameState, PlayerLocalSystem, PREDICTION_EPSILON};
pub use replay_system::{PredictedSystem, ReplaySystem, StampedState};
