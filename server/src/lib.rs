//! # Rewind Server
//! The authoritative half of the prediction protocol: consumes each client's
//! action packets strictly in simulation-tick order (buffering out-of-order
//! arrivals), advances the authoritative movement state, and echoes one
//! response per consumed action back to every client.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod player_remote;
mod server;

pub use player_remote::PlayerRemoteSystem;
pub use server::ReplayServer;
