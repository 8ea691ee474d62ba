//! # Rewind Shared
//! Common functionality shared between the rewind-server & rewind-client
//! crates: the simulation-tick types, packet definitions with their fixed
//! wire codec, the message-channel contract, networked components, and the
//! deterministic character movement both endpoints simulate.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod channel;
mod components;
mod movement;
mod packet;
mod tick_list;
mod transcoder;
mod types;

pub use channel::{MemoryChannel, MessageChannel, MessageEnvelope, SharedMessageChannel};
pub use components::{
    NetworkId, NetworkPosition, PacketComponent, Player, PlayerLocal, Position, Rotation, Velocity,
};
pub use movement::{
    compute_velocity, CharacterController, KinematicCharacterController, JUMP_SPEED, RUN_SPEED,
    WALK_SPEED,
};
pub use packet::{
    decode, encode, encode_addressed, split_addressed, Packet, PacketKind, PlayerAction,
    PlayerActionResponse, WireError,
};
pub use tick_list::{SequenceError, TickSequenceList};
pub use transcoder::{PacketTranscoderSystem, TranscoderDirection};
pub use types::{PeerId, SimTick};
