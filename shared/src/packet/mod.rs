mod packet_kind;
mod player_action;
mod player_action_response;
mod wire;

pub use packet_kind::PacketKind;
pub use player_action::PlayerAction;
pub use player_action_response::PlayerActionResponse;
pub use wire::{decode, encode, encode_addressed, split_addressed, WireError};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A typed message with a fixed binary layout, deliverable to a networked
/// entity's [`crate::PacketComponent`].
pub trait Packet: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: PacketKind;
    /// Stable component-type name of `PacketComponent<Self>`.
    const COMPONENT_NAME: &'static str;
}
