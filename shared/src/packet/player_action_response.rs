use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::packet::{Packet, PacketKind};
use crate::types::SimTick;

/// The server's authoritative echo for one consumed [`super::PlayerAction`]:
/// the resulting position, velocity, and orientation at that simulation tick.
/// Broadcast to every client.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerActionResponse {
    pub simulation_tick: SimTick,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
}

impl Packet for PlayerActionResponse {
    const KIND: PacketKind = PacketKind::PlayerActionResponse;
    const COMPONENT_NAME: &'static str = "PacketComponent<PlayerActionResponse>";
}

impl Default for PlayerActionResponse {
    fn default() -> Self {
        Self {
            simulation_tick: 0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}
