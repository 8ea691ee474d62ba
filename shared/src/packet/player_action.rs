use glam::Quat;
use serde::{Deserialize, Serialize};

use crate::packet::{Packet, PacketKind};
use crate::types::SimTick;

/// One simulation tick's worth of client input, sent reliably to the server:
/// the tick it was recorded for, the orientation it was recorded under, and
/// the discrete movement deltas (right, up, forward).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerAction {
    pub simulation_tick: SimTick,
    pub rotation: Quat,
    pub delta_action: [i8; 3],
    pub walking: bool,
}

impl Packet for PlayerAction {
    const KIND: PacketKind = PacketKind::PlayerAction;
    const COMPONENT_NAME: &'static str = "PacketComponent<PlayerAction>";
}

impl Default for PlayerAction {
    fn default() -> Self {
        Self {
            simulation_tick: 0,
            rotation: Quat::IDENTITY,
            delta_action: [0; 3],
            walking: false,
        }
    }
}
