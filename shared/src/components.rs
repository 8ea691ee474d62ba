use std::collections::VecDeque;

use glam::{Quat, Vec3};
use rewind_ecs::{declare_component, Component, ComponentType};

use crate::packet::Packet;

/// The locally presented position of an entity. On the server it mirrors
/// [`NetworkPosition`] after each consumed action; on the client it is owned
/// by presentation systems outside this core.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub value: Vec3,
}
declare_component!(Position, "Position");

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    pub value: Vec3,
}
declare_component!(Velocity, "Velocity");

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    pub quat: Quat,
}
declare_component!(Rotation, "Rotation");

/// The networked, simulation-authoritative position, distinct from the
/// presented [`Position`]. Prediction and reconciliation operate on this.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NetworkPosition {
    pub position: Vec3,
}
declare_component!(NetworkPosition, "NetworkPosition");

/// Wire identity of a networked entity; addressed packets carry this uid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetworkId {
    pub uid: u64,
}
declare_component!(NetworkId, "NetworkId");

/// Marks any player-controlled entity on the server.
#[derive(Clone, Copy, Debug, Default)]
pub struct Player;
declare_component!(Player, "Player");

/// Marks the locally controlled player entity on a client.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlayerLocal;
declare_component!(PlayerLocal, "PlayerLocal");

/// Per-entity packet queues for one packet type: what arrived this tick and
/// what is waiting to be flushed out by the transcoder.
pub struct PacketComponent<P: Packet> {
    received: Vec<P>,
    outgoing: VecDeque<P>,
}

impl<P: Packet> PacketComponent<P> {
    pub fn new() -> Self {
        Self {
            received: Vec::new(),
            outgoing: VecDeque::new(),
        }
    }

    /// Queues a packet for the transcoder's next outbound flush.
    pub fn send_packet(&mut self, packet: P) {
        self.outgoing.push_back(packet);
    }

    /// Packets delivered to this entity during the current tick.
    pub fn packets_received(&self) -> &[P] {
        &self.received
    }

    /// Delivery entry point used by the transcoder.
    pub fn push_received(&mut self, packet: P) {
        self.received.push(packet);
    }

    pub fn clear_received(&mut self) {
        self.received.clear();
    }

    pub fn drain_outgoing(&mut self) -> Vec<P> {
        self.outgoing.drain(..).collect()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }
}

impl<P: Packet> Default for PacketComponent<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Packet> Component for PacketComponent<P> {
    fn component_type() -> ComponentType {
        ComponentType::new(P::COMPONENT_NAME)
    }
}
