use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use rewind_ecs::{EcsContext, Entity, SystemHandle};
use rewind_shared::{
    KinematicCharacterController, NetworkId, NetworkPosition, PacketComponent,
    PacketTranscoderSystem, PeerId, Player, PlayerAction, PlayerActionResponse, Position, Rotation,
    SharedMessageChannel, TranscoderDirection, Velocity,
};

use crate::player_remote::PlayerRemoteSystem;

/// Owns the server's authoritative stack: the packet transcoder in phase 0
/// (broadcasting outbound echoes) and the remote-player system in phase 1,
/// registered against the provided context.
pub struct ReplayServer {
    context: Arc<EcsContext>,
    remote_system: Arc<Mutex<PlayerRemoteSystem>>,
    _system_handles: Vec<SystemHandle>,
}

impl ReplayServer {
    pub fn new(
        context: Arc<EcsContext>,
        channel: SharedMessageChannel,
        controller: KinematicCharacterController,
    ) -> Self {
        let mut transcoder =
            PacketTranscoderSystem::new(channel, TranscoderDirection::Broadcast);
        transcoder.register_route::<PlayerAction>();
        transcoder.register_route::<PlayerActionResponse>();
        let transcoder_registration = transcoder.registration();
        let transcoder = Arc::new(Mutex::new(transcoder));
        let transcoder_handle = context.register_system(
            "PacketTranscoderSystem",
            transcoder,
            transcoder_registration,
        );

        let remote_system = PlayerRemoteSystem::new(controller);
        let remote_registration = remote_system.registration(1);
        let remote_system = Arc::new(Mutex::new(remote_system));
        let remote_handle = context.register_system(
            "PlayerRemoteSystem",
            Arc::clone(&remote_system),
            remote_registration,
        );

        Self {
            context,
            remote_system,
            _system_handles: vec![transcoder_handle, remote_handle],
        }
    }

    /// Creates the authoritative entity for a connecting player. The client's
    /// peer id doubles as the entity's wire uid.
    pub fn spawn_player(&self, peer: PeerId, position: Vec3) -> Entity {
        let entity = self.context.create_entity();
        self.context.add_component(entity, Player);
        self.context.add_component(entity, NetworkId { uid: peer.0 });
        self.context.add_component(entity, Position { value: position });
        self.context.add_component(entity, Velocity::default());
        self.context.add_component(entity, Rotation::default());
        self.context
            .add_component(entity, NetworkPosition { position });
        self.context
            .add_component(entity, PacketComponent::<PlayerAction>::new());
        self.context
            .add_component(entity, PacketComponent::<PlayerActionResponse>::new());
        entity
    }

    /// Runs one fixed simulation tick of the whole server stack.
    pub fn tick(&self, delta_time: f32) {
        self.context.tick(delta_time);
    }

    pub fn context(&self) -> &Arc<EcsContext> {
        &self.context
    }

    /// The authoritative position of a player entity.
    pub fn authoritative_position(&self, entity: Entity) -> Option<Vec3> {
        self.context
            .component::<NetworkPosition>(entity)
            .map(|component| component.position)
    }

    pub fn remote_system(&self) -> &Arc<Mutex<PlayerRemoteSystem>> {
        &self.remote_system
    }
}
