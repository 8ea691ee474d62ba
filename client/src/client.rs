use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use rewind_ecs::{EcsContext, Entity, SubscriptionHandle, SystemHandle};
use rewind_shared::{
    KinematicCharacterController, NetworkId, NetworkPosition, PacketComponent,
    PacketTranscoderSystem, PeerId, PlayerAction, PlayerActionResponse, PlayerLocal, Position,
    Rotation, SharedMessageChannel, SimTick, TranscoderDirection, Velocity,
};

use crate::input::InputSource;
use crate::manager::ReplayManagerSystem;
use crate::participant::ReplayParticipant;
use crate::player_local::PlayerLocalSystem;
use crate::replay_system::ReplaySystem;

/// Owns a client's prediction stack: the packet transcoder in phase 0, the
/// predicted player-movement participant, and the replay manager in phase 1,
/// all registered against the provided context.
pub struct ReplayClient {
    context: Arc<EcsContext>,
    manager: Arc<Mutex<ReplayManagerSystem>>,
    local_player: Arc<Mutex<ReplaySystem<PlayerLocalSystem>>>,
    local_entity: Option<Entity>,
    _system_handles: Vec<SystemHandle>,
    _subscription_handles: Vec<SubscriptionHandle>,
}

impl ReplayClient {
    pub fn new(
        context: Arc<EcsContext>,
        channel: SharedMessageChannel,
        server_peer: PeerId,
        input: Box<dyn InputSource>,
        controller: KinematicCharacterController,
        fixed_timestep: f32,
    ) -> Self {
        let mut transcoder = PacketTranscoderSystem::new(
            Arc::clone(&channel),
            TranscoderDirection::ToPeer(server_peer),
        );
        transcoder.register_route::<PlayerAction>();
        transcoder.register_route::<PlayerActionResponse>();
        let transcoder_registration = transcoder.registration();
        let transcoder = Arc::new(Mutex::new(transcoder));
        let transcoder_handle = context.register_system(
            "PacketTranscoderSystem",
            transcoder,
            transcoder_registration,
        );

        let player_local = PlayerLocalSystem::new(input, controller);
        let player_subscription = context.subscribe(vec![player_local.subscription()]);
        let local_player = Arc::new(Mutex::new(ReplaySystem::new(player_local)));

        let mut manager = ReplayManagerSystem::new(fixed_timestep);
        let participant: Arc<Mutex<dyn ReplayParticipant>> = local_player.clone();
        manager.register_participant(participant);
        let manager_registration = manager.registration(1);
        let manager = Arc::new(Mutex::new(manager));
        let manager_handle = context.register_system(
            "ReplayManagerSystem",
            Arc::clone(&manager),
            manager_registration,
        );

        Self {
            context,
            manager,
            local_player,
            local_entity: None,
            _system_handles: vec![transcoder_handle, manager_handle],
            _subscription_handles: vec![player_subscription],
        }
    }

    /// Creates the locally controlled player entity with its movement and
    /// packet components. `uid` must match the uid the server assigned.
    pub fn spawn_local_player(&mut self, uid: u64, position: Vec3) -> Entity {
        let entity = self.context.create_entity();
        self.context.add_component(entity, PlayerLocal);
        self.context.add_component(entity, NetworkId { uid });
        self.context.add_component(entity, Position { value: position });
        self.context.add_component(entity, Velocity::default());
        self.context.add_component(entity, Rotation::default());
        self.context
            .add_component(entity, NetworkPosition { position });
        self.context
            .add_component(entity, PacketComponent::<PlayerAction>::new());
        self.context
            .add_component(entity, PacketComponent::<PlayerActionResponse>::new());

        self.local_entity = Some(entity);
        entity
    }

    /// Runs one fixed simulation tick of the whole client stack.
    pub fn tick(&self, delta_time: f32) {
        self.context.tick(delta_time);
    }

    pub fn context(&self) -> &Arc<EcsContext> {
        &self.context
    }

    pub fn local_entity(&self) -> Option<Entity> {
        self.local_entity
    }

    pub fn simulation_tick(&self) -> SimTick {
        self.manager.lock().simulation_tick()
    }

    pub fn simulation_tick_approved(&self) -> SimTick {
        self.manager.lock().simulation_tick_approved()
    }

    /// Predicted frames still awaiting server confirmation.
    pub fn pending_frames(&self) -> usize {
        self.local_player.lock().pending_frames()
    }

    /// The locally simulated network position of the player entity.
    pub fn predicted_position(&self) -> Option<Vec3> {
        let entity = self.local_entity?;
        self.context
            .component::<NetworkPosition>(entity)
            .map(|component| component.position)
    }
}
