use glam::{Quat, Vec3};
use log::error;
use rewind_ecs::{
    no_access, read, read_write, ComponentAccess, EcsContext, Entity, EntitySink,
    EntitySubscriptionRegistration,
};
use rewind_shared::{
    compute_velocity, CharacterController, KinematicCharacterController, NetworkPosition,
    PacketComponent, PlayerAction, PlayerActionResponse, PlayerLocal, Position, Rotation, SimTick,
    Velocity,
};

use crate::input::InputSource;
use crate::replay_system::{PredictedSystem, StampedState};

/// Distance tolerance between a predicted and an authoritative value before
/// the difference counts as a prediction error.
pub const PREDICTION_EPSILON: f32 = 0.01;

/// One locally simulated tick's predicted state together with the input that
/// produced it, retained until the server confirms or corrects the tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerGameState {
    pub simulation_tick: SimTick,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    pub delta_action: [i8; 3],
    pub walking: bool,
}

impl PlayerGameState {
    fn stamped(simulation_tick: SimTick) -> Self {
        Self {
            simulation_tick,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            delta_action: [0; 3],
            walking: false,
        }
    }
}

impl StampedState for PlayerGameState {
    fn simulation_tick(&self) -> SimTick {
        self.simulation_tick
    }
}

impl StampedState for PlayerActionResponse {
    fn simulation_tick(&self) -> SimTick {
        self.simulation_tick
    }
}

/// Predicted movement of the locally controlled player: samples input,
/// simulates the character controller ahead of the server, sends the action
/// packet, and reconciles against `PlayerActionResponse` echoes.
pub struct PlayerLocalSystem {
    entities: EntitySink,
    input: Box<dyn InputSource>,
    controller: KinematicCharacterController,
}

impl PlayerLocalSystem {
    pub fn new(input: Box<dyn InputSource>, controller: KinematicCharacterController) -> Self {
        Self {
            entities: EntitySink::new(),
            input,
            controller,
        }
    }

    /// The subscription backing this system's entity sink; registered by the
    /// owning client alongside the manager.
    pub fn subscription(&self) -> EntitySubscriptionRegistration {
        EntitySubscriptionRegistration::new(self.accesses(), self.entities.clone())
    }

    fn accesses(&self) -> Vec<ComponentAccess> {
        vec![
            no_access::<PlayerLocal>(),
            read_write::<NetworkPosition>(),
            read::<Position>(),
            read_write::<Velocity>(),
            read::<Rotation>(),
            read_write::<PacketComponent<PlayerAction>>(),
            read::<PacketComponent<PlayerActionResponse>>(),
        ]
    }

    fn local_entity(&self) -> Option<Entity> {
        debug_assert!(self.entities.len() <= 1, "at most one locally controlled player");
        self.entities.first()
    }

    /// Advances the character controller by one tick from the state recorded
    /// in `state`, then records the outcome back into it.
    fn simulate_recorded_input(&self, ctx: &EcsContext, delta_time: f32, entity: Entity, state: &mut PlayerGameState) {
        let network_positions = ctx.array::<NetworkPosition>();
        let velocities = ctx.array::<Velocity>();
        let mut network_positions = network_positions.write();
        let mut velocities = velocities.write();
        let (Some(network_position), Some(velocity)) =
            (network_positions.get_mut(entity), velocities.get_mut(entity))
        else {
            return;
        };

        compute_velocity(
            state.rotation,
            state.delta_action,
            state.walking,
            &mut velocity.value,
        );
        self.controller
            .step(delta_time, &mut network_position.position, &mut velocity.value);

        state.position = network_position.position;
        state.velocity = velocity.value;
    }

    fn send_game_state(&self, ctx: &EcsContext, entity: Entity, state: &PlayerGameState) {
        let packets = ctx.array::<PacketComponent<PlayerAction>>();
        let mut packets = packets.write();
        let Some(component) = packets.get_mut(entity) else {
            return;
        };

        component.send_packet(PlayerAction {
            simulation_tick: state.simulation_tick,
            rotation: state.rotation,
            delta_action: state.delta_action,
            walking: state.walking,
        });
    }
}

impl PredictedSystem for PlayerLocalSystem {
    type Predicted = PlayerGameState;
    type Authoritative = PlayerActionResponse;

    fn component_accesses(&self) -> Vec<ComponentAccess> {
        self.accesses()
    }

    fn collect_authoritative(&mut self, ctx: &EcsContext) -> Vec<PlayerActionResponse> {
        let Some(entity) = self.local_entity() else {
            return Vec::new();
        };

        let packets = ctx.array::<PacketComponent<PlayerActionResponse>>();
        let packets = packets.read();
        packets
            .get(entity)
            .map(|component| component.packets_received().to_vec())
            .unwrap_or_default()
    }

    fn new_predicted_state(&self, simulation_tick: SimTick) -> PlayerGameState {
        PlayerGameState::stamped(simulation_tick)
    }

    fn play_tick(&mut self, ctx: &EcsContext, delta_time: f32, state: &mut PlayerGameState) {
        let Some(entity) = self.local_entity() else {
            return;
        };

        let mut input = self.input.sample();

        // jump input only counts while grounded, so the recorded input is
        // already the one the server will agree with
        let grounded = {
            let network_positions = ctx.array::<NetworkPosition>();
            let network_positions = network_positions.read();
            network_positions
                .get(entity)
                .map(|component| self.controller.is_grounded(component.position))
                .unwrap_or(false)
        };
        if input.delta_action[1] != 0 && !grounded {
            input.delta_action[1] = 0;
        }

        let rotation = {
            let rotations = ctx.array::<Rotation>();
            let rotations = rotations.read();
            rotations
                .get(entity)
                .map(|component| component.quat)
                .unwrap_or(Quat::IDENTITY)
        };

        state.rotation = rotation;
        state.delta_action = input.delta_action;
        state.walking = input.walking;

        self.simulate_recorded_input(ctx, delta_time, entity, state);
        self.send_game_state(ctx, entity, state);
    }

    fn replay_tick(&mut self, ctx: &EcsContext, delta_time: f32, state: &mut PlayerGameState) {
        let Some(entity) = self.local_entity() else {
            return;
        };
        // deterministic replay: rotation and deltas come from the recorded
        // state, never from fresh input
        self.simulate_recorded_input(ctx, delta_time, entity, state);
    }

    fn surrender(&mut self, ctx: &EcsContext, server_state: &PlayerActionResponse) {
        let Some(entity) = self.local_entity() else {
            return;
        };

        let network_positions = ctx.array::<NetworkPosition>();
        let velocities = ctx.array::<Velocity>();
        if let Some(network_position) = network_positions.write().get_mut(entity) {
            network_position.position = server_state.position;
        }
        if let Some(velocity) = velocities.write().get_mut(entity) {
            velocity.value = server_state.velocity;
        };
    }

    fn compare(&self, predicted: &PlayerGameState, authoritative: &PlayerActionResponse) -> bool {
        let mut matches = true;

        if predicted.position.distance(authoritative.position) > PREDICTION_EPSILON {
            error!(
                "prediction error, tick {}: position [L: {:?}] [S: {:?}]",
                predicted.simulation_tick, predicted.position, authoritative.position
            );
            matches = false;
        }

        if predicted.velocity.distance(authoritative.velocity) > PREDICTION_EPSILON {
            error!(
                "prediction error, tick {}: velocity [L: {:?}] [S: {:?}]",
                predicted.simulation_tick, predicted.velocity, authoritative.velocity
            );
            matches = false;
        }

        matches
    }
}
