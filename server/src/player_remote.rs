use std::collections::HashMap;

use log::warn;
use rewind_ecs::{
    no_access, read, read_write, ComponentAccess, EcsContext, Entity, EntitySink,
    EntitySubscriptionRegistration, System, SystemRegistration,
};
use rewind_shared::{
    compute_velocity, CharacterController, KinematicCharacterController, NetworkPosition,
    PacketComponent, Player, PlayerAction, PlayerActionResponse, Position, Rotation, SequenceError,
    SimTick, TickSequenceList, Velocity,
};

/// Per-player ingestion state: a reorder buffer of not-yet-applicable actions
/// and the next simulation tick expected in order.
struct RemotePlayerLedger {
    buffer: TickSequenceList<PlayerAction>,
    next_expected_tick: SimTick,
}

impl RemotePlayerLedger {
    fn new() -> Self {
        Self {
            buffer: TickSequenceList::new(),
            next_expected_tick: 0,
        }
    }
}

/// Applies every remotely controlled player's received actions, one per
/// simulation tick, strictly in order. Out-of-order arrivals wait in the
/// reorder buffer until the gap fills; duplicates and already-applied ticks
/// are dropped with a warning. One [`PlayerActionResponse`] is emitted per
/// consumed action.
pub struct PlayerRemoteSystem {
    entities: EntitySink,
    ledgers: HashMap<Entity, RemotePlayerLedger>,
    controller: KinematicCharacterController,
}

impl PlayerRemoteSystem {
    pub fn new(controller: KinematicCharacterController) -> Self {
        Self {
            entities: EntitySink::new(),
            ledgers: HashMap::new(),
            controller,
        }
    }

    pub fn registration(&self, phase: usize) -> SystemRegistration {
        SystemRegistration::new(
            vec![EntitySubscriptionRegistration::new(
                self.accesses(),
                self.entities.clone(),
            )],
            phase,
        )
    }

    fn accesses(&self) -> Vec<ComponentAccess> {
        vec![
            no_access::<Player>(),
            read_write::<NetworkPosition>(),
            read_write::<Position>(),
            read_write::<Velocity>(),
            read_write::<Rotation>(),
            read::<PacketComponent<PlayerAction>>(),
            read_write::<PacketComponent<PlayerActionResponse>>(),
        ]
    }

    /// The next simulation tick expected from this player's client.
    pub fn next_expected_tick(&self, entity: Entity) -> SimTick {
        self.ledgers
            .get(&entity)
            .map(|ledger| ledger.next_expected_tick)
            .unwrap_or(0)
    }

    /// Actions buffered for this player because of a gap in tick order.
    pub fn buffered_actions(&self, entity: Entity) -> usize {
        self.ledgers
            .get(&entity)
            .map(|ledger| ledger.buffer.len())
            .unwrap_or(0)
    }

    fn buffer_received(ledger: &mut RemotePlayerLedger, entity: Entity, actions: &[PlayerAction]) {
        for action in actions {
            let tick = action.simulation_tick;
            if tick < ledger.next_expected_tick {
                warn!(
                    "dropping action for already applied tick {tick} from {entity} (expecting {})",
                    ledger.next_expected_tick
                );
                continue;
            }
            if let Err(SequenceError::DuplicateTick { tick }) = ledger.buffer.try_insert(tick, *action)
            {
                warn!("dropping duplicate action for tick {tick} from {entity}");
            }
        }
    }

    /// Applies one in-order action: snap the client's orientation, derive the
    /// authoritative velocity from the echoed input, and step the character.
    fn apply_action(&self, ctx: &EcsContext, entity: Entity, action: &PlayerAction, delta_time: f32) {
        let rotations = ctx.array::<Rotation>();
        let network_positions = ctx.array::<NetworkPosition>();
        let velocities = ctx.array::<Velocity>();

        let mut rotations = rotations.write();
        let mut network_positions = network_positions.write();
        let mut velocities = velocities.write();

        let (Some(rotation), Some(network_position), Some(velocity)) = (
            rotations.get_mut(entity),
            network_positions.get_mut(entity),
            velocities.get_mut(entity),
        ) else {
            return;
        };

        if rotation.quat != action.rotation {
            rotation.quat = action.rotation;
        }

        let mut delta_action = action.delta_action;
        // the server re-applies the same grounded gate the client recorded
        // under, so identical states stay identical
        if delta_action[1] != 0 && !self.controller.is_grounded(network_position.position) {
            delta_action[1] = 0;
        }

        compute_velocity(
            rotation.quat,
            delta_action,
            action.walking,
            &mut velocity.value,
        );
        self.controller.step(
            delta_time,
            &mut network_position.position,
            &mut velocity.value,
        );
    }
}

impl System for PlayerRemoteSystem {
    fn tick(&mut self, ctx: &EcsContext, delta_time: f32) {
        let entities = self.entities.entities();

        for &entity in &entities {
            let received = {
                let packets = ctx.array::<PacketComponent<PlayerAction>>();
                let packets = packets.read();
                packets
                    .get(entity)
                    .map(|component| component.packets_received().to_vec())
                    .unwrap_or_default()
            };

            let ledger = self
                .ledgers
                .entry(entity)
                .or_insert_with(RemotePlayerLedger::new);
            Self::buffer_received(ledger, entity, &received);

            // Drain the contiguous prefix: each applicable action advances the
            // authoritative simulation by one tick and emits one echo.
            let mut applied: Vec<PlayerAction> = Vec::new();
            while ledger
                .buffer
                .front()
                .map(|(tick, _)| *tick == ledger.next_expected_tick)
                .unwrap_or(false)
            {
                let Some((_, action)) = ledger.buffer.pop_front() else {
                    break;
                };
                ledger.next_expected_tick += 1;
                applied.push(action);
            }

            for action in &applied {
                self.apply_action(ctx, entity, action, delta_time);
                self.emit_response(ctx, entity, action.simulation_tick);
            }

            self.mirror_presented_position(ctx, entity);
        }

        self.ledgers.retain(|entity, _| entities.contains(entity));
    }
}

impl PlayerRemoteSystem {
    fn emit_response(&self, ctx: &EcsContext, entity: Entity, simulation_tick: SimTick) {
        let position = {
            let network_positions = ctx.array::<NetworkPosition>();
            let network_positions = network_positions.read();
            let Some(component) = network_positions.get(entity) else {
                return;
            };
            component.position
        };
        let velocity = {
            let velocities = ctx.array::<Velocity>();
            let velocities = velocities.read();
            velocities
                .get(entity)
                .map(|component| component.value)
                .unwrap_or_default()
        };
        let rotation = {
            let rotations = ctx.array::<Rotation>();
            let rotations = rotations.read();
            rotations
                .get(entity)
                .map(|component| component.quat)
                .unwrap_or_default()
        };

        let responses = ctx.array::<PacketComponent<PlayerActionResponse>>();
        let mut responses = responses.write();
        if let Some(component) = responses.get_mut(entity) {
            component.send_packet(PlayerActionResponse {
                simulation_tick,
                position,
                velocity,
                rotation,
            });
        }
    }

    /// Mirrors the authoritative network position into the presented one.
    fn mirror_presented_position(&self, ctx: &EcsContext, entity: Entity) {
        let network_position = {
            let network_positions = ctx.array::<NetworkPosition>();
            let network_positions = network_positions.read();
            let Some(component) = network_positions.get(entity) else {
                return;
            };
            component.position
        };

        let positions = ctx.array::<Position>();
        let mut positions = positions.write();
        if let Some(position) = positions.get_mut(entity) {
            if position.value != network_position {
                position.value = network_position;
            }
        }
    }
}
