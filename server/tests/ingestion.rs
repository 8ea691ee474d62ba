//! Ingestion-path behavior: out-of-order actions wait in the reorder buffer,
//! duplicates and stale ticks are dropped, and every consumed action emits
//! exactly one authoritative echo.

use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use rewind_ecs::{EcsContext, Entity, SystemHandle};
use rewind_server::PlayerRemoteSystem;
use rewind_shared::{
    KinematicCharacterController, NetworkPosition, PacketComponent, Player, PlayerAction,
    PlayerActionResponse, Position, Rotation, SimTick, Velocity,
};

const DT: f32 = 1.0 / 60.0;

struct Harness {
    ctx: Arc<EcsContext>,
    system: Arc<Mutex<PlayerRemoteSystem>>,
    entity: Entity,
    _handle: SystemHandle,
}

fn harness() -> Harness {
    let ctx = EcsContext::with_worker_threads(1);

    let system = PlayerRemoteSystem::new(KinematicCharacterController::default());
    let registration = system.registration(0);
    let system = Arc::new(Mutex::new(system));
    let handle = ctx.register_system("PlayerRemoteSystem", Arc::clone(&system), registration);

    let entity = ctx.create_entity();
    ctx.add_component(entity, Player);
    ctx.add_component(entity, Position::default());
    ctx.add_component(entity, Velocity::default());
    ctx.add_component(entity, Rotation::default());
    ctx.add_component(entity, NetworkPosition::default());
    ctx.add_component(entity, PacketComponent::<PlayerAction>::new());
    ctx.add_component(entity, PacketComponent::<PlayerActionResponse>::new());

    Harness {
        ctx,
        system,
        entity,
        _handle: handle,
    }
}

impl Harness {
    fn receive_actions(&self, ticks: &[SimTick]) {
        let packets = self.ctx.array::<PacketComponent<PlayerAction>>();
        let mut packets = packets.write();
        let component = packets.get_mut(self.entity).unwrap();
        for &tick in ticks {
            component.push_received(PlayerAction {
                simulation_tick: tick,
                delta_action: [0, 0, 1],
                ..Default::default()
            });
        }
    }

    /// One tick, clearing the received queue afterwards the way the
    /// transcoder would at the start of the next one.
    fn tick(&self) {
        self.ctx.tick(DT);
        let packets = self.ctx.array::<PacketComponent<PlayerAction>>();
        if let Some(component) = packets.write().get_mut(self.entity) {
            component.clear_received();
        };
    }

    fn drain_response_ticks(&self) -> Vec<SimTick> {
        let responses = self.ctx.array::<PacketComponent<PlayerActionResponse>>();
        let mut responses = responses.write();
        responses
            .get_mut(self.entity)
            .unwrap()
            .drain_outgoing()
            .iter()
            .map(|response| response.simulation_tick)
            .collect()
    }

    fn next_expected(&self) -> SimTick {
        self.system.lock().next_expected_tick(self.entity)
    }

    fn buffered(&self) -> usize {
        self.system.lock().buffered_actions(self.entity)
    }
}

#[test]
fn in_order_actions_apply_immediately_and_echo_once_each() {
    let h = harness();

    h.receive_actions(&[0, 1, 2]);
    h.tick();

    assert_eq!(h.next_expected(), 3);
    assert_eq!(h.buffered(), 0);
    assert_eq!(h.drain_response_ticks(), vec![0, 1, 2]);

    // three forward steps worth of authoritative movement
    let position = h
        .ctx
        .component::<NetworkPosition>(h.entity)
        .unwrap()
        .position;
    assert!(position.z > 0.0);
}

#[test]
fn a_gap_in_tick_order_stalls_later_actions_until_it_fills() {
    let h = harness();

    // tick 2 lost in transit: 0 and 1 apply, 3 waits in the buffer
    h.receive_actions(&[0, 1, 3]);
    h.tick();

    assert_eq!(h.next_expected(), 2);
    assert_eq!(h.buffered(), 1);
    assert_eq!(h.drain_response_ticks(), vec![0, 1]);

    // the late packet arrives: 2 and the buffered 3 apply in order
    h.receive_actions(&[2]);
    h.tick();

    assert_eq!(h.next_expected(), 4);
    assert_eq!(h.buffered(), 0);
    assert_eq!(h.drain_response_ticks(), vec![2, 3]);
}

#[test]
fn duplicate_and_stale_actions_are_dropped() {
    let h = harness();

    h.receive_actions(&[0, 0]);
    h.tick();
    assert_eq!(h.next_expected(), 1);
    assert_eq!(h.drain_response_ticks(), vec![0]);

    // redelivery of an already applied tick
    h.receive_actions(&[0]);
    h.tick();
    assert_eq!(h.next_expected(), 1);
    assert_eq!(h.buffered(), 0);
    assert!(h.drain_response_ticks().is_empty());
}

#[test]
fn movement_is_deterministic_for_identical_action_sequences() {
    let run = || -> Vec3 {
        let h = harness();
        h.receive_actions(&[0, 1, 2, 3, 4]);
        h.tick();
        h.ctx
            .component::<NetworkPosition>(h.entity)
            .unwrap()
            .position
    };

    assert_eq!(run(), run());
}
