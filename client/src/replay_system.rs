use log::warn;
use rewind_ecs::{ComponentAccess, EcsContext};
use rewind_shared::{SequenceError, SimTick, TickSequenceList};

use crate::participant::ReplayParticipant;

/// A state value keyed by the simulation tick it was recorded for.
pub trait StampedState {
    fn simulation_tick(&self) -> SimTick;
}

/// The typed hooks of one predicted subsystem. [`ReplaySystem`] lifts an
/// implementation into a [`ReplayParticipant`] by managing the frame ledgers
/// around these hooks.
pub trait PredictedSystem: Send {
    /// The locally predicted per-tick state, including the recorded input.
    type Predicted: StampedState + Send;
    /// The server's authoritative per-tick echo.
    type Authoritative: StampedState + Send;

    fn component_accesses(&self) -> Vec<ComponentAccess>;

    /// Drains the authoritative echoes that arrived since the last tick.
    fn collect_authoritative(&mut self, ctx: &EcsContext) -> Vec<Self::Authoritative>;

    /// A fresh predicted state stamped with `simulation_tick`.
    fn new_predicted_state(&self, simulation_tick: SimTick) -> Self::Predicted;

    /// Simulates one tick on current local input, filling `state`.
    fn play_tick(&mut self, ctx: &EcsContext, delta_time: f32, state: &mut Self::Predicted);

    /// Re-simulates one tick from the input recorded in `state`.
    fn replay_tick(&mut self, ctx: &EcsContext, delta_time: f32, state: &mut Self::Predicted);

    /// Snaps local state to the authoritative value.
    fn surrender(&mut self, ctx: &EcsContext, server_state: &Self::Authoritative);

    /// True when the prediction matches the echo within tolerance.
    fn compare(&self, predicted: &Self::Predicted, authoritative: &Self::Authoritative) -> bool;
}

/// Ledger plumbing shared by every predicted subsystem: predicted frames
/// pending confirmation, and the authoritative frames received for them kept
/// tick-ordered, so an echo arriving ahead of its predecessor waits in place
/// instead of blocking the front.
pub struct ReplaySystem<P: PredictedSystem> {
    system: P,
    frames_to_reconcile: Vec<P::Predicted>,
    frames_from_server: TickSequenceList<P::Authoritative>,
    last_retired_tick: SimTick,
}

impl<P: PredictedSystem> ReplaySystem<P> {
    pub fn new(system: P) -> Self {
        Self {
            system,
            frames_to_reconcile: Vec::new(),
            frames_from_server: TickSequenceList::new(),
            last_retired_tick: -1,
        }
    }

    pub fn system(&self) -> &P {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut P {
        &mut self.system
    }

    pub fn pending_frames(&self) -> usize {
        self.frames_to_reconcile.len()
    }

    /// Reliable delivery is at-least-once, so redelivered echoes for already
    /// retired ticks and duplicates are dropped, not errors.
    fn register_server_frame(&mut self, frame: P::Authoritative) {
        let tick = frame.simulation_tick();
        if tick <= self.last_retired_tick {
            warn!("dropping stale server frame for already retired tick {tick}");
            return;
        }
        if let Err(SequenceError::DuplicateTick { tick }) =
            self.frames_from_server.try_insert(tick, frame)
        {
            warn!("dropping duplicate server frame for tick {tick}");
        }
    }

    /// Ledger alignment is an internal invariant maintained by the manager's
    /// strict in-order confirmation; a mismatch here is a protocol bug.
    fn assert_fronts_aligned(&self, simulation_tick: SimTick) {
        let Some(predicted) = self.frames_to_reconcile.first() else {
            panic!("replay ledger is empty while confirming tick {simulation_tick}");
        };
        assert!(
            predicted.simulation_tick() == simulation_tick,
            "replay ledger front is tick {}, expected {simulation_tick}",
            predicted.simulation_tick()
        );

        let Some((front_tick, _)) = self.frames_from_server.front() else {
            panic!("no server frame available while confirming tick {simulation_tick}");
        };
        assert!(
            *front_tick == simulation_tick,
            "server frame front is tick {front_tick}, expected {simulation_tick}"
        );
    }
}

impl<P: PredictedSystem> ReplayParticipant for ReplaySystem<P> {
    fn component_accesses(&self) -> Vec<ComponentAccess> {
        self.system.component_accesses()
    }

    fn play_simulation_tick(
        &mut self,
        ctx: &EcsContext,
        delta_time: f32,
        simulation_tick: SimTick,
    ) {
        for frame in self.system.collect_authoritative(ctx) {
            self.register_server_frame(frame);
        }

        let mut state = self.system.new_predicted_state(simulation_tick);
        self.system.play_tick(ctx, delta_time, &mut state);
        self.frames_to_reconcile.push(state);
    }

    fn next_available_simulation_tick(&self) -> Option<SimTick> {
        self.frames_from_server.front().map(|(tick, _)| *tick)
    }

    fn compare_next_game_states(&mut self, simulation_tick: SimTick) -> bool {
        self.assert_fronts_aligned(simulation_tick);

        let predicted = &self.frames_to_reconcile[0];
        let Some((_, authoritative)) = self.frames_from_server.front() else {
            unreachable!("alignment was just asserted");
        };
        self.system.compare(predicted, authoritative)
    }

    fn surrender_game_state(&mut self, ctx: &EcsContext, simulation_tick: SimTick) {
        self.assert_fronts_aligned(simulation_tick);

        let Some((_, authoritative)) = self.frames_from_server.front() else {
            unreachable!("alignment was just asserted");
        };
        self.system.surrender(ctx, authoritative);
    }

    fn replay_simulation_tick(
        &mut self,
        ctx: &EcsContext,
        delta_time: f32,
        index: usize,
        simulation_tick: SimTick,
    ) {
        let Some(state) = self.frames_to_reconcile.get_mut(index) else {
            panic!("replay index {index} out of range while replaying tick {simulation_tick}");
        };
        assert!(
            state.simulation_tick() == simulation_tick,
            "replay ledger entry {index} is tick {}, expected {simulation_tick}",
            state.simulation_tick()
        );

        self.system.replay_tick(ctx, delta_time, state);
    }

    fn delete_game_state(&mut self, simulation_tick: SimTick) {
        self.assert_fronts_aligned(simulation_tick);

        self.frames_to_reconcile.remove(0);
        self.frames_from_server.pop_front();
        self.last_retired_tick = simulation_tick;
    }
}
