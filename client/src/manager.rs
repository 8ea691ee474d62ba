use std::sync::Arc;

use parking_lot::Mutex;
use rewind_ecs::{
    no_access, ComponentAccess, EcsContext, EntitySink, EntitySubscriptionRegistration, System,
    SystemRegistration,
};
use rewind_shared::{PlayerLocal, SimTick};

use crate::participant::ReplayParticipant;

/// Orchestrates deterministic replay across the registered participants.
///
/// `simulation_tick` is the next tick about to be locally simulated;
/// `simulation_tick_approved` is the last tick confirmed consistent with the
/// server. Confirmation is strictly sequential by tick number: a later tick's
/// echo arriving before an earlier one's is not consumed until the earlier
/// one arrives, so corrections are never applied out of order.
pub struct ReplayManagerSystem {
    simulation_tick: SimTick,
    simulation_tick_approved: SimTick,
    participants: Vec<Arc<Mutex<dyn ReplayParticipant>>>,
    player_local_entities: EntitySink,
    fixed_timestep: f32,
}

impl ReplayManagerSystem {
    pub fn new(fixed_timestep: f32) -> Self {
        Self {
            simulation_tick: 0,
            simulation_tick_approved: -1,
            participants: Vec::new(),
            player_local_entities: EntitySink::new(),
            fixed_timestep,
        }
    }

    pub fn register_participant(&mut self, participant: Arc<Mutex<dyn ReplayParticipant>>) {
        self.participants.push(participant);
    }

    /// The manager drives its participants' component access from its own
    /// regular job, so the job declares the union of their accesses.
    pub fn registration(&self, phase: usize) -> SystemRegistration {
        let mut additional: Vec<ComponentAccess> = Vec::new();
        for participant in &self.participants {
            additional.extend(participant.lock().component_accesses());
        }

        SystemRegistration::new(
            vec![EntitySubscriptionRegistration::new(
                vec![no_access::<PlayerLocal>()],
                self.player_local_entities.clone(),
            )],
            phase,
        )
        .with_additional_accesses(additional)
    }

    pub fn simulation_tick(&self) -> SimTick {
        self.simulation_tick
    }

    pub fn simulation_tick_approved(&self) -> SimTick {
        self.simulation_tick_approved
    }

    /// The oldest tick every participant has an authoritative echo for, or
    /// None while any participant is still waiting.
    fn oldest_available_simulation_tick(&self) -> Option<SimTick> {
        let mut oldest: Option<SimTick> = None;
        for participant in &self.participants {
            let tick = participant.lock().next_available_simulation_tick()?;
            oldest = Some(match oldest {
                Some(current) => current.min(tick),
                None => tick,
            });
        }
        oldest
    }

    fn is_new_tick_to_compare(&self, oldest_available: SimTick) -> bool {
        self.simulation_tick_approved + 1 == oldest_available
    }

    /// A prediction error in *any* participant surrenders *every* divergent
    /// participant to the server state for that tick.
    fn check_for_prediction_error(&mut self, ctx: &EcsContext, simulation_tick: SimTick) -> bool {
        let mut prediction_error = false;
        for participant in &self.participants {
            let mut participant = participant.lock();
            if !participant.compare_next_game_states(simulation_tick) {
                prediction_error = true;
                participant.surrender_game_state(ctx, simulation_tick);
            }
        }
        prediction_error
    }

    fn delete_game_state(&mut self, simulation_tick: SimTick) {
        for participant in &self.participants {
            participant.lock().delete_game_state(simulation_tick);
        }
    }

    /// Replays every tick from `simulation_tick` through the current one
    /// (inclusive) from the already-recorded inputs.
    fn replay_simulation_ticks_from(&mut self, ctx: &EcsContext, simulation_tick: SimTick) {
        let delta_time = self.fixed_timestep;

        let mut index = 0;
        for tick in simulation_tick..=self.simulation_tick {
            for participant in &self.participants {
                participant
                    .lock()
                    .replay_simulation_tick(ctx, delta_time, index, tick);
            }
            index += 1;
        }
    }
}

impl System for ReplayManagerSystem {
    fn tick(&mut self, ctx: &EcsContext, delta_time: f32) {
        if self.player_local_entities.is_empty() {
            return;
        }

        for participant in &self.participants {
            participant
                .lock()
                .play_simulation_tick(ctx, delta_time, self.simulation_tick);
        }

        // Drain loop: more than one tick may be confirmable in a single frame
        // if the server's acknowledgements arrive in a burst.
        loop {
            let Some(oldest_available) = self.oldest_available_simulation_tick() else {
                break;
            };
            if !self.is_new_tick_to_compare(oldest_available) {
                break;
            }

            let prediction_error = self.check_for_prediction_error(ctx, oldest_available);
            self.delete_game_state(oldest_available);

            if prediction_error {
                self.replay_simulation_ticks_from(ctx, oldest_available + 1);
            }

            self.simulation_tick_approved = oldest_available;
        }

        self.simulation_tick += 1;
    }
}
