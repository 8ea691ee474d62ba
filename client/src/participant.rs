use rewind_ecs::{ComponentAccess, EcsContext};
use rewind_shared::SimTick;

/// Capability interface of one predicted subsystem driven by
/// [`crate::ReplayManagerSystem`]. Implementations ledger their predicted
/// states per simulation tick and reconcile them against server echoes.
pub trait ReplayParticipant: Send {
    /// The component accesses this participant performs when driven, declared
    /// on the manager's regular job.
    fn component_accesses(&self) -> Vec<ComponentAccess>;

    /// Advances the subsystem by one tick on current local input and ledgers
    /// the resulting predicted state under `simulation_tick`.
    fn play_simulation_tick(&mut self, ctx: &EcsContext, delta_time: f32, simulation_tick: SimTick);

    /// The oldest tick for which the server's authoritative echo has arrived,
    /// if any.
    fn next_available_simulation_tick(&self) -> Option<SimTick>;

    /// Compares the ledgered prediction for `simulation_tick` against the
    /// server echo. Returns false on a prediction error.
    fn compare_next_game_states(&mut self, simulation_tick: SimTick) -> bool;

    /// Snaps local state to the server's authoritative value for
    /// `simulation_tick`.
    fn surrender_game_state(&mut self, ctx: &EcsContext, simulation_tick: SimTick);

    /// Re-simulates `simulation_tick` from the recorded input at ledger
    /// position `index`. Deterministic: no fresh input is read.
    fn replay_simulation_tick(
        &mut self,
        ctx: &EcsContext,
        delta_time: f32,
        index: usize,
        simulation_tick: SimTick,
    );

    /// Retires the confirmed (or corrected) tick's ledger entries.
    fn delete_game_state(&mut self, simulation_tick: SimTick);
}
