use std::collections::VecDeque;

/// Discrete input for one simulation tick: movement deltas (right, up,
/// forward) in {-1, 0, 1} and the walk modifier.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerInput {
    pub delta_action: [i8; 3],
    pub walking: bool,
}

/// Seam to the out-of-scope input layer: sampled once per locally simulated
/// tick, never during replay.
pub trait InputSource: Send {
    fn sample(&mut self) -> PlayerInput;
}

/// Deterministic input feed for tests and harnesses: pops scripted inputs in
/// order and returns neutral input once exhausted.
pub struct ScriptedInput {
    queue: VecDeque<PlayerInput>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, input: PlayerInput) {
        self.queue.push_back(input);
    }

    /// Queues the same input for `ticks` consecutive ticks.
    pub fn push_repeated(&mut self, input: PlayerInput, ticks: usize) {
        for _ in 0..ticks {
            self.queue.push_back(input);
        }
    }
}

impl Default for ScriptedInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> PlayerInput {
        self.queue.pop_front().unwrap_or_default()
    }
}
