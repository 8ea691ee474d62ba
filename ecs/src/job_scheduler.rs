use std::collections::HashMap;
use std::sync::Arc;

use log::{error, warn};
use parking_lot::{Condvar, Mutex};

use crate::component::{ComponentAccess, ComponentType, Permission};
use crate::id_generator::IdGenerator;
use crate::job::{Job, JobFunction, RegularJob, RegularJobFunction};
use crate::worker_pool::WorkerPool;

/// Number of regular phases per tick. Systems register into one of these.
pub const PHASE_COUNT: usize = 3;
/// The last regular phase.
pub const LAST_PHASE: usize = PHASE_COUNT - 1;
/// The slot after the last regular phase; post-frame jobs are guaranteed to
/// run after every per-tick system has completed for the frame.
pub const POST_FRAME_PHASE: usize = PHASE_COUNT;

/// Phase-ordered job executor. Within one phase, jobs run in parallel on the
/// worker pool subject to the declared-access conflict rule; a full barrier
/// separates phases.
pub struct JobScheduler {
    shared: Arc<SchedulerShared>,
}

struct SchedulerShared {
    state: Mutex<SchedulerState>,
    cvar: Condvar,
    pool: WorkerPool,
}

struct SchedulerState {
    /// One-shot jobs per phase, including the post-frame slot.
    jobs: [Vec<Job>; PHASE_COUNT + 1],
    /// Regular jobs persist across ticks until explicitly descheduled.
    regular_jobs: [Vec<(u32, RegularJob)>; PHASE_COUNT],
    /// IDs of the regular jobs still to run in the current tick, per phase.
    regular_ids_to_tick: [Vec<u32>; PHASE_COUNT],
    /// Component types touched by in-flight jobs, mapped to the number of
    /// jobs reading them. A zero count means a job is writing the type.
    processing_components: HashMap<ComponentType, u32>,
    in_flight: usize,
    current_phase: usize,
    id_generator: IdGenerator,
}

enum WorkFunction {
    Once(JobFunction),
    Regular(RegularJobFunction, f32),
}

struct WorkItem {
    component_accesses: Vec<ComponentAccess>,
    function: WorkFunction,
}

impl WorkItem {
    fn run(self) {
        match self.function {
            WorkFunction::Once(function) => function(),
            WorkFunction::Regular(function, delta_time) => {
                let mut function = function.lock();
                (*function)(delta_time);
            }
        }
    }
}

impl JobScheduler {
    pub fn new(worker_count: usize) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                state: Mutex::new(SchedulerState::new()),
                cvar: Condvar::new(),
                pool: WorkerPool::new(worker_count.max(1)),
            }),
        }
    }

    /// Runs one tick: phases 0..PHASE_COUNT in order, then the post-frame
    /// slot. Returns once every job of every phase has completed.
    pub fn tick(&self, delta_time: f32) {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        state.current_phase = 0;
        {
            let state = &mut *state;
            for phase in 0..PHASE_COUNT {
                state.regular_ids_to_tick[phase] = state.regular_jobs[phase]
                    .iter()
                    .map(|(job_id, _)| *job_id)
                    .collect();
            }
        }

        while state.current_phase <= POST_FRAME_PHASE {
            // Launch every job whose declared accesses are compatible with
            // the work currently in flight.
            while let Some(work) = state.take_executable_job(delta_time) {
                state.register_job_execution(&work.component_accesses);
                state.in_flight += 1;

                let shared_for_job = Arc::clone(shared);
                shared.pool.execute(Box::new(move || {
                    let accesses = work.component_accesses.clone();
                    // a panicking job must still release its access
                    // declarations, or the phase barrier never opens
                    let result =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| work.run()));
                    if result.is_err() {
                        error!("job panicked; releasing its component accesses");
                    }

                    let mut state = shared_for_job.state.lock();
                    state.deregister_job_execution(&accesses);
                    state.in_flight -= 1;
                    drop(state);
                    shared_for_job.cvar.notify_all();
                }));
            }

            if state.in_flight > 0 || state.phase_jobs_pending() {
                // Blocked on conflicts, or running jobs may still schedule
                // more work into this phase.
                shared.cvar.wait(&mut state);
                continue;
            }

            let phase = state.current_phase;
            state.jobs[phase].clear();
            state.current_phase += 1;
        }

        state.current_phase = 0;
    }

    pub fn schedule_job(&self, job: Job, phase: usize) {
        assert!(phase <= POST_FRAME_PHASE, "phase {phase} out of range");

        let mut state = self.shared.state.lock();
        state.jobs[phase].push(job);
        drop(state);
        self.shared.cvar.notify_all();
    }

    /// Enqueues into the current phase, so that jobs spawned mid-tick by
    /// other jobs still run before the phase barrier.
    pub fn schedule_job_asap(&self, job: Job) {
        let mut state = self.shared.state.lock();
        let phase = state.current_phase.min(POST_FRAME_PHASE);
        state.jobs[phase].push(job);
        drop(state);
        self.shared.cvar.notify_all();
    }

    /// Enqueues into the slot after the last regular phase.
    pub fn schedule_job_post_frame(&self, job: Job) {
        self.schedule_job(job, POST_FRAME_PHASE);
    }

    /// Schedules a job performed every tick until explicitly descheduled
    /// with the returned job ID. A job scheduled mid-tick first runs on the
    /// following tick.
    pub fn schedule_regular_job(&self, job: RegularJob, phase: usize) -> u32 {
        assert!(phase < PHASE_COUNT, "regular jobs must target a regular phase, got {phase}");

        let mut state = self.shared.state.lock();
        let job_id = state.id_generator.gen_id();
        state.regular_jobs[phase].push((job_id, job));
        job_id
    }

    pub fn deschedule_regular_job(&self, phase: usize, job_id: u32) {
        assert!(phase < PHASE_COUNT, "regular jobs must target a regular phase, got {phase}");

        let mut state = self.shared.state.lock();
        let Some(position) = state.regular_jobs[phase]
            .iter()
            .position(|(id, _)| *id == job_id)
        else {
            warn!("attempted to deschedule unknown regular job {job_id} in phase {phase}");
            return;
        };

        state.regular_jobs[phase].remove(position);
        state.regular_ids_to_tick[phase].retain(|id| *id != job_id);
        state.id_generator.pop_id(job_id);
    }
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            jobs: std::array::from_fn(|_| Vec::new()),
            regular_jobs: std::array::from_fn(|_| Vec::new()),
            regular_ids_to_tick: std::array::from_fn(|_| Vec::new()),
            processing_components: HashMap::new(),
            in_flight: 0,
            current_phase: 0,
            id_generator: IdGenerator::new(),
        }
    }

    fn take_executable_job(&mut self, delta_time: f32) -> Option<WorkItem> {
        let phase = self.current_phase;

        let position = self.jobs[phase]
            .iter()
            .position(|job| self.can_execute(&job.component_accesses));
        if let Some(index) = position {
            let job = self.jobs[phase].remove(index);
            return Some(WorkItem {
                component_accesses: job.component_accesses,
                function: WorkFunction::Once(job.function),
            });
        }

        if phase < PHASE_COUNT {
            let position = self.regular_ids_to_tick[phase].iter().position(|job_id| {
                self.regular_jobs[phase]
                    .iter()
                    .find(|(id, _)| id == job_id)
                    .map(|(_, job)| self.can_execute(&job.component_accesses))
                    .unwrap_or(false)
            });
            if let Some(index) = position {
                let job_id = self.regular_ids_to_tick[phase].swap_remove(index);
                let (_, job) = self.regular_jobs[phase]
                    .iter()
                    .find(|(id, _)| *id == job_id)?;
                return Some(WorkItem {
                    component_accesses: job.component_accesses.clone(),
                    function: WorkFunction::Regular(Arc::clone(&job.function), delta_time),
                });
            }
        }

        None
    }

    /// The no-data-race admission rule: a candidate touching a type some
    /// in-flight job also touches is only admitted when both sides are
    /// read-only.
    fn can_execute(&self, accesses: &[ComponentAccess]) -> bool {
        for access in accesses {
            if let Some(&readers) = self.processing_components.get(&access.component_type) {
                // a zero reader count means the type is being written to
                if access.permission == Permission::ReadWrite || readers == 0 {
                    return false;
                }
            }
        }
        true
    }

    fn register_job_execution(&mut self, accesses: &[ComponentAccess]) {
        for access in accesses {
            let is_read_only = (access.permission == Permission::Read) as u32;
            self.processing_components
                .entry(access.component_type)
                .and_modify(|count| *count += is_read_only)
                .or_insert(is_read_only);
        }
    }

    fn deregister_job_execution(&mut self, accesses: &[ComponentAccess]) {
        for access in accesses {
            match self.processing_components.get_mut(&access.component_type) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    self.processing_components.remove(&access.component_type);
                }
                None => {}
            }
        }
    }

    fn phase_jobs_pending(&self) -> bool {
        if !self.jobs[self.current_phase].is_empty() {
            return true;
        }
        self.current_phase < PHASE_COUNT && !self.regular_ids_to_tick[self.current_phase].is_empty()
    }
}
