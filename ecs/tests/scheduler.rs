//! Scheduler guarantees: phase ordering with a full barrier between phases,
//! and no two conflicting jobs in flight concurrently within a phase.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rewind_ecs::{
    declare_component, read, read_write, ComponentAccess, EcsContext, Job, Permission,
    SystemRegistration,
};

#[derive(Clone, Debug)]
struct Alpha;
declare_component!(Alpha, "SchedulerTestAlpha");

#[derive(Clone, Debug)]
struct Beta;
declare_component!(Beta, "SchedulerTestBeta");

#[test]
fn later_phase_starts_only_after_earlier_phase_completes() {
    let ctx = EcsContext::with_worker_threads(4);

    const PHASE_0_JOBS: u32 = 8;
    let completed_in_phase_0 = Arc::new(AtomicU32::new(0));
    let observed_by_phase_1 = Arc::new(AtomicU32::new(u32::MAX));

    for _ in 0..PHASE_0_JOBS {
        let counter = Arc::clone(&completed_in_phase_0);
        ctx.schedule_job(
            Job::new(Vec::new(), move || {
                thread::sleep(Duration::from_millis(2));
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            0,
        );
    }

    let counter = Arc::clone(&completed_in_phase_0);
    let observed = Arc::clone(&observed_by_phase_1);
    ctx.schedule_job(
        Job::new(Vec::new(), move || {
            observed.store(counter.load(Ordering::SeqCst), Ordering::SeqCst);
        }),
        1,
    );

    ctx.tick(1.0 / 60.0);

    assert_eq!(observed_by_phase_1.load(Ordering::SeqCst), PHASE_0_JOBS);
}

#[test]
fn asap_jobs_run_before_the_phase_barrier() {
    let ctx = EcsContext::with_worker_threads(4);

    let asap_completed = Arc::new(AtomicU32::new(0));
    let observed_by_phase_1 = Arc::new(AtomicU32::new(u32::MAX));

    // A phase-0 job spawns a follow-up into its own phase mid-tick.
    let ctx_for_job = Arc::clone(&ctx);
    let counter = Arc::clone(&asap_completed);
    ctx.schedule_job(
        Job::new(Vec::new(), move || {
            let counter = Arc::clone(&counter);
            ctx_for_job.schedule_job_asap(Job::new(Vec::new(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }),
        0,
    );

    let counter = Arc::clone(&asap_completed);
    let observed = Arc::clone(&observed_by_phase_1);
    ctx.schedule_job(
        Job::new(Vec::new(), move || {
            observed.store(counter.load(Ordering::SeqCst), Ordering::SeqCst);
        }),
        1,
    );

    ctx.tick(1.0 / 60.0);

    assert_eq!(observed_by_phase_1.load(Ordering::SeqCst), 1);
}

#[test]
fn post_frame_jobs_run_after_every_regular_phase() {
    let ctx = EcsContext::with_worker_threads(2);

    let regular_completed = Arc::new(AtomicU32::new(0));
    let observed_post_frame = Arc::new(AtomicU32::new(u32::MAX));

    for phase in 0..3 {
        let counter = Arc::clone(&regular_completed);
        ctx.schedule_job(
            Job::new(Vec::new(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            phase,
        );
    }

    let counter = Arc::clone(&regular_completed);
    let observed = Arc::clone(&observed_post_frame);
    ctx.schedule_job_post_frame(Job::new(Vec::new(), move || {
        observed.store(counter.load(Ordering::SeqCst), Ordering::SeqCst);
    }));

    ctx.tick(1.0 / 60.0);

    assert_eq!(observed_post_frame.load(Ordering::SeqCst), 3);
}

#[derive(Clone, Copy, PartialEq)]
enum TraceEvent {
    Enter(usize),
    Exit(usize),
}

fn record_conflicts(
    trace: &[TraceEvent],
    accesses: &[Vec<ComponentAccess>],
) -> Vec<(usize, usize)> {
    let mut active: Vec<usize> = Vec::new();
    let mut conflicts = Vec::new();

    for event in trace {
        match *event {
            TraceEvent::Enter(job) => {
                for &other in &active {
                    for a in &accesses[job] {
                        for b in &accesses[other] {
                            let same_type = a.component_type == b.component_type;
                            let any_write = a.permission == Permission::ReadWrite
                                || b.permission == Permission::ReadWrite;
                            if same_type && any_write {
                                conflicts.push((other, job));
                            }
                        }
                    }
                }
                active.push(job);
            }
            TraceEvent::Exit(job) => active.retain(|&id| id != job),
        }
    }

    conflicts
}

#[test]
fn conflicting_jobs_never_run_concurrently() {
    let ctx = EcsContext::with_worker_threads(4);

    // A mix of readers and writers over two component types.
    let accesses: Vec<Vec<ComponentAccess>> = vec![
        vec![read::<Alpha>()],
        vec![read::<Alpha>()],
        vec![read_write::<Alpha>()],
        vec![read::<Alpha>(), read_write::<Beta>()],
        vec![read_write::<Beta>()],
        vec![read::<Alpha>()],
        vec![read_write::<Alpha>(), read::<Beta>()],
        vec![read::<Beta>()],
    ];

    let trace: Arc<Mutex<Vec<TraceEvent>>> = Arc::new(Mutex::new(Vec::new()));

    for _round in 0..20 {
        for (job_index, job_accesses) in accesses.iter().enumerate() {
            let trace = Arc::clone(&trace);
            ctx.schedule_job(
                Job::new(job_accesses.clone(), move || {
                    trace.lock().push(TraceEvent::Enter(job_index));
                    thread::sleep(Duration::from_micros(500));
                    trace.lock().push(TraceEvent::Exit(job_index));
                }),
                0,
            );
        }
        ctx.tick(1.0 / 60.0);
    }

    let trace = trace.lock();
    let conflicts = record_conflicts(&trace, &accesses);
    assert!(
        conflicts.is_empty(),
        "conflicting job pairs ran concurrently: {conflicts:?}"
    );
}

struct CountingSystem {
    ticks: Arc<AtomicUsize>,
}

impl rewind_ecs::System for CountingSystem {
    fn tick(&mut self, _ctx: &EcsContext, _delta_time: f32) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn regular_jobs_persist_until_descheduled() {
    let ctx = EcsContext::with_worker_threads(2);

    let ticks = Arc::new(AtomicUsize::new(0));
    let system = Arc::new(Mutex::new(CountingSystem {
        ticks: Arc::clone(&ticks),
    }));

    let handle = ctx.register_system(
        "CountingSystem",
        system,
        SystemRegistration::new(Vec::new(), 0),
    );

    ctx.tick(1.0 / 60.0);
    ctx.tick(1.0 / 60.0);
    assert_eq!(ticks.load(Ordering::SeqCst), 2);

    drop(handle);
    ctx.tick(1.0 / 60.0);
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
}
