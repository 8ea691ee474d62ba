use std::sync::Arc;

use parking_lot::Mutex;

use crate::component::{ComponentAccess, Permission};

pub(crate) type JobFunction = Box<dyn FnOnce() + Send>;
pub(crate) type RegularJobFunction = Arc<Mutex<dyn FnMut(f32) + Send>>;

/// Strips membership-only declarations: `NoAccess` grants the job nothing, so
/// it never enters conflict detection.
fn conflicting_accesses(accesses: Vec<ComponentAccess>) -> Vec<ComponentAccess> {
    accesses
        .into_iter()
        .filter(|access| access.permission != Permission::NoAccess)
        .collect()
}

/// A single-use unit of work with declared component accesses, consumed by
/// the scheduler within the phase it targets.
pub struct Job {
    pub(crate) function: JobFunction,
    pub(crate) component_accesses: Vec<ComponentAccess>,
}

impl Job {
    pub fn new(
        component_accesses: Vec<ComponentAccess>,
        function: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            function: Box::new(function),
            component_accesses: conflicting_accesses(component_accesses),
        }
    }
}

/// A per-tick unit of work that persists across ticks until explicitly
/// descheduled; the scheduler re-considers it every tick rather than
/// reallocating it.
pub struct RegularJob {
    pub(crate) function: RegularJobFunction,
    pub(crate) component_accesses: Vec<ComponentAccess>,
}

impl RegularJob {
    pub fn new(
        component_accesses: Vec<ComponentAccess>,
        function: impl FnMut(f32) + Send + 'static,
    ) -> Self {
        Self {
            function: Arc::new(Mutex::new(function)),
            component_accesses: conflicting_accesses(component_accesses),
        }
    }
}
