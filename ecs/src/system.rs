use std::sync::Weak;

use crate::component::ComponentAccess;
use crate::context::EcsContext;
use crate::entity_publisher::EntitySubscriptionRegistration;

/// A unit of per-tick logic. Implementations are registered through
/// [`EcsContext::register_system`], which subscribes their sinks and schedules
/// their tick as a regular job in one atomic step.
pub trait System: Send + 'static {
    fn tick(&mut self, ctx: &EcsContext, delta_time: f32);
}

/// Everything a system submits at registration: its entity subscriptions, the
/// phase its regular job runs in, and any component accesses it performs
/// without maintaining a sink for.
pub struct SystemRegistration {
    pub subscriptions: Vec<EntitySubscriptionRegistration>,
    pub additional_accesses: Vec<ComponentAccess>,
    pub phase: usize,
}

impl SystemRegistration {
    pub fn new(subscriptions: Vec<EntitySubscriptionRegistration>, phase: usize) -> Self {
        Self {
            subscriptions,
            additional_accesses: Vec::new(),
            phase,
        }
    }

    pub fn with_additional_accesses(mut self, accesses: Vec<ComponentAccess>) -> Self {
        self.additional_accesses = accesses;
        self
    }
}

/// Merges duplicate component types, keeping the strongest permission.
pub(crate) fn union_accesses(accesses: Vec<ComponentAccess>) -> Vec<ComponentAccess> {
    let mut union: Vec<ComponentAccess> = Vec::new();
    for access in accesses {
        match union
            .iter_mut()
            .find(|existing| existing.component_type == access.component_type)
        {
            Some(existing) => {
                existing.permission = existing.permission.max(access.permission);
            }
            None => union.push(access),
        }
    }
    union
}

/// Deregisters its entity subscriptions when dropped.
pub struct SubscriptionHandle {
    pub(crate) context: Weak<EcsContext>,
    pub(crate) subscription_id: u32,
}

impl SubscriptionHandle {
    pub fn subscription_id(&self) -> u32 {
        self.subscription_id
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(context) = self.context.upgrade() {
            context.unsubscribe_from_entities(self.subscription_id);
        }
    }
}

/// Deregisters both the system's subscriptions and its regular job when
/// dropped.
pub struct SystemHandle {
    pub(crate) name: String,
    pub(crate) subscription: SubscriptionHandle,
    pub(crate) job_id: u32,
    pub(crate) phase: usize,
    pub(crate) context: Weak<EcsContext>,
}

impl SystemHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn subscription_id(&self) -> u32 {
        self.subscription.subscription_id()
    }
}

impl Drop for SystemHandle {
    fn drop(&mut self) {
        if let Some(context) = self.context.upgrade() {
            context.deschedule_regular_job(self.phase, self.job_id);
        }
    }
}
