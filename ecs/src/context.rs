use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, RwLock};

use crate::component::Component;
use crate::component_array::ComponentArrayHandle;
use crate::component_storage::ComponentStorage;
use crate::entity::Entity;
use crate::entity_publisher::{EntityPublisher, EntitySubscriptionRegistration};
use crate::entity_registry::EntityRegistry;
use crate::job::{Job, RegularJob};
use crate::job_scheduler::JobScheduler;
use crate::system::{union_accesses, SubscriptionHandle, System, SystemHandle, SystemRegistration};

/// The dependency-injection root of the ECS: owns the entity registry, the
/// component storage, the entity publisher, and the job scheduler. Shared as
/// `Arc<EcsContext>` and passed explicitly into systems.
pub struct EcsContext {
    entity_registry: RwLock<EntityRegistry>,
    component_storage: RwLock<ComponentStorage>,
    entity_publisher: Mutex<EntityPublisher>,
    job_scheduler: JobScheduler,
    entities_to_delete: Mutex<Vec<Entity>>,
}

impl EcsContext {
    pub fn new() -> Arc<Self> {
        let worker_count = thread::available_parallelism()
            .map(|count| count.get().saturating_sub(1))
            .unwrap_or(2)
            .max(1);
        Self::with_worker_threads(worker_count)
    }

    pub fn with_worker_threads(worker_count: usize) -> Arc<Self> {
        Arc::new(Self {
            entity_registry: RwLock::new(EntityRegistry::new()),
            component_storage: RwLock::new(ComponentStorage::new()),
            entity_publisher: Mutex::new(EntityPublisher::new()),
            job_scheduler: JobScheduler::new(worker_count),
            entities_to_delete: Mutex::new(Vec::new()),
        })
    }

    /// Runs one simulation tick: every phase of the scheduler, then the
    /// deferred entity deletions.
    pub fn tick(&self, delta_time: f32) {
        self.job_scheduler.tick(delta_time);
        self.perform_entity_deletions();
    }

    // Entities & components

    pub fn create_entity(&self) -> Entity {
        self.entity_registry.write().create_entity()
    }

    pub fn add_component<C: Component>(&self, entity: Entity, component: C) {
        let component_type = C::component_type();
        self.component_storage.write().add_component(entity, component);
        self.entity_registry
            .write()
            .register_component_type(entity, component_type);

        let registry = self.entity_registry.read();
        self.entity_publisher
            .lock()
            .publish_component(entity, component_type, &registry);
    }

    pub fn remove_component<C: Component>(&self, entity: Entity) {
        let component_type = C::component_type();
        self.component_storage.write().remove_component::<C>(entity);
        self.entity_registry
            .write()
            .deregister_component_type(entity, component_type);
        self.entity_publisher
            .lock()
            .unpublish_component(entity, component_type);
    }

    /// Shared handle to `C`'s component array, registering the array on first
    /// use. Jobs must only touch arrays matching their declared accesses.
    pub fn array<C: Component>(&self) -> ComponentArrayHandle<C> {
        if let Some(handle) = self.component_storage.read().array::<C>() {
            return handle;
        }
        self.component_storage.write().register::<C>()
    }

    /// Clone-out convenience accessor.
    pub fn component<C: Component + Clone>(&self, entity: Entity) -> Option<C> {
        let handle = self.component_storage.read().array::<C>()?;
        let array = handle.read();
        array.get(entity).cloned()
    }

    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        self.component_storage
            .read()
            .has_component(entity, C::component_type())
    }

    /// Enqueues an entity deletion, performed after the current tick's phases
    /// complete (or immediately at the next `tick` if called between ticks).
    pub fn remove_entity(&self, entity: Entity) {
        self.entities_to_delete.lock().push(entity);
    }

    fn perform_entity_deletions(&self) {
        let entities: Vec<Entity> = self.entities_to_delete.lock().drain(..).collect();
        for entity in entities {
            let component_types = self.entity_registry.read().component_types_of(entity);

            {
                let mut publisher = self.entity_publisher.lock();
                for component_type in &component_types {
                    publisher.unpublish_component(entity, *component_type);
                }
            }

            self.component_storage.write().entity_deleted(entity);
            self.entity_registry.write().deregister_entity(entity);
        }
    }

    // Registry pages

    pub fn add_registry_page(&self) {
        self.entity_registry.write().add_page();
    }

    /// Reversibly hides the top page: every (entity, type) pair in it is
    /// unpublished, emptying the affected sinks, but all data stays intact.
    pub fn deregister_top_registry_page(&self) {
        let contents = self.entity_registry.read().top_page_contents();
        let mut publisher = self.entity_publisher.lock();
        for (entity, component_types) in contents {
            for component_type in component_types {
                publisher.unpublish_component(entity, component_type);
            }
        }
    }

    /// The inverse of [`Self::deregister_top_registry_page`]: republishes
    /// every (entity, type) pair of the top page.
    pub fn reinstate_top_registry_page(&self) {
        let registry = self.entity_registry.read();
        let contents = registry.top_page_contents();
        let mut publisher = self.entity_publisher.lock();
        for (entity, component_types) in contents {
            for component_type in component_types {
                publisher.publish_component(entity, component_type, &registry);
            }
        }
    }

    /// Physically deletes the top page: unpublishes and destroys every entity
    /// allocated in it, then recycles their IDs.
    pub fn delete_top_registry_page(&self) {
        let contents = self.entity_registry.read().top_page_contents();

        {
            let mut publisher = self.entity_publisher.lock();
            for (entity, component_types) in &contents {
                for component_type in component_types {
                    publisher.unpublish_component(*entity, *component_type);
                }
            }
        }

        {
            let mut storage = self.component_storage.write();
            for (entity, _) in &contents {
                storage.entity_deleted(*entity);
            }
        }

        self.entity_registry.write().remove_page();
    }

    // Subscriptions & systems

    /// Registers standalone entity subscriptions, seeding each sink with the
    /// entities that already match. The handle unsubscribes on drop.
    pub fn subscribe(
        self: &Arc<Self>,
        registrations: Vec<EntitySubscriptionRegistration>,
    ) -> SubscriptionHandle {
        let registry = self.entity_registry.read();
        let storage = self.component_storage.read();
        let subscription_id =
            self.entity_publisher
                .lock()
                .subscribe_to_entities(registrations, &registry, &storage);

        SubscriptionHandle {
            context: Arc::downgrade(self),
            subscription_id,
        }
    }

    pub fn unsubscribe_from_entities(&self, subscription_id: u32) {
        self.entity_publisher
            .lock()
            .unsubscribe_from_entities(subscription_id);
    }

    /// Atomic registration of a system: subscribes its sinks and schedules
    /// its tick as a regular job whose declared accesses are the union of
    /// everything it subscribed to plus its additional accesses. The handle
    /// deregisters both on drop.
    pub fn register_system<S: System>(
        self: &Arc<Self>,
        name: &str,
        system: Arc<Mutex<S>>,
        registration: SystemRegistration,
    ) -> SystemHandle {
        let mut accesses = registration.additional_accesses.clone();
        for subscription in &registration.subscriptions {
            accesses.extend(subscription.component_accesses.iter().copied());
        }
        let accesses = union_accesses(accesses);

        let subscription = self.subscribe(registration.subscriptions);

        let context = Arc::downgrade(self);
        let job = RegularJob::new(accesses, move |delta_time| {
            if let Some(ctx) = context.upgrade() {
                system.lock().tick(&ctx, delta_time);
            }
        });
        let job_id = self
            .job_scheduler
            .schedule_regular_job(job, registration.phase);

        SystemHandle {
            name: name.to_string(),
            subscription,
            job_id,
            phase: registration.phase,
            context: Arc::downgrade(self),
        }
    }

    // Job scheduling passthroughs

    pub fn schedule_job(&self, job: Job, phase: usize) {
        self.job_scheduler.schedule_job(job, phase);
    }

    pub fn schedule_job_asap(&self, job: Job) {
        self.job_scheduler.schedule_job_asap(job);
    }

    pub fn schedule_job_post_frame(&self, job: Job) {
        self.job_scheduler.schedule_job_post_frame(job);
    }

    pub fn deschedule_regular_job(&self, phase: usize, job_id: u32) {
        self.job_scheduler.deschedule_regular_job(phase, job_id);
    }
}
