//! # Rewind ECS
//! Entity-component-system core shared between the rewind-client & rewind-server
//! crates: a paged entity registry, type-erased component storage, subscription
//! publishing, and a phase-ordered job scheduler that prevents conflicting
//! component access from running concurrently.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod component;
mod component_array;
mod component_storage;
mod context;
mod entity;
mod entity_publisher;
mod entity_registry;
mod id_generator;
mod job;
mod job_scheduler;
mod system;
mod worker_pool;

pub use component::{
    no_access, read, read_write, Component, ComponentAccess, ComponentType, Permission,
};
pub use component_array::{AnyComponentArray, ComponentArray, ComponentArrayHandle};
pub use component_storage::ComponentStorage;
pub use context::EcsContext;
pub use entity::Entity;
pub use entity_publisher::{
    EntityCallback, EntityPublisher, EntitySink, EntitySubscriptionRegistration,
};
pub use entity_registry::EntityRegistry;
pub use id_generator::IdGenerator;
pub use job::{Job, RegularJob};
pub use job_scheduler::{JobScheduler, LAST_PHASE, PHASE_COUNT, POST_FRAME_PHASE};
pub use system::{SubscriptionHandle, System, SystemHandle, SystemRegistration};
