use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use parking_lot::RwLock;

use crate::component::{ComponentAccess, ComponentType};
use crate::component_storage::ComponentStorage;
use crate::entity::Entity;
use crate::entity_registry::EntityRegistry;
use crate::id_generator::IdGenerator;

/// Hook fired when an entity enters or leaves a subscription's sink.
pub type EntityCallback = Box<dyn FnMut(Entity) + Send>;

/// Shared handle to a subscription's sink: the continuously synchronized set
/// of entities that currently satisfy the subscription's component types.
/// The publisher writes it; the owning system reads it.
#[derive(Clone)]
pub struct EntitySink {
    inner: Arc<RwLock<SinkSet>>,
}

struct SinkSet {
    entities: Vec<Entity>,
    indices: HashMap<Entity, usize>,
}

impl EntitySink {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SinkSet {
                entities: Vec::new(),
                indices: HashMap::new(),
            })),
        }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.read().indices.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entities.is_empty()
    }

    pub fn first(&self) -> Option<Entity> {
        self.inner.read().entities.first().copied()
    }

    /// Snapshot of the current membership.
    pub fn entities(&self) -> Vec<Entity> {
        self.inner.read().entities.clone()
    }

    pub(crate) fn push(&self, entity: Entity) {
        let mut guard = self.inner.write();
        let sink = &mut *guard;
        if sink.indices.contains_key(&entity) {
            return;
        }
        let index = sink.entities.len();
        sink.entities.push(entity);
        sink.indices.insert(entity, index);
    }

    pub(crate) fn remove(&self, entity: Entity) {
        let mut guard = self.inner.write();
        let sink = &mut *guard;
        let Some(index) = sink.indices.remove(&entity) else {
            return;
        };
        sink.entities.swap_remove(index);
        if let Some(&moved) = sink.entities.get(index) {
            sink.indices.insert(moved, index);
        }
    }
}

impl Default for EntitySink {
    fn default() -> Self {
        Self::new()
    }
}

/// All information required to request one entity subscription.
pub struct EntitySubscriptionRegistration {
    pub component_accesses: Vec<ComponentAccess>,
    pub sink: EntitySink,
    /// Called after an entity is added due to the subscription.
    pub on_added: Option<EntityCallback>,
    /// Called before an entity is removed, while it is still in the sink.
    pub on_removed: Option<EntityCallback>,
}

impl EntitySubscriptionRegistration {
    pub fn new(component_accesses: Vec<ComponentAccess>, sink: EntitySink) -> Self {
        Self {
            component_accesses,
            sink,
            on_added: None,
            on_removed: None,
        }
    }

    pub fn with_callbacks(
        mut self,
        on_added: Option<EntityCallback>,
        on_removed: Option<EntityCallback>,
    ) -> Self {
        self.on_added = on_added;
        self.on_removed = on_removed;
        self
    }
}

struct EntitySubscription {
    component_types: Vec<ComponentType>,
    sink: EntitySink,
    on_added: Option<EntityCallback>,
    on_removed: Option<EntityCallback>,
}

#[derive(Clone, Copy)]
struct SubscriptionIndex {
    subscription_id: u32,
    sub_index: usize,
}

/// Maintains the live mapping from component types to subscriptions and keeps
/// every subscription's sink synchronized as components are published and
/// unpublished.
pub struct EntityPublisher {
    /// Per-type subscription lists, in registration order.
    component_subscriptions: HashMap<ComponentType, Vec<SubscriptionIndex>>,
    subscription_storage: HashMap<u32, Vec<EntitySubscription>>,
    id_generator: IdGenerator,
}

impl EntityPublisher {
    pub fn new() -> Self {
        Self {
            component_subscriptions: HashMap::new(),
            subscription_storage: HashMap::new(),
            id_generator: IdGenerator::new(),
        }
    }

    /// Registers the subscriptions, immediately pushing every existing entity
    /// that already satisfies a subscription's full type set into its sink.
    /// Returns the ID used to unsubscribe later.
    pub fn subscribe_to_entities(
        &mut self,
        registrations: Vec<EntitySubscriptionRegistration>,
        registry: &EntityRegistry,
        storage: &ComponentStorage,
    ) -> u32 {
        let mut subscriptions = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let mut component_types: Vec<ComponentType> = Vec::new();
            for access in &registration.component_accesses {
                if !component_types.contains(&access.component_type) {
                    component_types.push(access.component_type);
                }
            }

            subscriptions.push(EntitySubscription {
                component_types,
                sink: registration.sink,
                on_added: registration.on_added,
                on_removed: registration.on_removed,
            });
        }

        let subscription_id = self.id_generator.gen_id();

        for (sub_index, subscription) in subscriptions.iter().enumerate() {
            for component_type in &subscription.component_types {
                self.component_subscriptions
                    .entry(*component_type)
                    .or_default()
                    .push(SubscriptionIndex {
                        subscription_id,
                        sub_index,
                    });
            }
        }

        // Seed each sink with the entities that already match.
        for subscription in &mut subscriptions {
            let Some(first_type) = subscription.component_types.first() else {
                continue;
            };

            for entity in storage.entities_of(*first_type) {
                if registry.entity_has_all_types(entity, &subscription.component_types) {
                    subscription.sink.push(entity);
                    if let Some(on_added) = subscription.on_added.as_mut() {
                        on_added(entity);
                    }
                }
            }
        }

        self.subscription_storage
            .insert(subscription_id, subscriptions);
        subscription_id
    }

    /// Unsubscribing an unknown ID is a benign double-teardown.
    pub fn unsubscribe_from_entities(&mut self, subscription_id: u32) {
        let Some(subscriptions) = self.subscription_storage.remove(&subscription_id) else {
            warn!("attempted to unsubscribe unknown subscription ID {subscription_id}");
            return;
        };

        for subscription in &subscriptions {
            for component_type in &subscription.component_types {
                if let Some(indices) = self.component_subscriptions.get_mut(component_type) {
                    indices.retain(|index| index.subscription_id != subscription_id);
                }
            }
        }

        self.id_generator.pop_id(subscription_id);
    }

    /// Notifies subscriptions indexed under `component_type` that the entity
    /// gained the component; the entity joins every sink whose full type set
    /// it now satisfies.
    pub fn publish_component(
        &mut self,
        entity: Entity,
        component_type: ComponentType,
        registry: &EntityRegistry,
    ) {
        let Some(indices) = self.component_subscriptions.get(&component_type) else {
            return;
        };

        for index in indices.clone() {
            let Some(subscriptions) = self.subscription_storage.get_mut(&index.subscription_id)
            else {
                continue;
            };
            let subscription = &mut subscriptions[index.sub_index];

            if subscription.sink.contains(entity) {
                continue;
            }
            if registry.entity_has_all_types(entity, &subscription.component_types) {
                subscription.sink.push(entity);
                if let Some(on_added) = subscription.on_added.as_mut() {
                    on_added(entity);
                }
            }
        }
    }

    /// Symmetric removal walk: the remove-callback fires while the entity is
    /// still in the sink, then the entity is dropped from it.
    pub fn unpublish_component(&mut self, entity: Entity, component_type: ComponentType) {
        let Some(indices) = self.component_subscriptions.get(&component_type) else {
            return;
        };

        for index in indices.clone() {
            let Some(subscriptions) = self.subscription_storage.get_mut(&index.subscription_id)
            else {
                continue;
            };
            let subscription = &mut subscriptions[index.sub_index];

            if !subscription.sink.contains(entity) {
                continue;
            }
            if let Some(on_removed) = subscription.on_removed.as_mut() {
                on_removed(entity);
            }
            subscription.sink.remove(entity);
        }
    }
}

impl Default for EntityPublisher {
    fn default() -> Self {
        Self::new()
    }
}
