use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use parking_lot::RwLock;

use crate::component::{Component, ComponentType};
use crate::entity::Entity;

/// Shared handle to one component type's dense array. The scheduler's declared
/// access admission control guarantees the lock is uncontended in a correct
/// schedule; the lock itself is the Rust-safety binding of that guarantee.
pub type ComponentArrayHandle<C> = Arc<RwLock<ComponentArray<C>>>;

/// Dense storage of one component type, indexed by entity. Removal is
/// swap-remove; iteration order is not meaningful.
pub struct ComponentArray<C: Component> {
    entities: Vec<Entity>,
    components: Vec<C>,
    indices: HashMap<Entity, usize>,
}

impl<C: Component> ComponentArray<C> {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            components: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Inserts a component for `entity`. The entity must not already have one;
    /// if it does, the previous value is overwritten with a warning.
    pub fn insert(&mut self, entity: Entity, component: C) -> &mut C {
        if let Some(&index) = self.indices.get(&entity) {
            warn!(
                "overwriting existing {} component on {}",
                C::component_type(),
                entity
            );
            self.components[index] = component;
            return &mut self.components[index];
        }

        let index = self.components.len();
        self.entities.push(entity);
        self.components.push(component);
        self.indices.insert(entity, index);
        &mut self.components[index]
    }

    pub fn get(&self, entity: Entity) -> Option<&C> {
        self.indices
            .get(&entity)
            .map(|&index| &self.components[index])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut C> {
        self.indices
            .get(&entity)
            .map(|&index| &mut self.components[index])
    }

    pub fn has(&self, entity: Entity) -> bool {
        self.indices.contains_key(&entity)
    }

    /// Removes the component for `entity`, returning it if present.
    pub fn remove(&mut self, entity: Entity) -> Option<C> {
        let index = self.indices.remove(&entity)?;

        let component = self.components.swap_remove(index);
        self.entities.swap_remove(index);
        if let Some(&moved) = self.entities.get(index) {
            self.indices.insert(moved, index);
        }

        Some(component)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &C)> {
        self.entities.iter().copied().zip(self.components.iter())
    }
}

impl<C: Component> Default for ComponentArray<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased capability interface over one component array, consumed by the
/// storage layer for entity teardown and by the publisher for membership
/// scans. Downcasting to the typed array goes through `as_any`.
pub trait AnyComponentArray: Send + Sync {
    fn component_type(&self) -> ComponentType;
    fn has(&self, entity: Entity) -> bool;
    fn entities(&self) -> Vec<Entity>;
    /// Drops the entity's component if present. Part of the entity-destroyed
    /// broadcast, so absence is not a warning here.
    fn entity_deleted(&self, entity: Entity) -> bool;
    fn as_any(&self) -> &dyn Any;
}

/// The storage-owned wrapper that pairs a typed array with its shared handle.
pub(crate) struct SharedComponentArray<C: Component> {
    inner: ComponentArrayHandle<C>,
}

impl<C: Component> SharedComponentArray<C> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ComponentArray::new())),
        }
    }

    pub(crate) fn handle(&self) -> ComponentArrayHandle<C> {
        Arc::clone(&self.inner)
    }
}

impl<C: Component> AnyComponentArray for SharedComponentArray<C> {
    fn component_type(&self) -> ComponentType {
        C::component_type()
    }

    fn has(&self, entity: Entity) -> bool {
        self.inner.read().has(entity)
    }

    fn entities(&self) -> Vec<Entity> {
        self.inner.read().entities().to_vec()
    }

    fn entity_deleted(&self, entity: Entity) -> bool {
        self.inner.write().remove(entity).is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
