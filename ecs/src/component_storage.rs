use std::collections::HashMap;

use log::warn;

use crate::component::{Component, ComponentType};
use crate::component_array::{
    AnyComponentArray, ComponentArrayHandle, SharedComponentArray,
};
use crate::entity::Entity;

/// Type-erased table of per-type component arrays. Arrays are registered
/// lazily on first use and live for the storage's lifetime.
pub struct ComponentStorage {
    arrays: HashMap<ComponentType, Box<dyn AnyComponentArray>>,
}

impl ComponentStorage {
    pub fn new() -> Self {
        Self {
            arrays: HashMap::new(),
        }
    }

    /// Returns the handle for `C`'s array, registering the array on first use.
    pub fn register<C: Component>(&mut self) -> ComponentArrayHandle<C> {
        let component_type = C::component_type();
        if !self.arrays.contains_key(&component_type) {
            self.arrays
                .insert(component_type, Box::new(SharedComponentArray::<C>::new()));
        }
        self.typed_array::<C>(component_type)
    }

    pub fn array<C: Component>(&self) -> Option<ComponentArrayHandle<C>> {
        let component_type = C::component_type();
        if !self.arrays.contains_key(&component_type) {
            return None;
        }
        Some(self.typed_array::<C>(component_type))
    }

    pub fn add_component<C: Component>(&mut self, entity: Entity, component: C) {
        let handle = self.register::<C>();
        handle.write().insert(entity, component);
    }

    /// Removes the entity's `C` component. Removing an absent component is a
    /// benign no-op that logs a warning.
    pub fn remove_component<C: Component>(&mut self, entity: Entity) -> bool {
        let component_type = C::component_type();
        let Some(array) = self.arrays.get(&component_type) else {
            warn!("attempted to remove unregistered component type {component_type} from {entity}");
            return false;
        };

        if !array.entity_deleted(entity) {
            warn!("attempted to remove absent {component_type} component from {entity}");
            return false;
        }
        true
    }

    pub fn has_type(&self, component_type: ComponentType) -> bool {
        self.arrays.contains_key(&component_type)
    }

    pub fn has_component(&self, entity: Entity, component_type: ComponentType) -> bool {
        self.arrays
            .get(&component_type)
            .map(|array| array.has(entity))
            .unwrap_or(false)
    }

    /// Entities currently holding a component of the given type.
    pub fn entities_of(&self, component_type: ComponentType) -> Vec<Entity> {
        self.arrays
            .get(&component_type)
            .map(|array| array.entities())
            .unwrap_or_default()
    }

    /// Broadcast of an entity's destruction: every registered array drops its
    /// entry for the entity. Invoked once per destruction regardless of how
    /// many component types the entity held.
    pub fn entity_deleted(&mut self, entity: Entity) {
        for array in self.arrays.values() {
            array.entity_deleted(entity);
        }
    }

    fn typed_array<C: Component>(&self, component_type: ComponentType) -> ComponentArrayHandle<C> {
        let array = &self.arrays[&component_type];
        let Some(shared) = array.as_any().downcast_ref::<SharedComponentArray<C>>() else {
            // Two distinct Rust types registered under one name is a
            // registration bug, not a runtime condition.
            panic!("component type name '{component_type}' is registered by a different Rust type");
        };
        shared.handle()
    }
}

impl Default for ComponentStorage {
    fn default() -> Self {
        Self::new()
    }
}
