use std::collections::{HashMap, HashSet};

use log::warn;

use crate::component::ComponentType;
use crate::entity::Entity;
use crate::id_generator::IdGenerator;

/// One reversible allocation scope of entities. Pages form a stack; only the
/// top page is visible to registration and membership queries, which is what
/// lets an entire scope (e.g. a loaded level) be deregistered, reinstated, or
/// deleted as a unit.
type EntityRegistryPage = HashMap<Entity, HashSet<ComponentType>>;

/// Authoritative map of entity -> owned component-type set.
pub struct EntityRegistry {
    pages: Vec<EntityRegistryPage>,
    id_generator: IdGenerator,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            pages: vec![EntityRegistryPage::new()],
            id_generator: IdGenerator::new(),
        }
    }

    pub fn create_entity(&mut self) -> Entity {
        let entity = Entity::new(self.id_generator.gen_id());
        self.top_page_mut().insert(entity, HashSet::new());
        entity
    }

    pub fn register_component_type(&mut self, entity: Entity, component_type: ComponentType) {
        self.top_page_mut()
            .entry(entity)
            .or_default()
            .insert(component_type);
    }

    /// Deregistering a type that is not present is a benign double-teardown:
    /// it logs a warning and continues.
    pub fn deregister_component_type(&mut self, entity: Entity, component_type: ComponentType) {
        let Some(types) = self.top_page_mut().get_mut(&entity) else {
            warn!("attempted to deregister component type {component_type} from unregistered {entity}");
            return;
        };

        if !types.remove(&component_type) {
            warn!("attempted to deregister absent component type {component_type} from {entity}");
        }
    }

    /// True iff the entity currently has every type in `types`. Entities in
    /// buried pages are invisible until their page is on top again.
    pub fn entity_has_all_types(&self, entity: Entity, types: &[ComponentType]) -> bool {
        let Some(entity_types) = self.top_page().get(&entity) else {
            return false;
        };
        types
            .iter()
            .all(|component_type| entity_types.contains(component_type))
    }

    pub fn component_types_of(&self, entity: Entity) -> Vec<ComponentType> {
        self.top_page()
            .get(&entity)
            .map(|types| types.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Removes the entity from the top page and recycles its ID. The caller
    /// is responsible for having torn its components down first.
    pub fn deregister_entity(&mut self, entity: Entity) {
        if self.top_page_mut().remove(&entity).is_none() {
            warn!("attempted to deregister unregistered {entity}");
            return;
        }
        self.id_generator.pop_id(entity.id());
    }

    pub fn add_page(&mut self) {
        self.pages.push(EntityRegistryPage::new());
    }

    /// Pops the top page, recycling every entity ID still allocated in it.
    /// The bottom page is permanent; popping it is refused with a warning.
    pub fn remove_page(&mut self) {
        if self.pages.len() == 1 {
            warn!("attempted to remove the bottom registry page");
            return;
        }

        let page = self.pages.pop().unwrap_or_default();
        for entity in page.keys() {
            self.id_generator.pop_id(entity.id());
        }
    }

    /// Snapshot of the top page, used to drive page-scoped publication and
    /// teardown from the owning context.
    pub fn top_page_contents(&self) -> Vec<(Entity, Vec<ComponentType>)> {
        self.top_page()
            .iter()
            .map(|(entity, types)| (*entity, types.iter().copied().collect()))
            .collect()
    }

    fn top_page(&self) -> &EntityRegistryPage {
        self.pages.last().unwrap_or_else(|| {
            unreachable!("registry always holds at least one page")
        })
    }

    fn top_page_mut(&mut self) -> &mut EntityRegistryPage {
        self.pages.last_mut().unwrap_or_else(|| {
            unreachable!("registry always holds at least one page")
        })
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
