//! World - the main container for all ECS data.
//!
//! The World owns the entity allocator and the component registry. Every
//! entity and component mutation goes through it, which keeps the sparse-set
//! invariants of every store intact.

use tracing::{debug, trace};

use crate::{
    command::{Command, CommandBuffer},
    component::{Component, ComponentId},
    entity::{Entity, EntityAllocator},
    error::{EcsError, EcsResult},
    query::{Query, QueryBuilder, QueryIter},
    registry::Registry,
};

/// Construction parameters for a [`World`].
///
/// Capacities are hints; the world grows past them as needed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldConfig {
    /// Entity slots to reserve up front.
    pub entity_capacity: usize,
    /// Slots each component store reserves when first created.
    pub store_capacity: usize,
}

impl WorldConfig {
    /// Reserve room for `entity_capacity` entities.
    #[must_use]
    pub const fn with_entity_capacity(mut self, entity_capacity: usize) -> Self {
        self.entity_capacity = entity_capacity;
        self
    }

    /// Reserve `store_capacity` slots in each new store.
    #[must_use]
    pub const fn with_store_capacity(mut self, store_capacity: usize) -> Self {
        self.store_capacity = store_capacity;
        self
    }
}

/// The ECS world - container for all entities and components.
pub struct World {
    /// Entity handle allocator.
    entities: EntityAllocator,
    /// One store per component type.
    components: Registry,
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create an empty world with pre-reserved capacity.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        debug!(
            entity_capacity = config.entity_capacity,
            store_capacity = config.store_capacity,
            "created world"
        );

        Self {
            entities: EntityAllocator::with_capacity(config.entity_capacity),
            components: Registry::with_store_capacity(config.store_capacity),
            config,
        }
    }

    /// The configuration this world was built with.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ==================== Entities ====================

    /// Create a new entity with no components.
    ///
    /// # Panics
    ///
    /// Panics if the entity index space or memory is exhausted. Use
    /// [`try_entity`](Self::try_entity) to handle that case.
    pub fn entity(&mut self) -> Entity {
        self.entities.allocate()
    }

    /// Create a new entity, reporting exhaustion as an error.
    pub fn try_entity(&mut self) -> EcsResult<Entity> {
        self.entities.try_allocate()
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// Returns `false` if the entity was already dead.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }

        let purged = self.components.purge(entity.index());
        self.entities.deallocate(entity);

        trace!(%entity, purged, "destroyed entity");
        true
    }

    /// Check if an entity is alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Get the number of alive entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.alive_count() as usize
    }

    /// Iterate over every alive entity in index order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter_alive()
    }

    /// Destroy every entity, keeping the component stores.
    ///
    /// Returns the number of entities destroyed. Every outstanding handle
    /// becomes stale.
    pub fn clear(&mut self) -> usize {
        let alive: Vec<Entity> = self.entities.iter_alive().collect();

        self.components.clear();
        for &entity in &alive {
            self.entities.deallocate(entity);
        }

        debug!(destroyed = alive.len(), "cleared world");
        alive.len()
    }

    // ==================== Components ====================

    /// Get the tag for component type `T`.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> ComponentId {
        self.components
            .id_of::<T>()
            .unwrap_or_else(ComponentId::of::<T>)
    }

    /// Create the store for `T` now rather than on first write.
    pub fn register<T: Component>(&mut self) -> ComponentId {
        self.components.get_or_create_store::<T>().info().id()
    }

    /// Attach `value` to `entity`, overwriting any existing `T`.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }

        self.components
            .get_or_create_store::<T>()
            .set(entity.index(), value)
    }

    /// Get a component reference.
    ///
    /// Returns `None` if the entity is dead or has no `T`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.get_store::<T>()?.get(entity.index())
    }

    /// Get a mutable component reference.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.get_store_mut::<T>()?.get_mut(entity.index())
    }

    /// Check if an entity has component `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
            && self
                .components
                .get_store::<T>()
                .is_some_and(|store| store.contains(entity.index()))
    }

    /// Remove component `T` from an entity.
    ///
    /// Returns `true` if the component was present.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.take::<T>(entity).is_some()
    }

    /// Remove component `T` from an entity and return it.
    pub fn take<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.get_store_mut::<T>()?.remove(entity.index())
    }

    /// Remove the component tagged `id` from an entity.
    ///
    /// Returns `true` if the component was present.
    pub fn remove_component_id(&mut self, entity: Entity, id: ComponentId) -> bool {
        self.entities.is_alive(entity)
            && self
                .components
                .store_mut(id)
                .is_some_and(|store| store.remove_index(entity.index()))
    }

    /// Number of entities holding component `T`.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len<T: Component>(&self) -> usize {
        self.components.get_store::<T>().map_or(0, |store| store.len())
    }

    /// The component registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.components
    }

    /// The entity allocator.
    #[must_use]
    pub const fn allocator(&self) -> &EntityAllocator {
        &self.entities
    }

    // ==================== Queries ====================

    /// Iterate over entities holding every component in `required`.
    ///
    /// An empty `required` list matches nothing.
    pub fn query(&self, required: &[ComponentId]) -> QueryIter<'_> {
        Query::from_ids(required).iter(self)
    }

    /// Start building a query.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new()
    }

    // ==================== Deferred Changes ====================

    /// Apply and drain every command in `commands`, in recording order.
    ///
    /// Commands whose target is already dead, or whose component is absent,
    /// are skipped. Returns the number of commands that took effect.
    pub fn apply(&mut self, commands: &mut CommandBuffer) -> usize {
        let pending = commands.len();
        let mut applied = 0;

        for command in commands.drain() {
            let took_effect = match command {
                Command::Destroy(entity) => self.destroy_entity(entity),
                Command::Remove { entity, component } => {
                    self.remove_component_id(entity, component)
                }
            };
            applied += usize::from(took_effect);
        }

        trace!(pending, applied, "applied command buffer");
        applied
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entities.alive_count())
            .field("component_types", &self.components.len())
            .field("stores", &self.components)
            .finish()
    }
}
