//! Registry of component stores.
//!
//! Maps each [`ComponentId`] to the one type-erased [`ComponentStore`] that
//! holds that type. Stores are created lazily the first time a type is written
//! and live as long as the registry.
//!
//! Typed access resolves `T` through the registry's own `TypeId` table, so the
//! process-wide tag table is only consulted when a store is first created.

use std::{any::TypeId, fmt};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::{
    component::{Component, ComponentId, ComponentInfo},
    entity::EntityIndex,
    error::{EcsError, EcsResult},
    storage::{ComponentStore, ErasedStore},
};

/// Owner of every component store in a world.
#[derive(Default)]
pub struct Registry {
    /// Stores indexed by `ComponentId`; `None` for tags this registry never saw.
    stores: Vec<Option<Box<dyn ErasedStore>>>,
    /// Tags of the types that have a store here.
    type_ids: HashMap<TypeId, ComponentId, FxBuildHasher>,
    /// Number of `Some` entries in `stores`.
    count: usize,
    /// Initial capacity for newly created stores.
    store_capacity: usize,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry whose new stores pre-allocate `store_capacity` slots.
    #[must_use]
    pub fn with_store_capacity(store_capacity: usize) -> Self {
        Self {
            store_capacity,
            ..Self::default()
        }
    }

    /// Get the store for `T`, creating an empty one on first access.
    ///
    /// # Panics
    ///
    /// Panics if the store registered under `T`'s tag holds a different type,
    /// which would mean the tag table is corrupt.
    pub fn get_or_create_store<T: Component>(&mut self) -> &mut ComponentStore<T> {
        let id = match self.id_of::<T>() {
            Some(id) => id,
            None => {
                let id = ComponentId::of::<T>();
                self.type_ids.insert(TypeId::of::<T>(), id);
                id
            }
        };
        let slot = id.index();

        if slot >= self.stores.len() {
            self.stores.resize_with(slot + 1, || None);
        }

        let entry = &mut self.stores[slot];
        if entry.is_none() {
            let store = ComponentStore::<T>::with_capacity(self.store_capacity);
            debug!(
                component = store.info().name(),
                id = id.as_raw(),
                "created component store"
            );
            *entry = Some(Box::new(store));
            self.count += 1;
        }

        entry
            .as_mut()
            .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
            .expect("component store type matches its tag")
    }

    /// Tag of `T` if this registry holds a store for it.
    #[inline]
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.type_ids.get(&TypeId::of::<T>()).copied()
    }

    /// Get the store for `T` without creating it.
    #[inline]
    #[must_use]
    pub fn get_store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        let id = self.id_of::<T>()?;
        self.store(id)?.as_any().downcast_ref()
    }

    /// Get the mutable store for `T` without creating it.
    #[inline]
    pub fn get_store_mut<T: Component>(&mut self) -> Option<&mut ComponentStore<T>> {
        let id = self.id_of::<T>()?;
        self.store_mut(id)?.as_any_mut().downcast_mut()
    }

    /// Get a type-erased store by tag.
    #[must_use]
    pub fn store(&self, id: ComponentId) -> Option<&dyn ErasedStore> {
        self.stores.get(id.index())?.as_deref()
    }

    /// Get a mutable type-erased store by tag.
    pub fn store_mut(&mut self, id: ComponentId) -> Option<&mut dyn ErasedStore> {
        match self.stores.get_mut(id.index()) {
            Some(Some(store)) => Some(store.as_mut()),
            _ => None,
        }
    }

    /// Check whether a store exists for `id`.
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.store(id).is_some()
    }

    /// Component metadata for a registered tag.
    pub fn info(&self, id: ComponentId) -> EcsResult<&ComponentInfo> {
        self.store(id)
            .map(|store| store.info())
            .ok_or(EcsError::UnregisteredType(id))
    }

    /// Remove `index` from every store that holds it.
    ///
    /// Returns the number of components removed.
    pub fn purge(&mut self, index: EntityIndex) -> usize {
        self.stores
            .iter_mut()
            .flatten()
            .map(|store| usize::from(store.remove_index(index)))
            .sum()
    }

    /// Empty every store, keeping the stores themselves.
    pub fn clear(&mut self) {
        for store in self.stores.iter_mut().flatten() {
            store.clear();
        }
    }

    /// Number of registered component types.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Check if no component type has been registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate over all stores in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn ErasedStore> + '_ {
        self.stores.iter().filter_map(|store| store.as_deref())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|store| (store.info().name(), store.len())))
            .finish()
    }
}
