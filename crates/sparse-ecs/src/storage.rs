//! Component storage - one sparse set per component type.
//!
//! Each store keeps its values in a gap-free dense array alongside the
//! entity index that owns each value, plus a sparse table from entity index
//! to dense position. Insert, lookup, and removal are all O(1).
//!
//! # Iteration order
//!
//! Removal fills the vacated dense slot with the last element
//! (swap-and-pop), so iteration order is not stable across insert/remove.
//! Callers must not depend on it.

use std::{any::Any, fmt};

use crate::{
    component::{Component, ComponentInfo},
    entity::EntityIndex,
    error::{EcsError, EcsResult},
};

/// Sparse-table marker for "no component at this entity index".
const EMPTY: u32 = u32::MAX;

/// Dense storage for every instance of one component type.
pub struct ComponentStore<T: Component> {
    /// Entity index -> dense position, `EMPTY` when absent.
    sparse: Vec<u32>,
    /// Dense position -> owning entity index.
    dense: Vec<EntityIndex>,
    /// Component values, parallel to `dense`.
    data: Vec<T>,
    info: ComponentInfo,
}

impl<T: Component> ComponentStore<T> {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            data: Vec::new(),
            info: ComponentInfo::of::<T>(),
        }
    }

    /// Create a store with room for `capacity` values before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::with_capacity(capacity),
            dense: Vec::with_capacity(capacity),
            data: Vec::with_capacity(capacity),
            info: ComponentInfo::of::<T>(),
        }
    }

    /// Get the component type information.
    #[must_use]
    pub const fn info(&self) -> &ComponentInfo {
        &self.info
    }

    /// Number of entities currently holding this component.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no entity holds this component.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of values the dense array can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Dense position of `index`, if present.
    #[inline]
    fn position(&self, index: EntityIndex) -> Option<usize> {
        match self.sparse.get(index as usize) {
            Some(&pos) if pos != EMPTY => Some(pos as usize),
            _ => None,
        }
    }

    /// Attach `value` to `index`, overwriting any existing value in place.
    ///
    /// Growth is amortized doubling. If any backing array cannot grow, returns
    /// [`EcsError::OutOfMemory`] and the store is left untouched.
    pub fn set(&mut self, index: EntityIndex, value: T) -> EcsResult<()> {
        if let Some(pos) = self.position(index) {
            self.data[pos] = value;
            return Ok(());
        }

        let slot = index as usize;
        let sparse_needed = (slot + 1).saturating_sub(self.sparse.len());

        // Reserve everything before mutating so failure leaves no partial state.
        self.sparse
            .try_reserve(sparse_needed)
            .map_err(|_| self.out_of_memory(slot + 1))?;
        self.try_reserve(1)?;

        if sparse_needed > 0 {
            self.sparse.resize(slot + 1, EMPTY);
        }
        self.sparse[slot] = self.dense.len() as u32;
        self.dense.push(index);
        self.data.push(value);
        Ok(())
    }

    /// Reserve room for `additional` more values.
    ///
    /// On failure returns [`EcsError::OutOfMemory`]; stored values are untouched.
    pub fn try_reserve(&mut self, additional: usize) -> EcsResult<()> {
        let requested = self.data.len().saturating_add(additional);
        self.dense
            .try_reserve(additional)
            .map_err(|_| self.out_of_memory(requested))?;
        self.data
            .try_reserve(additional)
            .map_err(|_| self.out_of_memory(requested))
    }

    fn out_of_memory(&self, requested: usize) -> EcsError {
        EcsError::OutOfMemory {
            component: self.info.name(),
            requested,
        }
    }

    /// Get a reference to the value attached to `index`.
    #[must_use]
    #[inline]
    pub fn get(&self, index: EntityIndex) -> Option<&T> {
        self.position(index).map(|pos| &self.data[pos])
    }

    /// Get a mutable reference to the value attached to `index`.
    #[inline]
    pub fn get_mut(&mut self, index: EntityIndex) -> Option<&mut T> {
        self.position(index).map(|pos| &mut self.data[pos])
    }

    /// Check whether `index` holds this component.
    #[must_use]
    #[inline]
    pub fn contains(&self, index: EntityIndex) -> bool {
        self.position(index).is_some()
    }

    /// Detach and return the value at `index`.
    ///
    /// The last dense element moves into the vacated slot, so this is O(1)
    /// and disturbs iteration order.
    pub fn remove(&mut self, index: EntityIndex) -> Option<T> {
        let pos = self.position(index)?;
        self.sparse[index as usize] = EMPTY;

        let last = self.dense.len() - 1;
        if pos != last {
            let moved = self.dense[last];
            self.sparse[moved as usize] = pos as u32;
        }
        self.dense.swap_remove(pos);
        Some(self.data.swap_remove(pos))
    }

    /// Owning entity indices in dense order.
    #[must_use]
    pub fn entities(&self) -> &[EntityIndex] {
        &self.dense
    }

    /// Component values in dense order.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.data
    }

    /// Mutable component values in dense order.
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate `(entity index, &value)` in current dense order.
    ///
    /// The order is physical, not insertion order, and changes after removals.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (EntityIndex, &T)> + '_ {
        self.dense.iter().copied().zip(self.data.iter())
    }

    /// Iterate `(entity index, &mut value)` in current dense order.
    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (EntityIndex, &mut T)> + '_ {
        self.dense.iter().copied().zip(self.data.iter_mut())
    }

    /// Remove every value, keeping allocated capacity.
    pub fn clear(&mut self) {
        for &index in &self.dense {
            self.sparse[index as usize] = EMPTY;
        }
        self.dense.clear();
        self.data.clear();
    }
}

impl<T: Component> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> fmt::Debug for ComponentStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStore")
            .field("component", &self.info.name())
            .field("len", &self.data.len())
            .field("capacity", &self.data.capacity())
            .finish()
    }
}

/// Type-erased view of a [`ComponentStore`].
///
/// The registry holds stores behind this trait so it can purge destroyed
/// entities and answer membership tests without knowing `T`.
pub trait ErasedStore: Any + Send + Sync {
    /// Component type information.
    fn info(&self) -> &ComponentInfo;

    /// Number of entities holding this component.
    fn len(&self) -> usize;

    /// Check if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether `index` holds this component.
    fn contains(&self, index: EntityIndex) -> bool;

    /// Owning entity indices in dense order.
    fn entities(&self) -> &[EntityIndex];

    /// Drop the value at `index`. Returns `false` if absent.
    fn remove_index(&mut self, index: EntityIndex) -> bool;

    /// Drop every value.
    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn contains(&self, index: EntityIndex) -> bool {
        ComponentStore::contains(self, index)
    }

    fn entities(&self) -> &[EntityIndex] {
        &self.dense
    }

    fn remove_index(&mut self, index: EntityIndex) -> bool {
        self.remove(index).is_some()
    }

    fn clear(&mut self) {
        ComponentStore::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
