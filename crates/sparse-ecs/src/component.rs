//! Component type identification and metadata.
//!
//! Components are plain data types attached to entities. Each Rust type is
//! assigned a [`ComponentId`] the first time it is seen, and that tag stays
//! the same for the rest of the process, across every [`World`](crate::World).

use std::{any::TypeId, fmt};

use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

/// Marker trait for types that can be used as components.
///
/// # Example
///
/// ```ignore
/// struct Position { x: f32, y: f32, z: f32 }
/// world.set(entity, Position { x: 0.0, y: 0.0, z: 0.0 })?;
/// ```
pub trait Component: Send + Sync + 'static {}

// Blanket implementation for all suitable types
impl<T: Send + Sync + 'static> Component for T {}

/// Stable tag identifying one component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

/// Process-wide table of assigned tags.
///
/// Only consulted when a tag is assigned or when a registry first sees a type;
/// per-entity access goes through each registry's own map.
static TYPE_IDS: RwLock<HashMap<TypeId, ComponentId, FxBuildHasher>> =
    parking_lot::const_rwlock(HashMap::with_hasher(FxBuildHasher));

#[cfg(test)]
thread_local! {
    static TABLE_ACCESSES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Number of times this thread has touched the global tag table.
#[cfg(test)]
pub(crate) fn table_accesses() -> usize {
    TABLE_ACCESSES.with(std::cell::Cell::get)
}

#[inline]
fn note_table_access() {
    #[cfg(test)]
    TABLE_ACCESSES.with(|count| count.set(count.get() + 1));
}

impl ComponentId {
    /// Get the tag for `T`, assigning one on first use.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        let type_id = TypeId::of::<T>();
        note_table_access();

        if let Some(&id) = TYPE_IDS.read().get(&type_id) {
            return id;
        }

        let mut ids = TYPE_IDS.write();
        let next = Self(ids.len() as u32);
        *ids.entry(type_id).or_insert(next)
    }

    /// Get the tag for `T` only if one has already been assigned.
    #[must_use]
    pub fn lookup<T: Component>() -> Option<Self> {
        note_table_access();
        TYPE_IDS.read().get(&TypeId::of::<T>()).copied()
    }

    /// Create a component ID from a raw value.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// The raw value as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Runtime information about a component type.
#[derive(Clone, Copy)]
pub struct ComponentInfo {
    id: ComponentId,
    /// Type name for debugging.
    name: &'static str,
    type_id: TypeId,
}

impl ComponentInfo {
    /// Create component info for a concrete type.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            id: ComponentId::of::<T>(),
            name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Get the component ID.
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Get the component type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Check if this info is for the given type.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
