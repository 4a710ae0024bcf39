//! Entity identifiers with generational indices.
//!
//! Entities use a generational index pattern to safely reuse slots
//! while detecting use-after-destroy scenarios.

use std::{cmp::Reverse, collections::BinaryHeap, fmt};

use tracing::trace;

use crate::error::{EcsError, EcsResult};

/// Generation counter to detect stale entity references.
/// Incremented each time an entity slot is recycled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Generation(u32);

impl Generation {
    /// Create a new generation (starts at 0).
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Create a generation from a raw value.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// The following generation, or `None` once the counter is used up.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Get the raw generation value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Raw entity index, the dense slot number shared by every component store.
pub type EntityIndex = u32;

/// A handle to one simulated object.
///
/// Two handles are equal iff both the index and the generation match. A handle
/// whose generation differs from the allocator's current generation for its
/// index is stale and treated as dead everywhere.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: EntityIndex,
    generation: Generation,
}

impl Entity {
    /// Create an entity handle from its parts.
    #[must_use]
    pub const fn new(index: EntityIndex, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Get the entity's slot index.
    #[must_use]
    pub const fn index(self) -> EntityIndex {
        self.index
    }

    /// Get the entity's generation.
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }

    /// Pack entity into a single u64 (generation in the high half).
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation.0 as u64) << 32) | (self.index as u64)
    }

    /// Unpack entity from a u64 produced by [`Entity::to_bits`].
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: Generation((bits >> 32) as u32),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation.0)
    }
}

/// Per-slot bookkeeping.
#[derive(Clone, Copy, Debug)]
struct Slot {
    /// Generation of the handle currently (or next) issued for this slot.
    generation: Generation,
    /// Whether the handle carrying `generation` is live.
    alive: bool,
}

/// Allocator for entity handles with generation tracking.
///
/// Retired slots are kept in a min-heap so `allocate` always hands out the
/// lowest-numbered free index before growing.
pub struct EntityAllocator {
    /// Bookkeeping for each slot ever issued.
    slots: Vec<Slot>,
    /// Free slots, lowest index on top.
    free: BinaryHeap<Reverse<EntityIndex>>,
    /// Number of currently alive entities.
    alive_count: u32,
    /// Slots that ran out of generations and are never reused.
    retired: u32,
    /// Indices at or above this are never issued.
    index_limit: EntityIndex,
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAllocator {
    /// Create a new entity allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: BinaryHeap::new(),
            alive_count: 0,
            retired: 0,
            index_limit: EntityIndex::MAX,
        }
    }

    /// Create an allocator with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: BinaryHeap::with_capacity(capacity / 4),
            ..Self::new()
        }
    }

    /// Cap the number of slots this allocator will ever issue.
    #[must_use]
    pub fn with_index_limit(mut self, limit: EntityIndex) -> Self {
        self.index_limit = limit;
        self
    }

    /// Allocate a new entity, reporting exhaustion as an error.
    ///
    /// Fails with [`EcsError::OutOfMemory`] when the index space is used up or
    /// the slot table cannot grow. The allocator is unchanged on failure.
    pub fn try_allocate(&mut self) -> EcsResult<Entity> {
        if let Some(Reverse(index)) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            self.alive_count += 1;
            return Ok(Entity::new(index, slot.generation));
        }

        let requested = self.slots.len() + 1;
        let exhausted = move || EcsError::OutOfMemory {
            component: "Entity",
            requested,
        };

        let index = match EntityIndex::try_from(self.slots.len()) {
            Ok(index) if index < self.index_limit => index,
            _ => return Err(exhausted()),
        };
        self.slots.try_reserve(1).map_err(|_| exhausted())?;

        let generation = Generation::new();
        self.slots.push(Slot {
            generation,
            alive: true,
        });
        self.alive_count += 1;
        Ok(Entity::new(index, generation))
    }

    /// Allocate a new entity.
    ///
    /// # Panics
    ///
    /// Panics if the entity index space or memory is exhausted. Use
    /// [`EntityAllocator::try_allocate`] to handle that case.
    pub fn allocate(&mut self) -> Entity {
        match self.try_allocate() {
            Ok(entity) => entity,
            Err(err) => panic!("entity allocation failed: {err}"),
        }
    }

    /// Deallocate an entity, making its slot available for reuse.
    ///
    /// Returns `true` if the entity was alive and is now retired. A stale or
    /// out-of-range handle returns `false` and changes nothing.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let slot = &mut self.slots[entity.index() as usize];
        slot.alive = false;
        self.alive_count -= 1;

        // Every handle issued for this slot so far becomes permanently stale.
        // A slot whose generations are used up is never handed out again.
        match slot.generation.next() {
            Some(generation) => {
                slot.generation = generation;
                self.free.push(Reverse(entity.index()));
            }
            None => {
                self.retired += 1;
                trace!(%entity, "entity slot out of generations; retired");
            }
        }
        true
    }

    /// Check if an entity is currently alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation())
    }

    /// The live handle occupying `index`, if any.
    #[must_use]
    pub fn entity_at(&self, index: EntityIndex) -> Option<Entity> {
        let slot = self.slots.get(index as usize)?;
        slot.alive.then(|| Entity::new(index, slot.generation))
    }

    /// Get the number of currently alive entities.
    #[must_use]
    pub const fn alive_count(&self) -> u32 {
        self.alive_count
    }

    /// Get the number of slots ever issued, dead or alive.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots permanently withdrawn after exhausting their generations.
    #[must_use]
    pub const fn retired_count(&self) -> u32 {
        self.retired
    }

    /// Iterate over every alive entity in index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| Entity::new(index as EntityIndex, slot.generation))
    }
}

impl fmt::Debug for EntityAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityAllocator")
            .field("alive", &self.alive_count)
            .field("slots", &self.slots.len())
            .field("free", &self.free.len())
            .field("retired", &self.retired)
            .finish()
    }
}
