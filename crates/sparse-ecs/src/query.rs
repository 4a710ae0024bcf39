//! Multi-component intersection queries.
//!
//! A query names the component types an entity must carry (and optionally the
//! types it must not carry). Evaluation is a streaming filter: the smallest
//! required store drives the scan, and every entity it holds is tested against
//! the remaining stores. Nothing is materialized unless asked for.
//!
//! # Basic Usage
//!
//! ```ignore
//! let query = world.query_builder()
//!     .with::<Position>()
//!     .with::<Velocity>()
//!     .build();
//!
//! for entity in query.iter(&world) {
//!     let pos = world.get::<Position>(entity);
//!     let vel = world.get::<Velocity>(entity);
//! }
//! ```
//!
//! # Mutating While Scanning
//!
//! [`QueryIter`] borrows the world, so in-place writes go through a
//! [`QueryCursor`], which only needs the world for the duration of one
//! `advance`:
//!
//! ```ignore
//! let mut cursor = query.cursor();
//! while let Some(entity) = cursor.advance(&world) {
//!     let vel = *world.get::<Velocity>(entity).unwrap();
//!     world.get_mut::<Position>(entity).unwrap().add(vel);
//! }
//! ```
//!
//! Removing a component or destroying an entity mid-scan can relocate a
//! not-yet-visited entity into an already-visited dense slot. Record those
//! changes in a [`CommandBuffer`](crate::CommandBuffer) and apply it once the
//! scan has finished.

use std::iter::FusedIterator;

use smallvec::SmallVec;
use tracing::trace;

use crate::{
    World,
    component::{Component, ComponentId},
    entity::{Entity, EntityIndex},
    registry::Registry,
};

/// Inline capacity for required terms; queries rarely name more than four.
type Terms = SmallVec<[ComponentId; 4]>;

// ============================================================================
// QueryBuilder
// ============================================================================

/// Builder for constructing queries from component types or raw tags.
#[derive(Clone, Debug, Default)]
pub struct QueryBuilder {
    required: Terms,
    excluded: Terms,
}

impl QueryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity must have component `T`.
    #[must_use]
    pub fn with<T: Component>(self) -> Self {
        self.with_id(ComponentId::of::<T>())
    }

    /// Entity must have the component tagged `id`.
    #[must_use]
    pub fn with_id(mut self, id: ComponentId) -> Self {
        if !self.required.contains(&id) {
            self.required.push(id);
        }
        self
    }

    /// Entity must NOT have component `T`.
    #[must_use]
    pub fn without<T: Component>(self) -> Self {
        self.without_id(ComponentId::of::<T>())
    }

    /// Entity must NOT have the component tagged `id`.
    #[must_use]
    pub fn without_id(mut self, id: ComponentId) -> Self {
        if !self.excluded.contains(&id) {
            self.excluded.push(id);
        }
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Query {
        Query {
            required: self.required,
            excluded: self.excluded,
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// A reusable set of query terms.
///
/// Holds no world state; every call to [`iter`](Self::iter) or
/// [`cursor`](Self::cursor) re-evaluates against the world as it is then.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    required: Terms,
    excluded: Terms,
}

impl Query {
    /// Build a query that requires every tag in `required`.
    #[must_use]
    pub fn from_ids(required: &[ComponentId]) -> Self {
        required
            .iter()
            .fold(QueryBuilder::new(), |builder, &id| builder.with_id(id))
            .build()
    }

    /// Required component tags, in the order they were added.
    #[must_use]
    pub fn required(&self) -> &[ComponentId] {
        &self.required
    }

    /// Excluded component tags.
    #[must_use]
    pub fn excluded(&self) -> &[ComponentId] {
        &self.excluded
    }

    /// Start a detached scan.
    #[must_use]
    pub fn cursor(&self) -> QueryCursor {
        QueryCursor::new(self.clone())
    }

    /// Iterate over all matching entities.
    pub fn iter<'w>(&self, world: &'w World) -> QueryIter<'w> {
        QueryIter {
            world,
            cursor: self.cursor(),
        }
    }

    /// Count matching entities.
    #[must_use]
    pub fn count(&self, world: &World) -> usize {
        self.iter(world).count()
    }

    /// Collect all matching entities.
    #[must_use]
    pub fn collect_entities(&self, world: &World) -> Vec<Entity> {
        self.iter(world).collect()
    }

    /// Check a single entity against this query.
    #[must_use]
    pub fn matches(&self, world: &World, entity: Entity) -> bool {
        !self.required.is_empty()
            && world.is_alive(entity)
            && self.matches_index(world.registry(), entity.index(), None)
    }

    /// Test `index` against every term, skipping the driver tag.
    fn matches_index(
        &self,
        registry: &Registry,
        index: EntityIndex,
        driver: Option<ComponentId>,
    ) -> bool {
        let holds =
            |id: ComponentId| registry.store(id).is_some_and(|store| store.contains(index));

        self.required
            .iter()
            .filter(|&&id| Some(id) != driver)
            .all(|&id| holds(id))
            && !self.excluded.iter().any(|&id| holds(id))
    }
}

// ============================================================================
// QueryCursor - Detached State Machine
// ============================================================================

/// Lifecycle of a [`QueryCursor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryState {
    /// Not started; the driver has not been chosen.
    Idle,
    /// Walking the driver store's dense array.
    Scanning,
    /// Terminal; every later advance returns `None`.
    Exhausted,
}

/// A query scan that does not borrow the world between steps.
#[derive(Clone, Debug)]
pub struct QueryCursor {
    query: Query,
    state: QueryState,
    driver: Option<ComponentId>,
    /// Next dense position to visit in the driver store.
    position: usize,
}

impl QueryCursor {
    fn new(query: Query) -> Self {
        Self {
            query,
            state: QueryState::Idle,
            driver: None,
            position: 0,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> QueryState {
        self.state
    }

    /// Driver chosen on the first advance, if any.
    #[must_use]
    pub const fn driver(&self) -> Option<ComponentId> {
        self.driver
    }

    /// The query this cursor evaluates.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Produce the next matching entity, or `None` once exhausted.
    pub fn advance(&mut self, world: &World) -> Option<Entity> {
        let registry = world.registry();

        if self.state == QueryState::Idle {
            self.start(registry);
        }
        if self.state == QueryState::Exhausted {
            return None;
        }

        let Some(store) = self.driver.and_then(|id| registry.store(id)) else {
            self.state = QueryState::Exhausted;
            return None;
        };

        while let Some(&index) = store.entities().get(self.position) {
            self.position += 1;

            if !self.query.matches_index(registry, index, self.driver) {
                continue;
            }
            if let Some(entity) = world.allocator().entity_at(index) {
                return Some(entity);
            }
        }

        self.state = QueryState::Exhausted;
        None
    }

    /// Upper bound on the entities this cursor can still yield.
    #[must_use]
    pub fn remaining(&self, world: &World) -> usize {
        let registry = world.registry();
        match self.state {
            QueryState::Idle => self
                .query
                .required
                .iter()
                .map(|&id| registry.store(id).map_or(0, |store| store.len()))
                .min()
                .unwrap_or(0),
            QueryState::Scanning => self
                .driver
                .and_then(|id| registry.store(id))
                .map_or(0, |store| store.len().saturating_sub(self.position)),
            QueryState::Exhausted => 0,
        }
    }

    /// Idle -> Scanning (or straight to Exhausted when nothing can match).
    fn start(&mut self, registry: &Registry) {
        self.state = QueryState::Exhausted;

        let mut best: Option<(ComponentId, usize)> = None;
        for &id in &self.query.required {
            let Some(store) = registry.store(id) else {
                trace!(component = ?id, "query term has no store; no matches");
                return;
            };
            let len = store.len();
            if best.is_none_or(|(_, best_len)| len < best_len) {
                best = Some((id, len));
            }
        }

        // Empty requirement set matches nothing.
        let Some((driver, len)) = best else {
            return;
        };

        trace!(
            driver = ?driver,
            len,
            terms = self.query.required.len(),
            "query driver selected"
        );

        self.driver = Some(driver);
        self.position = 0;
        self.state = QueryState::Scanning;
    }
}

// ============================================================================
// QueryIter
// ============================================================================

/// Iterator over the entities matching a query.
pub struct QueryIter<'w> {
    world: &'w World,
    cursor: QueryCursor,
}

impl QueryIter<'_> {
    /// Current lifecycle state of the underlying cursor.
    #[must_use]
    pub const fn state(&self) -> QueryState {
        self.cursor.state()
    }
}

impl Iterator for QueryIter<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.advance(self.world)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.cursor.remaining(self.world)))
    }
}

impl FusedIterator for QueryIter<'_> {}

impl std::fmt::Debug for QueryIter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryIter")
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
