#![allow(clippy::float_cmp)]
#![allow(clippy::missing_fields_in_debug)]

//! Sparse ECS - Sparse-set Entity Component System core
//!
//! Storage and query layer for simulations with 100k+ live entities and any
//! number of component types, sized to run several multi-component queries
//! per frame inside a 60 FPS budget.
//!
//! # Key Concepts
//!
//! - **Entity**: A generational handle (index + generation) for one object
//! - **Component**: Plain data attached to at most one entity per type
//! - **ComponentStore**: Sparse set holding every instance of one type densely
//! - **Registry**: One type-erased store per [`ComponentId`]
//! - **Query**: Intersection of stores, driven by the smallest one
//!
//! # Access Patterns
//!
//! Lookups never fail; absence is `None` or `false`. Mutations report a stale
//! handle as [`EcsError::DeadEntity`]:
//! ```ignore
//! let mut world = World::new();
//! let e = world.entity();
//! world.set(e, Position { x: 0.0, y: 0.0 })?;
//!
//! if let Some(pos) = world.get_mut::<Position>(e) {
//!     pos.x += 1.0;
//! }
//!
//! world.destroy_entity(e);
//! assert!(world.get::<Position>(e).is_none());
//! ```
//!
//! # Structural Changes During a Query
//!
//! Queue removals and destroys in a [`CommandBuffer`] and apply it after the
//! scan:
//! ```ignore
//! let mut commands = CommandBuffer::new();
//! for e in world.query_builder().with::<Health>().build().iter(&world) {
//!     if world.get::<Health>(e).is_some_and(|h| h.0 <= 0.0) {
//!         commands.destroy(e);
//!     }
//! }
//! world.apply(&mut commands);
//! ```

mod command;
mod component;
mod entity;
mod error;
mod query;
mod registry;
mod storage;
mod world;

pub use command::{Command, CommandBuffer};
pub use component::{Component, ComponentId, ComponentInfo};
pub use entity::{Entity, EntityAllocator, EntityIndex, Generation};
pub use error::{EcsError, EcsResult};
pub use query::{Query, QueryBuilder, QueryCursor, QueryIter, QueryState};
pub use registry::Registry;
pub use storage::{ComponentStore, ErasedStore};
pub use world::{World, WorldConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CommandBuffer, Component, ComponentId, EcsError, EcsResult, Entity, Query, World,
        WorldConfig,
    };
}
