//! ECS error types.

use thiserror::Error;

use crate::{component::ComponentId, entity::Entity};

/// Errors returned by mutating world and store operations.
///
/// Lookups (`get`, `has`) never produce these; absence is expressed as `None`
/// or `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// The handle is stale or was never issued.
    #[error("entity {0} is dead")]
    DeadEntity(Entity),

    /// Backing storage could not grow.
    #[error("out of memory growing {component} storage to {requested} slots")]
    OutOfMemory {
        /// Type name of the storage that failed to grow.
        component: &'static str,
        /// Slot count that was requested.
        requested: usize,
    },

    /// No store has ever been created for this component type.
    #[error("component type {0:?} is not registered")]
    UnregisteredType(ComponentId),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
