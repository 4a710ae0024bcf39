//! Deferred structural changes.
//!
//! Removing components or destroying entities while a query is scanning can
//! reorder the dense arrays under the scan. A [`CommandBuffer`] records those
//! changes instead; [`World::apply`](crate::World::apply) performs them in
//! recording order once the scan is over.

use std::{collections::VecDeque, fmt};

use crate::{
    component::{Component, ComponentId},
    entity::Entity,
};

/// A single deferred change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Destroy the entity and purge all of its components.
    Destroy(Entity),
    /// Remove one component from the entity.
    Remove {
        /// Target entity.
        entity: Entity,
        /// Tag of the component to remove.
        component: ComponentId,
    },
}

impl Command {
    /// The entity this command targets.
    #[must_use]
    pub const fn entity(&self) -> Entity {
        match *self {
            Self::Destroy(entity) | Self::Remove { entity, .. } => entity,
        }
    }
}

/// FIFO list of pending structural changes.
#[derive(Default)]
pub struct CommandBuffer {
    commands: VecDeque<Command>,
}

impl CommandBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue destruction of `entity`.
    pub fn destroy(&mut self, entity: Entity) {
        self.commands.push_back(Command::Destroy(entity));
    }

    /// Queue removal of component `T` from `entity`.
    pub fn remove<T: Component>(&mut self, entity: Entity) {
        self.remove_id(entity, ComponentId::of::<T>());
    }

    /// Queue removal of the component tagged `component` from `entity`.
    pub fn remove_id(&mut self, entity: Entity, component: ComponentId) {
        self.commands.push_back(Command::Remove { entity, component });
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Pending commands in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> + '_ {
        self.commands.iter()
    }

    /// Take every pending command in recording order.
    pub fn drain(&mut self) -> impl Iterator<Item = Command> + '_ {
        self.commands.drain(..)
    }

    /// Drop every pending command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("pending", &self.commands.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::World;

    #[derive(Debug, PartialEq)]
    struct Health(u32);

    #[derive(Debug, PartialEq)]
    struct Poisoned;

    #[test]
    fn test_records_in_order() {
        let mut world = World::new();
        let a = world.entity();
        let b = world.entity();

        let mut commands = CommandBuffer::new();
        assert!(commands.is_empty());

        commands.destroy(a);
        commands.remove::<Health>(b);

        assert_eq!(commands.len(), 2);
        let recorded: Vec<_> = commands.iter().copied().collect();
        assert_eq!(
            recorded,
            vec![
                Command::Destroy(a),
                Command::Remove {
                    entity: b,
                    component: ComponentId::of::<Health>(),
                },
            ]
        );
        assert_eq!(recorded[1].entity(), b);
    }

    #[test]
    fn test_apply_empties_buffer() {
        let mut world = World::new();
        let e = world.entity();
        world.set(e, Health(10)).unwrap();
        world.set(e, Poisoned).unwrap();

        let mut commands = CommandBuffer::new();
        commands.remove::<Poisoned>(e);

        assert_eq!(world.apply(&mut commands), 1);
        assert!(commands.is_empty());
        assert!(!world.has::<Poisoned>(e));
        assert_eq!(world.get::<Health>(e), Some(&Health(10)));
    }

    #[test]
    fn test_apply_skips_dead_targets() {
        let mut world = World::new();
        let e = world.entity();
        world.set(e, Health(1)).unwrap();

        let mut commands = CommandBuffer::new();
        commands.destroy(e);
        commands.remove::<Health>(e);
        commands.destroy(e);

        // Only the first destroy lands; the rest target a dead handle.
        assert_eq!(world.apply(&mut commands), 1);
        assert!(!world.is_alive(e));
    }

    #[test]
    fn test_remove_missing_component_is_not_counted() {
        let mut world = World::new();
        let e = world.entity();

        let mut commands = CommandBuffer::new();
        commands.remove::<Poisoned>(e);

        assert_eq!(world.apply(&mut commands), 0);
        assert!(world.is_alive(e));
    }

    #[test]
    fn test_clear_discards() {
        let mut world = World::new();
        let e = world.entity();

        let mut commands = CommandBuffer::new();
        commands.destroy(e);
        commands.clear();

        assert_eq!(world.apply(&mut commands), 0);
        assert!(world.is_alive(e));
    }
}
