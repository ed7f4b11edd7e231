use std::{fmt, marker::PhantomData};

use bevy_ecs::{component::Mutable, prelude::*};

// ============================================================================
// Weak References
// ============================================================================

/// Non-owning reference to an entity expected to carry a `T` component.
///
/// The world owns the referent; a despawned entity, or one that lost its `T`,
/// resolves to `None`. Every access goes through the world.
pub struct WeakRef<T> {
    entity: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> WeakRef<T> {
    #[must_use]
    pub const fn new(entity: Entity) -> Self {
        Self {
            entity,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    #[must_use]
    pub fn get<'w>(&self, world: &'w World) -> Option<&'w T> {
        world.get::<T>(self.entity)
    }

    #[must_use]
    pub fn is_valid(&self, world: &World) -> bool {
        self.get(world).is_some()
    }

    // Resolve to the entity only while the referent is alive.
    #[must_use]
    pub fn upgrade(&self, world: &World) -> Option<Entity> {
        self.is_valid(world).then_some(self.entity)
    }
}

impl<T: Component<Mutability = Mutable>> WeakRef<T> {
    #[must_use]
    pub fn get_mut<'w>(&self, world: &'w mut World) -> Option<Mut<'w, T>> {
        world.get_mut::<T>(self.entity)
    }
}

impl<T> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WeakRef<T> {}

impl<T> PartialEq for WeakRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl<T> Eq for WeakRef<T> {}

impl<T> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakRef({:?})", self.entity)
    }
}
