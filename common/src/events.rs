use bevy_ecs::prelude::*;
use bevy_math::Vec3;

use crate::{pickup::PickupKind, projectile::ProjectileKind};

// ============================================================================
// Game Events
// ============================================================================

// Sound cues. Playback belongs to the presentation layer; the simulation only names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Fire,
    StopFire,
    Hit,
    Explode,
    Bounce,
    Annihilate,
    PickUp,
}

/// Everything the simulation reports outward in a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    // Positive damage landed and should be shown to the instigator.
    DamageShown {
        instigator: Entity,
        victim: Entity,
        amount: f32,
        location: Vec3,
    },
    Sound {
        cue: SoundCue,
        location: Vec3,
    },
    Explosion {
        projectile: Entity,
        kind: ProjectileKind,
        location: Vec3,
    },
    Died {
        victim: Entity,
        instigator: Option<Entity>,
    },
    PickupCollected {
        pickup: Entity,
        collector: Entity,
        kind: PickupKind,
    },
    PowerupProgress {
        pickup: Entity,
        beneficiary: Entity,
        progress: f32,
    },
    PowerupExpired {
        pickup: Entity,
        beneficiary: Entity,
    },
    Perception {
        observer: Entity,
        target: Entity,
        sensed: bool,
    },
    Teleported {
        entity: Entity,
        from: Entity,
        to: Entity,
    },
}

// Frame-scoped outbox, drained by whoever drives the simulation.
#[derive(Resource, Debug, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// Push onto the world's queue if one is installed.
pub fn emit(world: &mut World, event: GameEvent) {
    if let Some(mut queue) = world.get_resource_mut::<EventQueue>() {
        queue.push(event);
    }
}
