use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use bevy_time::{Timer, TimerMode};

use crate::{constants::*, pickup::PowerupKind};

// ============================================================================
// Spatial Components
// ============================================================================

// World-space location (centimeters)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position(pub Vec3);

// Linear velocity (centimeters per second)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub Vec3);

// Facing; local +X is forward, +Y right, +Z up
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation(pub Quat);

impl Orientation {
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.0 * Vec3::X
    }

    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.0 * Vec3::Y
    }

    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.0 * Vec3::Z
    }
}

// Point of view of a character: eye location and aim direction.
#[must_use]
pub fn view_point(position: &Position, orientation: &Orientation) -> (Vec3, Vec3) {
    (position.0 + Vec3::Z * EYE_HEIGHT, orientation.forward())
}

// ============================================================================
// Collision Components
// ============================================================================

// Vertical capsule around the entity's position. `half_height` includes the
// hemispherical caps. The overlap query reports the capsule and, when
// `has_mesh` is set, the skeletal mesh as separate primitives.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub radius: f32,
    pub half_height: f32,
    pub has_mesh: bool,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            radius: CAPSULE_RADIUS,
            half_height: CAPSULE_HALF_HEIGHT,
            has_mesh: true,
        }
    }
}

// ============================================================================
// Motion Components
// ============================================================================

// What happens when an entity reaches the ground plane (z = 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundResponse {
    // Pass through (rockets detonate on their own contact check)
    Ignore,
    // Reflect vertical velocity, keeping this fraction of speed
    Bounce { restitution: f32 },
    // Stop falling and bleed horizontal speed at `friction` per second
    Land { friction: f32 },
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Kinematic {
    pub gravity: f32,
    // Height of the entity's origin above the ground when resting
    pub rest_height: f32,
    pub ground: GroundResponse,
}

impl Kinematic {
    #[must_use]
    pub const fn walker(rest_height: f32) -> Self {
        Self {
            gravity: 980.0,
            rest_height,
            ground: GroundResponse::Land { friction: 8.0 },
        }
    }

    #[must_use]
    pub const fn straight() -> Self {
        Self {
            gravity: 0.0,
            rest_height: 0.0,
            ground: GroundResponse::Ignore,
        }
    }
}

// Despawns the entity once the timer runs out.
#[derive(Component, Debug, Clone)]
pub struct Lifespan(pub Timer);

impl Lifespan {
    #[must_use]
    pub fn from_seconds(seconds: f32) -> Self {
        Self(Timer::from_seconds(seconds, TimerMode::Once))
    }
}

// ============================================================================
// Presentation State
// ============================================================================

// A character glowing because of an active power-up.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Glow(pub Option<PowerupKind>);

// Hidden entities keep simulating but are not drawn.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hidden;
