use bevy_ecs::prelude::*;
use bevy_math::Vec3;

// ============================================================================
// Skirmish Components
// ============================================================================

// Display name used in logs and the final report
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Callsign(pub String);

// The weapon a combatant carries
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loadout {
    pub weapon: Entity,
}

// Where an idle combatant is walking to
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Wander {
    pub goal: Option<Vec3>,
}

// Dead and waiting to come back; counts down in seconds
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Respawning {
    pub remaining: f32,
}
