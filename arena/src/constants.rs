// ============================================================================
// Skirmish Constants
// ============================================================================

// Frame loop
pub const SKIRMISH_LOOP_FREQUENCY: u64 = 30; // frames per second

// Arena layout (centimeters)
pub const ARENA_RADIUS: f32 = 2500.0; // spawn and wander disk
pub const PICKUP_FIELD_HALF_EXTENT: f32 = 1500.0; // health and armor square
pub const HEALTH_PICKUP_COUNT: usize = 4;
pub const ARMOR_PICKUP_COUNT: usize = 4;
pub const PORTAL_DISTANCE: f32 = 2000.0; // from the arena center, along X
pub const PORTAL_HEIGHT: f32 = 150.0; // center of the portal volume

// Bot behavior
pub const WALK_SPEED: f32 = 400.0;
pub const WANDER_ARRIVAL_RADIUS: f32 = 100.0;
pub const AIM_TOLERANCE_DEG: f32 = 5.0; // fire only when this close to the aim
pub const RESPAWN_DELAY: f32 = 3.0; // seconds
