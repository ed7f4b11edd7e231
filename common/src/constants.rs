// ============================================================================
// Units
// ============================================================================

// Distances are centimeters, speeds centimeters per second, times seconds.
// World frame: +X forward, +Y right, +Z up.

// ============================================================================
// Floating-Point Comparisons
// ============================================================================

// Small value for floating-point comparisons (near-zero checks, division guards).
pub const PHYSICS_EPSILON: f32 = 1e-6;

// ============================================================================
// Combatants
// ============================================================================

pub const COMBATANT_MAX_HEALTH: f32 = 100.0;
pub const COMBATANT_MAX_ARMOR: f32 = 100.0;
pub const COMBATANT_START_ARMOR: f32 = 0.0;

// Share of incoming damage soaked by armor while armor lasts.
pub const ARMOR_ABSORPTION: f32 = 2.0 / 3.0;

// Collision capsule (centimeters)
pub const CAPSULE_RADIUS: f32 = 55.0;
pub const CAPSULE_HALF_HEIGHT: f32 = 96.0;
pub const EYE_HEIGHT: f32 = 64.0; // above capsule center
pub const MUZZLE_OFFSET: f32 = 50.0; // in front of the eye

// ============================================================================
// Projectiles
// ============================================================================

pub const PROJECTILE_SPHERE_RADIUS: f32 = 20.0;
pub const PROJECTILE_LIFESPAN: f32 = 5.0;
pub const PROJECTILE_SPAWN_OFFSET: f32 = 100.0; // in front of the muzzle
pub const BLAST_SELF_SPEED_SCALE: f32 = 1.25;

// Rocket
pub const ROCKET_SPEED: f32 = 2000.0;
pub const ROCKET_DAMAGE: f32 = 100.0;
pub const ROCKET_BLAST_RADIUS: f32 = 400.0;
pub const ROCKET_BLAST_SPEED_CHANGE: f32 = 1500.0;
pub const ROCKET_SELF_DAMAGE_SCALE: f32 = 0.5;

// Recycler grenade
pub const GRENADE_SPEED: f32 = 1200.0;
pub const GRENADE_SPHERE_RADIUS: f32 = 10.0;
pub const GRENADE_DAMAGE: f32 = 200.0;
pub const GRENADE_BLAST_RADIUS: f32 = 400.0;
pub const GRENADE_BLAST_SPEED_CHANGE: f32 = 600.0;
pub const GRENADE_SELF_DAMAGE_SCALE: f32 = 0.3;
pub const GRENADE_GRAVITY: f32 = 980.0;
pub const GRENADE_IDLE_DURATION: f32 = 2.5;
pub const GRENADE_ATTRACT_DURATION: f32 = 1.5;
pub const GRENADE_ATTRACT_INTERVAL: f32 = 0.01;
pub const GRENADE_RECOVER_DURATION: f32 = 2.0;

// Remains of a recycled victim
pub const RECYCLED_PICKUPS_PER_KIND: usize = 2;
pub const RECYCLED_SCATTER_XY: f32 = 50.0;
pub const RECYCLED_SCATTER_Z_MIN: f32 = 100.0;
pub const RECYCLED_SCATTER_Z_MAX: f32 = 150.0;
pub const RECYCLED_LAUNCH_XY: f32 = 100.0;
pub const RECYCLED_LAUNCH_Z: f32 = 600.0;

// ============================================================================
// Weapons
// ============================================================================

pub const LIGHTNING_RANGE: f32 = 1200.0;
pub const LIGHTNING_RATE_OF_FIRE: f32 = 0.05;
pub const LIGHTNING_DAMAGE: f32 = 6.0;
pub const LIGHTNING_KNOCKBACK: f32 = 50.0;

pub const RAILGUN_RANGE: f32 = 1e5;
pub const RAILGUN_DAMAGE: f32 = 80.0;
pub const RAILGUN_COOLDOWN: f32 = 1.5;
pub const RAIL_BEAM_LIFESPAN: f32 = 1.0;

pub const ROCKET_LAUNCHER_COOLDOWN: f32 = 0.8;
pub const GRENADE_LAUNCHER_COOLDOWN: f32 = 1.0;

// ============================================================================
// Pickups & Power-Ups
// ============================================================================

pub const PICKUP_COLLECTION_RADIUS: f32 = 80.0;
pub const HEALTH_PICKUP_AMOUNT: f32 = 25.0;
pub const ARMOR_PICKUP_AMOUNT: f32 = 25.0;

pub const POWER_UP_EFFECT_DURATION: f32 = 30.0;
pub const POWER_UP_RESPAWN_INTERVAL: f32 = 120.0;
pub const POWER_UP_PROGRESS_INTERVAL: f32 = 0.1;
pub const PROTECTION_MULTIPLIER: f32 = 0.3;
pub const QUAD_DAMAGE_MULTIPLIER: f32 = 4.0;

pub const GLOW_INTENSITY_ACTIVE: f32 = 5.0;
pub const GLOW_INTENSITY_INACTIVE: f32 = 0.1;

// ============================================================================
// Portals
// ============================================================================

pub const PORTAL_HALF_EXTENT: [f32; 3] = [50.0, 120.0, 150.0];

// ============================================================================
// AI
// ============================================================================

pub const SIGHT_PERIPHERAL_HALF_ANGLE_DEG: f32 = 70.0;
pub const SIGHT_RADIUS: f32 = 3000.0;
