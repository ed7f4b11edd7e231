use std::path::Path;

use anyhow::{Context, Result};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{constants::*, splash::SplashPolicy};

// ============================================================================
// Tuning
// ============================================================================

// Gameplay numbers that can be overridden from a JSON file. Every field is
// optional in the file; missing ones keep the built-in defaults.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub lightning_gun: LightningTuning,
    pub railgun: RailgunTuning,
    pub rocket: ProjectileTuning,
    pub recycler_grenade: GrenadeTuning,
    pub pickups: PickupTuning,
    pub powerups: PowerupTuning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightningTuning {
    pub range: f32,
    pub rate_of_fire: f32,
    pub damage: f32,
    pub knockback: f32,
}

impl Default for LightningTuning {
    fn default() -> Self {
        Self {
            range: LIGHTNING_RANGE,
            rate_of_fire: LIGHTNING_RATE_OF_FIRE,
            damage: LIGHTNING_DAMAGE,
            knockback: LIGHTNING_KNOCKBACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailgunTuning {
    pub range: f32,
    pub damage: f32,
    pub cooldown: f32,
    pub beam_lifespan: f32,
}

impl Default for RailgunTuning {
    fn default() -> Self {
        Self {
            range: RAILGUN_RANGE,
            damage: RAILGUN_DAMAGE,
            cooldown: RAILGUN_COOLDOWN,
            beam_lifespan: RAIL_BEAM_LIFESPAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    pub speed: f32,
    pub sphere_radius: f32,
    pub damage: f32,
    pub blast_radius: f32,
    pub blast_speed_change: f32,
    pub lifespan: f32,
    pub launcher_cooldown: f32,
    pub splash: SplashPolicy,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: ROCKET_SPEED,
            sphere_radius: PROJECTILE_SPHERE_RADIUS,
            damage: ROCKET_DAMAGE,
            blast_radius: ROCKET_BLAST_RADIUS,
            blast_speed_change: ROCKET_BLAST_SPEED_CHANGE,
            lifespan: PROJECTILE_LIFESPAN,
            launcher_cooldown: ROCKET_LAUNCHER_COOLDOWN,
            splash: SplashPolicy::ROCKET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrenadeTuning {
    pub projectile: ProjectileTuning,
    pub gravity: f32,
    pub idle_duration: f32,
    pub attract_duration: f32,
    pub attract_interval: f32,
    pub recover_duration: f32,
}

impl Default for GrenadeTuning {
    fn default() -> Self {
        Self {
            projectile: ProjectileTuning {
                speed: GRENADE_SPEED,
                sphere_radius: GRENADE_SPHERE_RADIUS,
                damage: GRENADE_DAMAGE,
                blast_radius: GRENADE_BLAST_RADIUS,
                blast_speed_change: GRENADE_BLAST_SPEED_CHANGE,
                lifespan: GRENADE_IDLE_DURATION + GRENADE_ATTRACT_DURATION + GRENADE_RECOVER_DURATION,
                launcher_cooldown: GRENADE_LAUNCHER_COOLDOWN,
                splash: SplashPolicy::RECYCLER_GRENADE,
            },
            gravity: GRENADE_GRAVITY,
            idle_duration: GRENADE_IDLE_DURATION,
            attract_duration: GRENADE_ATTRACT_DURATION,
            attract_interval: GRENADE_ATTRACT_INTERVAL,
            recover_duration: GRENADE_RECOVER_DURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    pub collection_radius: f32,
    pub health_amount: f32,
    pub armor_amount: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            collection_radius: PICKUP_COLLECTION_RADIUS,
            health_amount: HEALTH_PICKUP_AMOUNT,
            armor_amount: ARMOR_PICKUP_AMOUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerupTuning {
    pub effect_duration: f32,
    pub respawn_interval: f32,
    pub progress_interval: f32,
    pub protection_multiplier: f32,
    pub quad_damage_multiplier: f32,
}

impl Default for PowerupTuning {
    fn default() -> Self {
        Self {
            effect_duration: POWER_UP_EFFECT_DURATION,
            respawn_interval: POWER_UP_RESPAWN_INTERVAL,
            progress_interval: POWER_UP_PROGRESS_INTERVAL,
            protection_multiplier: PROTECTION_MULTIPLIER,
            quad_damage_multiplier: QUAD_DAMAGE_MULTIPLIER,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

pub fn parse_tuning(text: &str) -> Result<Tuning> {
    serde_json::from_str(text).context("Failed to parse tuning JSON")
}

pub fn load_tuning(path: &Path) -> Result<Tuning> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let tuning = parse_tuning(&text).with_context(|| format!("Invalid tuning file {}", path.display()))?;
    info!("loaded tuning from {}", path.display());
    Ok(tuning)
}
