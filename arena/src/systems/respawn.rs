use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_time::Time;
use tracing::info;

use crate::{
    components::{Loadout, Respawning, Wander},
    constants::{ARENA_RADIUS, RESPAWN_DELAY},
};
use common::{
    ai::{Focus, sample_point_in_disk},
    combat::Combatant,
    components::{Position, Velocity},
    constants::CAPSULE_HALF_HEIGHT,
    resources::GameRng,
    weapon::stop_fire,
};

// ============================================================================
// Death System
// ============================================================================

// Freshly dead combatants drop their trigger, stop moving and start the
// respawn countdown.
pub fn death_system(world: &mut World) {
    let fallen: Vec<(Entity, Option<Entity>)> = world
        .query_filtered::<(Entity, &Combatant, Option<&Loadout>), Without<Respawning>>()
        .iter(world)
        .filter(|(_, combatant, _)| !combatant.is_alive())
        .map(|(entity, _, loadout)| (entity, loadout.map(|loadout| loadout.weapon)))
        .collect();

    for (entity, weapon) in fallen {
        if let Some(weapon) = weapon {
            stop_fire(world, weapon);
        }
        if let Some(mut velocity) = world.get_mut::<Velocity>(entity) {
            velocity.0 = Vec3::ZERO;
        }
        if let Some(mut focus) = world.get_mut::<Focus>(entity) {
            focus.0 = None;
        }
        world.entity_mut(entity).insert(Respawning {
            remaining: RESPAWN_DELAY,
        });
    }
}

// ============================================================================
// Respawn System
// ============================================================================

// Bring combatants back at a random spot once their countdown runs out.
// Protection from a running power-up carries over; the power-up ends it.
pub fn respawn_system(
    mut commands: Commands,
    time: Res<Time>,
    mut rng: ResMut<GameRng>,
    mut query: Query<(Entity, &mut Respawning, &mut Combatant, &mut Position, Option<&mut Wander>)>,
) {
    let delta = time.delta_secs();
    for (entity, mut respawning, mut combatant, mut pos, wander) in &mut query {
        respawning.remaining -= delta;
        if respawning.remaining > 0.0 {
            continue;
        }

        let protection = combatant.protection_multiplier;
        *combatant = Combatant::new(combatant.team);
        combatant.set_protection_multiplier(protection);
        pos.0 = sample_point_in_disk(&mut rng.0, Vec3::Z * CAPSULE_HALF_HEIGHT, ARENA_RADIUS);
        if let Some(mut wander) = wander {
            wander.goal = None;
        }
        commands.entity(entity).remove::<Respawning>();
        info!("{entity:?} respawned at {}", pos.0);
    }
}
