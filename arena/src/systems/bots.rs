use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use tracing::trace;

use crate::{
    components::{Loadout, Respawning, Wander},
    constants::{AIM_TOLERANCE_DEG, ARENA_RADIUS, WALK_SPEED, WANDER_ARRIVAL_RADIUS},
};
use common::{
    ai::{Attitude, Focus, SightSense, attitude, predict_intercept, sample_point_in_disk},
    combat::Combatant,
    components::{Orientation, Position, Velocity, view_point},
    config::Tuning,
    constants::{CAPSULE_HALF_HEIGHT, EYE_HEIGHT},
    resources::GameRng,
    weapon::{Weapon, WeaponKind, on_fire, on_fire_release},
};

// What a combatant knows at the start of its turn
struct Outlook {
    entity: Entity,
    position: Vec3,
    eye: Vec3,
    forward: Vec3,
    weapon: Entity,
    target: Option<(Vec3, Vec3)>,
}

// Nearest live hostile among the actors `sense` currently perceives, as
// (position, velocity).
fn pick_target(world: &World, observer: &Combatant, position: Vec3, sense: &SightSense) -> Option<(Vec3, Vec3)> {
    sense
        .sensed
        .iter()
        .filter(|target| world.get::<Respawning>(**target).is_none())
        .filter_map(|target| {
            let other = world.get::<Combatant>(*target)?;
            let at = world.get::<Position>(*target)?.0;
            let velocity = world.get::<Velocity>(*target).map_or(Vec3::ZERO, |vel| vel.0);
            (other.is_alive() && attitude(observer.team, other.team) == Attitude::Hostile).then_some((at, velocity))
        })
        .min_by(|(a, _), (b, _)| a.distance_squared(position).total_cmp(&b.distance_squared(position)))
}

// Where to point the weapon: lead projectiles, aim hit-scans straight on.
fn aim_point(kind: WeaponKind, tuning: &Tuning, eye: Vec3, target: Vec3, target_velocity: Vec3) -> Vec3 {
    let speed = match kind {
        WeaponKind::RocketLauncher => tuning.rocket.speed,
        WeaponKind::GrenadeLauncher => tuning.recycler_grenade.projectile.speed,
        WeaponKind::LightningGun | WeaponKind::Railgun => return target,
    };
    predict_intercept(eye, target, target_velocity, speed).map_or(target, |(location, _)| location)
}

#[must_use]
pub fn is_on_target(eye: Vec3, forward: Vec3, aim: Vec3) -> bool {
    let wanted = (aim - eye).normalize_or_zero();
    wanted != Vec3::ZERO && forward.angle_between(wanted) <= AIM_TOLERANCE_DEG.to_radians()
}

// ============================================================================
// Bot Brain System
// ============================================================================

// Fight the nearest visible enemy, or wander when nobody is in sight.
pub fn bot_brain_system(world: &mut World) {
    let tuning = world.get_resource::<Tuning>().cloned().unwrap_or_default();

    let outlooks: Vec<Outlook> = {
        let mut query = world.query_filtered::<(Entity, &Position, &Orientation, &Combatant, &SightSense, &Loadout), Without<Respawning>>();
        let world: &World = world;
        query
            .iter(world)
            .filter(|(_, _, _, combatant, _, _)| combatant.is_alive())
            .map(|(entity, pos, orientation, combatant, sense, loadout)| {
                let (eye, forward) = view_point(pos, orientation);
                Outlook {
                    entity,
                    position: pos.0,
                    eye,
                    forward,
                    weapon: loadout.weapon,
                    target: pick_target(world, combatant, pos.0, sense),
                }
            })
            .collect()
    };

    for outlook in outlooks {
        match outlook.target {
            Some((target, target_velocity)) => engage(world, &tuning, &outlook, target, target_velocity),
            None => wander(world, &outlook),
        }
    }
}

fn engage(world: &mut World, tuning: &Tuning, outlook: &Outlook, target: Vec3, target_velocity: Vec3) {
    let Some(kind) = world.get::<Weapon>(outlook.weapon).map(|weapon| weapon.kind) else {
        return;
    };
    let aim = aim_point(kind, tuning, outlook.eye, target, target_velocity);

    if let Some(mut focus) = world.get_mut::<Focus>(outlook.entity) {
        focus.0 = Some(aim);
    }
    if let Some(mut velocity) = world.get_mut::<Velocity>(outlook.entity) {
        velocity.0.x = 0.0;
        velocity.0.y = 0.0;
    }

    if is_on_target(outlook.eye, outlook.forward, aim) {
        if on_fire(world, outlook.weapon) {
            trace!("{:?} fires {kind:?} at {aim}", outlook.entity);
        }
    } else {
        on_fire_release(world, outlook.weapon);
    }
}

fn wander(world: &mut World, outlook: &Outlook) {
    on_fire_release(world, outlook.weapon);

    let current = world.get::<Wander>(outlook.entity).and_then(|wander| wander.goal);
    let goal = match current {
        Some(goal) if goal.truncate().distance(outlook.position.truncate()) > WANDER_ARRIVAL_RADIUS => goal,
        _ => {
            let Some(mut rng) = world.get_resource_mut::<GameRng>() else {
                return;
            };
            sample_point_in_disk(&mut rng.0, Vec3::Z * CAPSULE_HALF_HEIGHT, ARENA_RADIUS)
        }
    };

    let heading = (goal - outlook.position).with_z(0.0).normalize_or_zero();
    if let Some(mut wander) = world.get_mut::<Wander>(outlook.entity) {
        wander.goal = Some(goal);
    }
    if let Some(mut focus) = world.get_mut::<Focus>(outlook.entity) {
        focus.0 = Some(goal + Vec3::Z * EYE_HEIGHT);
    }
    if let Some(mut velocity) = world.get_mut::<Velocity>(outlook.entity) {
        velocity.0.x = heading.x * WALK_SPEED;
        velocity.0.y = heading.y * WALK_SPEED;
    }
}
