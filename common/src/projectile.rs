use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use tracing::debug;

use crate::{
    collision::overlap_sphere,
    combat::{Combatant, DamageEvent, apply_damage},
    components::{GroundResponse, Hidden, Kinematic, Lifespan, Position, Velocity},
    config::{GrenadeTuning, ProjectileTuning, Tuning},
    events::{GameEvent, SoundCue, emit},
    handle::WeakRef,
    pickup::spawn_recycled_remains,
    scheduler::TimerHandle,
    splash::{BlastMode, Detonation, SplashPolicy, detonate},
    timers::{GameTimers, TimerAction},
};

// ============================================================================
// Projectile Component
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectileKind {
    Rocket,
    RecyclerGrenade,
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub owner: Option<WeakRef<Combatant>>,
    pub base_damage: f32,
    pub damage_multiplier: f32,
    pub blast_radius: f32,
    pub blast_speed_change: f32,
    pub policy: SplashPolicy,
    pub sphere_radius: f32,
}

impl Projectile {
    #[must_use]
    pub fn new(kind: ProjectileKind, owner: Option<Entity>, tuning: &ProjectileTuning, damage_multiplier: f32) -> Self {
        Self {
            kind,
            owner: owner.map(WeakRef::new),
            base_damage: tuning.damage,
            damage_multiplier,
            blast_radius: tuning.blast_radius,
            blast_speed_change: tuning.blast_speed_change,
            policy: tuning.splash,
            sphere_radius: tuning.sphere_radius,
        }
    }

    #[must_use]
    pub fn adjusted_damage(&self) -> f32 {
        self.base_damage * self.damage_multiplier
    }

    // Owner entity while it's still a live reference.
    #[must_use]
    pub fn owner(&self, world: &World) -> Option<Entity> {
        self.owner.and_then(|owner| owner.upgrade(world))
    }

    #[must_use]
    pub fn detonation(&self, epicenter: Vec3, owner: Option<Entity>) -> Detonation {
        Detonation {
            epicenter,
            radius: self.blast_radius,
            damage: self.adjusted_damage(),
            speed_change: self.blast_speed_change,
            mode: BlastMode::Explode,
            owner,
            policy: self.policy,
            inflicts_damage: true,
        }
    }
}

// ============================================================================
// Recycler Grenade State
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecyclerPhase {
    // Bouncing around, waiting to implode
    #[default]
    Idle,
    // Pulling everything nearby toward itself
    Attracting,
    // Annihilated; hidden until it despawns
    Spent,
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Recycler {
    pub phase: RecyclerPhase,
    pub attract_timer: Option<TimerHandle>,
    pub attract_interval: f32,
    pub attract_duration: f32,
    pub recover_duration: f32,
}

impl Recycler {
    #[must_use]
    pub const fn new(tuning: &GrenadeTuning) -> Self {
        Self {
            phase: RecyclerPhase::Idle,
            attract_timer: None,
            attract_interval: tuning.attract_interval,
            attract_duration: tuning.attract_duration,
            recover_duration: tuning.recover_duration,
        }
    }
}

// ============================================================================
// Spawning
// ============================================================================

// Launch a projectile from `location` along `direction`.
pub fn spawn_projectile(
    world: &mut World,
    kind: ProjectileKind,
    owner: Option<Entity>,
    location: Vec3,
    direction: Vec3,
    damage_multiplier: f32,
) -> Entity {
    let tuning = world.get_resource::<Tuning>().cloned().unwrap_or_default();
    let direction = direction.normalize_or(Vec3::X);

    match kind {
        ProjectileKind::Rocket => {
            let t = &tuning.rocket;
            let entity = world
                .spawn((
                    Projectile::new(kind, owner, t, damage_multiplier),
                    Position(location),
                    Velocity(direction * t.speed),
                    Kinematic::straight(),
                    Lifespan::from_seconds(t.lifespan),
                ))
                .id();
            debug!("rocket {entity:?} launched by {owner:?}");
            entity
        }
        ProjectileKind::RecyclerGrenade => {
            let t = &tuning.recycler_grenade;
            let entity = world
                .spawn((
                    Projectile::new(kind, owner, &t.projectile, damage_multiplier),
                    Recycler::new(t),
                    Position(location),
                    Velocity(direction * t.projectile.speed),
                    Kinematic {
                        gravity: t.gravity,
                        rest_height: t.projectile.sphere_radius,
                        ground: GroundResponse::Bounce { restitution: 1.0 },
                    },
                ))
                .id();
            if let Some(mut timers) = world.get_resource_mut::<GameTimers>() {
                timers.schedule_once(TimerAction::GrenadeImplode { grenade: entity }, t.idle_duration);
            }
            debug!("recycler grenade {entity:?} launched by {owner:?}");
            entity
        }
    }
}

// Remove a projectile and report where it went off.
fn explode(world: &mut World, entity: Entity, kind: ProjectileKind, location: Vec3) {
    emit(
        world,
        GameEvent::Sound {
            cue: SoundCue::Explode,
            location,
        },
    );
    emit(
        world,
        GameEvent::Explosion {
            projectile: entity,
            kind,
            location,
        },
    );
    world.despawn(entity);
}

// ============================================================================
// Rocket Contact
// ============================================================================

// First combatant touched by a projectile sphere, other than its owner.
fn contact_victim(world: &mut World, location: Vec3, radius: f32, owner: Option<Entity>) -> Option<Entity> {
    overlap_sphere(world, location, radius)
        .into_iter()
        .map(|hit| hit.entity)
        .find(|entity| Some(*entity) != owner && world.get::<Combatant>(*entity).is_some())
}

// Rockets detonate on the first combatant they touch (never their owner) or
// on the ground. The touched combatant takes a direct hit and is then spared
// splash damage, though the blast still pushes it.
pub fn projectile_contact_system(world: &mut World) {
    let rockets: Vec<(Entity, Projectile, Vec3)> = world
        .query::<(Entity, &Projectile, &Position)>()
        .iter(world)
        .filter(|(_, projectile, _)| projectile.kind == ProjectileKind::Rocket)
        .map(|(entity, projectile, pos)| (entity, projectile.clone(), pos.0))
        .collect();

    for (entity, projectile, location) in rockets {
        let owner = projectile.owner(world);
        let victim = contact_victim(world, location, projectile.sphere_radius, owner);
        let grounded = location.z <= projectile.sphere_radius;
        if victim.is_none() && !grounded {
            continue;
        }

        if let Some(victim) = victim {
            let victim_location = world.get::<Position>(victim).map_or(location, |pos| pos.0);
            let dealt = apply_damage(
                world,
                victim,
                projectile.adjusted_damage(),
                &DamageEvent::Point,
                owner,
            )
            .unwrap_or(0.0);
            if dealt > 0.0
                && let Some(owner) = owner
            {
                emit(
                    world,
                    GameEvent::Sound {
                        cue: SoundCue::Hit,
                        location: victim_location,
                    },
                );
                emit(
                    world,
                    GameEvent::DamageShown {
                        instigator: owner,
                        victim,
                        amount: dealt,
                        location: victim_location,
                    },
                );
            }
        }

        detonate(world, &projectile.detonation(location, owner), victim);
        explode(world, entity, projectile.kind, location);
    }
}

// ============================================================================
// Recycler Grenade Lifecycle
// ============================================================================

// Idle -> Attracting: start the pull pulses and the annihilation countdown.
pub fn implode(world: &mut World, grenade: Entity) {
    let Some(recycler) = world.get::<Recycler>(grenade).cloned() else {
        return;
    };
    if recycler.phase != RecyclerPhase::Idle {
        return;
    }

    let attract_timer = {
        let mut timers = world.resource_mut::<GameTimers>();
        let handle = timers.schedule(
            TimerAction::GrenadeAttract { grenade },
            recycler.attract_interval,
            true,
            Some(0.0),
        );
        timers.schedule_once(TimerAction::GrenadeAnnihilate { grenade }, recycler.attract_duration);
        handle
    };
    if let Some(mut state) = world.get_mut::<Recycler>(grenade) {
        state.phase = RecyclerPhase::Attracting;
        state.attract_timer = Some(attract_timer);
    }
    debug!("recycler grenade {grenade:?} imploding");
}

// One pull pulse: push-only blast toward the grenade.
pub fn attract(world: &mut World, grenade: Entity, handle: TimerHandle) {
    let attracting = world
        .get::<Recycler>(grenade)
        .is_some_and(|recycler| recycler.phase == RecyclerPhase::Attracting);
    let Some((projectile, location)) = world
        .get::<Projectile>(grenade)
        .cloned()
        .zip(world.get::<Position>(grenade).map(|pos| pos.0))
        .filter(|_| attracting)
    else {
        world.resource_mut::<GameTimers>().cancel(handle);
        return;
    };

    let owner = projectile.owner(world);
    detonate(world, &projectile.detonation(location, owner).attraction(), None);
}

// Attracting -> Spent: full splash with no direct hit, then recycle whoever
// it killed into health and armor. The grenade hides and despawns later.
pub fn annihilate(world: &mut World, grenade: Entity) {
    let Some(recycler) = world.get::<Recycler>(grenade).cloned() else {
        return;
    };
    if recycler.phase == RecyclerPhase::Spent {
        return;
    }
    let Some(projectile) = world.get::<Projectile>(grenade).cloned() else {
        return;
    };
    let Some(location) = world.get::<Position>(grenade).map(|pos| pos.0) else {
        return;
    };

    if let Some(handle) = recycler.attract_timer {
        world.resource_mut::<GameTimers>().cancel(handle);
    }
    emit(
        world,
        GameEvent::Sound {
            cue: SoundCue::Annihilate,
            location,
        },
    );
    world.entity_mut(grenade).insert((
        Hidden,
        Lifespan::from_seconds(recycler.recover_duration),
        Velocity(Vec3::ZERO),
        Kinematic::straight(),
        Recycler {
            phase: RecyclerPhase::Spent,
            attract_timer: None,
            ..recycler
        },
    ));

    let owner = projectile.owner(world);
    let report = detonate(world, &projectile.detonation(location, owner), None);
    emit(
        world,
        GameEvent::Explosion {
            projectile: grenade,
            kind: projectile.kind,
            location,
        },
    );

    let recycled: Vec<Entity> = report
        .victims
        .iter()
        .copied()
        .filter(|victim| world.get::<Combatant>(*victim).is_some_and(|c| !c.is_alive()))
        .collect();
    for victim in recycled {
        debug!("{victim:?} recycled by {grenade:?}");
        spawn_recycled_remains(world, location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        combat::TeamId,
        components::Body,
        constants::*,
        events::EventQueue,
        pickup::{Pickup, PickupKind},
        resources::GameRng,
    };

    fn setup() -> World {
        let mut world = World::new();
        world.init_resource::<EventQueue>();
        world.init_resource::<GameTimers>();
        world.init_resource::<Tuning>();
        world.insert_resource(GameRng::seeded(3));
        world
    }

    fn spawn_combatant(world: &mut World, at: Vec3, team: u8) -> Entity {
        world
            .spawn((Combatant::new(TeamId(team)), Position(at), Velocity::default(), Body::default()))
            .id()
    }

    fn health(world: &World, entity: Entity) -> f32 {
        world.get::<Combatant>(entity).unwrap().health
    }

    #[test]
    fn rocket_direct_hit_is_not_splashed_twice() {
        let mut world = setup();
        let owner = spawn_combatant(&mut world, Vec3::new(-1500.0, 0.0, 96.0), 0);
        let victim = spawn_combatant(&mut world, Vec3::new(0.0, 0.0, 96.0), 1);
        world.get_mut::<Combatant>(victim).unwrap().max_health = 500.0;
        world.get_mut::<Combatant>(victim).unwrap().health = 500.0;

        let rocket = spawn_projectile(&mut world, ProjectileKind::Rocket, Some(owner), Vec3::new(-60.0, 0.0, 96.0), Vec3::X, 1.0);
        projectile_contact_system(&mut world);

        assert!(world.get_entity(rocket).is_err());
        assert!((health(&world, victim) - (500.0 - ROCKET_DAMAGE)).abs() < 1e-3);
        // Blast pushed the victim away from the epicenter.
        assert!(world.get::<Velocity>(victim).unwrap().0.x > 0.0);
        let explosions = world
            .resource_mut::<EventQueue>()
            .drain()
            .into_iter()
            .filter(|event| matches!(event, GameEvent::Explosion { .. }))
            .count();
        assert_eq!(explosions, 1);
    }

    #[test]
    fn rocket_ignores_its_owner() {
        let mut world = setup();
        let owner = spawn_combatant(&mut world, Vec3::new(0.0, 0.0, 96.0), 0);

        let rocket = spawn_projectile(&mut world, ProjectileKind::Rocket, Some(owner), Vec3::new(30.0, 0.0, 96.0), Vec3::X, 1.0);
        projectile_contact_system(&mut world);

        assert!(world.get_entity(rocket).is_ok());
        assert!((health(&world, owner) - COMBATANT_MAX_HEALTH).abs() < f32::EPSILON);
    }

    #[test]
    fn rocket_jump_off_the_floor() {
        let mut world = setup();
        let owner = spawn_combatant(&mut world, Vec3::new(0.0, 0.0, 96.0), 0);

        spawn_projectile(&mut world, ProjectileKind::Rocket, Some(owner), Vec3::new(100.0, 0.0, 10.0), Vec3::NEG_Z, 1.0);
        projectile_contact_system(&mut world);

        assert!((health(&world, owner) - (COMBATANT_MAX_HEALTH - ROCKET_DAMAGE * ROCKET_SELF_DAMAGE_SCALE)).abs() < 1e-3);
        assert!(world.get::<Velocity>(owner).unwrap().0.z > 0.0);
    }

    #[test]
    fn quad_rocket_scales_damage() {
        let mut world = setup();
        let owner = spawn_combatant(&mut world, Vec3::new(-1500.0, 0.0, 96.0), 0);
        let victim = spawn_combatant(&mut world, Vec3::new(0.0, 0.0, 96.0), 1);
        world.get_mut::<Combatant>(victim).unwrap().health = 1000.0;

        spawn_projectile(&mut world, ProjectileKind::Rocket, Some(owner), Vec3::new(-60.0, 0.0, 96.0), Vec3::X, 4.0);
        projectile_contact_system(&mut world);

        assert!((health(&world, victim) - (1000.0 - ROCKET_DAMAGE * 4.0)).abs() < 1e-3);
    }

    #[test]
    fn grenade_does_not_detonate_on_contact() {
        let mut world = setup();
        let victim = spawn_combatant(&mut world, Vec3::new(0.0, 0.0, 96.0), 1);

        let grenade = spawn_projectile(&mut world, ProjectileKind::RecyclerGrenade, None, Vec3::new(0.0, 0.0, 96.0), Vec3::X, 1.0);
        projectile_contact_system(&mut world);

        assert!(world.get_entity(grenade).is_ok());
        assert!((health(&world, victim) - COMBATANT_MAX_HEALTH).abs() < f32::EPSILON);
    }

    #[test]
    fn grenade_implodes_attracts_and_annihilates() {
        let mut world = setup();
        let owner = spawn_combatant(&mut world, Vec3::new(-3000.0, 0.0, 96.0), 0);
        let victim = spawn_combatant(&mut world, Vec3::new(200.0, 0.0, 96.0), 1);
        let grenade = spawn_projectile(&mut world, ProjectileKind::RecyclerGrenade, Some(owner), Vec3::new(0.0, 0.0, 96.0), Vec3::X, 1.0);
        world.entity_mut(grenade).insert(Velocity(Vec3::ZERO));

        implode(&mut world, grenade);
        assert_eq!(world.get::<Recycler>(grenade).unwrap().phase, RecyclerPhase::Attracting);
        let handle = world.get::<Recycler>(grenade).unwrap().attract_timer.unwrap();

        attract(&mut world, grenade, handle);
        assert!(world.get::<Velocity>(victim).unwrap().0.x < 0.0);
        assert!((health(&world, victim) - COMBATANT_MAX_HEALTH).abs() < f32::EPSILON);

        annihilate(&mut world, grenade);
        let recycler = world.get::<Recycler>(grenade).unwrap();
        assert_eq!(recycler.phase, RecyclerPhase::Spent);
        assert!(!world.resource::<GameTimers>().is_active(handle));
        assert!(world.get::<Hidden>(grenade).is_some());
        assert!(world.get::<Lifespan>(grenade).is_some());
        // 200 damage kills an unarmored victim outright.
        assert!(!world.get::<Combatant>(victim).unwrap().is_alive());

        let remains = world.query::<&Pickup>().iter(&world).count();
        assert_eq!(remains, 2 * RECYCLED_PICKUPS_PER_KIND);
        let armor = world
            .query::<&Pickup>()
            .iter(&world)
            .filter(|pickup| matches!(pickup.kind, PickupKind::Armor(_)))
            .count();
        assert_eq!(armor, RECYCLED_PICKUPS_PER_KIND);
    }

    #[test]
    fn survivors_are_not_recycled() {
        let mut world = setup();
        let victim = spawn_combatant(&mut world, Vec3::new(200.0, 0.0, 96.0), 1);
        world.get_mut::<Combatant>(victim).unwrap().health = 1000.0;
        let grenade = spawn_projectile(&mut world, ProjectileKind::RecyclerGrenade, None, Vec3::new(0.0, 0.0, 96.0), Vec3::X, 1.0);

        implode(&mut world, grenade);
        annihilate(&mut world, grenade);
        // A second annihilation is ignored.
        annihilate(&mut world, grenade);

        assert!((health(&world, victim) - (1000.0 - GRENADE_DAMAGE)).abs() < 1e-3);
        assert_eq!(world.query::<&Pickup>().iter(&world).count(), 0);
    }

    #[test]
    fn stale_attract_timer_cancels_itself() {
        let mut world = setup();
        let grenade = spawn_projectile(&mut world, ProjectileKind::RecyclerGrenade, None, Vec3::new(0.0, 0.0, 96.0), Vec3::X, 1.0);
        implode(&mut world, grenade);
        let handle = world.get::<Recycler>(grenade).unwrap().attract_timer.unwrap();
        world.despawn(grenade);

        attract(&mut world, grenade, handle);
        assert!(!world.resource::<GameTimers>().is_active(handle));
    }
}
