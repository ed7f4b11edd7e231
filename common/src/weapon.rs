use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use tracing::debug;

use crate::{
    collision::trace_ray,
    combat::{Combatant, DamageEvent, apply_damage},
    components::{Lifespan, Orientation, Position, Velocity, view_point},
    config::Tuning,
    constants::*,
    events::{GameEvent, SoundCue, emit},
    handle::WeakRef,
    markers::RailBeamMarker,
    projectile::{ProjectileKind, spawn_projectile},
    scheduler::{Scheduler, TimerHandle},
    timers::{GameTimers, TimerAction},
};

// ============================================================================
// Hold-To-Fire State
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FireState {
    #[default]
    Idle,
    Firing,
}

// Trigger state of a continuous weapon: exactly one periodic timer exists
// while firing, none while idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldFire {
    state: FireState,
    timer: Option<TimerHandle>,
}

impl HoldFire {
    #[must_use]
    pub const fn state(&self) -> FireState {
        self.state
    }

    #[must_use]
    pub const fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.state == FireState::Firing
    }

    // Idle -> Firing. The first tick fires immediately, then every `interval`.
    // Returns false (and schedules nothing) when already firing.
    pub fn press<A: Clone + Send + Sync + 'static>(
        &mut self,
        scheduler: &mut Scheduler<A>,
        action: A,
        interval: f32,
    ) -> bool {
        if self.is_firing() {
            return false;
        }
        self.state = FireState::Firing;
        self.timer = Some(scheduler.schedule(action, interval, true, Some(0.0)));
        true
    }

    // Firing -> Idle, cancelling the periodic timer.
    pub fn release<A: Clone + Send + Sync + 'static>(&mut self, scheduler: &mut Scheduler<A>) -> bool {
        if !self.is_firing() {
            return false;
        }
        self.state = FireState::Idle;
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
        true
    }
}

// ============================================================================
// Weapon Component
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    LightningGun,
    RocketLauncher,
    GrenadeLauncher,
    Railgun,
}

impl WeaponKind {
    pub const ALL: [Self; 4] = [Self::LightningGun, Self::RocketLauncher, Self::GrenadeLauncher, Self::Railgun];

    #[must_use]
    pub const fn is_continuous(self) -> bool {
        matches!(self, Self::LightningGun)
    }
}

// A weapon is its own entity; the holder is referenced, not owned.
#[derive(Component, Debug, Clone)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub holder: WeakRef<Combatant>,
    pub hold: HoldFire,
    pub fire_enabled: bool,
    pub base_damage: f32,
    damage_multiplier: f32,
    pub range: f32,
    pub rate_of_fire: f32,
    pub knockback: f32,
    pub cooldown: f32,
}

impl Weapon {
    #[must_use]
    pub fn new(kind: WeaponKind, holder: Entity, tuning: &Tuning) -> Self {
        let (base_damage, range, rate_of_fire, knockback, cooldown) = match kind {
            WeaponKind::LightningGun => {
                let t = &tuning.lightning_gun;
                (t.damage, t.range, t.rate_of_fire, t.knockback, 0.0)
            }
            WeaponKind::RocketLauncher => {
                let t = &tuning.rocket;
                (t.damage, 0.0, 0.0, 0.0, t.launcher_cooldown)
            }
            WeaponKind::GrenadeLauncher => {
                let t = &tuning.recycler_grenade.projectile;
                (t.damage, 0.0, 0.0, 0.0, t.launcher_cooldown)
            }
            WeaponKind::Railgun => {
                let t = &tuning.railgun;
                (t.damage, t.range, 0.0, 0.0, t.cooldown)
            }
        };

        Self {
            kind,
            holder: WeakRef::new(holder),
            hold: HoldFire::default(),
            fire_enabled: true,
            base_damage,
            damage_multiplier: 1.0,
            range,
            rate_of_fire,
            knockback,
            cooldown,
        }
    }

    #[must_use]
    pub const fn damage_multiplier(&self) -> f32 {
        self.damage_multiplier
    }

    #[must_use]
    pub fn adjusted_damage(&self) -> f32 {
        self.base_damage * self.damage_multiplier
    }

    pub const fn set_damage_multiplier(&mut self, value: f32) {
        self.damage_multiplier = value;
    }
}

// Beam endpoints for presentation (lightning while held, rail shots).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Beam {
    pub active: bool,
    pub source: Vec3,
    pub target: Vec3,
}

pub fn spawn_weapon(world: &mut World, kind: WeaponKind, holder: Entity) -> Entity {
    let tuning = world.get_resource::<Tuning>().cloned().unwrap_or_default();
    let mut entity = world.spawn(Weapon::new(kind, holder, &tuning));
    if kind.is_continuous() {
        entity.insert(Beam::default());
    }
    entity.id()
}

// ============================================================================
// Helpers
// ============================================================================

// Eye location and aim of the weapon's holder, while the holder exists.
fn holder_view(world: &World, weapon: &Weapon) -> Option<(Entity, Vec3, Vec3)> {
    let holder = weapon.holder.upgrade(world)?;
    let pos = world.get::<Position>(holder)?;
    let orientation = world.get::<Orientation>(holder)?;
    let (eye, forward) = view_point(pos, orientation);
    Some((holder, eye, forward))
}

#[must_use]
pub fn muzzle_location(eye: Vec3, forward: Vec3) -> Vec3 {
    eye + forward * MUZZLE_OFFSET
}

fn weapon_sound(world: &mut World, weapon: &Weapon, cue: SoundCue) {
    if let Some(holder) = weapon.holder.upgrade(world)
        && let Some(pos) = world.get::<Position>(holder).map(|pos| pos.0)
    {
        emit(world, GameEvent::Sound { cue, location: pos });
    }
}

// Point damage to a traced victim, skipping the shooter. Returns the damage
// dealt when something was hit.
fn hit_scan_damage(world: &mut World, weapon: &Weapon, range: f32, knockback: f32) -> Option<(f32, Vec3)> {
    let (holder, eye, forward) = holder_view(world, weapon)?;
    let hit = trace_ray(world, eye, forward, range, Some(holder))?;
    world.get::<Combatant>(hit.entity)?;

    let dealt = apply_damage(
        world,
        hit.entity,
        weapon.adjusted_damage(),
        &DamageEvent::Point,
        Some(holder),
    )?;
    if knockback > 0.0
        && let Some(mut velocity) = world.get_mut::<Velocity>(hit.entity)
    {
        velocity.0 += -hit.impact_normal * knockback;
    }

    if dealt > 0.0 {
        emit(
            world,
            GameEvent::Sound {
                cue: SoundCue::Hit,
                location: hit.impact_point,
            },
        );
        emit(
            world,
            GameEvent::DamageShown {
                instigator: holder,
                victim: hit.entity,
                amount: dealt,
                location: hit.impact_point,
            },
        );
    }
    Some((dealt, hit.impact_point))
}

// ============================================================================
// Trigger Operations
// ============================================================================

// Pull the trigger. Continuous weapons start their hit-scan timer; single-shot
// weapons fire once and start their cooldown. Returns whether anything fired.
pub fn on_fire(world: &mut World, weapon_entity: Entity) -> bool {
    let Some(weapon) = world.get::<Weapon>(weapon_entity).cloned() else {
        return false;
    };
    if !weapon.holder.get(world).is_some_and(Combatant::is_alive) {
        return false;
    }

    if weapon.kind.is_continuous() {
        let mut hold = weapon.hold;
        let pressed = {
            let mut timers = world.resource_mut::<GameTimers>();
            hold.press(
                &mut *timers,
                TimerAction::LightningHitScan { weapon: weapon_entity },
                weapon.rate_of_fire,
            )
        };
        if pressed {
            if let Some(mut stored) = world.get_mut::<Weapon>(weapon_entity) {
                stored.hold = hold;
            }
            if let Some(mut beam) = world.get_mut::<Beam>(weapon_entity) {
                beam.active = true;
            }
            weapon_sound(world, &weapon, SoundCue::Fire);
        }
        return pressed;
    }

    if !weapon.fire_enabled {
        return false;
    }
    let fired = match weapon.kind {
        WeaponKind::RocketLauncher => launch(world, &weapon, ProjectileKind::Rocket),
        WeaponKind::GrenadeLauncher => launch(world, &weapon, ProjectileKind::RecyclerGrenade),
        WeaponKind::Railgun => rail_shot(world, weapon_entity),
        WeaponKind::LightningGun => false,
    };
    if fired {
        if let Some(mut stored) = world.get_mut::<Weapon>(weapon_entity) {
            stored.fire_enabled = false;
        }
        world
            .resource_mut::<GameTimers>()
            .schedule_once(TimerAction::EnableFire { weapon: weapon_entity }, weapon.cooldown);
        weapon_sound(world, &weapon, SoundCue::Fire);
    }
    fired
}

// Let go of the trigger. Only continuous weapons react.
pub fn on_fire_release(world: &mut World, weapon_entity: Entity) -> bool {
    let Some(weapon) = world.get::<Weapon>(weapon_entity).cloned() else {
        return false;
    };
    let mut hold = weapon.hold;
    let released = {
        let mut timers = world.resource_mut::<GameTimers>();
        hold.release(&mut *timers)
    };
    if !released {
        return false;
    }
    if let Some(mut stored) = world.get_mut::<Weapon>(weapon_entity) {
        stored.hold = hold;
    }
    if let Some(mut beam) = world.get_mut::<Beam>(weapon_entity) {
        beam.active = false;
    }
    weapon_sound(world, &weapon, SoundCue::StopFire);
    true
}

// Weapon switch: stop firing if the trigger is held.
pub fn stop_fire(world: &mut World, weapon_entity: Entity) {
    if world
        .get::<Weapon>(weapon_entity)
        .is_some_and(|weapon| weapon.hold.is_firing())
    {
        on_fire_release(world, weapon_entity);
    }
}

pub fn enable_fire(world: &mut World, weapon_entity: Entity) {
    if let Some(mut weapon) = world.get_mut::<Weapon>(weapon_entity) {
        weapon.fire_enabled = true;
    }
}

// ============================================================================
// Shots
// ============================================================================

// One lightning tick: trace from the holder's point of view and damage the
// first combatant hit, pushing it away from the shooter. The tick timer dies
// with the weapon.
pub fn lightning_hit_scan(world: &mut World, weapon_entity: Entity, handle: TimerHandle) {
    let Some(weapon) = world.get::<Weapon>(weapon_entity).cloned() else {
        world.resource_mut::<GameTimers>().cancel(handle);
        return;
    };
    if hit_scan_damage(world, &weapon, weapon.range, weapon.knockback).is_none() {
        debug!("lightning {weapon_entity:?}: no hit");
    }
}

// Instant railgun shot. Spawns a short-lived beam from the muzzle to the
// impact point (or to max range on a miss).
pub fn rail_shot(world: &mut World, weapon_entity: Entity) -> bool {
    let Some(weapon) = world.get::<Weapon>(weapon_entity).cloned() else {
        return false;
    };
    let Some((_, eye, forward)) = holder_view(world, &weapon) else {
        return false;
    };

    let target = hit_scan_damage(world, &weapon, weapon.range, 0.0)
        .map_or_else(|| eye + forward * weapon.range, |(_, impact)| impact);
    let lifespan = world
        .get_resource::<Tuning>()
        .map_or(RAIL_BEAM_LIFESPAN, |tuning| tuning.railgun.beam_lifespan);
    world.spawn((
        RailBeamMarker,
        Beam {
            active: true,
            source: muzzle_location(eye, forward),
            target,
        },
        Lifespan::from_seconds(lifespan),
    ));
    true
}

fn launch(world: &mut World, weapon: &Weapon, kind: ProjectileKind) -> bool {
    let Some((holder, eye, forward)) = holder_view(world, weapon) else {
        return false;
    };
    let location = eye + forward * PROJECTILE_SPAWN_OFFSET;
    spawn_projectile(world, kind, Some(holder), location, forward, weapon.damage_multiplier());
    true
}

// ============================================================================
// Systems
// ============================================================================

// Per-frame beam endpoints for held continuous weapons: muzzle to impact, or
// to max range. Independent of the hit-scan timer.
pub fn beam_update_system(world: &mut World) {
    let beams: Vec<(Entity, Weapon)> = world
        .query::<(Entity, &Weapon, &Beam)>()
        .iter(world)
        .filter(|(_, weapon, _)| weapon.hold.is_firing())
        .map(|(entity, weapon, _)| (entity, weapon.clone()))
        .collect();

    for (entity, weapon) in beams {
        let Some((holder, eye, forward)) = holder_view(world, &weapon) else {
            continue;
        };
        let target = trace_ray(world, eye, forward, weapon.range, Some(holder))
            .map_or_else(|| muzzle_location(eye, forward) + forward * weapon.range, |hit| hit.impact_point);
        if let Some(mut beam) = world.get_mut::<Beam>(entity) {
            beam.source = muzzle_location(eye, forward);
            beam.target = target;
        }
    }
}

// Set the damage multiplier on every weapon held by `holder`.
pub fn set_holder_damage_multiplier(world: &mut World, holder: Entity, value: f32) {
    let mut query = world.query::<&mut Weapon>();
    for mut weapon in query.iter_mut(world) {
        if weapon.holder.entity() == holder {
            weapon.set_damage_multiplier(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy_math::Quat;
    use bevy_time::Time;

    use super::*;
    use crate::{
        combat::TeamId, components::Body, events::EventQueue, projectile::Projectile, timers::timer_dispatch_system,
    };

    fn setup() -> World {
        let mut world = World::new();
        world.init_resource::<EventQueue>();
        world.init_resource::<GameTimers>();
        world.init_resource::<Tuning>();
        world
    }

    fn spawn_shooter(world: &mut World, at: Vec3) -> Entity {
        world
            .spawn((
                Combatant::new(TeamId(0)),
                Position(at),
                Velocity::default(),
                Orientation(Quat::IDENTITY),
                Body::default(),
            ))
            .id()
    }

    fn spawn_target(world: &mut World, at: Vec3) -> Entity {
        world
            .spawn((Combatant::new(TeamId(1)), Position(at), Velocity::default(), Body::default()))
            .id()
    }

    fn run_timers(world: &mut World, seconds: f32) {
        let mut time = Time::<()>::default();
        time.advance_by(Duration::from_secs_f32(seconds));
        world.insert_resource(time);
        timer_dispatch_system(world);
    }

    #[test]
    fn pressing_twice_keeps_one_timer() {
        let mut scheduler = Scheduler::<u8>::new();
        let mut hold = HoldFire::default();

        assert!(hold.press(&mut scheduler, 1, 0.05));
        assert!(!hold.press(&mut scheduler, 1, 0.05));
        assert_eq!(scheduler.len(), 1);
        assert!(hold.is_firing());
    }

    #[test]
    fn release_cancels_and_is_idempotent() {
        let mut scheduler = Scheduler::<u8>::new();
        let mut hold = HoldFire::default();
        hold.press(&mut scheduler, 1, 0.05);

        assert!(hold.release(&mut scheduler));
        assert!(!hold.release(&mut scheduler));
        assert!(scheduler.is_empty());
        assert_eq!(hold.state(), FireState::Idle);
    }

    #[test]
    fn first_tick_fires_immediately() {
        let mut scheduler = Scheduler::<u8>::new();
        let mut hold = HoldFire::default();
        hold.press(&mut scheduler, 7, 0.05);
        assert_eq!(scheduler.advance(0.0).len(), 1);
    }

    #[test]
    fn multiplier_scales_adjusted_damage() {
        let mut weapon = Weapon::new(WeaponKind::LightningGun, Entity::PLACEHOLDER, &Tuning::default());
        assert!((weapon.adjusted_damage() - LIGHTNING_DAMAGE).abs() < f32::EPSILON);
        weapon.set_damage_multiplier(QUAD_DAMAGE_MULTIPLIER);
        assert!((weapon.adjusted_damage() - LIGHTNING_DAMAGE * 4.0).abs() < 1e-4);
    }

    #[test]
    fn lightning_damages_and_knocks_back_target() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let target = spawn_target(&mut world, Vec3::new(500.0, 0.0, 0.0));
        let gun = spawn_weapon(&mut world, WeaponKind::LightningGun, shooter);

        assert!(on_fire(&mut world, gun));
        assert!(!on_fire(&mut world, gun));
        // Ticks at 0, 0.05 and 0.1
        run_timers(&mut world, 0.12);

        let health = world.get::<Combatant>(target).unwrap().health;
        assert!((health - (COMBATANT_MAX_HEALTH - 3.0 * LIGHTNING_DAMAGE)).abs() < 1e-3);
        assert!(world.get::<Velocity>(target).unwrap().0.x > 0.0);

        assert!(on_fire_release(&mut world, gun));
        run_timers(&mut world, 1.0);
        let after = world.get::<Combatant>(target).unwrap().health;
        assert!((after - health).abs() < f32::EPSILON);
    }

    #[test]
    fn lightning_out_of_range_misses() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let target = spawn_target(&mut world, Vec3::new(LIGHTNING_RANGE + 500.0, 0.0, 0.0));
        let gun = spawn_weapon(&mut world, WeaponKind::LightningGun, shooter);

        on_fire(&mut world, gun);
        run_timers(&mut world, 0.2);
        let health = world.get::<Combatant>(target).unwrap().health;
        assert!((health - COMBATANT_MAX_HEALTH).abs() < f32::EPSILON);
    }

    #[test]
    fn beam_tracks_impact_and_max_range() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let gun = spawn_weapon(&mut world, WeaponKind::LightningGun, shooter);
        on_fire(&mut world, gun);

        beam_update_system(&mut world);
        let beam = *world.get::<Beam>(gun).unwrap();
        assert!(beam.active);
        assert!((beam.target.x - (MUZZLE_OFFSET + LIGHTNING_RANGE)).abs() < 1e-3);

        spawn_target(&mut world, Vec3::new(400.0, 0.0, 0.0));
        beam_update_system(&mut world);
        let beam = *world.get::<Beam>(gun).unwrap();
        // The eye is above the capsule's straight section, so the beam ends on the top cap.
        assert!(beam.target.x > 400.0 - CAPSULE_RADIUS && beam.target.x < 400.0);
    }

    #[test]
    fn stop_fire_releases_held_trigger() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let gun = spawn_weapon(&mut world, WeaponKind::LightningGun, shooter);
        on_fire(&mut world, gun);

        stop_fire(&mut world, gun);
        assert!(!world.get::<Weapon>(gun).unwrap().hold.is_firing());
        assert!(world.resource::<GameTimers>().is_empty());
        assert!(!world.get::<Beam>(gun).unwrap().active);
    }

    #[test]
    fn railgun_cooldown_blocks_then_reenables() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let target = spawn_target(&mut world, Vec3::new(3000.0, 0.0, 0.0));
        let rail = spawn_weapon(&mut world, WeaponKind::Railgun, shooter);

        assert!(on_fire(&mut world, rail));
        assert!(!on_fire(&mut world, rail));
        let health = world.get::<Combatant>(target).unwrap().health;
        assert!((health - (COMBATANT_MAX_HEALTH - RAILGUN_DAMAGE)).abs() < 1e-3);

        let beams = world.query::<&RailBeamMarker>().iter(&world).count();
        assert_eq!(beams, 1);

        run_timers(&mut world, RAILGUN_COOLDOWN + 0.01);
        assert!(on_fire(&mut world, rail));
    }

    #[test]
    fn rocket_launcher_spawns_owned_rocket() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let launcher = spawn_weapon(&mut world, WeaponKind::RocketLauncher, shooter);
        set_holder_damage_multiplier(&mut world, shooter, QUAD_DAMAGE_MULTIPLIER);

        assert!(on_fire(&mut world, launcher));
        let projectiles: Vec<Projectile> = world.query::<&Projectile>().iter(&world).cloned().collect();
        assert_eq!(projectiles.len(), 1);
        assert_eq!(projectiles[0].kind, ProjectileKind::Rocket);
        assert_eq!(projectiles[0].owner.map(|owner| owner.entity()), Some(shooter));
        assert!((projectiles[0].damage_multiplier - QUAD_DAMAGE_MULTIPLIER).abs() < f32::EPSILON);
    }

    #[test]
    fn weapon_without_holder_does_nothing() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let gun = spawn_weapon(&mut world, WeaponKind::Railgun, shooter);
        world.despawn(shooter);

        assert!(!on_fire(&mut world, gun));
    }

    #[test]
    fn dead_holder_cannot_fire() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let gun = spawn_weapon(&mut world, WeaponKind::LightningGun, shooter);
        let rail = spawn_weapon(&mut world, WeaponKind::Railgun, shooter);
        world.get_mut::<Combatant>(shooter).unwrap().health = 0.0;

        assert!(!on_fire(&mut world, gun));
        assert!(!on_fire(&mut world, rail));
        assert!(!world.get::<Weapon>(gun).unwrap().hold.is_firing());
        assert!(world.resource::<GameTimers>().is_empty());
    }

    #[test]
    fn despawned_lightning_gun_stops_ticking() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let gun = spawn_weapon(&mut world, WeaponKind::LightningGun, shooter);
        assert!(on_fire(&mut world, gun));
        assert_eq!(world.resource::<GameTimers>().len(), 1);

        world.despawn(gun);
        for _ in 0..100 {
            run_timers(&mut world, 1.0);
        }

        assert_eq!(world.resource::<GameTimers>().len(), 0);
    }

    #[test]
    fn dispatcher_drives_lightning() {
        let mut world = setup();
        let shooter = spawn_shooter(&mut world, Vec3::ZERO);
        let target = spawn_target(&mut world, Vec3::new(300.0, 0.0, 0.0));
        let gun = spawn_weapon(&mut world, WeaponKind::LightningGun, shooter);

        on_fire(&mut world, gun);
        run_timers(&mut world, 0.0);
        let health = world.get::<Combatant>(target).unwrap().health;
        assert!((health - (COMBATANT_MAX_HEALTH - LIGHTNING_DAMAGE)).abs() < 1e-3);
    }
}
