use std::collections::HashSet;

use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    collision::{OverlapHit, Primitive, overlap_sphere},
    combat::{Combatant, DamageEvent, apply_damage},
    components::{Position, Velocity},
    constants::*,
    events::{GameEvent, SoundCue, emit},
};

// ============================================================================
// Radial Impulse
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadialFalloff {
    Constant,
    Linear,
}

/// Velocity change for a target at `target` from a radial impulse at `origin`.
/// Points away from the origin for positive strength; zero outside the radius
/// or exactly at the origin.
#[must_use]
pub fn radial_velocity_change(origin: Vec3, radius: f32, strength: f32, falloff: RadialFalloff, target: Vec3) -> Vec3 {
    let offset = target - origin;
    let distance = offset.length();
    if radius <= 0.0 || distance > radius {
        return Vec3::ZERO;
    }

    let scale = match falloff {
        RadialFalloff::Constant => 1.0,
        RadialFalloff::Linear => 1.0 - distance / radius,
    };
    offset.normalize_or_zero() * strength * scale
}

// ============================================================================
// Detonation Description
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlastMode {
    Explode,
    Implode,
}

impl BlastMode {
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Explode => 1.0,
            Self::Implode => -1.0,
        }
    }
}

// Per-weapon treatment of the projectile's own owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplashPolicy {
    pub self_damage_scale: f32,
    pub self_speed_scale: f32,
}

impl SplashPolicy {
    pub const ROCKET: Self = Self {
        self_damage_scale: ROCKET_SELF_DAMAGE_SCALE,
        self_speed_scale: BLAST_SELF_SPEED_SCALE,
    };

    pub const RECYCLER_GRENADE: Self = Self {
        self_damage_scale: GRENADE_SELF_DAMAGE_SCALE,
        self_speed_scale: BLAST_SELF_SPEED_SCALE,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detonation {
    pub epicenter: Vec3,
    pub radius: f32,
    // Base damage with the damage multiplier already applied
    pub damage: f32,
    pub speed_change: f32,
    pub mode: BlastMode,
    pub owner: Option<Entity>,
    pub policy: SplashPolicy,
    pub inflicts_damage: bool,
}

impl Detonation {
    // Same blast as a push-only pulse toward the epicenter.
    #[must_use]
    pub const fn attraction(self) -> Self {
        Self {
            mode: BlastMode::Implode,
            inflicts_damage: false,
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplashReport {
    // Every valid character touched by the blast, in query order
    pub victims: Vec<Entity>,
    // Damage actually applied, at most one entry per victim
    pub damaged: Vec<(Entity, f32)>,
}

impl SplashReport {
    #[must_use]
    pub fn damage_to(&self, entity: Entity) -> Option<f32> {
        self.damaged
            .iter()
            .find(|(victim, _)| *victim == entity)
            .map(|(_, amount)| *amount)
    }
}

// ============================================================================
// Host Services
// ============================================================================

/// What the resolver needs from the world it runs in.
pub trait SplashHost {
    // The entity still refers to a live character.
    fn is_valid(&self, entity: Entity) -> bool;
    fn location(&self, entity: Entity) -> Option<Vec3>;
    fn add_velocity(&mut self, entity: Entity, delta: Vec3);
    // Returns the damage actually taken, or `None` if the victim vanished.
    fn take_damage(&mut self, victim: Entity, amount: f32, event: &DamageEvent, instigator: Option<Entity>)
    -> Option<f32>;
    fn show_damage(&mut self, instigator: Entity, victim: Entity, amount: f32, location: Vec3);
    fn play_sound(&mut self, cue: SoundCue, location: Vec3);
}

// ============================================================================
// Resolution
// ============================================================================

// One entry per actor: only skeletal mesh hits count, since a character also
// reports its capsule.
#[must_use]
pub fn splash_victims(overlaps: &[OverlapHit]) -> Vec<Entity> {
    let mut seen = HashSet::new();
    overlaps
        .iter()
        .filter(|hit| hit.primitive == Primitive::SkeletalMesh)
        .filter(|hit| seen.insert(hit.entity))
        .map(|hit| hit.entity)
        .collect()
}

/// Apply a detonation to the overlapping actors.
///
/// Every character inside the blast sphere gets a radial velocity change with
/// linear falloff and is damaged at most once. `direct_hit` is the actor that
/// already took direct-hit damage from this projectile, if any; it only gets
/// the push. The projectile's owner takes scaled damage and an amplified push
/// per the detonation's [`SplashPolicy`].
pub fn resolve<H: SplashHost>(
    detonation: &Detonation,
    overlaps: &[OverlapHit],
    direct_hit: Option<Entity>,
    host: &mut H,
) -> SplashReport {
    let owner = detonation.owner.filter(|owner| host.is_valid(*owner));
    let mut report = SplashReport::default();

    for victim in splash_victims(overlaps) {
        if !host.is_valid(victim) {
            continue;
        }
        let Some(location) = host.location(victim) else {
            continue;
        };
        report.victims.push(victim);
        let is_owner = owner == Some(victim);

        let mut strength = detonation.speed_change * detonation.mode.sign();
        if is_owner {
            strength *= detonation.policy.self_speed_scale;
        }
        let delta = radial_velocity_change(
            detonation.epicenter,
            detonation.radius,
            strength,
            RadialFalloff::Linear,
            location,
        );
        host.add_velocity(victim, delta);

        if !detonation.inflicts_damage || direct_hit == Some(victim) {
            continue;
        }

        let mut amount = detonation.damage;
        if is_owner {
            amount *= detonation.policy.self_damage_scale;
        }
        let event = DamageEvent::Radial {
            base_damage: amount,
            outer_radius: detonation.radius,
        };
        let Some(applied) = host.take_damage(victim, amount, &event, owner) else {
            continue;
        };
        report.damaged.push((victim, applied));

        if applied > 0.0
            && let Some(owner) = owner
        {
            if !is_owner {
                host.play_sound(SoundCue::Hit, location);
            }
            host.show_damage(owner, victim, applied, location);
        }
    }

    report
}

// ============================================================================
// ECS Host
// ============================================================================

impl SplashHost for World {
    fn is_valid(&self, entity: Entity) -> bool {
        self.get::<Combatant>(entity).is_some()
    }

    fn location(&self, entity: Entity) -> Option<Vec3> {
        self.get::<Position>(entity).map(|pos| pos.0)
    }

    fn add_velocity(&mut self, entity: Entity, delta: Vec3) {
        if let Some(mut velocity) = self.get_mut::<Velocity>(entity) {
            velocity.0 += delta;
        }
    }

    fn take_damage(
        &mut self,
        victim: Entity,
        amount: f32,
        event: &DamageEvent,
        instigator: Option<Entity>,
    ) -> Option<f32> {
        apply_damage(self, victim, amount, event, instigator)
    }

    fn show_damage(&mut self, instigator: Entity, victim: Entity, amount: f32, location: Vec3) {
        emit(
            self,
            GameEvent::DamageShown {
                instigator,
                victim,
                amount,
                location,
            },
        );
    }

    fn play_sound(&mut self, cue: SoundCue, location: Vec3) {
        emit(self, GameEvent::Sound { cue, location });
    }
}

// Query the blast sphere and resolve against the world.
pub fn detonate(world: &mut World, detonation: &Detonation, direct_hit: Option<Entity>) -> SplashReport {
    let overlaps = overlap_sphere(world, detonation.epicenter, detonation.radius);
    let report = resolve(detonation, &overlaps, direct_hit, world);
    debug!(
        "detonation at {:?}: {} victims, {} damaged",
        detonation.epicenter,
        report.victims.len(),
        report.damaged.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{combat::TeamId, components::Body, events::EventQueue};

    #[derive(Default)]
    struct MockHost {
        locations: HashMap<Entity, Vec3>,
        velocities: HashMap<Entity, Vec3>,
        damage_taken: Vec<(Entity, f32)>,
        shown: Vec<(Entity, Entity, f32)>,
        sounds: Vec<SoundCue>,
        // Victims that shrug off damage entirely
        immune: HashSet<Entity>,
    }

    impl SplashHost for MockHost {
        fn is_valid(&self, entity: Entity) -> bool {
            self.locations.contains_key(&entity)
        }

        fn location(&self, entity: Entity) -> Option<Vec3> {
            self.locations.get(&entity).copied()
        }

        fn add_velocity(&mut self, entity: Entity, delta: Vec3) {
            *self.velocities.entry(entity).or_default() += delta;
        }

        fn take_damage(
            &mut self,
            victim: Entity,
            amount: f32,
            _event: &DamageEvent,
            _instigator: Option<Entity>,
        ) -> Option<f32> {
            let applied = if self.immune.contains(&victim) { 0.0 } else { amount };
            self.damage_taken.push((victim, applied));
            Some(applied)
        }

        fn show_damage(&mut self, instigator: Entity, victim: Entity, amount: f32, _location: Vec3) {
            self.shown.push((instigator, victim, amount));
        }

        fn play_sound(&mut self, cue: SoundCue, _location: Vec3) {
            self.sounds.push(cue);
        }
    }

    fn entities(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    fn meshed(entity: Entity) -> [OverlapHit; 2] {
        [
            OverlapHit {
                entity,
                primitive: Primitive::Capsule,
            },
            OverlapHit {
                entity,
                primitive: Primitive::SkeletalMesh,
            },
        ]
    }

    fn rocket(owner: Option<Entity>) -> Detonation {
        Detonation {
            epicenter: Vec3::ZERO,
            radius: ROCKET_BLAST_RADIUS,
            damage: ROCKET_DAMAGE,
            speed_change: ROCKET_BLAST_SPEED_CHANGE,
            mode: BlastMode::Explode,
            owner,
            policy: SplashPolicy::ROCKET,
            inflicts_damage: true,
        }
    }

    #[test]
    fn linear_falloff_is_half_at_half_radius() {
        let delta = radial_velocity_change(Vec3::ZERO, 400.0, 1500.0, RadialFalloff::Linear, Vec3::new(0.0, 200.0, 0.0));
        assert!((delta.length() - 750.0).abs() < 1e-3);
        assert!(delta.y > 0.0);
    }

    #[test]
    fn no_impulse_outside_radius_or_at_center() {
        let outside = radial_velocity_change(Vec3::ZERO, 400.0, 1500.0, RadialFalloff::Linear, Vec3::X * 401.0);
        let center = radial_velocity_change(Vec3::ZERO, 400.0, 1500.0, RadialFalloff::Linear, Vec3::ZERO);
        assert_eq!(outside, Vec3::ZERO);
        assert_eq!(center, Vec3::ZERO);
    }

    #[test]
    fn off_axis_victim_takes_full_damage_and_half_push() {
        let [owner, victim] = entities(2)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(owner, Vec3::new(-1000.0, 0.0, 0.0));
        host.locations.insert(victim, Vec3::new(0.0, 200.0, 0.0));

        let report = resolve(&rocket(Some(owner)), &meshed(victim), None, &mut host);

        assert_eq!(report.damage_to(victim), Some(ROCKET_DAMAGE));
        let push = host.velocities[&victim];
        assert!((push.length() - ROCKET_BLAST_SPEED_CHANGE * 0.5).abs() < 1e-3);
        assert_eq!(host.sounds, vec![SoundCue::Hit]);
        assert_eq!(host.shown, vec![(owner, victim, ROCKET_DAMAGE)]);
    }

    #[test]
    fn rocket_jump_halves_self_damage() {
        let [owner] = entities(1)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(owner, Vec3::ZERO);

        let report = resolve(&rocket(Some(owner)), &meshed(owner), None, &mut host);

        assert_eq!(report.damage_to(owner), Some(ROCKET_DAMAGE * 0.5));
        // Self damage is shown but makes no hit sound.
        assert!(host.sounds.is_empty());
        assert_eq!(host.shown.len(), 1);
    }

    #[test]
    fn grenade_self_damage_uses_its_own_factor() {
        let [owner] = entities(1)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(owner, Vec3::ZERO);

        let detonation = Detonation {
            damage: GRENADE_DAMAGE,
            policy: SplashPolicy::RECYCLER_GRENADE,
            ..rocket(Some(owner))
        };
        let report = resolve(&detonation, &meshed(owner), None, &mut host);
        assert!((report.damage_to(owner).unwrap() - GRENADE_DAMAGE * 0.3).abs() < 1e-3);
    }

    #[test]
    fn owner_push_is_amplified() {
        let [owner, other] = entities(2)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(owner, Vec3::new(100.0, 0.0, 0.0));
        host.locations.insert(other, Vec3::new(-100.0, 0.0, 0.0));

        let overlaps: Vec<_> = meshed(owner).into_iter().chain(meshed(other)).collect();
        resolve(&rocket(Some(owner)), &overlaps, None, &mut host);

        let ratio = host.velocities[&owner].length() / host.velocities[&other].length();
        assert!((ratio - BLAST_SELF_SPEED_SCALE).abs() < 1e-4);
    }

    #[test]
    fn repeated_overlaps_damage_once() {
        let [victim] = entities(1)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(victim, Vec3::X * 100.0);

        let overlaps: Vec<_> = meshed(victim).into_iter().chain(meshed(victim)).collect();
        let report = resolve(&rocket(None), &overlaps, None, &mut host);

        assert_eq!(report.victims, vec![victim]);
        assert_eq!(host.damage_taken.len(), 1);
    }

    #[test]
    fn capsule_only_hits_are_ignored() {
        let [victim] = entities(1)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(victim, Vec3::X * 100.0);

        let overlaps = [OverlapHit {
            entity: victim,
            primitive: Primitive::Capsule,
        }];
        let report = resolve(&rocket(None), &overlaps, None, &mut host);
        assert!(report.victims.is_empty());
    }

    #[test]
    fn direct_hit_victim_is_pushed_but_not_damaged_again() {
        let [victim, bystander] = entities(2)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(victim, Vec3::X * 50.0);
        host.locations.insert(bystander, Vec3::Y * 150.0);

        let overlaps: Vec<_> = meshed(victim).into_iter().chain(meshed(bystander)).collect();
        let report = resolve(&rocket(None), &overlaps, Some(victim), &mut host);

        assert_eq!(report.damage_to(victim), None);
        assert_eq!(report.damage_to(bystander), Some(ROCKET_DAMAGE));
        assert!(host.velocities[&victim].x > 0.0);
    }

    #[test]
    fn implosion_pulls_inward_without_damage() {
        let [victim] = entities(1)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(victim, Vec3::X * 200.0);

        let report = resolve(&rocket(None).attraction(), &meshed(victim), None, &mut host);

        assert!(report.damaged.is_empty());
        assert!(host.velocities[&victim].x < 0.0);
    }

    #[test]
    fn stale_references_are_skipped() {
        let [gone, owner_gone] = entities(2)[..] else { unreachable!() };
        let mut host = MockHost::default();

        let report = resolve(&rocket(Some(owner_gone)), &meshed(gone), None, &mut host);
        assert!(report.victims.is_empty());
        assert!(host.damage_taken.is_empty());
    }

    #[test]
    fn zero_damage_shows_nothing() {
        let [owner, victim] = entities(2)[..] else { unreachable!() };
        let mut host = MockHost::default();
        host.locations.insert(owner, Vec3::X * 5000.0);
        host.locations.insert(victim, Vec3::X * 100.0);
        host.immune.insert(victim);

        resolve(&rocket(Some(owner)), &meshed(victim), None, &mut host);
        assert!(host.shown.is_empty());
        assert!(host.sounds.is_empty());
    }

    #[test]
    fn detonate_in_world_applies_damage_and_push() {
        let mut world = World::new();
        world.init_resource::<EventQueue>();
        let owner = world
            .spawn((
                Combatant::new(TeamId(0)),
                Position(Vec3::new(-2000.0, 0.0, 96.0)),
                Velocity::default(),
                Body::default(),
            ))
            .id();
        let victim = world
            .spawn((
                Combatant::new(TeamId(1)),
                Position(Vec3::new(200.0, 0.0, 0.0)),
                Velocity::default(),
                Body::default(),
            ))
            .id();

        let report = detonate(&mut world, &rocket(Some(owner)), None);

        assert_eq!(report.victims, vec![victim]);
        assert!((world.get::<Combatant>(victim).unwrap().health).abs() < 1e-3);
        assert!((world.get::<Velocity>(victim).unwrap().0.x - 750.0).abs() < 1e-2);
        let events = world.resource_mut::<EventQueue>().drain();
        assert!(events.iter().any(|event| matches!(event, GameEvent::Died { victim: v, .. } if *v == victim)));
        assert!(events.iter().any(|event| matches!(event, GameEvent::DamageShown { .. })));
    }
}
