use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use tracing::debug;

use crate::{
    components::Position,
    constants::*,
    events::{GameEvent, emit},
};

// ============================================================================
// Teams
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeamId(pub u8);

impl TeamId {
    pub const NEUTRAL: Self = Self(u8::MAX);
}

// ============================================================================
// Damage Events
// ============================================================================

// Describes how damage was delivered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageEvent {
    // Single target: direct projectile hit or hit-scan
    Point,
    // Splash: base damage and blast radius of the detonation
    Radial { base_damage: f32, outer_radius: f32 },
}

// ============================================================================
// Combatant
// ============================================================================

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Combatant {
    pub health: f32,
    pub max_health: f32,
    pub armor: f32,
    pub max_armor: f32,
    // Scales all incoming damage (1.0 normally, lower while protected)
    pub protection_multiplier: f32,
    pub team: TeamId,
}

impl Combatant {
    #[must_use]
    pub const fn new(team: TeamId) -> Self {
        Self {
            health: COMBATANT_MAX_HEALTH,
            max_health: COMBATANT_MAX_HEALTH,
            armor: COMBATANT_START_ARMOR,
            max_armor: COMBATANT_MAX_ARMOR,
            protection_multiplier: 1.0,
            team,
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    // Apply incoming damage and return the amount actually dealt.
    // Protection scales the hit first; armor then soaks its share while it lasts.
    pub fn take_damage(&mut self, amount: f32, _event: &DamageEvent) -> f32 {
        if amount <= 0.0 || !self.is_alive() {
            return 0.0;
        }

        let scaled = amount * self.protection_multiplier;
        let absorbed = (scaled * ARMOR_ABSORPTION).min(self.armor);
        self.armor -= absorbed;
        self.health -= scaled - absorbed;
        scaled
    }

    // Restore health up to the maximum; returns the amount gained.
    pub fn heal(&mut self, amount: f32) -> f32 {
        let before = self.health;
        self.health = (self.health + amount.max(0.0)).min(self.max_health);
        self.health - before
    }

    // Restore armor up to the maximum; returns the amount gained.
    pub fn add_armor(&mut self, amount: f32) -> f32 {
        let before = self.armor;
        self.armor = (self.armor + amount.max(0.0)).min(self.max_armor);
        self.armor - before
    }

    pub const fn set_protection_multiplier(&mut self, value: f32) {
        self.protection_multiplier = value;
    }
}

// ============================================================================
// World-Level Damage
// ============================================================================

/// Damage a combatant in the world. Returns `None` when the victim is gone.
/// Emits `Died` when this hit is the one that kills.
pub fn apply_damage(
    world: &mut World,
    victim: Entity,
    amount: f32,
    event: &DamageEvent,
    instigator: Option<Entity>,
) -> Option<f32> {
    let (applied, killed) = {
        let mut combatant = world.get_mut::<Combatant>(victim)?;
        let was_alive = combatant.is_alive();
        let applied = combatant.take_damage(amount, event);
        (applied, was_alive && !combatant.is_alive())
    };

    if killed {
        debug!("{victim:?} killed by {instigator:?}");
        emit(world, GameEvent::Died { victim, instigator });
    }
    Some(applied)
}

// Location used for damage numbers and sounds.
#[must_use]
pub fn actor_location(world: &World, entity: Entity) -> Option<Vec3> {
    world.get::<Position>(entity).map(|pos| pos.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventQueue;

    #[test]
    fn unarmored_damage_goes_to_health() {
        let mut combatant = Combatant::new(TeamId(0));
        let dealt = combatant.take_damage(40.0, &DamageEvent::Point);
        assert!((dealt - 40.0).abs() < 1e-4);
        assert!((combatant.health - 60.0).abs() < 1e-4);
    }

    #[test]
    fn armor_soaks_two_thirds() {
        let mut combatant = Combatant::new(TeamId(0));
        combatant.armor = 100.0;
        combatant.take_damage(30.0, &DamageEvent::Point);
        assert!((combatant.armor - 80.0).abs() < 1e-4);
        assert!((combatant.health - 90.0).abs() < 1e-4);
    }

    #[test]
    fn depleted_armor_passes_the_rest_through() {
        let mut combatant = Combatant::new(TeamId(0));
        combatant.armor = 10.0;
        combatant.take_damage(30.0, &DamageEvent::Point);
        assert!(combatant.armor.abs() < 1e-4);
        assert!((combatant.health - 80.0).abs() < 1e-4);
    }

    #[test]
    fn protection_scales_before_armor() {
        let mut combatant = Combatant::new(TeamId(0));
        combatant.set_protection_multiplier(PROTECTION_MULTIPLIER);
        let dealt = combatant.take_damage(100.0, &DamageEvent::Point);
        assert!((dealt - 30.0).abs() < 1e-4);
        assert!((combatant.health - 70.0).abs() < 1e-4);
    }

    #[test]
    fn dead_combatants_take_nothing() {
        let mut combatant = Combatant::new(TeamId(0));
        combatant.health = 0.0;
        assert!(combatant.take_damage(50.0, &DamageEvent::Point).abs() < f32::EPSILON);
    }

    #[test]
    fn heal_and_armor_clamp_to_max() {
        let mut combatant = Combatant::new(TeamId(0));
        combatant.health = 90.0;
        assert!((combatant.heal(25.0) - 10.0).abs() < 1e-4);
        assert!((combatant.add_armor(150.0) - 100.0).abs() < 1e-4);
        assert!((combatant.add_armor(1.0)).abs() < 1e-4);
    }

    #[test]
    fn killing_blow_emits_died_once() {
        let mut world = World::new();
        world.init_resource::<EventQueue>();
        let attacker = world.spawn(Combatant::new(TeamId(0))).id();
        let victim = world.spawn(Combatant::new(TeamId(1))).id();

        apply_damage(&mut world, victim, 150.0, &DamageEvent::Point, Some(attacker));
        apply_damage(&mut world, victim, 150.0, &DamageEvent::Point, Some(attacker));

        let deaths = world
            .resource_mut::<EventQueue>()
            .drain()
            .into_iter()
            .filter(|event| matches!(event, GameEvent::Died { .. }))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn missing_victim_is_skipped() {
        let mut world = World::new();
        let victim = world.spawn(Combatant::new(TeamId(1))).id();
        world.despawn(victim);
        assert_eq!(apply_damage(&mut world, victim, 10.0, &DamageEvent::Point, None), None);
    }
}
