use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    collision::within_radius,
    combat::Combatant,
    components::{Glow, Kinematic, Position, Velocity},
    config::{PickupTuning, PowerupTuning, Tuning},
    constants::*,
    events::{GameEvent, SoundCue, emit},
    handle::WeakRef,
    resources::GameRng,
    scheduler::TimerHandle,
    timers::{GameTimers, TimerAction},
    weapon::set_holder_damage_multiplier,
};

// ============================================================================
// Pickup Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerupKind {
    Protection,
    Quad,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickupKind {
    Health(f32),
    Armor(f32),
    Powerup(PowerupKind),
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Pickup {
    pub kind: PickupKind,
    // Inactive pickups can't be collected (a taken power-up waiting to respawn)
    pub active: bool,
    pub glow_intensity: f32,
}

impl Pickup {
    #[must_use]
    pub const fn new(kind: PickupKind) -> Self {
        Self {
            kind,
            active: true,
            glow_intensity: GLOW_INTENSITY_ACTIVE,
        }
    }
}

// ============================================================================
// Power-Up State
// ============================================================================

// Timing of a power-up pickup while its effect is running.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct PowerupState {
    pub beneficiary: Option<WeakRef<Combatant>>,
    pub elapsed: f32,
    pub progress: f32,
    pub progress_timer: Option<TimerHandle>,
    pub effect_timer: Option<TimerHandle>,
    pub respawn_timer: Option<TimerHandle>,
}

// Power-ups currently affecting a combatant; at most one of each kind.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivePowerups(pub Vec<PowerupKind>);

impl ActivePowerups {
    #[must_use]
    pub fn contains(&self, kind: PowerupKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn add(&mut self, kind: PowerupKind) -> bool {
        if self.contains(kind) {
            return false;
        }
        self.0.push(kind);
        true
    }

    pub fn remove(&mut self, kind: PowerupKind) -> bool {
        let before = self.0.len();
        self.0.retain(|active| *active != kind);
        self.0.len() != before
    }
}

#[must_use]
pub fn powerup_progress(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 0.0;
    }
    (1.0 - elapsed / duration).clamp(0.0, 1.0)
}

// ============================================================================
// Spawning
// ============================================================================

pub fn spawn_pickup(world: &mut World, kind: PickupKind, location: Vec3) -> Entity {
    let mut entity = world.spawn((Pickup::new(kind), Position(location)));
    if matches!(kind, PickupKind::Powerup(_)) {
        entity.insert(PowerupState::default());
    }
    entity.id()
}

// Health and armor left behind by a recycled combatant: a handful of each,
// scattered above `epicenter` and tossed upward so they fall back down.
pub fn spawn_recycled_remains(world: &mut World, epicenter: Vec3) -> Vec<Entity> {
    let tuning = world
        .get_resource::<Tuning>()
        .map(|tuning| tuning.pickups.clone())
        .unwrap_or_default();
    let kinds = [
        PickupKind::Health(tuning.health_amount),
        PickupKind::Armor(tuning.armor_amount),
    ];

    let rolls: Vec<(PickupKind, Vec3, Vec3)> = {
        let mut rng = world.get_resource_or_insert_with(GameRng::default);
        let rng = &mut rng.0;
        kinds
            .iter()
            .flat_map(|kind| std::iter::repeat_n(*kind, RECYCLED_PICKUPS_PER_KIND))
            .map(|kind| {
                let offset = Vec3::new(
                    rng.random_range(-RECYCLED_SCATTER_XY..=RECYCLED_SCATTER_XY),
                    rng.random_range(-RECYCLED_SCATTER_XY..=RECYCLED_SCATTER_XY),
                    rng.random_range(RECYCLED_SCATTER_Z_MIN..=RECYCLED_SCATTER_Z_MAX),
                );
                let launch = Vec3::new(
                    rng.random_range(-RECYCLED_LAUNCH_XY..=RECYCLED_LAUNCH_XY),
                    rng.random_range(-RECYCLED_LAUNCH_XY..=RECYCLED_LAUNCH_XY),
                    RECYCLED_LAUNCH_Z,
                );
                (kind, offset, launch)
            })
            .collect()
    };

    rolls
        .into_iter()
        .map(|(kind, offset, launch)| {
            let entity = spawn_pickup(world, kind, epicenter + offset);
            world
                .entity_mut(entity)
                .insert((Velocity(launch), Kinematic::walker(0.0)));
            entity
        })
        .collect()
}

// ============================================================================
// Effects
// ============================================================================

// Apply (`on = true`) or revert a power-up's effect on a combatant.
pub fn set_powerup_effect(world: &mut World, combatant: Entity, kind: PowerupKind, on: bool, tuning: &PowerupTuning) {
    match kind {
        PowerupKind::Protection => {
            if let Some(mut target) = world.get_mut::<Combatant>(combatant) {
                target.set_protection_multiplier(if on { tuning.protection_multiplier } else { 1.0 });
            }
        }
        PowerupKind::Quad => {
            let multiplier = if on { tuning.quad_damage_multiplier } else { 1.0 };
            set_holder_damage_multiplier(world, combatant, multiplier);
        }
    }

    let remaining = world.get_mut::<ActivePowerups>(combatant).and_then(|mut active| {
        if on {
            active.add(kind);
        } else {
            active.remove(kind);
        }
        active.0.last().copied()
    });
    let glow = if on { Some(kind) } else { remaining };
    if let Ok(mut entity) = world.get_entity_mut(combatant) {
        entity.insert(Glow(glow));
    }
}

// ============================================================================
// Collection
// ============================================================================

fn try_collect(world: &mut World, pickup: Entity, kind: PickupKind, collector: Entity) -> bool {
    match kind {
        PickupKind::Health(amount) => {
            let Some(mut combatant) = world.get_mut::<Combatant>(collector) else {
                return false;
            };
            if combatant.health >= combatant.max_health {
                return false;
            }
            combatant.heal(amount);
            world.despawn(pickup);
            true
        }
        PickupKind::Armor(amount) => {
            let Some(mut combatant) = world.get_mut::<Combatant>(collector) else {
                return false;
            };
            if combatant.armor >= combatant.max_armor {
                return false;
            }
            combatant.add_armor(amount);
            world.despawn(pickup);
            true
        }
        PickupKind::Powerup(kind) => start_powerup(world, pickup, kind, collector),
    }
}

// Hand a power-up to `collector` and start its timers. Refused when the
// collector already holds one of the same kind. An effect still running from
// an earlier collection ends first.
pub fn start_powerup(world: &mut World, pickup: Entity, kind: PowerupKind, collector: Entity) -> bool {
    match world.get::<ActivePowerups>(collector) {
        Some(active) if active.contains(kind) => return false,
        Some(_) => {}
        None => {
            let Ok(mut entity) = world.get_entity_mut(collector) else {
                return false;
            };
            entity.insert(ActivePowerups::default());
        }
    }
    if world
        .get::<PowerupState>(pickup)
        .is_some_and(|state| state.beneficiary.is_some() || state.effect_timer.is_some())
    {
        end_powerup_effect(world, pickup);
    }

    let tuning = world
        .get_resource::<Tuning>()
        .map(|tuning| tuning.powerups.clone())
        .unwrap_or_default();
    set_powerup_effect(world, collector, kind, true, &tuning);

    let (respawn_timer, progress_timer, effect_timer) = {
        let mut timers = world.resource_mut::<GameTimers>();
        (
            timers.schedule_once(TimerAction::PowerupReactivate { pickup }, tuning.respawn_interval),
            timers.schedule(
                TimerAction::PowerupProgress { pickup },
                tuning.progress_interval,
                true,
                Some(0.0),
            ),
            timers.schedule_once(TimerAction::PowerupEffectEnd { pickup }, tuning.effect_duration),
        )
    };

    if let Some(mut component) = world.get_mut::<Pickup>(pickup) {
        component.active = false;
        component.glow_intensity = GLOW_INTENSITY_INACTIVE;
    }
    world.entity_mut(pickup).insert(PowerupState {
        beneficiary: Some(WeakRef::new(collector)),
        elapsed: 0.0,
        progress: 1.0,
        progress_timer: Some(progress_timer),
        effect_timer: Some(effect_timer),
        respawn_timer: Some(respawn_timer),
    });

    info!("{collector:?} picked up {kind:?}");
    true
}

// Let combatants standing close enough collect active pickups.
pub fn pickup_collection_system(world: &mut World) {
    let radius = world
        .get_resource::<Tuning>()
        .map_or(PICKUP_COLLECTION_RADIUS, |tuning| tuning.pickups.collection_radius);

    let pickups: Vec<(Entity, PickupKind, Vec3)> = world
        .query::<(Entity, &Pickup, &Position)>()
        .iter(world)
        .filter(|(_, pickup, _)| pickup.active)
        .map(|(entity, pickup, pos)| (entity, pickup.kind, pos.0))
        .collect();
    let collectors: Vec<(Entity, Vec3)> = world
        .query::<(Entity, &Combatant, &Position)>()
        .iter(world)
        .filter(|(_, combatant, _)| combatant.is_alive())
        .map(|(entity, _, pos)| (entity, pos.0))
        .collect();

    for (pickup, kind, location) in pickups {
        for &(collector, at) in &collectors {
            if !within_radius(location, at, radius) || !try_collect(world, pickup, kind, collector) {
                continue;
            }
            emit(
                world,
                GameEvent::Sound {
                    cue: SoundCue::PickUp,
                    location,
                },
            );
            emit(
                world,
                GameEvent::PickupCollected {
                    pickup,
                    collector,
                    kind,
                },
            );
            break;
        }
    }
}

// ============================================================================
// Timer Callbacks
// ============================================================================

pub fn reactivate_powerup(world: &mut World, pickup: Entity) {
    let Some(mut component) = world.get_mut::<Pickup>(pickup) else {
        return;
    };
    component.active = true;
    component.glow_intensity = GLOW_INTENSITY_ACTIVE;
    if let Some(mut state) = world.get_mut::<PowerupState>(pickup) {
        state.respawn_timer = None;
    }
    debug!("power-up {pickup:?} respawned");
}

pub fn update_powerup_progress(world: &mut World, pickup: Entity, handle: TimerHandle) {
    let (interval, duration) = world
        .get_resource::<Tuning>()
        .map_or((POWER_UP_PROGRESS_INTERVAL, POWER_UP_EFFECT_DURATION), |tuning| {
            (tuning.powerups.progress_interval, tuning.powerups.effect_duration)
        });

    let beneficiary = {
        let Some(mut state) = world.get_mut::<PowerupState>(pickup) else {
            world.resource_mut::<GameTimers>().cancel(handle);
            return;
        };
        state.elapsed += interval;
        state.progress = powerup_progress(state.elapsed, duration);
        state.beneficiary.map(|beneficiary| (beneficiary, state.progress))
    };

    if let Some((beneficiary, progress)) = beneficiary
        && let Some(beneficiary) = beneficiary.upgrade(world)
    {
        emit(
            world,
            GameEvent::PowerupProgress {
                pickup,
                beneficiary,
                progress,
            },
        );
    }
}

pub fn end_powerup_effect(world: &mut World, pickup: Entity) {
    let Some(kind) = world.get::<Pickup>(pickup).and_then(|component| match component.kind {
        PickupKind::Powerup(kind) => Some(kind),
        _ => None,
    }) else {
        return;
    };
    let Some(state) = world.get::<PowerupState>(pickup).cloned() else {
        return;
    };

    {
        let mut timers = world.resource_mut::<GameTimers>();
        for handle in [state.progress_timer, state.effect_timer].into_iter().flatten() {
            timers.cancel(handle);
        }
    }

    if let Some(beneficiary) = state.beneficiary.and_then(|beneficiary| beneficiary.upgrade(world)) {
        let tuning = world
            .get_resource::<Tuning>()
            .map(|tuning| tuning.powerups.clone())
            .unwrap_or_default();
        set_powerup_effect(world, beneficiary, kind, false, &tuning);
        emit(
            world,
            GameEvent::PowerupProgress {
                pickup,
                beneficiary,
                progress: 0.0,
            },
        );
        emit(world, GameEvent::PowerupExpired { pickup, beneficiary });
        info!("{kind:?} wore off for {beneficiary:?}");
    }

    if let Some(mut state) = world.get_mut::<PowerupState>(pickup) {
        state.beneficiary = None;
        state.progress = 0.0;
        state.progress_timer = None;
        state.effect_timer = None;
    }
}

// Pickup amounts from tuning, for spawners.
#[must_use]
pub const fn health_kind(tuning: &PickupTuning) -> PickupKind {
    PickupKind::Health(tuning.health_amount)
}

#[must_use]
pub const fn armor_kind(tuning: &PickupTuning) -> PickupKind {
    PickupKind::Armor(tuning.armor_amount)
}
