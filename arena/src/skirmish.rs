use std::{f32::consts::PI, time::Duration};

use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use tracing::{debug, info};

use crate::{
    components::{Callsign, Loadout, Wander},
    constants::*,
    resources::{Score, Scoreboard},
    systems::{bot_brain_system, death_system, respawn_system},
};
use common::{
    ai::{Focus, SightSense, control_rotation_system, sample_point_in_disk, sample_point_in_square},
    combat::{Combatant, TeamId},
    components::{Body, Kinematic, Orientation, Position, Velocity},
    config::Tuning,
    constants::CAPSULE_HALF_HEIGHT,
    events::{EventQueue, GameEvent},
    markers::{BotMarker, PlayerMarker, TravellerMarker},
    pickup::{PickupKind, PowerupKind, armor_kind, health_kind, spawn_pickup},
    portal::{PortalColor, pair_portals, spawn_portal},
    resources::GameRng,
    systems::{build_schedule, init_world, step},
    weapon::{WeaponKind, spawn_weapon},
};

// ============================================================================
// Skirmish
// ============================================================================

// A headless match: one player and a number of bots, each on its own team,
// in an open arena with a pair of portals and a field of pickups.
pub struct Skirmish {
    world: World,
    schedule: Schedule,
    frame: u64,
}

// Final line of the report for one combatant
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub name: String,
    pub score: Score,
}

impl Skirmish {
    #[must_use]
    pub fn new(tuning: Tuning, bots: usize, seed: u64) -> Self {
        let mut world = init_world(tuning, seed);
        world.init_resource::<Scoreboard>();

        let mut schedule = build_schedule();
        schedule.add_systems((death_system, respawn_system, bot_brain_system).chain().before(control_rotation_system));

        spawn_portals(&mut world);
        spawn_pickups(&mut world);

        spawn_combatant(&mut world, "player", TeamId(0), WeaponKind::LightningGun, true);
        for index in 0..bots {
            let kind = WeaponKind::ALL[(index + 1) % WeaponKind::ALL.len()];
            spawn_combatant(&mut world, &format!("bot-{}", index + 1), TeamId(index as u8 + 1), kind, false);
        }
        info!("skirmish ready: 1 player, {bots} bots, seed {seed}");

        Self {
            world,
            schedule,
            frame: 0,
        }
    }

    // Run one frame and return what happened in it.
    pub fn step(&mut self, delta: Duration) -> Vec<GameEvent> {
        step(&mut self.world, &mut self.schedule, delta);
        self.frame += 1;

        let events = self.world.resource_mut::<EventQueue>().drain();
        for event in &events {
            self.log_event(event);
            self.world.resource_mut::<Scoreboard>().record(event);
        }
        events
    }

    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    pub const fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    // Scoreboard ranking with every combatant included, even the idle ones.
    #[must_use]
    pub fn standings(&mut self) -> Vec<Standing> {
        let combatants: Vec<Entity> = self
            .world
            .query_filtered::<Entity, With<Callsign>>()
            .iter(&self.world)
            .collect();
        let scoreboard = self.world.resource::<Scoreboard>();
        let mut ranking = scoreboard.ranking();
        let mut idle: Vec<Entity> = combatants
            .into_iter()
            .filter(|entity| !scoreboard.0.contains_key(entity))
            .collect();
        idle.sort();
        ranking.extend(idle.into_iter().map(|entity| (entity, Score::default())));

        ranking
            .into_iter()
            .map(|(entity, score)| Standing {
                name: self.name(entity),
                score,
            })
            .collect()
    }

    fn name(&self, entity: Entity) -> String {
        self.world
            .get::<Callsign>(entity)
            .map_or_else(|| format!("{entity:?}"), |callsign| callsign.0.clone())
    }

    fn log_event(&self, event: &GameEvent) {
        match *event {
            GameEvent::Died { victim, instigator } => match instigator.filter(|killer| *killer != victim) {
                Some(killer) => info!("{} fragged {}", self.name(killer), self.name(victim)),
                None => info!("{} died", self.name(victim)),
            },
            GameEvent::PickupCollected { collector, kind, .. } => {
                info!("{} collected {kind:?}", self.name(collector));
            }
            GameEvent::PowerupExpired { beneficiary, .. } => {
                info!("power-up of {} wore off", self.name(beneficiary));
            }
            GameEvent::Teleported { entity, .. } => {
                debug!("{} went through a portal", self.name(entity));
            }
            GameEvent::DamageShown {
                instigator,
                victim,
                amount,
                ..
            } => {
                debug!("{} hit {} for {amount:.1}", self.name(instigator), self.name(victim));
            }
            _ => {}
        }
    }
}

// ============================================================================
// Arena Layout
// ============================================================================

// Blue and orange portals facing each other across the arena.
fn spawn_portals(world: &mut World) {
    let blue = spawn_portal(
        world,
        PortalColor::Blue,
        Vec3::new(-PORTAL_DISTANCE, 0.0, PORTAL_HEIGHT),
        Quat::IDENTITY,
    );
    let orange = spawn_portal(
        world,
        PortalColor::Orange,
        Vec3::new(PORTAL_DISTANCE, 0.0, PORTAL_HEIGHT),
        Quat::from_rotation_z(PI),
    );
    pair_portals(world, blue, Some(orange));
}

// Health and armor scattered over the field, power-ups on the center line.
fn spawn_pickups(world: &mut World) {
    let tuning = world.get_resource::<Tuning>().map(|tuning| tuning.pickups.clone()).unwrap_or_default();
    let kinds = std::iter::repeat_n(health_kind(&tuning), HEALTH_PICKUP_COUNT)
        .chain(std::iter::repeat_n(armor_kind(&tuning), ARMOR_PICKUP_COUNT));

    for kind in kinds {
        let location = {
            let mut rng = world.resource_mut::<GameRng>();
            sample_point_in_square(&mut rng.0, Vec3::Z * CAPSULE_HALF_HEIGHT, PICKUP_FIELD_HALF_EXTENT)
        };
        spawn_pickup(world, kind, location);
    }

    spawn_pickup(
        world,
        PickupKind::Powerup(PowerupKind::Protection),
        Vec3::new(0.0, -PICKUP_FIELD_HALF_EXTENT, CAPSULE_HALF_HEIGHT),
    );
    spawn_pickup(
        world,
        PickupKind::Powerup(PowerupKind::Quad),
        Vec3::new(0.0, PICKUP_FIELD_HALF_EXTENT, CAPSULE_HALF_HEIGHT),
    );
}

fn spawn_combatant(world: &mut World, name: &str, team: TeamId, kind: WeaponKind, is_player: bool) -> Entity {
    let location = {
        let mut rng = world.resource_mut::<GameRng>();
        sample_point_in_disk(&mut rng.0, Vec3::Z * CAPSULE_HALF_HEIGHT, ARENA_RADIUS)
    };

    let mut entity = world.spawn((
        Callsign(name.to_string()),
        Combatant::new(team),
        Position(location),
        Velocity::default(),
        Orientation::default(),
        Body::default(),
        Kinematic::walker(CAPSULE_HALF_HEIGHT),
        TravellerMarker,
        SightSense::default(),
        Focus::default(),
        Wander::default(),
    ));
    if is_player {
        entity.insert(PlayerMarker);
    } else {
        entity.insert(BotMarker);
    }
    let entity = entity.id();

    let weapon = spawn_weapon(world, kind, entity);
    world.entity_mut(entity).insert(Loadout { weapon });
    debug!("{name} ({entity:?}) spawned at {location} with {kind:?}");
    entity
}
