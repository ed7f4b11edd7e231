use std::time::Duration;

use bevy_ecs::{prelude::*, schedule::ExecutorKind};
use bevy_time::Time;

use crate::{
    ai::{control_rotation_system, perception_system},
    components::{GroundResponse, Kinematic, Lifespan, Position, Velocity},
    config::Tuning,
    events::{EventQueue, GameEvent, SoundCue},
    pickup::pickup_collection_system,
    portal::teleport_system,
    projectile::{Projectile, ProjectileKind, projectile_contact_system},
    resources::GameRng,
    timers::{GameTimers, timer_dispatch_system},
    weapon::beam_update_system,
};

// ============================================================================
// Shared Game Systems
// ============================================================================

// Movement system - integrates velocity into position and resolves contact
// with the ground plane (z = 0) according to each entity's ground response.
pub fn movement_system(
    time: Res<Time>,
    mut query: Query<(&mut Position, &mut Velocity, Option<&Kinematic>)>,
    mut events: Option<ResMut<EventQueue>>,
) {
    let delta = time.delta_secs();
    if delta <= 0.0 {
        return;
    }

    for (mut pos, mut vel, kinematic) in &mut query {
        let Some(kinematic) = kinematic else {
            pos.0 += vel.0 * delta;
            continue;
        };

        vel.0.z -= kinematic.gravity * delta;
        let next = pos.0 + vel.0 * delta;
        if next.z >= kinematic.rest_height {
            pos.0 = next;
            continue;
        }

        match kinematic.ground {
            GroundResponse::Ignore => pos.0 = next,
            GroundResponse::Bounce { restitution } => {
                // Reflect off the ground: v' = v - 2(v·n)n, then scale
                let step = vel.0.z * delta;
                let t = if step < 0.0 {
                    ((kinematic.rest_height - pos.0.z) / step).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let contact = pos.0 + vel.0 * delta * t;
                vel.0.z = -vel.0.z;
                vel.0 *= restitution;
                let mut bounced = contact + vel.0 * delta * (1.0 - t);
                bounced.z = bounced.z.max(kinematic.rest_height);
                pos.0 = bounced;

                if let Some(events) = events.as_mut() {
                    events.push(GameEvent::Sound {
                        cue: SoundCue::Bounce,
                        location: contact,
                    });
                }
            }
            GroundResponse::Land { friction } => {
                pos.0 = next;
                pos.0.z = kinematic.rest_height;
                vel.0.z = vel.0.z.max(0.0);
                let damping = friction.mul_add(-delta, 1.0).max(0.0);
                vel.0.x *= damping;
                vel.0.y *= damping;
            }
        }
    }
}

// Despawn entities whose lifespan ran out. Rockets that expire in flight
// still go off visually, without damage.
pub fn lifespan_system(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut Lifespan, Option<&Projectile>, Option<&Position>)>,
    mut events: Option<ResMut<EventQueue>>,
) {
    for (entity, mut lifespan, projectile, pos) in &mut query {
        lifespan.0.tick(time.delta());
        if !lifespan.0.is_finished() {
            continue;
        }

        if let Some(projectile) = projectile
            && projectile.kind == ProjectileKind::Rocket
            && let Some(pos) = pos
            && let Some(events) = events.as_mut()
        {
            events.push(GameEvent::Sound {
                cue: SoundCue::Explode,
                location: pos.0,
            });
            events.push(GameEvent::Explosion {
                projectile: entity,
                kind: projectile.kind,
                location: pos.0,
            });
        }
        commands.entity(entity).despawn();
    }
}

// ============================================================================
// Simulation Assembly
// ============================================================================

// One frame of simulation, in order. Single-threaded so timer callbacks and
// systems never interleave.
#[must_use]
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            control_rotation_system,
            movement_system,
            teleport_system,
            projectile_contact_system,
            pickup_collection_system,
            perception_system,
            timer_dispatch_system,
            beam_update_system,
            lifespan_system,
        )
            .chain(),
    );
    schedule
}

// World with every resource the systems expect.
#[must_use]
pub fn init_world(tuning: Tuning, seed: u64) -> World {
    let mut world = World::new();
    world.insert_resource(Time::<()>::default());
    world.insert_resource(tuning);
    world.insert_resource(GameRng::seeded(seed));
    world.init_resource::<EventQueue>();
    world.init_resource::<GameTimers>();
    world
}

// Advance simulated time by `delta` and run one frame.
pub fn step(world: &mut World, schedule: &mut Schedule, delta: Duration) {
    world.resource_mut::<Time>().advance_by(delta);
    schedule.run(world);
}
