use bevy_ecs::prelude::*;
use bevy_time::Time;

use crate::{
    pickup::{end_powerup_effect, reactivate_powerup, update_powerup_progress},
    projectile::{annihilate, attract, implode},
    scheduler::{Scheduler, TimerHandle},
    weapon::{enable_fire, lightning_hit_scan},
};

// ============================================================================
// Timer Actions
// ============================================================================

// Every deferred callback in the game, keyed by the entity it acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    LightningHitScan { weapon: Entity },
    EnableFire { weapon: Entity },
    GrenadeImplode { grenade: Entity },
    GrenadeAttract { grenade: Entity },
    GrenadeAnnihilate { grenade: Entity },
    PowerupReactivate { pickup: Entity },
    PowerupProgress { pickup: Entity },
    PowerupEffectEnd { pickup: Entity },
}

pub type GameTimers = Scheduler<TimerAction>;

// ============================================================================
// Dispatch
// ============================================================================

// Advance the timer clock by the frame delta and run every due action in
// fire-time order. Actions may schedule or cancel timers; anything that comes
// due within this frame still runs this frame.
pub fn timer_dispatch_system(world: &mut World) {
    let delta = world.get_resource::<Time>().map_or(0.0, Time::delta_secs_f64);
    let Some(until) = world.get_resource::<GameTimers>().map(|timers| timers.now() + delta) else {
        return;
    };

    loop {
        let Some((handle, action)) = world.resource_mut::<GameTimers>().pop_due(until) else {
            break;
        };
        dispatch(world, handle, action);
    }
    world.resource_mut::<GameTimers>().advance_to(until);
}

fn dispatch(world: &mut World, handle: TimerHandle, action: TimerAction) {
    match action {
        TimerAction::LightningHitScan { weapon } => lightning_hit_scan(world, weapon, handle),
        TimerAction::EnableFire { weapon } => enable_fire(world, weapon),
        TimerAction::GrenadeImplode { grenade } => implode(world, grenade),
        TimerAction::GrenadeAttract { grenade } => attract(world, grenade, handle),
        TimerAction::GrenadeAnnihilate { grenade } => annihilate(world, grenade),
        TimerAction::PowerupReactivate { pickup } => reactivate_powerup(world, pickup),
        TimerAction::PowerupProgress { pickup } => update_powerup_progress(world, pickup, handle),
        TimerAction::PowerupEffectEnd { pickup } => end_powerup_effect(world, pickup),
    }
}
