use std::collections::HashMap;

use bevy_ecs::prelude::*;
use common::events::GameEvent;

// ============================================================================
// Skirmish Resources
// ============================================================================

// Running tally for one combatant
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Score {
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: f32,
    pub pickups: u32,
    pub teleports: u32,
}

// Tally of every combatant that did or suffered something
#[derive(Resource, Debug, Default)]
pub struct Scoreboard(pub HashMap<Entity, Score>);

impl Scoreboard {
    pub fn record(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::DamageShown { instigator, amount, .. } => {
                self.0.entry(instigator).or_default().damage_dealt += amount;
            }
            GameEvent::Died { victim, instigator } => {
                self.0.entry(victim).or_default().deaths += 1;
                // Self kills only count against the victim
                if let Some(killer) = instigator.filter(|killer| *killer != victim) {
                    self.0.entry(killer).or_default().kills += 1;
                }
            }
            GameEvent::PickupCollected { collector, .. } => {
                self.0.entry(collector).or_default().pickups += 1;
            }
            GameEvent::Teleported { entity, .. } => {
                self.0.entry(entity).or_default().teleports += 1;
            }
            _ => {}
        }
    }

    #[must_use]
    pub fn get(&self, entity: Entity) -> Score {
        self.0.get(&entity).copied().unwrap_or_default()
    }

    // Most kills first; ties go to fewer deaths, then more damage.
    #[must_use]
    pub fn ranking(&self) -> Vec<(Entity, Score)> {
        let mut ranking: Vec<(Entity, Score)> = self.0.iter().map(|(entity, score)| (*entity, *score)).collect();
        ranking.sort_by(|(_, a), (_, b)| {
            b.kills
                .cmp(&a.kills)
                .then_with(|| a.deaths.cmp(&b.deaths))
                .then_with(|| b.damage_dealt.total_cmp(&a.damage_dealt))
        });
        ranking
    }
}
