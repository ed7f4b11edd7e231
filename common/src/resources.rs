use bevy_ecs::prelude::*;
use rand::{SeedableRng, rngs::StdRng};

// ============================================================================
// Shared Resources
// ============================================================================

// Seeded random source for everything gameplay rolls (pickup scatter, spawn
// points), so a run can be replayed from its seed.
#[derive(Resource)]
pub struct GameRng(pub StdRng);

impl GameRng {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::seeded(0)
    }
}
