pub mod bots;
pub mod respawn;

pub use bots::bot_brain_system;
pub use respawn::{death_system, respawn_system};
