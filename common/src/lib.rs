pub mod ai;
pub mod collision;
pub mod combat;
pub mod components;
pub mod config;
pub mod constants;
pub mod events;
pub mod handle;
pub mod markers;
pub mod pickup;
pub mod portal;
pub mod projectile;
pub mod resources;
pub mod scheduler;
pub mod splash;
pub mod systems;
pub mod timers;
pub mod weapon;

pub use handle::WeakRef;
pub use scheduler::{Scheduler, TimerHandle};
