pub mod components;
pub mod config;
pub mod constants;
pub mod resources;
pub mod skirmish;
pub mod systems;

pub use config::{init_tracing, resolve_tuning};
pub use skirmish::{Skirmish, Standing};

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::constants::SKIRMISH_LOOP_FREQUENCY;

// ============================================================================
// CLI Argument Parsing
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless arena skirmish", long_about = None)]
pub struct Args {
    // JSON tuning file; built-in values when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    // Number of bots besides the player
    #[arg(short, long, default_value_t = 3)]
    pub bots: usize,

    // Simulated match length
    #[arg(short, long, default_value_t = 60.0)]
    pub seconds: f64,

    // Seed for spawn points and pickup scatter
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    // Pace frames with the wall clock instead of running flat out
    #[arg(long, default_value_t = false)]
    pub realtime: bool,
}

impl Args {
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        (self.seconds.max(0.0) * SKIRMISH_LOOP_FREQUENCY as f64).round() as u64
    }
}

// ============================================================================
// Main Skirmish Loop
// ============================================================================

pub async fn run_skirmish(args: Args) -> Result<Vec<Standing>> {
    let tuning = resolve_tuning(args.config.as_deref())?;
    let mut skirmish = Skirmish::new(tuning, args.bots, args.seed);

    let tick_duration = Duration::from_nanos(1_000_000_000 / SKIRMISH_LOOP_FREQUENCY);
    let frames = args.frame_count();
    info!("running {frames} frames ({:.1}s simulated)", args.seconds);

    if args.realtime {
        // Run at SKIRMISH_LOOP_FREQUENCY Hz
        let mut interval = time::interval(tick_duration);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while skirmish.frame() < frames {
            interval.tick().await;

            let update_start = Instant::now();
            skirmish.step(tick_duration);
            let update_elapsed = update_start.elapsed();

            if update_elapsed > tick_duration {
                warn!(
                    "tick {} took {:.2}ms (exceeded {:.2}ms budget)",
                    skirmish.frame(),
                    update_elapsed.as_secs_f64() * 1000.0,
                    tick_duration.as_secs_f64() * 1000.0
                );
            }
        }
    } else {
        while skirmish.frame() < frames {
            skirmish.step(tick_duration);
        }
    }

    let standings = skirmish.standings();
    for (rank, standing) in standings.iter().enumerate() {
        let score = &standing.score;
        info!(
            "#{} {}: {} kills, {} deaths, {:.0} damage, {} pickups, {} teleports",
            rank + 1,
            standing.name,
            score.kills,
            score.deaths,
            score.damage_dealt,
            score.pickups,
            score.teleports
        );
    }
    Ok(standings)
}
