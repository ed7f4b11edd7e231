use std::path::Path;

use anyhow::{Context, Result};
use common::config::{Tuning, load_tuning};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// ============================================================================
// Logging
// ============================================================================

const DEFAULT_LOG_FILTER: &str = "info";

// Install the global subscriber. RUST_LOG wins over the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}

// ============================================================================
// Tuning
// ============================================================================

// Tuning from `path`, or the built-in defaults when no file is given.
pub fn resolve_tuning(path: Option<&Path>) -> Result<Tuning> {
    let Some(path) = path else {
        info!("no tuning file given, using defaults");
        return Ok(Tuning::default());
    };
    load_tuning(path).context("Failed to load skirmish tuning")
}
