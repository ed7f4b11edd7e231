use anyhow::Result;
use clap::Parser;

use arena::{Args, init_tracing, run_skirmish};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    run_skirmish(args).await?;
    Ok(())
}
