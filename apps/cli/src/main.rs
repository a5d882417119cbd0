//! Trialforge CLI — build pipeline for declarative behavioral experiments.
//!
//! Turns experiment configurations, page directories, and stimulus files
//! into routable timelines, a relational table model, and a resolved
//! experiment registry.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
