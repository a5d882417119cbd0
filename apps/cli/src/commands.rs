//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;

use trialforge_core::BuildConfig;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Trialforge — compile declarative experiments into runnable artifacts.
#[derive(Parser)]
#[command(
    name = "trialforge",
    version,
    about = "Compile experiment configurations into timelines, tables, and a registry.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full build and write artifacts.
    Build {
        /// Project root directory.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Extra config layer roots, outermost-first (repeatable).
        #[arg(long = "layer")]
        layers: Vec<PathBuf>,

        /// Output directory (defaults to <root>/.trialforge).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run the full pipeline without writing any artifacts.
    Check {
        /// Project root directory.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Extra config layer roots, outermost-first (repeatable).
        #[arg(long = "layer")]
        layers: Vec<PathBuf>,
    },

    /// List the resolved experiments.
    List {
        /// Project root directory.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Extra config layer roots, outermost-first (repeatable).
        #[arg(long = "layer")]
        layers: Vec<PathBuf>,

        /// Emit the registry as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "trialforge=info",
        1 => "trialforge=debug",
        _ => "trialforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build { root, layers, out } => cmd_build(root, layers, out).await,
        Command::Check { root, layers } => cmd_check(root, layers).await,
        Command::List { root, layers, json } => cmd_list(root, layers, json).await,
    }
}

fn build_config(root: PathBuf, layers: Vec<PathBuf>, out: Option<PathBuf>) -> BuildConfig {
    let mut config = BuildConfig::new(root);
    config.layer_roots = layers;
    config.out_dir = out;
    config
}

async fn cmd_build(root: PathBuf, layers: Vec<PathBuf>, out: Option<PathBuf>) -> Result<()> {
    let config = build_config(root, layers, out);
    info!(project = %config.project_root.display(), "building experiments");

    let result = trialforge_core::build(&config).await?;

    println!();
    println!("  Build complete!");
    println!("  Experiments: {}", result.experiments);
    println!("  Steps:       {}", result.steps);
    println!("  Tables:      {}", result.tables);
    println!("  Records:     {}", result.records);
    println!("  Output:      {}", result.out_dir.display());
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_check(root: PathBuf, layers: Vec<PathBuf>) -> Result<()> {
    let config = build_config(root, layers, None);
    info!(project = %config.project_root.display(), "checking experiments");

    let output = trialforge_core::check(&config).await?;

    let steps: usize = output
        .registry
        .experiments
        .values()
        .map(|e| e.steps.len())
        .sum();
    println!();
    println!("  Check passed.");
    println!("  Experiments: {}", output.registry.experiments.len());
    println!("  Steps:       {steps}");
    println!("  Tables:      {}", output.tables.len());
    println!();

    Ok(())
}

async fn cmd_list(root: PathBuf, layers: Vec<PathBuf>, json: bool) -> Result<()> {
    let config = build_config(root, layers, None);
    let resolved = trialforge_core::resolve(&config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    println!();
    for (id, experiment) in &resolved.experiments {
        let marker = if *id == resolved.active_experiment {
            "*"
        } else {
            " "
        };
        println!(
            "  {marker} {id}  ({}, {})  table={}",
            experiment.duration, experiment.compensation, experiment.table_name
        );
    }
    println!();
    println!("  * active experiment");
    println!();

    Ok(())
}
