use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use waypoint_cli::cli::{
    cmd_capture, cmd_frames, cmd_resolve, CaptureArgs, FramesArgs, Outcome, ResolveArgs,
};
use waypoint_cli::init_tracing;
use waypoint_policy_center::load_policy;

use anchor_locator::Locator;

/// Waypoint - capture elements as resilient targets and re-find them later
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ", built ", env!("BUILD_DATE"), ")"))]
#[command(propagate_version = true)]
struct Cli {
    /// Locator policy file (YAML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture an element as a target descriptor (JSON on stdout)
    Capture(CaptureArgs),

    /// Resolve a target descriptor against a page
    Resolve(ResolveArgs),

    /// List the documents a cross-frame search would visit
    Frames(FramesArgs),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let code = match run(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("Command failed: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<Outcome> {
    if let Some(path) = cli.config.as_deref() {
        if !path.exists() {
            bail!("policy file {} does not exist", path.display());
        }
    }
    let policy = load_policy(cli.config.as_deref()).context("failed to load locator policy")?;
    info!(rev = policy.rev, "policy loaded");
    let locator = Locator::new(policy);

    match cli.command {
        Commands::Capture(args) => cmd_capture(args, &locator),
        Commands::Resolve(args) => cmd_resolve(args, &locator),
        Commands::Frames(args) => cmd_frames(args, &locator),
    }
}
