//! Taskflow CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskflow_foundation::{ConfigLoader, LoggingConfig, TaskflowConfig};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Registry};

/// Taskflow - submit tasks and follow their status
#[derive(Parser, Debug)]
#[command(name = "taskflow")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file applied on top of the user and project configs
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Override the simulated work interval
    #[arg(long, global = true)]
    work_delay_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one task and stream its status (default)
    Run {
        /// Task description
        #[arg(long, default_value = "Sample Task")]
        description: String,

        /// Priority label
        #[arg(short, long, default_value = "HIGH")]
        priority: String,
    },
    /// Submit many tasks, wait for all of them and print statistics
    Load {
        /// Number of tasks to submit
        #[arg(short = 'n', long, default_value = "100")]
        count: usize,

        /// Priority label
        #[arg(short, long, default_value = "LOW")]
        priority: String,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging before config so loader warnings are visible
    let filter = init_logging(args.debug);

    let loader = ConfigLoader::new(&std::env::current_dir()?);
    let config = load_config(&args, loader)?;
    filter.reload(log_filter(args.debug, &config.logging.level))?;

    tracing::debug!(
        max_concurrent = config.engine.max_concurrent,
        work_delay_ms = config.engine.work_delay_ms,
        channel_capacity = config.hub.channel_capacity,
        "configuration loaded"
    );

    match args.command.unwrap_or(Command::Run {
        description: "Sample Task".to_string(),
        priority: "HIGH".to_string(),
    }) {
        Command::Run {
            description,
            priority,
        } => cli::run_once(&config, &description, &priority).await,
        Command::Load {
            count,
            priority,
            json,
        } => cli::run_load(&config, count, &priority, json).await,
        Command::Config => cli::print_config(&config),
    }
}

/// `RUST_LOG` wins, then `--debug`, then the configured level
fn log_filter(debug: bool, level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(level)
        }
    })
}

/// Install the global subscriber. The filter starts at the default level and
/// is swapped once the config is loaded.
fn init_logging(debug: bool) -> reload::Handle<EnvFilter, Registry> {
    let default_level = LoggingConfig::default().level;
    let (filter, handle) = reload::Layer::new(log_filter(debug, &default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
    handle
}

/// Merge config layers, then apply command line overrides
fn load_config(args: &Args, mut loader: ConfigLoader) -> anyhow::Result<TaskflowConfig> {
    if let Some(path) = &args.config {
        loader = loader.with_explicit(path);
    }

    let mut config = loader.load_all()?;
    if let Some(work_delay_ms) = args.work_delay_ms {
        config.engine.work_delay_ms = work_delay_ms;
    }
    Ok(config)
}
