//! Scaling policy definition simulator
//!
//! Replays a measurement trace against a scaling policy definition and
//! reports the scaling requests the decision core emits. Also validates
//! and inspects model files.

mod commands;
mod config;
mod output;
mod replay;
mod trace;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, run, validate};
use config::{LogFormat, SpdSimConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Scaling policy definition simulator
#[derive(Parser)]
#[command(name = "spd-sim")]
#[command(author, version, about = "Scaling policy definition simulator", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short, env = "SPD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Log record format on stderr
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a measurement trace against a model
    Run {
        /// Model file (JSON)
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Measurement trace (JSON array or JSON lines)
        #[arg(long, short)]
        trace: Option<PathBuf>,

        /// Last simulated time to process
        #[arg(long)]
        end_time: Option<f64>,

        /// Base seed for model evaluators
        #[arg(long)]
        seed: Option<u64>,

        /// Report requests without applying them to container counts
        #[arg(long)]
        dry_run: bool,

        /// Adjustor state to restore before the replay (JSON array)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Write the final adjustor state to this file
        #[arg(long)]
        export_state: Option<PathBuf>,

        /// Print Prometheus metrics after the report
        #[arg(long)]
        metrics: bool,
    },

    /// Check that every policy of a model can be interpreted
    Validate {
        /// Model file (JSON)
        model: PathBuf,
    },

    /// Show target groups and the filter chain built for each policy
    Inspect {
        /// Model file (JSON)
        model: PathBuf,
    },
}

fn init_tracing(config: &SpdSimConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SpdSimConfig::load(cli.config.as_deref())?;
    if let Some(log_format) = cli.log_format {
        config.log_format = log_format;
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    init_tracing(&config);

    match cli.command {
        Commands::Run {
            model,
            trace,
            end_time,
            seed,
            dry_run,
            checkpoint,
            export_state,
            metrics,
        } => {
            config.model_path = model.or(config.model_path);
            config.trace_path = trace.or(config.trace_path);
            config.end_time = end_time.or(config.end_time);
            config.seed = seed.or(config.seed);
            if dry_run {
                config.simulate_enactment = false;
            }
            let args = run::RunArgs {
                checkpoint,
                export_state,
                print_metrics: metrics,
            };
            run::run_simulation(&config, &args, cli.format)?;
        }
        Commands::Validate { model } => {
            validate::validate_model(&model, &config, cli.format)?;
        }
        Commands::Inspect { model } => {
            inspect::inspect_model(&model, &config, cli.format)?;
        }
    }

    Ok(())
}
