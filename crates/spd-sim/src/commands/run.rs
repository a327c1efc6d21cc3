//! Trace replay

use crate::config::SpdSimConfig;
use crate::output::{self, OutputFormat};
use crate::replay::{ReplayOptions, Simulator};
use crate::trace::load_trace;
use anyhow::{Context, Result};
use spd_core::{SpdAdjustorStateValues, SpdModel};
use std::path::{Path, PathBuf};
use tracing::info;

/// Arguments of `spd-sim run` after merging with the configuration
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub checkpoint: Option<PathBuf>,
    pub export_state: Option<PathBuf>,
    pub print_metrics: bool,
}

pub fn run_simulation(config: &SpdSimConfig, args: &RunArgs, format: OutputFormat) -> Result<()> {
    let model_path = config
        .model_path
        .as_deref()
        .context("No model given; pass --model or set SPD_MODEL_PATH")?;
    let model = SpdModel::from_path(model_path)?;
    let trace = match &config.trace_path {
        Some(path) => load_trace(path)?,
        None => Vec::new(),
    };
    info!(
        model = %model.name,
        policies = model.scaling_policies.len(),
        measurements = trace.len(),
        "Starting replay"
    );

    let options = ReplayOptions {
        simulate_enactment: config.simulate_enactment,
        end_time: config.end_time,
    };
    let mut simulator = Simulator::new(&model, config.interpreter_config(), options);
    if let Some(path) = &args.checkpoint {
        simulator.restore(&load_checkpoints(path)?);
    }
    simulator.schedule_trace(trace);

    let report = simulator.run();
    output::print_report(&report, format);

    if let Some(path) = &args.export_state {
        let states = simulator.engine().export_states();
        let json = serde_json::to_string_pretty(&states).context("Failed to serialize adjustor state")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write state file {}", path.display()))?;
        info!(path = %path.display(), policies = states.len(), "Adjustor state exported");
    }

    if args.print_metrics {
        let metrics = simulator
            .engine()
            .metrics()
            .render()
            .context("Failed to render metrics")?;
        println!("{metrics}");
    }

    simulator.engine().shutdown("replay finished");
    Ok(())
}

fn load_checkpoints(path: &Path) -> Result<Vec<SpdAdjustorStateValues>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read checkpoint file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse checkpoint file {}", path.display()))
}
