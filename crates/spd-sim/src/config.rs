//! Simulator configuration
//!
//! Values come from an optional config file, then `SPD_*` environment
//! variables; command line flags override both.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use spd_core::constraint::DEFAULT_LEARNING_PERIOD;
use spd_core::InterpreterConfig;
use std::path::{Path, PathBuf};

/// Log record layout on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Simulator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpdSimConfig {
    /// Scaling policy definition (JSON)
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Measurement trace (JSON array or JSON lines)
    #[serde(default)]
    pub trace_path: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base seed for model evaluators; unseeded runs are not reproducible
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_learning_period")]
    pub thrashing_learning_period: f64,

    /// Apply scaling requests to the simulated container counts
    #[serde(default = "default_simulate_enactment")]
    pub simulate_enactment: bool,

    /// Stop time; defaults to the last measurement of the trace
    #[serde(default)]
    pub end_time: Option<f64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_learning_period() -> f64 {
    DEFAULT_LEARNING_PERIOD
}

fn default_simulate_enactment() -> bool {
    true
}

impl Default for SpdSimConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            trace_path: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            seed: None,
            thrashing_learning_period: default_learning_period(),
            simulate_enactment: default_simulate_enactment(),
            end_time: None,
        }
    }
}

impl SpdSimConfig {
    /// Load configuration from `file` (if given) and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("SPD").try_parsing(true))
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Invalid simulator configuration")
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        let config = InterpreterConfig::default().with_learning_period(self.thrashing_learning_period);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SpdSimConfig::default();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_level, "info");
        assert!(config.simulate_enactment);
        assert_eq!(config.thrashing_learning_period, DEFAULT_LEARNING_PERIOD);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "log_format = \"json\"\nseed = 42\nthrashing_learning_period = 0.0\nsimulate_enactment = false"
        )
        .unwrap();

        let config = SpdSimConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.thrashing_learning_period, 0.0);
        assert!(!config.simulate_enactment);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(SpdSimConfig::load(Some(Path::new("/nonexistent/spd.toml"))).is_err());
    }
}
