//! Model validation

use super::policy_kind;
use crate::config::SpdSimConfig;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use serde::Serialize;
use spd_core::{SpdInterpreter, SpdModel};
use std::path::Path;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
pub struct PolicyStatusRow {
    #[tabled(rename = "Policy")]
    pub policy: String,
    #[tabled(rename = "Target Group")]
    pub target_group: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

/// Interpret the model and report which policies would run.
///
/// Fails when any active policy is rejected.
pub fn validate_model(path: &Path, config: &SpdSimConfig, format: OutputFormat) -> Result<()> {
    let model = SpdModel::from_path(path)?;
    let result = SpdInterpreter::new(config.interpreter_config()).interpret(&model);

    let rows: Vec<PolicyStatusRow> = model
        .scaling_policies
        .iter()
        .map(|policy| {
            let error = result.errors.iter().find(|e| e.policy() == policy.id);
            let (status, detail) = match error {
                _ if !policy.active => ("inactive", String::new()),
                Some(error) => ("rejected", error.to_string()),
                None => ("ok", String::new()),
            };
            let status = match format {
                OutputFormat::Table => output::color_status(status),
                OutputFormat::Json => status.to_string(),
            };
            PolicyStatusRow {
                policy: policy.id.clone(),
                target_group: policy.target_group.clone(),
                kind: policy_kind(policy),
                status,
                detail,
            }
        })
        .collect();

    output::print_table(&rows, format, "Model declares no scaling policies");

    if !result.errors.is_empty() {
        bail!(
            "{} of {} scaling policies rejected",
            result.errors.len(),
            model.scaling_policies.len()
        );
    }
    if let OutputFormat::Table = format {
        output::print_success(&format!(
            "{} scaling policies ready",
            result.contexts.len()
        ));
    }
    Ok(())
}
