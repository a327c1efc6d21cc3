//! Model inspection: target groups and the filter chain of each policy

use super::policy_kind;
use crate::config::SpdSimConfig;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use spd_core::{PolicyConstraint, SpdInterpreter, SpdModel};
use std::path::Path;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
pub struct TargetGroupRow {
    #[tabled(rename = "Target Group")]
    pub id: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Elements")]
    pub elements: usize,
    #[tabled(rename = "Initial")]
    pub initial_size: u32,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "Max")]
    pub max: String,
    #[tabled(rename = "No-Thrashing (s)")]
    pub thrashing: String,
}

#[derive(Debug, Serialize, Tabled)]
pub struct ChainRow {
    #[tabled(rename = "Policy")]
    pub policy: String,
    #[tabled(rename = "Target Group")]
    pub target_group: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Constraints")]
    pub constraints: String,
    #[tabled(rename = "Filter Chain")]
    pub chain: String,
}

#[derive(Debug, Serialize)]
struct Inspection<'a> {
    target_groups: &'a [TargetGroupRow],
    policies: &'a [ChainRow],
}

pub fn inspect_model(path: &Path, config: &SpdSimConfig, format: OutputFormat) -> Result<()> {
    let model = SpdModel::from_path(path)?;
    let result = SpdInterpreter::new(config.interpreter_config()).interpret(&model);

    let groups: Vec<TargetGroupRow> = model
        .target_groups
        .iter()
        .map(|tg| {
            let bounds = tg.size_bounds();
            let thrashing: Vec<String> = tg.thrashing_intervals().map(|t| format!("{t:.0}")).collect();
            TargetGroupRow {
                id: tg.id.clone(),
                kind: format!("{:?}", tg.kind),
                elements: tg.elements.len(),
                initial_size: tg.initial_size,
                min: output::format_bound(bounds.min, bounds.constrained),
                max: output::format_bound(bounds.max, bounds.constrained),
                thrashing: if thrashing.is_empty() {
                    "-".to_string()
                } else {
                    thrashing.join(", ")
                },
            }
        })
        .collect();

    let chains: Vec<ChainRow> = result
        .contexts
        .iter()
        .map(|context| {
            let policy = context.policy();
            let constraints: Vec<String> = policy
                .policy_constraints
                .iter()
                .map(|constraint| match constraint {
                    PolicyConstraint::Interval {
                        offset,
                        interval_duration,
                    } => format!("interval {interval_duration}s from {offset}s"),
                    PolicyConstraint::Cooldown {
                        cooldown_time,
                        max_scaling_operations,
                    } => format!("cooldown {cooldown_time}s x{max_scaling_operations}"),
                })
                .collect();
            ChainRow {
                policy: policy.id.clone(),
                target_group: policy.target_group.clone(),
                kind: policy_kind(policy),
                constraints: constraints.join(", "),
                chain: context.chain().filter_names().join(" > "),
            }
        })
        .collect();

    match format {
        OutputFormat::Json => output::print_json(&Inspection {
            target_groups: &groups,
            policies: &chains,
        }),
        OutputFormat::Table => {
            output::print_table(&groups, format, "No target groups");
            output::print_table(&chains, format, "No runnable scaling policies");
            for error in &result.errors {
                output::print_warning(&error.to_string());
            }
        }
    }
    Ok(())
}
