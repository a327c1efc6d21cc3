//! Subcommand implementations

pub mod inspect;
pub mod run;
pub mod validate;

use spd_core::{PolicyKind, ScalingPolicy};

/// Short description of what drives a policy
pub(crate) fn policy_kind(policy: &ScalingPolicy) -> String {
    match &policy.kind {
        PolicyKind::Reactive { .. } => "reactive".to_string(),
        PolicyKind::ModelBased { model } => format!("model:{}", model.name()),
    }
}
