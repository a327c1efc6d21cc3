//! Error types for policy interpretation and model evaluation

use crate::models::{MetricKind, TargetGroupKind};
use thiserror::Error;

/// A policy that cannot be turned into a working chain.
///
/// Interpretation collects these and skips the offending policy; all other
/// policies keep working.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("policy {policy}: expected value '{expected}' is not supported for stimulus {metric}")]
    UnsupportedExpectedValue {
        policy: String,
        metric: MetricKind,
        expected: &'static str,
    },

    #[error("policy {policy}: model-based scaling policies require an interval constraint")]
    MissingIntervalConstraint { policy: String },

    #[error("policy {policy}: target group {target_group} of kind {kind:?} is not supported by the adjustment mechanism")]
    UnsupportedTargetGroup {
        policy: String,
        target_group: String,
        kind: TargetGroupKind,
    },

    #[error("policy {policy}: unknown target group {target_group}")]
    UnknownTargetGroup {
        policy: String,
        target_group: String,
    },

    #[error("policy {policy}: invalid model: {reason}")]
    InvalidModel { policy: String, reason: String },

    #[error("policy {policy}: invalid trigger: {reason}")]
    InvalidTrigger { policy: String, reason: String },
}

impl ConfigurationError {
    pub fn policy(&self) -> &str {
        match self {
            ConfigurationError::UnsupportedExpectedValue { policy, .. }
            | ConfigurationError::MissingIntervalConstraint { policy }
            | ConfigurationError::UnsupportedTargetGroup { policy, .. }
            | ConfigurationError::UnknownTargetGroup { policy, .. }
            | ConfigurationError::InvalidModel { policy, .. }
            | ConfigurationError::InvalidTrigger { policy, .. } => policy,
        }
    }
}

/// A model cannot emit a value yet (not enough data or no update so far)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not emittable: {reason}")]
pub struct NotEmittable {
    pub reason: &'static str,
}

impl NotEmittable {
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}
