//! Runtime state of adjustors and target groups

use crate::events::SpdAdjustorStateValues;
use crate::models::ScalingPolicy;
use std::sync::Arc;

/// Per-policy adjustor state, mutated by the filter chain.
///
/// All times are simulation seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SpdAdjustorState {
    pub policy_id: String,
    pub latest_adjustment_at: f64,
    pub number_scales: u32,
    pub cool_down_end: f64,
    pub number_of_scales_in_cooldown: u32,
}

impl SpdAdjustorState {
    pub fn new(policy_id: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            latest_adjustment_at: 0.0,
            number_scales: 0,
            cool_down_end: 0.0,
            number_of_scales_in_cooldown: 0,
        }
    }

    pub fn in_cooldown(&self, time: f64) -> bool {
        time < self.cool_down_end
    }

    /// Record an emitted adjustment and advance cooldown bookkeeping
    pub fn record_adjustment(&mut self, time: f64, cooldown: Option<f64>) {
        self.number_scales += 1;
        self.latest_adjustment_at = time;
        if let Some(cooldown_time) = cooldown {
            if self.in_cooldown(time) {
                self.number_of_scales_in_cooldown += 1;
            } else {
                self.cool_down_end = time + cooldown_time;
                self.number_of_scales_in_cooldown = 1;
            }
        }
    }

    /// Export without target group history
    pub fn export(&self) -> SpdAdjustorStateValues {
        SpdAdjustorStateValues {
            scaling_policy_id: self.policy_id.clone(),
            latest_adjustment_at_sim_time: self.latest_adjustment_at,
            number_scales: self.number_scales,
            cool_down_end: self.cool_down_end,
            number_of_scales_in_cooldown: self.number_of_scales_in_cooldown,
            enacted_policies: Vec::new(),
            enactment_times: Vec::new(),
        }
    }

    /// Restore from persisted values.
    ///
    /// The scale counter only moves forward towards the persisted value.
    pub fn restore(&mut self, values: &SpdAdjustorStateValues) {
        self.cool_down_end = values.cool_down_end;
        self.latest_adjustment_at = values.latest_adjustment_at_sim_time;
        self.number_of_scales_in_cooldown = values.number_of_scales_in_cooldown;
        self.number_scales = self.number_scales.max(values.number_scales);
    }
}

/// Enactment history of one target group, shared by all its policies.
///
/// The three lists are index-aligned: entry `i` describes the `i`-th
/// enacted adjustment.
#[derive(Debug, Clone, Default)]
pub struct TargetGroupState {
    target_group: String,
    enactment_times: Vec<f64>,
    enacted_policies: Vec<Arc<ScalingPolicy>>,
    decisions: Vec<Option<i32>>,
}

impl TargetGroupState {
    pub fn new(target_group: impl Into<String>) -> Self {
        Self {
            target_group: target_group.into(),
            ..Default::default()
        }
    }

    pub fn target_group(&self) -> &str {
        &self.target_group
    }

    /// Append an enactment. `decision` is set for model-based policies.
    pub fn record_enactment(&mut self, time: f64, policy: Arc<ScalingPolicy>, decision: Option<i32>) {
        self.enactment_times.push(time);
        self.enacted_policies.push(policy);
        self.decisions.push(decision);
    }

    pub fn is_empty(&self) -> bool {
        self.enactment_times.is_empty()
    }

    pub fn len(&self) -> usize {
        self.enactment_times.len()
    }

    pub fn last_enactment_time(&self) -> Option<f64> {
        self.enactment_times.last().copied()
    }

    pub fn last_enacted_policy(&self) -> Option<&Arc<ScalingPolicy>> {
        self.enacted_policies.last()
    }

    /// Decision of the last enactment, if it came from a model
    pub fn last_dynamic_decision(&self) -> Option<i32> {
        self.decisions.last().copied().flatten()
    }

    pub fn enacted_policy_ids(&self) -> Vec<String> {
        self.enacted_policies.iter().map(|p| p.id.clone()).collect()
    }

    pub fn enactment_times(&self) -> &[f64] {
        &self.enactment_times
    }
}
