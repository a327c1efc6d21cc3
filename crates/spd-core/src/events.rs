//! Events flowing into the scaling engine and requests flowing out

use crate::models::{AdjustmentType, ContainerBounds, Measurement};
use serde::{Deserialize, Serialize};

/// Input event of the scaling engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpdEvent {
    Measurement(Measurement),
    /// One-shot simulation time marker
    TimeReached { time: f64 },
    /// Periodic tick for the model-based policies of one target group
    RepeatedTimeReached(RepeatedTimeReached),
    /// Restore persisted adjustor state
    StateInitialized(SpdAdjustorStateValues),
}

impl SpdEvent {
    pub fn time(&self) -> f64 {
        match self {
            SpdEvent::Measurement(m) => m.time,
            SpdEvent::TimeReached { time } => *time,
            SpdEvent::RepeatedTimeReached(tick) => tick.time,
            SpdEvent::StateInitialized(values) => values.latest_adjustment_at_sim_time,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SpdEvent::Measurement(_) => "measurement",
            SpdEvent::TimeReached { .. } => "time_reached",
            SpdEvent::RepeatedTimeReached(_) => "repeated_time_reached",
            SpdEvent::StateInitialized(_) => "state_initialized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatedTimeReached {
    pub target_group: String,
    pub time: f64,
    pub interval: f64,
}

impl RepeatedTimeReached {
    /// The tick that follows this one
    pub fn next(&self) -> Self {
        Self {
            target_group: self.target_group.clone(),
            time: self.time + self.interval,
            interval: self.interval,
        }
    }
}

/// Adjustment carried by a scaling request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestedAdjustment {
    Step { delta: i32 },
    Relative { percentage_growth: f64 },
    Absolute { target_size: u32 },
}

impl From<&AdjustmentType> for RequestedAdjustment {
    fn from(adjustment: &AdjustmentType) -> Self {
        match adjustment {
            AdjustmentType::Step { step_value } => RequestedAdjustment::Step { delta: *step_value },
            AdjustmentType::Relative { percentage_growth } => RequestedAdjustment::Relative {
                percentage_growth: *percentage_growth,
            },
            AdjustmentType::Absolute { goal_value } => RequestedAdjustment::Absolute {
                target_size: *goal_value,
            },
        }
    }
}

impl RequestedAdjustment {
    /// Size the target group would have after enactment, kept within `bounds`
    pub fn resulting_size(&self, current: u32, bounds: &ContainerBounds) -> u32 {
        let raw = match self {
            RequestedAdjustment::Step { delta } => i64::from(current) + i64::from(*delta),
            RequestedAdjustment::Relative { percentage_growth } => {
                let change = (f64::from(current) * percentage_growth / 100.0).round() as i64;
                i64::from(current) + change
            }
            RequestedAdjustment::Absolute { target_size } => i64::from(*target_size),
        };
        bounds.clamp(raw)
    }

    /// Signed delta for step requests
    pub fn delta(&self) -> Option<i32> {
        match self {
            RequestedAdjustment::Step { delta } => Some(*delta),
            _ => None,
        }
    }
}

/// Request handed to the enactment mechanism
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRequest {
    pub policy_id: String,
    pub target_group: String,
    pub adjustment: RequestedAdjustment,
    pub time: f64,
    /// Decision of a model-based policy, kept for thrashing bookkeeping
    #[serde(default)]
    pub model_decision: Option<i32>,
}

/// Persistable adjustor state of one policy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpdAdjustorStateValues {
    pub scaling_policy_id: String,
    pub latest_adjustment_at_sim_time: f64,
    pub number_scales: u32,
    pub cool_down_end: f64,
    pub number_of_scales_in_cooldown: u32,
    /// Policies enacted on the target group, oldest first
    #[serde(default)]
    pub enacted_policies: Vec<String>,
    /// Enactment times aligned with `enacted_policies`
    #[serde(default)]
    pub enactment_times: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resulting_size_clamped() {
        let bounds = ContainerBounds::new(1, 5);
        assert_eq!(RequestedAdjustment::Step { delta: 3 }.resulting_size(4, &bounds), 5);
        assert_eq!(RequestedAdjustment::Step { delta: -3 }.resulting_size(2, &bounds), 1);
        assert_eq!(
            RequestedAdjustment::Relative {
                percentage_growth: 50.0
            }
            .resulting_size(2, &bounds),
            3
        );
        assert_eq!(
            RequestedAdjustment::Absolute { target_size: 9 }.resulting_size(2, &bounds),
            5
        );
    }

    #[test]
    fn test_repeated_tick_next() {
        let tick = RepeatedTimeReached {
            target_group: "tg".into(),
            time: 10.0,
            interval: 5.0,
        };
        assert_eq!(tick.next().time, 15.0);
        assert_eq!(SpdEvent::RepeatedTimeReached(tick).kind(), "repeated_time_reached");
    }
}
