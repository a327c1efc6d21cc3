use crate::chain::{ChainEvent, FilterContext, FilterResult};
use crate::models::{AdjustmentSign, ScalingPolicy};

/// Default length of the exploration period for learning models (simulated seconds)
pub const DEFAULT_LEARNING_PERIOD: f64 = 1000.0;

/// Prevents reversing the scaling direction too soon after an enactment
#[derive(Debug, Clone)]
pub struct ThrashingConstraint {
    minimum_time_no_thrashing: f64,
    learning_period: f64,
}

impl ThrashingConstraint {
    pub fn new(minimum_time_no_thrashing: f64) -> Self {
        Self {
            minimum_time_no_thrashing,
            learning_period: DEFAULT_LEARNING_PERIOD,
        }
    }

    pub fn with_learning_period(mut self, learning_period: f64) -> Self {
        self.learning_period = learning_period;
        self
    }

    /// A reversal at exactly `last enactment + minimum` is allowed.
    pub fn process(&self, event: ChainEvent, ctx: &FilterContext<'_>) -> FilterResult {
        let (time, decision) = match &event {
            ChainEvent::Filtering(object) => (object.time, object.decision),
            ChainEvent::ScalingRequested(request) => (request.time, request.model_decision),
        };

        let history = ctx.target_group_state;
        let (Some(last_policy), Some(last_time)) =
            (history.last_enacted_policy(), history.last_enactment_time())
        else {
            return FilterResult::Success(event);
        };

        // learning models explore freely at the start
        if last_policy.uses_learning_model() && time < self.learning_period {
            return FilterResult::Success(event);
        }

        if is_absolute(ctx.policy) || is_absolute(last_policy) {
            return FilterResult::Success(event);
        }

        let current_sign = sign_of(ctx.policy, decision);
        let last_sign = sign_of(last_policy, history.last_dynamic_decision());
        if last_sign == AdjustmentSign::Neutral {
            return FilterResult::Success(event);
        }

        if current_sign != last_sign && last_time + self.minimum_time_no_thrashing > time {
            return FilterResult::Disregard(format!(
                "thrashing constraint violated: {:?} after {:?} enacted by {} at {:.1} (minimum {:.1}s)",
                current_sign, last_sign, last_policy.id, last_time, self.minimum_time_no_thrashing
            ));
        }
        FilterResult::Success(event)
    }
}

fn is_absolute(policy: &ScalingPolicy) -> bool {
    policy.adjustment().is_some_and(|a| a.is_absolute())
}

/// Static sign for reactive policies, decision sign for model-based ones
fn sign_of(policy: &ScalingPolicy, decision: Option<i32>) -> AdjustmentSign {
    match policy.adjustment() {
        Some(adjustment) => adjustment.sign(),
        None => decision.map_or(AdjustmentSign::Neutral, AdjustmentSign::from_delta),
    }
}
