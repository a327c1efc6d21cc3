use crate::chain::{ChainEvent, FilterContext, FilterResult};

/// Enforces a minimum spacing between two adjustments of the same policy
#[derive(Debug, Clone)]
pub struct IntervalConstraint {
    offset: f64,
    interval_duration: f64,
}

impl IntervalConstraint {
    pub fn new(offset: f64, interval_duration: f64) -> Self {
        Self {
            offset,
            interval_duration,
        }
    }

    pub fn process(&self, event: ChainEvent, ctx: &FilterContext<'_>) -> FilterResult {
        let time = event.time();
        if time < self.offset {
            return FilterResult::Disregard(format!(
                "interval constraint starts at {:.1}",
                self.offset
            ));
        }
        let state = &*ctx.state;
        let earliest = state.latest_adjustment_at + self.interval_duration;
        if state.number_scales > 0 && time < earliest {
            return FilterResult::Disregard(format!(
                "interval of {:.1}s since last adjustment at {:.1} not elapsed",
                self.interval_duration, state.latest_adjustment_at
            ));
        }
        FilterResult::Success(event)
    }
}
