use crate::chain::{ChainEvent, FilterContext, FilterResult};

/// Limits the number of adjustments inside one cooldown window
#[derive(Debug, Clone)]
pub struct CooldownConstraint {
    cooldown_time: f64,
    max_scaling_operations: u32,
}

impl CooldownConstraint {
    pub fn new(cooldown_time: f64, max_scaling_operations: u32) -> Self {
        Self {
            cooldown_time,
            max_scaling_operations,
        }
    }

    pub fn cooldown_time(&self) -> f64 {
        self.cooldown_time
    }

    pub fn process(&self, event: ChainEvent, ctx: &FilterContext<'_>) -> FilterResult {
        let time = event.time();
        let state = &*ctx.state;
        if state.in_cooldown(time) && state.number_of_scales_in_cooldown >= self.max_scaling_operations {
            return FilterResult::Disregard(format!(
                "cooldown active until {:.1} ({} of {} scaling operations used)",
                state.cool_down_end, state.number_of_scales_in_cooldown, self.max_scaling_operations
            ));
        }
        FilterResult::Success(event)
    }
}
