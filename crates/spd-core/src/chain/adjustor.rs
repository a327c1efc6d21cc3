use super::{ChainEvent, FilterContext, FilterResult};
use crate::events::{RequestedAdjustment, ScalingRequest};
use crate::models::PolicyKind;

/// Tail of every chain: turns a surviving event into a scaling request
#[derive(Debug, Clone, Default)]
pub struct Adjustor {
    cooldown_time: Option<f64>,
}

impl Adjustor {
    pub fn new(cooldown_time: Option<f64>) -> Self {
        Self { cooldown_time }
    }

    pub fn process(&self, event: ChainEvent, ctx: &mut FilterContext<'_>) -> FilterResult {
        let object = match event {
            ChainEvent::Filtering(object) => object,
            passthrough => return FilterResult::Success(passthrough),
        };

        let (adjustment, model_decision) = match &ctx.policy.kind {
            PolicyKind::Reactive { adjustment, .. } => (RequestedAdjustment::from(adjustment), None),
            PolicyKind::ModelBased { .. } => {
                let Some(delta) = object.decision else {
                    return FilterResult::Disregard("model produced no decision".to_string());
                };
                (RequestedAdjustment::Step { delta }, Some(delta))
            }
        };

        ctx.state.record_adjustment(object.time, self.cooldown_time);

        FilterResult::Success(ChainEvent::ScalingRequested(ScalingRequest {
            policy_id: ctx.policy.id.clone(),
            target_group: ctx.target_group.id.clone(),
            adjustment,
            time: object.time,
            model_decision,
        }))
    }
}
