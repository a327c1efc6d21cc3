use super::{ChainEvent, FilterContext, FilterResult};
use crate::events::SpdEvent;

/// Head of every chain: drops events concerning other target groups
#[derive(Debug, Clone)]
pub struct TargetGroupChecker {
    target_group: String,
}

impl TargetGroupChecker {
    pub fn new(target_group: impl Into<String>) -> Self {
        Self {
            target_group: target_group.into(),
        }
    }

    pub fn process(&self, event: ChainEvent, ctx: &FilterContext<'_>) -> FilterResult {
        let rejection = match &event {
            ChainEvent::Filtering(object) => self.rejection(&object.event, ctx),
            ChainEvent::ScalingRequested(_) => None,
        };
        match rejection {
            Some(reason) => FilterResult::Disregard(reason),
            None => FilterResult::Success(event),
        }
    }

    fn rejection(&self, event: &SpdEvent, ctx: &FilterContext<'_>) -> Option<String> {
        match event {
            SpdEvent::Measurement(m) if !ctx.target_group.contains_element(&m.entity) => Some(format!(
                "{} does not belong to target group {}",
                m.entity, self.target_group
            )),
            SpdEvent::RepeatedTimeReached(tick) if tick.target_group != self.target_group => {
                Some(format!(
                    "timer of target group {} is not for {}",
                    tick.target_group, self.target_group
                ))
            }
            SpdEvent::StateInitialized(_) => Some("state events are not filtered".to_string()),
            _ => None,
        }
    }
}
