use crate::chain::{ChainEvent, FilterResult};
use crate::events::SpdEvent;
use crate::model::ModelEvaluator;

/// Trigger stage of model-based policies.
///
/// Measurements are recorded into the model and stop there; timer ticks
/// update the model and carry its decision on to the constraints.
#[derive(Debug)]
pub struct ModelTriggerChecker {
    evaluator: Box<dyn ModelEvaluator>,
}

impl ModelTriggerChecker {
    pub fn new(evaluator: Box<dyn ModelEvaluator>) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &dyn ModelEvaluator {
        self.evaluator.as_ref()
    }

    pub fn process(&mut self, event: ChainEvent) -> FilterResult {
        let mut object = match event {
            ChainEvent::Filtering(object) => object,
            passthrough => return FilterResult::Success(passthrough),
        };
        let decision = match &object.event {
            SpdEvent::Measurement(measurement) => {
                self.evaluator.record_usage(measurement);
                return FilterResult::Wait(format!("{} recorded by model", measurement.metric));
            }
            SpdEvent::StateInitialized(_) => {
                return FilterResult::Disregard("state events are not evaluated".to_string());
            }
            SpdEvent::RepeatedTimeReached(_) | SpdEvent::TimeReached { .. } => self
                .evaluator
                .update()
                .and_then(|()| self.evaluator.decision()),
        };
        match decision {
            Ok(delta) => {
                object.decision = Some(delta);
                FilterResult::Success(ChainEvent::Filtering(object))
            }
            Err(not_emittable) => FilterResult::Wait(not_emittable.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FilterObject;
    use crate::events::RepeatedTimeReached;
    use crate::model::RandomEvaluator;
    use crate::models::{Measurement, MetricKind, RandomModel};

    fn checker() -> ModelTriggerChecker {
        let model = RandomModel {
            min_adjustment: 1,
            max_adjustment: 1,
            seed: None,
        };
        ModelTriggerChecker::new(Box::new(RandomEvaluator::new(&model, Some(5)).unwrap()))
    }

    #[test]
    fn test_measurement_is_recorded_and_waits() {
        let mut checker = checker();
        let event = SpdEvent::Measurement(Measurement::new(MetricKind::CpuUtilization, 0.5, "vm", 1.0));
        let result = checker.process(ChainEvent::Filtering(FilterObject::new(event)));
        assert!(matches!(result, FilterResult::Wait(_)));
    }

    #[test]
    fn test_tick_attaches_decision() {
        let mut checker = checker();
        let tick = SpdEvent::RepeatedTimeReached(RepeatedTimeReached {
            target_group: "tg".into(),
            time: 10.0,
            interval: 10.0,
        });
        match checker.process(ChainEvent::Filtering(FilterObject::new(tick))) {
            FilterResult::Success(ChainEvent::Filtering(object)) => {
                assert_eq!(object.decision, Some(1));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
