use super::ModelEvaluator;
use crate::aggregator::StimulusAggregator;
use crate::error::NotEmittable;
use crate::models::{Measurement, QThresholdsModel};

/// Buckets an aggregated stimulus into configured deltas
#[derive(Debug)]
pub struct QThresholdsEvaluator {
    aggregator: StimulusAggregator,
    thresholds: Vec<f64>,
    deltas: Vec<i32>,
    current: Option<i32>,
}

impl QThresholdsEvaluator {
    pub fn new(model: &QThresholdsModel) -> Result<Self, String> {
        if model.deltas.len() != model.thresholds.len() + 1 {
            return Err(format!(
                "{} thresholds need {} deltas, got {}",
                model.thresholds.len(),
                model.thresholds.len() + 1,
                model.deltas.len()
            ));
        }
        if model.thresholds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("thresholds must be strictly ascending".to_string());
        }
        Ok(Self {
            aggregator: StimulusAggregator::fixed(
                model.stimulus.clone(),
                model.window_size,
                model.aggregation,
            ),
            thresholds: model.thresholds.clone(),
            deltas: model.deltas.clone(),
            current: None,
        })
    }

    /// Delta of the bucket `value` falls into
    pub fn bucket(&self, value: f64) -> i32 {
        let index = self.thresholds.iter().take_while(|t| value >= **t).count();
        self.deltas[index]
    }
}

impl ModelEvaluator for QThresholdsEvaluator {
    fn update(&mut self) -> Result<(), NotEmittable> {
        let value = self.aggregator.result()?;
        self.current = Some(self.bucket(value));
        Ok(())
    }

    fn decision(&self) -> Result<i32, NotEmittable> {
        self.current
            .ok_or(NotEmittable::new("model has not been updated yet"))
    }

    fn record_usage(&mut self, measurement: &Measurement) {
        self.aggregator.record(measurement);
    }

    fn name(&self) -> &'static str {
        "q_thresholds"
    }
}
