use super::{ChangeWindow, ElementAggregator, FixedLengthWindow, WindowAggregator};
use crate::error::NotEmittable;
use crate::models::{AggregationMethod, Measurement, Stimulus};

/// Aggregates all measurements of one stimulus
#[derive(Debug, Clone)]
pub struct StimulusAggregator {
    stimulus: Stimulus,
    elements: Option<ElementAggregator>,
    window: WindowAggregator,
    last_value: Option<f64>,
}

impl StimulusAggregator {
    /// Aggregator backed by a fixed-length window
    pub fn fixed(stimulus: Stimulus, window_size: usize, method: AggregationMethod) -> Self {
        Self::with_window(
            stimulus,
            WindowAggregator::Fixed(FixedLengthWindow::new(window_size, method)),
        )
    }

    /// Aggregator backed by a change window
    pub fn change(stimulus: Stimulus, window_size: usize) -> Self {
        Self::with_window(
            stimulus,
            WindowAggregator::Change(ChangeWindow::new(window_size)),
        )
    }

    fn with_window(stimulus: Stimulus, window: WindowAggregator) -> Self {
        let elements = stimulus.aggregate_over_elements.map(ElementAggregator::new);
        Self {
            stimulus,
            elements,
            window,
            last_value: None,
        }
    }

    pub fn stimulus(&self) -> &Stimulus {
        &self.stimulus
    }

    pub fn accepts(&self, measurement: &Measurement) -> bool {
        measurement.metric == self.stimulus.metric
    }

    /// Feed a measurement. Returns false when it belongs to another stimulus.
    pub fn record(&mut self, measurement: &Measurement) -> bool {
        if !self.accepts(measurement) {
            return false;
        }
        let value = match self.elements.as_mut() {
            Some(elements) => elements.record(&measurement.entity, measurement.value),
            None => measurement.value,
        };
        self.last_value = Some(value);
        self.window.aggregate(value);
        true
    }

    /// Current window aggregate
    pub fn result(&self) -> Result<f64, NotEmittable> {
        self.window
            .current()
            .ok_or(NotEmittable::new("aggregation window is not full"))
    }

    pub fn current(&self) -> Option<f64> {
        self.window.current()
    }

    /// Most recent (element-aggregated) value before windowing
    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    pub fn window(&self) -> &WindowAggregator {
        &self.window
    }

    pub fn is_window_full(&self) -> bool {
        self.window.is_window_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKind;

    #[test]
    fn test_ignores_other_metrics() {
        let mut agg = StimulusAggregator::fixed(
            Stimulus::new(MetricKind::CpuUtilization),
            1,
            AggregationMethod::Average,
        );
        let rt = Measurement::new(MetricKind::ResponseTime, 120.0, "vm-1", 0.0);
        assert!(!agg.record(&rt));
        assert!(agg.result().is_err());

        let cpu = Measurement::new(MetricKind::CpuUtilization, 0.7, "vm-1", 1.0);
        assert!(agg.record(&cpu));
        assert_eq!(agg.result(), Ok(0.7));
    }

    #[test]
    fn test_element_aggregation_feeds_window() {
        let stimulus = Stimulus {
            metric: MetricKind::CpuUtilization,
            aggregate_over_elements: Some(AggregationMethod::Max),
        };
        let mut agg = StimulusAggregator::fixed(stimulus, 2, AggregationMethod::Average);
        agg.record(&Measurement::new(MetricKind::CpuUtilization, 0.2, "a", 0.0));
        agg.record(&Measurement::new(MetricKind::CpuUtilization, 0.8, "b", 1.0));
        // window holds [0.2, 0.8]
        assert_eq!(agg.result(), Ok(0.5));
        assert_eq!(agg.last_value(), Some(0.8));
    }
}
