use crate::models::AggregationMethod;
use std::collections::BTreeMap;

/// Reduces the latest value of each managed element into one value
#[derive(Debug, Clone)]
pub struct ElementAggregator {
    method: AggregationMethod,
    latest: BTreeMap<String, f64>,
}

impl ElementAggregator {
    pub fn new(method: AggregationMethod) -> Self {
        Self {
            method,
            latest: BTreeMap::new(),
        }
    }

    /// Record the latest value of `entity` and return the reduced value
    pub fn record(&mut self, entity: &str, value: f64) -> f64 {
        self.latest.insert(entity.to_string(), value);
        let values: Vec<f64> = self.latest.values().copied().collect();
        self.method.reduce(&values).unwrap_or(value)
    }

    pub fn element_count(&self) -> usize {
        self.latest.len()
    }
}
