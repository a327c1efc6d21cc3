//! Metric aggregation
//!
//! Raw measurements pass through two stages before a comparator sees them:
//!
//! 1. [`ElementAggregator`] reduces the latest value of every managed element
//!    into one value (optional, configured per stimulus)
//! 2. A window ([`FixedLengthWindow`] or [`ChangeWindow`]) keeps the last `n`
//!    values and produces an aggregate once it is full
//!
//! [`StimulusAggregator`] wires both stages to one stimulus.

mod element;
mod stimulus;
mod window;

pub use element::ElementAggregator;
pub use stimulus::StimulusAggregator;
pub use window::{ChangeWindow, FixedLengthWindow, WindowAggregator};

use crate::models::AggregationMethod;

impl AggregationMethod {
    /// Reduce `values` to a single number, `None` for an empty slice
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let value = match self {
            AggregationMethod::Average => values.iter().sum::<f64>() / values.len() as f64,
            AggregationMethod::Sum => values.iter().sum(),
            AggregationMethod::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregationMethod::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregationMethod::Median => median(values),
        };
        Some(value)
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
