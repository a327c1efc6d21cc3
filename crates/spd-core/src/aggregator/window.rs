//! Sliding windows over aggregated stimulus values

use crate::models::AggregationMethod;
use std::collections::VecDeque;

/// Keeps the last `window_size` values and reduces them with one method.
///
/// The window produces no value until it has seen `window_size` samples.
#[derive(Debug, Clone)]
pub struct FixedLengthWindow {
    values: VecDeque<f64>,
    window_size: usize,
    method: AggregationMethod,
}

impl FixedLengthWindow {
    pub fn new(window_size: usize, method: AggregationMethod) -> Self {
        let window_size = window_size.max(1);
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            method,
        }
    }

    /// Push a value and return the aggregate if the window is full
    pub fn aggregate(&mut self, value: f64) -> Option<f64> {
        push_bounded(&mut self.values, self.window_size, value);
        self.current()
    }

    pub fn current(&self) -> Option<f64> {
        if !self.is_window_full() {
            return None;
        }
        let values: Vec<f64> = self.values.iter().copied().collect();
        self.method.reduce(&values)
    }

    pub fn is_window_full(&self) -> bool {
        self.values.len() >= self.window_size
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}

/// Change rate over the window: `(last - first) / window_size`
#[derive(Debug, Clone)]
pub struct ChangeWindow {
    values: VecDeque<f64>,
    window_size: usize,
}

impl ChangeWindow {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    pub fn aggregate(&mut self, value: f64) -> Option<f64> {
        push_bounded(&mut self.values, self.window_size, value);
        self.current()
    }

    pub fn current(&self) -> Option<f64> {
        if !self.is_window_full() {
            return None;
        }
        let first = self.values.front()?;
        let last = self.values.back()?;
        Some((last - first) / self.values.len() as f64)
    }

    pub fn is_window_full(&self) -> bool {
        self.values.len() >= self.window_size
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}

/// Either kind of window, chosen by the comparator it feeds
#[derive(Debug, Clone)]
pub enum WindowAggregator {
    Fixed(FixedLengthWindow),
    Change(ChangeWindow),
}

impl WindowAggregator {
    pub fn aggregate(&mut self, value: f64) -> Option<f64> {
        match self {
            WindowAggregator::Fixed(w) => w.aggregate(value),
            WindowAggregator::Change(w) => w.aggregate(value),
        }
    }

    pub fn current(&self) -> Option<f64> {
        match self {
            WindowAggregator::Fixed(w) => w.current(),
            WindowAggregator::Change(w) => w.current(),
        }
    }

    pub fn is_window_full(&self) -> bool {
        match self {
            WindowAggregator::Fixed(w) => w.is_window_full(),
            WindowAggregator::Change(w) => w.is_window_full(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            WindowAggregator::Fixed(w) => w.len(),
            WindowAggregator::Change(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window_size(&self) -> usize {
        match self {
            WindowAggregator::Fixed(w) => w.window_size(),
            WindowAggregator::Change(w) => w.window_size(),
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, WindowAggregator::Change(_))
    }
}

fn push_bounded(values: &mut VecDeque<f64>, window_size: usize, value: f64) {
    values.push_back(value);
    while values.len() > window_size {
        values.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_window_waits_until_full() {
        let mut window = FixedLengthWindow::new(3, AggregationMethod::Average);
        assert_eq!(window.aggregate(1.0), None);
        assert_eq!(window.aggregate(2.0), None);
        assert!(!window.is_window_full());
        assert_eq!(window.aggregate(3.0), Some(2.0));
        assert!(window.is_window_full());
    }

    #[test]
    fn test_fixed_window_slides() {
        let mut window = FixedLengthWindow::new(2, AggregationMethod::Max);
        window.aggregate(10.0);
        window.aggregate(1.0);
        assert_eq!(window.aggregate(2.0), Some(2.0));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_change_window() {
        let mut window = ChangeWindow::new(4);
        for v in [1.0, 2.0, 3.0] {
            assert_eq!(window.aggregate(v), None);
        }
        assert_eq!(window.aggregate(5.0), Some(1.0));
        assert_eq!(window.aggregate(1.0), Some(-0.25));
    }

    #[test]
    fn test_change_window_repeats_on_same_sequence() {
        let sequence = [2.0, 4.0, 7.0, 3.0];
        let mut window = ChangeWindow::new(3);
        let first: Vec<Option<f64>> = sequence.iter().map(|v| window.aggregate(*v)).collect();
        let second: Vec<Option<f64>> = sequence.iter().map(|v| window.aggregate(*v)).collect();

        assert_eq!(first[2], Some(5.0 / 3.0));
        assert_eq!(first.last(), second.last());
        assert_eq!(second.last(), Some(&Some(-1.0 / 3.0)));
    }

    #[test]
    fn test_zero_window_size_is_one() {
        let mut window = FixedLengthWindow::new(0, AggregationMethod::Sum);
        assert_eq!(window.aggregate(7.0), Some(7.0));
        assert_eq!(window.window_size(), 1);
    }
}
