//! Value comparators for simple triggers

use crate::aggregator::WindowAggregator;
use crate::error::ConfigurationError;
use crate::models::{ExpectedValue, RelationalOperator, SimpleTrigger, TrendPattern, TriggerCondition};
use serde::Serialize;
use std::fmt;

/// Outcome of comparing an aggregate against an expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparatorResult {
    InAccordance,
    Disregard,
    /// The paired window has not filled up yet
    Wait,
}

/// Comparator resolved once from a trigger definition
#[derive(Debug, Clone, PartialEq)]
pub enum ValueComparator {
    Value {
        operator: RelationalOperator,
        expected: f64,
    },
    Trend {
        pattern: TrendPattern,
    },
}

impl ValueComparator {
    /// Resolve the comparator of `trigger`, rejecting unsupported combinations
    pub fn for_trigger(policy: &str, trigger: &SimpleTrigger) -> Result<Self, ConfigurationError> {
        let metric = trigger.stimulus.metric;
        let unsupported = || ConfigurationError::UnsupportedExpectedValue {
            policy: policy.to_string(),
            metric,
            expected: trigger.expected.variant_name(),
        };

        if !metric.accepts(&trigger.expected) {
            return Err(unsupported());
        }

        match (&trigger.condition, trigger.expected) {
            (TriggerCondition::FireOnValue { operator }, ExpectedValue::Time(v))
            | (TriggerCondition::FireOnValue { operator }, ExpectedValue::Count(v))
            | (TriggerCondition::FireOnValue { operator }, ExpectedValue::Percentage(v)) => {
                Ok(ValueComparator::Value {
                    operator: *operator,
                    expected: v,
                })
            }
            (TriggerCondition::FireOnTrend, ExpectedValue::Trend(pattern)) => {
                Ok(ValueComparator::Trend { pattern })
            }
            _ => Err(unsupported()),
        }
    }

    /// Trend comparators read change rates rather than plain aggregates
    pub fn requires_change_window(&self) -> bool {
        matches!(self, ValueComparator::Trend { .. })
    }

    /// Check that `window` is the kind of window this comparator reads
    pub fn check_window(&self, policy: &str, window: &WindowAggregator) -> Result<(), ConfigurationError> {
        if self.requires_change_window() != window.is_change() {
            return Err(ConfigurationError::InvalidTrigger {
                policy: policy.to_string(),
                reason: format!("comparator '{self}' cannot read this aggregation window"),
            });
        }
        Ok(())
    }

    /// Compare an aggregate (`None` while the window is filling)
    pub fn compare(&self, actual: Option<f64>) -> ComparatorResult {
        let Some(actual) = actual else {
            return ComparatorResult::Wait;
        };
        let holds = match self {
            ValueComparator::Value { operator, expected } => operator.holds(actual, *expected),
            ValueComparator::Trend { pattern } => match pattern {
                TrendPattern::Increasing => actual > 0.0,
                TrendPattern::Decreasing => actual < 0.0,
                TrendPattern::NonIncreasing => actual <= 0.0,
                TrendPattern::NonDecreasing => actual >= 0.0,
            },
        };
        if holds {
            ComparatorResult::InAccordance
        } else {
            ComparatorResult::Disregard
        }
    }
}

impl fmt::Display for ValueComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueComparator::Value { operator, expected } => {
                write!(f, "{} {}", operator.symbol(), expected)
            }
            ValueComparator::Trend { pattern } => write!(f, "trend {pattern:?}"),
        }
    }
}
