//! Trigger checker tree for reactive policies

use super::comparator::{ComparatorResult, ValueComparator};
use crate::aggregator::StimulusAggregator;
use crate::error::ConfigurationError;
use crate::models::{Measurement, ScalingTrigger, SimpleTrigger};

/// Verdict of a trigger tree, with a reason for anything but accordance
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerVerdict {
    InAccordance,
    Disregard(String),
    Wait(String),
}

impl TriggerVerdict {
    pub fn is_in_accordance(&self) -> bool {
        matches!(self, TriggerVerdict::InAccordance)
    }
}

/// Leaf of the tree: one stimulus aggregator and its comparator.
///
/// A leaf remembers its latest comparison so that sibling leaves observing
/// other metrics can still be combined.
#[derive(Debug, Clone)]
pub struct TriggerLeaf {
    aggregator: StimulusAggregator,
    comparator: ValueComparator,
    latest: Option<ComparatorResult>,
}

impl TriggerLeaf {
    pub fn new(policy: &str, trigger: &SimpleTrigger) -> Result<Self, ConfigurationError> {
        let comparator = ValueComparator::for_trigger(policy, trigger)?;
        let aggregator = if comparator.requires_change_window() {
            StimulusAggregator::change(trigger.stimulus.clone(), trigger.window_size)
        } else {
            StimulusAggregator::fixed(
                trigger.stimulus.clone(),
                trigger.window_size,
                trigger.aggregation,
            )
        };
        comparator.check_window(policy, aggregator.window())?;
        Ok(Self {
            aggregator,
            comparator,
            latest: None,
        })
    }

    fn record(&mut self, measurement: &Measurement) -> bool {
        if !self.aggregator.record(measurement) {
            return false;
        }
        self.latest = Some(self.comparator.compare(self.aggregator.current()));
        true
    }

    fn verdict(&self) -> TriggerVerdict {
        let metric = self.aggregator.stimulus().metric;
        match self.latest {
            None => TriggerVerdict::Wait(format!("no {metric} measurements yet")),
            Some(ComparatorResult::Wait) => {
                let window = self.aggregator.window();
                TriggerVerdict::Wait(format!(
                    "{metric} window not full ({}/{})",
                    window.len(),
                    window.window_size()
                ))
            }
            Some(ComparatorResult::Disregard) => TriggerVerdict::Disregard(format!(
                "{metric} {} not satisfied (actual {:.3})",
                self.comparator,
                self.aggregator.current().unwrap_or_default()
            )),
            Some(ComparatorResult::InAccordance) => TriggerVerdict::InAccordance,
        }
    }
}

/// Boolean combination of trigger leaves
#[derive(Debug, Clone)]
pub enum TriggerChecker {
    Leaf(TriggerLeaf),
    And(Vec<TriggerChecker>),
    Or(Vec<TriggerChecker>),
    Not(Box<TriggerChecker>),
}

impl TriggerChecker {
    pub fn from_trigger(policy: &str, trigger: &ScalingTrigger) -> Result<Self, ConfigurationError> {
        match trigger {
            ScalingTrigger::Simple(simple) => Ok(TriggerChecker::Leaf(TriggerLeaf::new(policy, simple)?)),
            ScalingTrigger::And { triggers } => {
                Ok(TriggerChecker::And(Self::children(policy, "AND", triggers)?))
            }
            ScalingTrigger::Or { triggers } => {
                Ok(TriggerChecker::Or(Self::children(policy, "OR", triggers)?))
            }
            ScalingTrigger::Not { trigger } => Ok(TriggerChecker::Not(Box::new(
                Self::from_trigger(policy, trigger)?,
            ))),
        }
    }

    fn children(
        policy: &str,
        operator: &str,
        triggers: &[ScalingTrigger],
    ) -> Result<Vec<TriggerChecker>, ConfigurationError> {
        if triggers.is_empty() {
            return Err(ConfigurationError::InvalidTrigger {
                policy: policy.to_string(),
                reason: format!("{operator} trigger without operands"),
            });
        }
        triggers
            .iter()
            .map(|t| Self::from_trigger(policy, t))
            .collect()
    }

    /// Feed a measurement to every leaf observing its metric
    pub fn record(&mut self, measurement: &Measurement) -> bool {
        match self {
            TriggerChecker::Leaf(leaf) => leaf.record(measurement),
            TriggerChecker::And(children) | TriggerChecker::Or(children) => {
                // every child must see the measurement, no short-circuit
                children
                    .iter_mut()
                    .fold(false, |consumed, child| child.record(measurement) || consumed)
            }
            TriggerChecker::Not(inner) => inner.record(measurement),
        }
    }

    /// Combine the latest leaf verdicts
    pub fn verdict(&self) -> TriggerVerdict {
        match self {
            TriggerChecker::Leaf(leaf) => leaf.verdict(),
            TriggerChecker::And(children) => {
                let mut wait = None;
                for child in children {
                    match child.verdict() {
                        TriggerVerdict::InAccordance => {}
                        disregard @ TriggerVerdict::Disregard(_) => return disregard,
                        TriggerVerdict::Wait(reason) => {
                            wait.get_or_insert(reason);
                        }
                    }
                }
                wait.map_or(TriggerVerdict::InAccordance, TriggerVerdict::Wait)
            }
            TriggerChecker::Or(children) => {
                let mut reasons = Vec::new();
                let mut wait = None;
                for child in children {
                    match child.verdict() {
                        TriggerVerdict::InAccordance => return TriggerVerdict::InAccordance,
                        TriggerVerdict::Disregard(reason) => reasons.push(reason),
                        TriggerVerdict::Wait(reason) => {
                            wait.get_or_insert(reason);
                        }
                    }
                }
                match wait {
                    Some(reason) => TriggerVerdict::Wait(reason),
                    None => TriggerVerdict::Disregard(reasons.join(" AND ")),
                }
            }
            TriggerChecker::Not(inner) => match inner.verdict() {
                TriggerVerdict::InAccordance => {
                    TriggerVerdict::Disregard("negated trigger is in accordance".to_string())
                }
                TriggerVerdict::Disregard(_) => TriggerVerdict::InAccordance,
                wait @ TriggerVerdict::Wait(_) => wait,
            },
        }
    }

    /// Record a measurement and evaluate the tree.
    ///
    /// Measurements no leaf observes are disregarded without changing state.
    pub fn check(&mut self, measurement: &Measurement) -> TriggerVerdict {
        if !self.record(measurement) {
            return TriggerVerdict::Disregard(format!(
                "{} is not observed by this trigger",
                measurement.metric
            ));
        }
        self.verdict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AggregationMethod, ExpectedValue, MetricKind, RelationalOperator, Stimulus, TrendPattern,
        TriggerCondition,
    };

    fn value_trigger(metric: MetricKind, operator: RelationalOperator, expected: ExpectedValue) -> ScalingTrigger {
        ScalingTrigger::Simple(SimpleTrigger {
            stimulus: Stimulus::new(metric),
            condition: TriggerCondition::FireOnValue { operator },
            expected,
            window_size: 1,
            aggregation: AggregationMethod::Average,
        })
    }

    fn cpu_above(threshold: f64) -> ScalingTrigger {
        value_trigger(
            MetricKind::CpuUtilization,
            RelationalOperator::GreaterThan,
            ExpectedValue::Percentage(threshold),
        )
    }

    fn rt_above(threshold: f64) -> ScalingTrigger {
        value_trigger(
            MetricKind::ResponseTime,
            RelationalOperator::GreaterThan,
            ExpectedValue::Time(threshold),
        )
    }

    fn cpu(value: f64, time: f64) -> Measurement {
        Measurement::new(MetricKind::CpuUtilization, value, "vm-1", time)
    }

    fn rt(value: f64, time: f64) -> Measurement {
        Measurement::new(MetricKind::ResponseTime, value, "vm-1", time)
    }

    #[test]
    fn test_leaf_waits_for_first_measurement() {
        let checker = TriggerChecker::from_trigger("p", &cpu_above(0.5)).unwrap();
        assert!(matches!(checker.verdict(), TriggerVerdict::Wait(_)));
    }

    #[test]
    fn test_unobserved_metric_is_disregarded() {
        let mut checker = TriggerChecker::from_trigger("p", &cpu_above(0.5)).unwrap();
        assert!(matches!(checker.check(&rt(100.0, 0.0)), TriggerVerdict::Disregard(_)));
    }

    #[test]
    fn test_and_combines_latest_leaf_verdicts() {
        let trigger = ScalingTrigger::And {
            triggers: vec![cpu_above(0.5), rt_above(100.0)],
        };
        let mut checker = TriggerChecker::from_trigger("p", &trigger).unwrap();

        // rt leaf has not seen data yet
        assert!(matches!(checker.check(&cpu(0.9, 0.0)), TriggerVerdict::Wait(_)));
        assert_eq!(checker.check(&rt(150.0, 1.0)), TriggerVerdict::InAccordance);
        assert!(matches!(checker.check(&cpu(0.1, 2.0)), TriggerVerdict::Disregard(_)));
    }

    #[test]
    fn test_and_prefers_disregard_over_wait() {
        let trigger = ScalingTrigger::And {
            triggers: vec![rt_above(100.0), cpu_above(0.5)],
        };
        let mut checker = TriggerChecker::from_trigger("p", &trigger).unwrap();
        assert!(matches!(checker.check(&cpu(0.1, 0.0)), TriggerVerdict::Disregard(_)));
    }

    #[test]
    fn test_or_joins_disregard_reasons() {
        let trigger = ScalingTrigger::Or {
            triggers: vec![cpu_above(0.5), rt_above(100.0)],
        };
        let mut checker = TriggerChecker::from_trigger("p", &trigger).unwrap();
        checker.record(&cpu(0.1, 0.0));
        match checker.check(&rt(50.0, 1.0)) {
            TriggerVerdict::Disregard(reason) => {
                assert!(reason.contains(" AND "));
                assert!(reason.contains("cpu_utilization"));
                assert!(reason.contains("response_time"));
            }
            other => panic!("unexpected verdict {other:?}"),
        }
        assert_eq!(checker.check(&cpu(0.7, 2.0)), TriggerVerdict::InAccordance);
    }

    #[test]
    fn test_not_inverts_and_keeps_wait() {
        let trigger = ScalingTrigger::Not {
            trigger: Box::new(cpu_above(0.5)),
        };
        let mut checker = TriggerChecker::from_trigger("p", &trigger).unwrap();
        assert!(matches!(checker.verdict(), TriggerVerdict::Wait(_)));
        assert_eq!(checker.check(&cpu(0.2, 0.0)), TriggerVerdict::InAccordance);
        assert!(matches!(checker.check(&cpu(0.8, 1.0)), TriggerVerdict::Disregard(_)));
    }

    #[test]
    fn test_trend_leaf_uses_change_window() {
        let trigger = ScalingTrigger::Simple(SimpleTrigger {
            stimulus: Stimulus::new(MetricKind::QueueLength),
            condition: TriggerCondition::FireOnTrend,
            expected: ExpectedValue::Trend(TrendPattern::Increasing),
            window_size: 3,
            aggregation: AggregationMethod::Average,
        });
        let mut checker = TriggerChecker::from_trigger("p", &trigger).unwrap();
        let q = |v, t| Measurement::new(MetricKind::QueueLength, v, "queue", t);
        assert!(matches!(checker.check(&q(1.0, 0.0)), TriggerVerdict::Wait(_)));
        assert!(matches!(checker.check(&q(2.0, 1.0)), TriggerVerdict::Wait(_)));
        assert_eq!(checker.check(&q(4.0, 2.0)), TriggerVerdict::InAccordance);
    }

    #[test]
    fn test_empty_compound_rejected() {
        let trigger = ScalingTrigger::Or { triggers: vec![] };
        assert!(matches!(
            TriggerChecker::from_trigger("p", &trigger),
            Err(ConfigurationError::InvalidTrigger { .. })
        ));
    }
}
