use super::fuzzy::{
    annealed_epsilon, apply_td_update, approximate_q, choose_partial_actions, FuzzyLearner, QTable,
    ACTION_LEVELS, TERMS,
};
use super::reward::shaper_for;
use super::ModelEvaluator;
use crate::error::NotEmittable;
use crate::models::{
    default_scale_down_bonus, default_scale_up_penalty, ContainerBounds, FuzzyLearningModel,
    Measurement, RewardShaping,
};
use std::collections::HashMap;
use tracing::debug;

const DEFAULT_EPSILON_FLOOR: f64 = 0.1;

const EMPTY_TABLE: QTable = [[[0.0; ACTION_LEVELS]; TERMS]; TERMS];

/// On-policy fuzzy SARSA with one Q table per container count
#[derive(Debug)]
pub struct FuzzySarsaEvaluator {
    learner: FuzzyLearner,
    tables: HashMap<u32, QTable>,
}

impl FuzzySarsaEvaluator {
    pub fn new(model: &FuzzyLearningModel, bounds: ContainerBounds, initial_containers: u32) -> Self {
        let shaping = model.reward.unwrap_or(RewardShaping::ContainerAware {
            scale_up_penalty: default_scale_up_penalty(),
            scale_down_bonus: default_scale_down_bonus(),
        });
        Self {
            learner: FuzzyLearner::new(
                model,
                shaper_for(shaping),
                DEFAULT_EPSILON_FLOOR,
                bounds,
                initial_containers,
            ),
            tables: HashMap::new(),
        }
    }

    pub fn q_values(&self, containers: u32) -> Option<&QTable> {
        self.tables.get(&containers)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl ModelEvaluator for FuzzySarsaEvaluator {
    fn update(&mut self) -> Result<(), NotEmittable> {
        let current = self.learner.observe()?;
        let containers = self.learner.containers;
        let table = *self.tables.entry(containers).or_insert(EMPTY_TABLE);

        self.learner.iteration += 1;
        let epsilon = annealed_epsilon(
            self.learner.epsilon,
            self.learner.iteration,
            self.learner.epsilon_floor,
        );
        let previous_partial = self.learner.partial_actions;
        let partial = choose_partial_actions(&table, epsilon, &mut self.learner.rng);
        let previous_q = self.learner.approximated_q;
        let approximated = approximate_q(&current, &partial, &table);

        if let (Some(previous), Some(previous_partial)) = (self.learner.previous_state, previous_partial) {
            if let Some(reward) = self.learner.reward(&current) {
                let error = reward + self.learner.discount_factor * approximated - previous_q;
                let previous_containers = self.learner.previous_containers;
                let previous_table = self.tables.entry(previous_containers).or_insert(EMPTY_TABLE);
                apply_td_update(
                    previous_table,
                    &previous_partial,
                    &previous.firing_degrees(),
                    self.learner.learning_rate,
                    error,
                );
                debug!(
                    model = "fuzzy_sarsa",
                    reward,
                    error,
                    containers = previous_containers,
                    "Q table updated"
                );
            }
        }

        self.learner.commit(current, partial, approximated);
        Ok(())
    }

    fn decision(&self) -> Result<i32, NotEmittable> {
        self.learner.decision()
    }

    fn record_usage(&mut self, measurement: &Measurement) {
        self.learner.record_usage(measurement);
    }

    fn name(&self) -> &'static str {
        "fuzzy_sarsa"
    }

    fn last_reward(&self) -> Option<f64> {
        self.learner.last_reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKind;

    fn model() -> FuzzyLearningModel {
        let mut model = FuzzyLearningModel::new(0.5, 0.9, 0.1, 100.0);
        model.window_size = 1;
        model.seed = Some(11);
        model
    }

    fn feed(evaluator: &mut FuzzySarsaEvaluator, metric: MetricKind, value: f64, time: f64) {
        evaluator.record_usage(&Measurement::new(metric, value, "vm-1", time));
    }

    #[test]
    fn test_tables_keyed_by_container_count() {
        let mut evaluator = FuzzySarsaEvaluator::new(&model(), ContainerBounds::new(1, 10), 2);
        feed(&mut evaluator, MetricKind::CpuUtilization, 0.5, 0.0);
        feed(&mut evaluator, MetricKind::ResponseTime, 80.0, 0.0);
        evaluator.update().unwrap();
        assert_eq!(evaluator.table_count(), 1);
        assert!(evaluator.q_values(2).is_some());

        feed(&mut evaluator, MetricKind::ContainerCount, 3.0, 1.0);
        feed(&mut evaluator, MetricKind::CpuUtilization, 0.4, 1.0);
        evaluator.update().unwrap();
        assert_eq!(evaluator.table_count(), 2);
        assert!(evaluator.q_values(3).is_some());
    }

    #[test]
    fn test_update_credits_previous_table() {
        let mut evaluator = FuzzySarsaEvaluator::new(&model(), ContainerBounds::new(1, 10), 2);
        feed(&mut evaluator, MetricKind::CpuUtilization, 0.5, 0.0);
        feed(&mut evaluator, MetricKind::ResponseTime, 50.0, 0.0);
        evaluator.update().unwrap();

        feed(&mut evaluator, MetricKind::ContainerCount, 4.0, 1.0);
        evaluator.update().unwrap();

        // the reward for the transition lands in the table of the old count
        let reward = evaluator.last_reward().unwrap();
        let touched = evaluator
            .q_values(2)
            .unwrap()
            .iter()
            .flatten()
            .flatten()
            .any(|q| *q != 0.0);
        assert!(reward != 0.0);
        assert!(touched);
        assert!(evaluator.q_values(4).unwrap().iter().flatten().flatten().all(|q| *q == 0.0));
    }
}
