use super::fuzzy::{
    annealed_epsilon, apply_td_update, approximate_q, choose_partial_actions, value_function,
    FuzzyLearner, QTable, ACTION_LEVELS, TERMS,
};
use super::reward::shaper_for;
use super::ModelEvaluator;
use crate::error::NotEmittable;
use crate::models::{ContainerBounds, FuzzyLearningModel, Measurement, RewardShaping};
use tracing::debug;

/// Exploration floor used when the model does not configure one
const DEFAULT_EPSILON_FLOOR: f64 = 0.01;

/// Reject parameter sets the learning update cannot work with
pub(crate) fn validate(model: &FuzzyLearningModel) -> Result<(), String> {
    if !(model.learning_rate > 0.0 && model.learning_rate <= 1.0) {
        return Err(format!("learning_rate {} must be in (0, 1]", model.learning_rate));
    }
    if !(0.0..=1.0).contains(&model.discount_factor) {
        return Err(format!("discount_factor {} must be in [0, 1]", model.discount_factor));
    }
    if model.epsilon < 0.0 {
        return Err(format!("epsilon {} must not be negative", model.epsilon));
    }
    if let Some(floor) = model.epsilon_floor {
        if !(0.0..=1.0).contains(&floor) {
            return Err(format!("epsilon_floor {floor} must be in [0, 1]"));
        }
    }
    if model.target_response_time <= 0.0 {
        return Err(format!(
            "target_response_time {} must be positive",
            model.target_response_time
        ));
    }
    if !model.utilization_breakpoints.is_ordered() {
        return Err("utilization breakpoints must satisfy alpha < beta < gamma < delta".to_string());
    }
    Ok(())
}

/// Off-policy fuzzy Q-learning over a single Q table
#[derive(Debug)]
pub struct FuzzyQLearningEvaluator {
    learner: FuzzyLearner,
    q: QTable,
}

impl FuzzyQLearningEvaluator {
    pub fn new(model: &FuzzyLearningModel, bounds: ContainerBounds, initial_containers: u32) -> Self {
        let reward = shaper_for(model.reward.unwrap_or(RewardShaping::Sla));
        Self {
            learner: FuzzyLearner::new(model, reward, DEFAULT_EPSILON_FLOOR, bounds, initial_containers),
            q: [[[0.0; ACTION_LEVELS]; TERMS]; TERMS],
        }
    }

    pub fn q_values(&self) -> &QTable {
        &self.q
    }
}

impl ModelEvaluator for FuzzyQLearningEvaluator {
    fn update(&mut self) -> Result<(), NotEmittable> {
        let current = self.learner.observe()?;

        if let (Some(previous), Some(partial)) = (self.learner.previous_state, self.learner.partial_actions) {
            if let Some(reward) = self.learner.reward(&current) {
                let value = value_function(&current, &self.q);
                let error = reward + self.learner.discount_factor * value - self.learner.approximated_q;
                apply_td_update(
                    &mut self.q,
                    &partial,
                    &previous.firing_degrees(),
                    self.learner.learning_rate,
                    error,
                );
                debug!(model = "fuzzy_q_learning", reward, error, "Q table updated");
            }
        }

        let epsilon = annealed_epsilon(
            self.learner.epsilon,
            self.learner.iteration,
            self.learner.epsilon_floor,
        );
        let partial = choose_partial_actions(&self.q, epsilon, &mut self.learner.rng);
        self.learner.iteration += 1;
        let approximated = approximate_q(&current, &partial, &self.q);
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
        "fuzzy_q_learning"
    }

    fn last_reward(&self) -> Option<f64> {
        self.learner.last_reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DecisionClamping, MetricKind};

    fn model() -> FuzzyLearningModel {
        let mut model = FuzzyLearningModel::new(0.5, 0.9, 0.1, 100.0);
        model.window_size = 1;
        model.seed = Some(3);
        model
    }

    fn feed(evaluator: &mut FuzzyQLearningEvaluator, utilization: f64, rt: f64, time: f64) {
        evaluator.record_usage(&Measurement::new(MetricKind::CpuUtilization, utilization, "vm-1", time));
        evaluator.record_usage(&Measurement::new(MetricKind::ResponseTime, rt, "vm-1", time));
    }

    #[test]
    fn test_not_emittable_without_data() {
        let mut evaluator = FuzzyQLearningEvaluator::new(&model(), ContainerBounds::new(1, 10), 1);
        assert!(evaluator.update().is_err());
        assert!(evaluator.decision().is_err());
    }

    #[test]
    fn test_first_update_emits_without_learning() {
        let mut evaluator = FuzzyQLearningEvaluator::new(&model(), ContainerBounds::new(1, 10), 1);
        feed(&mut evaluator, 0.5, 50.0, 0.0);
        evaluator.update().unwrap();
        let decision = evaluator.decision().unwrap();
        assert!((-2..=2).contains(&decision));
        assert!(evaluator.last_reward().is_none());
        assert!(evaluator.q_values().iter().flatten().flatten().all(|q| *q == 0.0));
    }

    #[test]
    fn test_rewards_utilization_below_target() {
        let mut evaluator = FuzzyQLearningEvaluator::new(&model(), ContainerBounds::new(1, 10), 5);
        for tick in 0..20 {
            let utilization = 0.2 + 0.03 * tick as f64;
            feed(&mut evaluator, utilization, 50.0, tick as f64);
            evaluator.update().unwrap();
            if tick > 0 {
                let reward = evaluator.last_reward().unwrap();
                assert!((reward - utilization.exp()).abs() < 1e-12);
                assert!(reward > 0.0);
            }
        }
    }

    #[test]
    fn test_decision_clamped_to_bounds() {
        let mut evaluator = FuzzyQLearningEvaluator::new(&model(), ContainerBounds::new(1, 1), 1);
        for tick in 0..10 {
            feed(&mut evaluator, 0.95, 200.0, tick as f64);
            evaluator.update().unwrap();
            assert_eq!(evaluator.decision(), Ok(0));
        }
    }

    #[test]
    fn test_raw_clamping_emits_unclamped_action() {
        let mut raw = model();
        raw.clamping = DecisionClamping::Raw;
        let mut evaluator = FuzzyQLearningEvaluator::new(&raw, ContainerBounds::new(1, 1), 1);
        for tick in 0..10 {
            feed(&mut evaluator, 0.95, 200.0, tick as f64);
            evaluator.update().unwrap();
            assert_eq!(evaluator.decision().ok(), evaluator.learner.previous_action);
        }

        // a scale-out of 2 has no headroom at max 1 but is still emitted
        evaluator.learner.previous_action = Some(2);
        assert_eq!(evaluator.decision(), Ok(2));
        evaluator.learner.previous_action = Some(-2);
        assert_eq!(evaluator.decision(), Ok(-2));
    }

    #[test]
    fn test_validation() {
        let mut bad = model();
        bad.learning_rate = 0.0;
        assert!(validate(&bad).is_err());
        let mut bad = model();
        bad.discount_factor = 1.5;
        assert!(validate(&bad).is_err());
        assert!(validate(&model()).is_ok());
    }
}
