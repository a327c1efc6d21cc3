//! Model evaluators for model-based scaling policies
//!
//! A model evaluator is updated once per evaluation tick and then asked for a
//! signed container delta. Measurements reach it through `record_usage`
//! between ticks.

mod fuzzy_q;
mod fuzzy_sarsa;
mod random;
mod thresholds;

pub mod fuzzy;
pub mod reward;

pub use fuzzy_q::FuzzyQLearningEvaluator;
pub use fuzzy_sarsa::FuzzySarsaEvaluator;
pub use random::RandomEvaluator;
pub use thresholds::QThresholdsEvaluator;

use crate::error::{ConfigurationError, NotEmittable};
use crate::models::{BaseModel, ContainerBounds, Measurement};
use std::fmt::Debug;

/// Common contract of all model evaluators
pub trait ModelEvaluator: Debug + Send {
    /// Advance the model by one evaluation tick
    fn update(&mut self) -> Result<(), NotEmittable>;

    /// Signed container delta of the latest update
    fn decision(&self) -> Result<i32, NotEmittable>;

    /// Feed a raw measurement into the model's aggregators
    fn record_usage(&mut self, measurement: &Measurement);

    fn name(&self) -> &'static str;

    /// Reward computed during the latest update, for learning models
    fn last_reward(&self) -> Option<f64> {
        None
    }
}

/// Runtime parameters handed to every evaluator
#[derive(Debug, Clone, Copy)]
pub struct EvaluatorSettings {
    pub bounds: ContainerBounds,
    pub initial_containers: u32,
    /// Seed used when the model does not carry its own
    pub seed: Option<u64>,
}

/// Build the evaluator of `model`
pub fn build_evaluator(
    policy: &str,
    model: &BaseModel,
    settings: EvaluatorSettings,
) -> Result<Box<dyn ModelEvaluator>, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidModel {
        policy: policy.to_string(),
        reason,
    };
    match model {
        BaseModel::Random(random) => {
            let seed = random.seed.or(settings.seed);
            RandomEvaluator::new(random, seed)
                .map(|e| Box::new(e) as Box<dyn ModelEvaluator>)
                .map_err(invalid)
        }
        BaseModel::QThresholds(thresholds) => QThresholdsEvaluator::new(thresholds)
            .map(|e| Box::new(e) as Box<dyn ModelEvaluator>)
            .map_err(invalid),
        BaseModel::FuzzyQLearning(fuzzy) => {
            fuzzy_q::validate(fuzzy).map_err(invalid)?;
            let mut fuzzy = fuzzy.clone();
            fuzzy.seed = fuzzy.seed.or(settings.seed);
            Ok(Box::new(FuzzyQLearningEvaluator::new(
                &fuzzy,
                settings.bounds,
                settings.initial_containers,
            )))
        }
        BaseModel::FuzzySarsa(fuzzy) => {
            fuzzy_q::validate(fuzzy).map_err(invalid)?;
            let mut fuzzy = fuzzy.clone();
            fuzzy.seed = fuzzy.seed.or(settings.seed);
            Ok(Box::new(FuzzySarsaEvaluator::new(
                &fuzzy,
                settings.bounds,
                settings.initial_containers,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FuzzyLearningModel, RandomModel};

    fn settings() -> EvaluatorSettings {
        EvaluatorSettings {
            bounds: ContainerBounds::new(1, 10),
            initial_containers: 1,
            seed: Some(42),
        }
    }

    #[test]
    fn test_build_each_kind() {
        let random = BaseModel::Random(RandomModel {
            min_adjustment: -1,
            max_adjustment: 1,
            seed: None,
        });
        assert_eq!(build_evaluator("p", &random, settings()).unwrap().name(), "random");

        let fql = BaseModel::FuzzyQLearning(FuzzyLearningModel::new(0.1, 0.9, 0.1, 100.0));
        assert_eq!(
            build_evaluator("p", &fql, settings()).unwrap().name(),
            "fuzzy_q_learning"
        );

        let sarsa = BaseModel::FuzzySarsa(FuzzyLearningModel::new(0.1, 0.9, 0.1, 100.0));
        assert_eq!(build_evaluator("p", &sarsa, settings()).unwrap().name(), "fuzzy_sarsa");
    }

    #[test]
    fn test_invalid_model_carries_policy() {
        let fql = BaseModel::FuzzyQLearning(FuzzyLearningModel::new(0.1, 0.9, 0.1, 0.0));
        let err = build_evaluator("fql-policy", &fql, settings()).unwrap_err();
        assert_eq!(err.policy(), "fql-policy");
        assert!(matches!(err, ConfigurationError::InvalidModel { .. }));
    }

    #[test]
    fn test_decision_before_update_is_not_emittable() {
        let fql = BaseModel::FuzzyQLearning(FuzzyLearningModel::new(0.1, 0.9, 0.1, 100.0));
        let evaluator = build_evaluator("p", &fql, settings()).unwrap();
        assert!(evaluator.decision().is_err());
    }
}
