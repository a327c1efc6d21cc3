use super::ModelEvaluator;
use crate::error::NotEmittable;
use crate::models::{Measurement, RandomModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniformly samples a delta from a fixed range on every tick
#[derive(Debug)]
pub struct RandomEvaluator {
    min_adjustment: i32,
    max_adjustment: i32,
    rng: StdRng,
    current: Option<i32>,
}

impl RandomEvaluator {
    pub fn new(model: &RandomModel, seed: Option<u64>) -> Result<Self, String> {
        if model.min_adjustment > model.max_adjustment {
            return Err(format!(
                "min_adjustment {} exceeds max_adjustment {}",
                model.min_adjustment, model.max_adjustment
            ));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            min_adjustment: model.min_adjustment,
            max_adjustment: model.max_adjustment,
            rng,
            current: None,
        })
    }
}

impl ModelEvaluator for RandomEvaluator {
    fn update(&mut self) -> Result<(), NotEmittable> {
        self.current = Some(self.rng.gen_range(self.min_adjustment..=self.max_adjustment));
        Ok(())
    }

    fn decision(&self) -> Result<i32, NotEmittable> {
        self.current
            .ok_or(NotEmittable::new("model has not been updated yet"))
    }

    fn record_usage(&mut self, _measurement: &Measurement) {}

    fn name(&self) -> &'static str {
        "random"
    }
}
