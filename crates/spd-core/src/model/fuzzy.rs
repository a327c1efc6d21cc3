//! Fuzzy state machinery shared by the fuzzy learning evaluators
//!
//! Utilization and response time are each mapped onto three linguistic terms
//! (low, medium, high). Every (workload term, response time term) pair is a
//! rule; a rule's firing degree is the product of the two memberships. Each
//! rule picks one of five partial actions, `-2..=+2` containers, and the
//! control action is the firing-degree weighted sum over all rules.

use super::reward::{RewardContext, RewardShaper};
use crate::aggregator::StimulusAggregator;
use crate::error::NotEmittable;
use crate::models::{
    ContainerBounds, DecisionClamping, FuzzyLearningModel, Measurement, MetricKind,
    UtilizationBreakpoints,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of linguistic terms per dimension
pub const TERMS: usize = 3;

/// Number of partial action levels per rule
pub const ACTION_LEVELS: usize = 5;

/// Index of the "do nothing" partial action
pub const NEUTRAL_LEVEL: usize = 2;

pub type QTable = [[[f64; ACTION_LEVELS]; TERMS]; TERMS];
pub type PartialActions = [[usize; TERMS]; TERMS];
pub type FiringDegrees = [[f64; TERMS]; TERMS];

/// Container delta of a partial action level
pub fn level_delta(level: usize) -> i32 {
    level as i32 - NEUTRAL_LEVEL as i32
}

/// Observed system state at one evaluation tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyState {
    pub utilization: f64,
    pub response_time: f64,
    pub target_response_time: f64,
    pub breakpoints: UtilizationBreakpoints,
}

impl FuzzyState {
    pub fn new(utilization: f64, response_time: f64, target_response_time: f64) -> Self {
        Self {
            utilization,
            response_time,
            target_response_time,
            breakpoints: UtilizationBreakpoints::default(),
        }
    }

    pub fn utilization_membership(&self) -> [f64; TERMS] {
        let bp = &self.breakpoints;
        trapezoid(self.utilization, bp.alpha, bp.beta, bp.gamma, bp.delta)
    }

    /// Response time terms around the target: 0.5x, 1x and 1.5x
    pub fn response_time_membership(&self) -> [f64; TERMS] {
        let target = self.target_response_time;
        trapezoid(self.response_time, 0.5 * target, target, target, 1.5 * target)
    }

    pub fn firing_degrees(&self) -> FiringDegrees {
        let workload = self.utilization_membership();
        let response_time = self.response_time_membership();
        let mut degrees = [[0.0; TERMS]; TERMS];
        for (wl, row) in degrees.iter_mut().enumerate() {
            for (rt, degree) in row.iter_mut().enumerate() {
                *degree = workload[wl] * response_time[rt];
            }
        }
        degrees
    }
}

/// Three overlapping terms with ramps on [a, b) and [c, d).
///
/// Values below `a` are fully low, values from `d` on fully high; the
/// memberships always sum to 1.
fn trapezoid(x: f64, a: f64, b: f64, c: f64, d: f64) -> [f64; TERMS] {
    let mut terms = [0.0; TERMS];
    if x < a {
        terms[0] = 1.0;
    } else if x < b {
        terms[0] = 1.0 - (x - a) / (b - a);
        terms[1] = 1.0 - terms[0];
    } else if x < c {
        terms[1] = 1.0;
    } else if x < d {
        terms[1] = 1.0 - (x - c) / (d - c);
        terms[2] = 1.0 - terms[1];
    } else {
        terms[2] = 1.0;
    }
    terms
}

/// State value: firing-degree weighted best Q of every rule
pub fn value_function(state: &FuzzyState, q: &QTable) -> f64 {
    let degrees = state.firing_degrees();
    let mut value = 0.0;
    for wl in 0..TERMS {
        for rt in 0..TERMS {
            let best = q[wl][rt].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            value += degrees[wl][rt] * best;
        }
    }
    value
}

/// Blended real-valued action of the chosen partial actions
pub fn control_action(state: &FuzzyState, partial: &PartialActions) -> f64 {
    let degrees = state.firing_degrees();
    let mut action = 0.0;
    for wl in 0..TERMS {
        for rt in 0..TERMS {
            action += degrees[wl][rt] * f64::from(level_delta(partial[wl][rt]));
        }
    }
    action
}

/// Approximated Q of the joint action `partial` in `state`
pub fn approximate_q(state: &FuzzyState, partial: &PartialActions, q: &QTable) -> f64 {
    let degrees = state.firing_degrees();
    let mut approximation = 0.0;
    for wl in 0..TERMS {
        for rt in 0..TERMS {
            approximation += degrees[wl][rt] * q[wl][rt][partial[wl][rt]];
        }
    }
    approximation
}

/// Credit every rule's chosen level in proportion to its firing degree
pub fn apply_td_update(
    q: &mut QTable,
    partial: &PartialActions,
    firing: &FiringDegrees,
    learning_rate: f64,
    error: f64,
) {
    for wl in 0..TERMS {
        for rt in 0..TERMS {
            q[wl][rt][partial[wl][rt]] += learning_rate * error * firing[wl][rt];
        }
    }
}

/// Exploration probability after `iteration` ticks
pub fn annealed_epsilon(epsilon: f64, iteration: u64, floor: f64) -> f64 {
    (-epsilon * iteration as f64).exp().max(floor)
}

/// Epsilon-greedy choice per rule; exploitation keeps the neutral level on ties
pub fn choose_partial_actions(q: &QTable, epsilon: f64, rng: &mut StdRng) -> PartialActions {
    let mut partial = [[NEUTRAL_LEVEL; TERMS]; TERMS];
    for wl in 0..TERMS {
        for rt in 0..TERMS {
            partial[wl][rt] = if rng.gen::<f64>() < epsilon {
                rng.gen_range(0..ACTION_LEVELS)
            } else {
                greedy_level(&q[wl][rt])
            };
        }
    }
    partial
}

fn greedy_level(levels: &[f64; ACTION_LEVELS]) -> usize {
    let mut best = NEUTRAL_LEVEL;
    for (index, value) in levels.iter().enumerate() {
        if *value > levels[best] {
            best = index;
        }
    }
    best
}

/// Observation and bookkeeping common to both fuzzy learning evaluators
#[derive(Debug)]
pub struct FuzzyLearner {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub epsilon: f64,
    pub epsilon_floor: f64,
    target_response_time: f64,
    breakpoints: UtilizationBreakpoints,
    workload: StimulusAggregator,
    response_time: StimulusAggregator,
    reward: Box<dyn RewardShaper>,
    clamping: DecisionClamping,
    pub bounds: ContainerBounds,
    pub rng: StdRng,
    pub containers: u32,
    pub previous_containers: u32,
    pub previous_state: Option<FuzzyState>,
    pub previous_action: Option<i32>,
    pub partial_actions: Option<PartialActions>,
    pub approximated_q: f64,
    pub iteration: u64,
    pub last_reward: Option<f64>,
}

impl FuzzyLearner {
    pub fn new(
        model: &FuzzyLearningModel,
        reward: Box<dyn RewardShaper>,
        default_floor: f64,
        bounds: ContainerBounds,
        initial_containers: u32,
    ) -> Self {
        let rng = match model.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            learning_rate: model.learning_rate,
            discount_factor: model.discount_factor,
            epsilon: model.epsilon,
            epsilon_floor: model.epsilon_floor.unwrap_or(default_floor),
            target_response_time: model.target_response_time,
            breakpoints: model.utilization_breakpoints,
            workload: StimulusAggregator::fixed(
                model.workload_stimulus.clone(),
                model.window_size,
                crate::models::AggregationMethod::Average,
            ),
            response_time: StimulusAggregator::fixed(
                model.response_time_stimulus.clone(),
                model.window_size,
                model.response_time_aggregation,
            ),
            reward,
            clamping: model.clamping,
            bounds,
            rng,
            containers: initial_containers,
            previous_containers: initial_containers,
            previous_state: None,
            previous_action: None,
            partial_actions: None,
            approximated_q: 0.0,
            iteration: 0,
            last_reward: None,
        }
    }

    pub fn record_usage(&mut self, measurement: &Measurement) {
        self.workload.record(measurement);
        self.response_time.record(measurement);
        if measurement.metric == MetricKind::ContainerCount {
            self.containers = measurement.value.max(0.0).round() as u32;
        }
    }

    /// Current fuzzy state from both aggregators
    pub fn observe(&self) -> Result<FuzzyState, NotEmittable> {
        Ok(FuzzyState {
            utilization: self.workload.result()?,
            response_time: self.response_time.result()?,
            target_response_time: self.target_response_time,
            breakpoints: self.breakpoints,
        })
    }

    /// Reward of reaching `current` from the previous state, if there is one
    pub fn reward(&mut self, current: &FuzzyState) -> Option<f64> {
        let previous = self.previous_state?;
        let reward = self.reward.reward(&RewardContext {
            current,
            previous: &previous,
            previous_action: self.previous_action.unwrap_or(0),
            containers: self.containers,
            previous_containers: self.previous_containers,
            bounds: self.bounds,
        });
        self.last_reward = Some(reward);
        Some(reward)
    }

    /// Round and remember the blended action of this tick
    pub fn commit(&mut self, state: FuzzyState, partial: PartialActions, approximated_q: f64) {
        let action = control_action(&state, &partial);
        self.previous_action = Some(action.round() as i32);
        self.previous_state = Some(state);
        self.partial_actions = Some(partial);
        self.approximated_q = approximated_q;
        self.previous_containers = self.containers;
    }

    pub fn decision(&self) -> Result<i32, NotEmittable> {
        let action = self
            .previous_action
            .ok_or(NotEmittable::new("model has not been updated yet"))?;
        Ok(match self.clamping {
            DecisionClamping::Headroom => self.bounds.clamp_delta(self.containers, action),
            DecisionClamping::Raw => action,
        })
    }
}
