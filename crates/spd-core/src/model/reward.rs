//! Reward shaping for the fuzzy learning evaluators

use super::fuzzy::FuzzyState;
use crate::models::{ContainerBounds, RewardShaping};
use std::fmt::Debug;

/// Inputs available when rewarding the transition into `current`
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    pub current: &'a FuzzyState,
    pub previous: &'a FuzzyState,
    /// Action taken at the previous tick
    pub previous_action: i32,
    pub containers: u32,
    pub previous_containers: u32,
    pub bounds: ContainerBounds,
}

pub trait RewardShaper: Debug + Send {
    fn reward(&self, ctx: &RewardContext<'_>) -> f64;
}

/// Reward utilization while the response time target holds.
///
/// - below target: `exp(utilization)`
/// - above target but improving after a scale-up: `0`
/// - otherwise: `exp((target - rt) / target) - 1`, which is negative
#[derive(Debug, Clone, Copy, Default)]
pub struct SlaReward;

impl RewardShaper for SlaReward {
    fn reward(&self, ctx: &RewardContext<'_>) -> f64 {
        let target = ctx.current.target_response_time;
        let rt = ctx.current.response_time;
        if rt < target {
            ctx.current.utilization.exp()
        } else if rt < ctx.previous.response_time && ctx.previous_action > 0 {
            0.0
        } else {
            ((target - rt) / target).exp() - 1.0
        }
    }
}

/// SLA reward normalized by container count, with penalty and bonus terms.
///
/// Positive rewards are divided by the container count. Added containers are
/// penalized and removed containers rewarded, both weighted by how far the
/// group sits between its minimum and maximum size.
#[derive(Debug, Clone, Copy)]
pub struct ContainerAwareReward {
    pub scale_up_penalty: f64,
    pub scale_down_bonus: f64,
}

impl RewardShaper for ContainerAwareReward {
    fn reward(&self, ctx: &RewardContext<'_>) -> f64 {
        let mut reward = SlaReward.reward(ctx);
        if reward > 0.0 {
            reward /= f64::from(ctx.containers.max(1));
        }

        let pressure = 1.0 + ctx.bounds.occupancy(ctx.previous_containers);
        let change = i64::from(ctx.containers) - i64::from(ctx.previous_containers);
        if ctx.previous_action > 0 && change > 0 {
            reward -= self.scale_up_penalty * change as f64 * pressure;
        } else if ctx.previous_action < 0 && change < 0 {
            reward += self.scale_down_bonus * (-change) as f64 * pressure;
        }
        reward
    }
}

/// Shaper for a configured strategy
pub fn shaper_for(shaping: RewardShaping) -> Box<dyn RewardShaper> {
    match shaping {
        RewardShaping::Sla => Box::new(SlaReward),
        RewardShaping::ContainerAware {
            scale_up_penalty,
            scale_down_bonus,
        } => Box::new(ContainerAwareReward {
            scale_up_penalty,
            scale_down_bonus,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(current: &'a FuzzyState, previous: &'a FuzzyState, action: i32) -> RewardContext<'a> {
        RewardContext {
            current,
            previous,
            previous_action: action,
            containers: 2,
            previous_containers: 2,
            bounds: ContainerBounds::unbounded(),
        }
    }

    #[test]
    fn test_sla_met_rewards_utilization() {
        let current = FuzzyState::new(0.6, 50.0, 100.0);
        let previous = FuzzyState::new(0.5, 60.0, 100.0);
        let reward = SlaReward.reward(&ctx(&current, &previous, 0));
        assert!((reward - 0.6f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_improving_after_scale_up_is_neutral() {
        let current = FuzzyState::new(0.9, 120.0, 100.0);
        let previous = FuzzyState::new(0.9, 180.0, 100.0);
        assert_eq!(SlaReward.reward(&ctx(&current, &previous, 1)), 0.0);
    }

    #[test]
    fn test_sla_violation_is_negative() {
        let current = FuzzyState::new(0.9, 150.0, 100.0);
        let previous = FuzzyState::new(0.9, 120.0, 100.0);
        let reward = SlaReward.reward(&ctx(&current, &previous, 1));
        assert!(reward < 0.0);
        assert!((reward - ((-0.5f64).exp() - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_container_aware_normalizes_and_penalizes() {
        let shaper = ContainerAwareReward {
            scale_up_penalty: 4.0,
            scale_down_bonus: 2.0,
        };
        let current = FuzzyState::new(0.5, 50.0, 100.0);
        let previous = FuzzyState::new(0.5, 50.0, 100.0);

        let mut c = ctx(&current, &previous, 0);
        c.containers = 4;
        c.previous_containers = 4;
        assert!((shaper.reward(&c) - 0.5f64.exp() / 4.0).abs() < 1e-12);

        c.previous_action = 2;
        c.previous_containers = 2;
        let up = shaper.reward(&c);
        assert!((up - (0.5f64.exp() / 4.0 - 8.0)).abs() < 1e-12);

        c.previous_action = -1;
        c.containers = 3;
        c.previous_containers = 4;
        let down = shaper.reward(&c);
        assert!((down - (0.5f64.exp() / 3.0 + 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_penalty_grows_near_maximum() {
        let shaper = ContainerAwareReward {
            scale_up_penalty: 1.0,
            scale_down_bonus: 1.0,
        };
        let current = FuzzyState::new(0.5, 150.0, 100.0);
        let previous = FuzzyState::new(0.5, 150.0, 100.0);
        let mut low = ctx(&current, &previous, 1);
        low.bounds = ContainerBounds::new(1, 11);
        low.previous_containers = 1;
        low.containers = 2;
        let mut high = low;
        high.previous_containers = 10;
        high.containers = 11;
        assert!(shaper.reward(&high) < shaper.reward(&low));
    }
}
