//! Turns a scaling policy definition into runnable adjustor contexts

use crate::chain::{Adjustor, Filter, FilterChain, TargetGroupChecker};
use crate::constraint::{
    CooldownConstraint, IntervalConstraint, ThrashingConstraint, DEFAULT_LEARNING_PERIOD,
};
use crate::context::SpdAdjustorContext;
use crate::error::ConfigurationError;
use crate::events::{RepeatedTimeReached, SpdEvent};
use crate::model::{build_evaluator, EvaluatorSettings};
use crate::models::{PolicyConstraint, PolicyKind, ScalingPolicy, SpdModel, TargetGroup, TargetGroupKind};
use crate::state::TargetGroupState;
use crate::trigger::{ModelTriggerChecker, TriggerChecker};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Interpretation settings
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Thrashing checks are skipped before this time for learning models
    pub thrashing_learning_period: f64,
    /// Base seed for model randomness; each policy derives its own
    pub seed: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            thrashing_learning_period: DEFAULT_LEARNING_PERIOD,
            seed: None,
        }
    }
}

impl InterpreterConfig {
    pub fn with_learning_period(mut self, period: f64) -> Self {
        self.thrashing_learning_period = period;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Everything produced from one model
#[derive(Debug, Default)]
pub struct InterpretationResult {
    pub contexts: Vec<SpdAdjustorContext>,
    /// Initial timer events, at most one per target group and timestamp
    pub events_to_schedule: Vec<SpdEvent>,
    pub errors: Vec<ConfigurationError>,
    pub target_group_states: HashMap<String, TargetGroupState>,
}

#[derive(Debug, Clone, Default)]
pub struct SpdInterpreter {
    config: InterpreterConfig,
}

impl SpdInterpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Self { config }
    }

    pub fn interpret(&self, model: &SpdModel) -> InterpretationResult {
        let mut result = InterpretationResult::default();
        for tg in &model.target_groups {
            result
                .target_group_states
                .insert(tg.id.clone(), TargetGroupState::new(tg.id.clone()));
        }

        for (index, policy) in model.scaling_policies.iter().enumerate() {
            if !policy.active {
                debug!(policy = %policy.id, "Skipping inactive scaling policy");
                continue;
            }
            match self.interpret_policy(model, policy, index as u64) {
                Ok((context, events)) => {
                    result.contexts.push(context);
                    result.events_to_schedule.extend(events);
                }
                Err(e) => {
                    warn!(policy = %policy.id, error = %e, "Scaling policy excluded");
                    result.errors.push(e);
                }
            }
        }

        dedupe_timer_events(&mut result.events_to_schedule);
        info!(
            model = %model.name,
            contexts = result.contexts.len(),
            errors = result.errors.len(),
            scheduled = result.events_to_schedule.len(),
            "Scaling policy definition interpreted"
        );
        result
    }

    fn interpret_policy(
        &self,
        model: &SpdModel,
        policy: &ScalingPolicy,
        index: u64,
    ) -> Result<(SpdAdjustorContext, Vec<SpdEvent>), ConfigurationError> {
        let target_group = model.target_group(&policy.target_group).ok_or_else(|| {
            ConfigurationError::UnknownTargetGroup {
                policy: policy.id.clone(),
                target_group: policy.target_group.clone(),
            }
        })?;
        if target_group.kind != TargetGroupKind::ElasticInfrastructure {
            return Err(ConfigurationError::UnsupportedTargetGroup {
                policy: policy.id.clone(),
                target_group: target_group.id.clone(),
                kind: target_group.kind,
            });
        }

        let mut events = Vec::new();
        let trigger_stage = match &policy.kind {
            PolicyKind::Reactive { trigger, .. } => {
                Filter::Trigger(TriggerChecker::from_trigger(&policy.id, trigger)?)
            }
            PolicyKind::ModelBased { model: base_model } => {
                let (offset, interval) = policy.interval_constraint().ok_or_else(|| {
                    ConfigurationError::MissingIntervalConstraint {
                        policy: policy.id.clone(),
                    }
                })?;
                if interval <= 0.0 {
                    return Err(ConfigurationError::InvalidModel {
                        policy: policy.id.clone(),
                        reason: format!("interval duration {interval} must be positive"),
                    });
                }
                let bounds = target_group.size_bounds();
                if !bounds.constrained {
                    warn!(
                        policy = %policy.id,
                        target_group = %target_group.id,
                        "No size constraint on target group, model decisions are unbounded"
                    );
                }
                let settings = EvaluatorSettings {
                    bounds,
                    initial_containers: bounds.clamp(i64::from(target_group.initial_size)),
                    seed: self.config.seed.map(|seed| seed.wrapping_add(index)),
                };
                let evaluator = build_evaluator(&policy.id, base_model, settings)?;
                events.push(SpdEvent::RepeatedTimeReached(RepeatedTimeReached {
                    target_group: target_group.id.clone(),
                    time: offset + interval,
                    interval,
                }));
                Filter::Model(ModelTriggerChecker::new(evaluator))
            }
        };

        let chain = self.build_chain(policy, target_group, trigger_stage);
        debug!(
            policy = %policy.id,
            filters = ?chain.filter_names(),
            "Filter chain built"
        );
        Ok((SpdAdjustorContext::new(Arc::new(policy.clone()), chain), events))
    }

    fn build_chain(&self, policy: &ScalingPolicy, target_group: &TargetGroup, trigger_stage: Filter) -> FilterChain {
        let mut chain = FilterChain::new()
            .with_filter(Filter::TargetGroup(TargetGroupChecker::new(target_group.id.clone())))
            .with_filter(trigger_stage);

        for minimum in target_group.thrashing_intervals() {
            chain.push(Filter::Thrashing(
                ThrashingConstraint::new(minimum)
                    .with_learning_period(self.config.thrashing_learning_period),
            ));
        }

        let mut cooldown_time = None;
        for constraint in &policy.policy_constraints {
            match constraint {
                PolicyConstraint::Cooldown {
                    cooldown_time: time,
                    max_scaling_operations,
                } => {
                    cooldown_time.get_or_insert(*time);
                    chain.push(Filter::Cooldown(CooldownConstraint::new(*time, *max_scaling_operations)));
                }
                PolicyConstraint::Interval {
                    offset,
                    interval_duration,
                } => {
                    chain.push(Filter::Interval(IntervalConstraint::new(*offset, *interval_duration)));
                }
            }
        }

        chain.with_filter(Filter::Adjustor(Adjustor::new(cooldown_time)))
    }
}

/// Keep the first timer per (target group, timestamp)
fn dedupe_timer_events(events: &mut Vec<SpdEvent>) {
    let mut seen = HashSet::new();
    events.retain(|event| match event {
        SpdEvent::RepeatedTimeReached(tick) => {
            seen.insert((tick.target_group.clone(), tick.time.to_bits()))
        }
        SpdEvent::TimeReached { time } => seen.insert((String::new(), time.to_bits())),
        _ => true,
    });
}
