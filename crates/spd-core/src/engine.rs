//! Scaling engine: dispatches events to all adjustor contexts
//!
//! The engine is the single owner of every [`TargetGroupState`]. Contexts
//! read it while filtering; it is only appended to when the enactment
//! mechanism reports back through [`ScalingEngine::on_adjustment_enacted`].

use crate::chain::{ChainEvent, FilterResult};
use crate::context::SpdAdjustorContext;
use crate::error::ConfigurationError;
use crate::events::{ScalingRequest, SpdAdjustorStateValues, SpdEvent};
use crate::interpreter::{InterpretationResult, InterpreterConfig, SpdInterpreter};
use crate::models::{SpdModel, TargetGroup};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::state::TargetGroupState;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Result of dispatching one event
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub requests: Vec<ScalingRequest>,
    /// Events to schedule in response (the next tick of a repeated timer)
    pub follow_up: Vec<SpdEvent>,
    pub disregarded: usize,
    pub waiting: usize,
}

pub struct ScalingEngine {
    target_groups: HashMap<String, TargetGroup>,
    target_group_states: HashMap<String, TargetGroupState>,
    contexts: Vec<SpdAdjustorContext>,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl ScalingEngine {
    /// Interpret `model` and build an engine from the surviving policies.
    ///
    /// Returns the engine, the initial events to schedule and the policies
    /// that were rejected.
    pub fn from_model(
        model: &SpdModel,
        config: InterpreterConfig,
    ) -> (Self, Vec<SpdEvent>, Vec<ConfigurationError>) {
        let result = SpdInterpreter::new(config).interpret(model);
        Self::from_interpretation(model, result)
    }

    pub fn from_interpretation(
        model: &SpdModel,
        result: InterpretationResult,
    ) -> (Self, Vec<SpdEvent>, Vec<ConfigurationError>) {
        let InterpretationResult {
            contexts,
            events_to_schedule,
            errors,
            target_group_states,
        } = result;

        let engine = Self {
            target_groups: model
                .target_groups
                .iter()
                .map(|tg| (tg.id.clone(), tg.clone()))
                .collect(),
            target_group_states,
            contexts,
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new(if model.name.is_empty() { "spd" } else { &model.name }),
        };

        for error in &errors {
            engine.metrics.inc_configuration_errors();
            engine.logger.log_configuration_error(error.policy(), &error.to_string());
        }
        engine.metrics.set_active_policies(engine.contexts.len() as i64);
        engine.logger.log_startup(engine.contexts.len(), errors.len());

        (engine, events_to_schedule, errors)
    }

    pub fn contexts(&self) -> &[SpdAdjustorContext] {
        &self.contexts
    }

    pub fn target_group(&self, id: &str) -> Option<&TargetGroup> {
        self.target_groups.get(id)
    }

    pub fn target_group_state(&self, id: &str) -> Option<&TargetGroupState> {
        self.target_group_states.get(id)
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Process one event to completion
    pub fn dispatch(&mut self, event: &SpdEvent) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        match event {
            SpdEvent::StateInitialized(values) => {
                self.restore(values);
                return outcome;
            }
            SpdEvent::RepeatedTimeReached(tick) => {
                self.metrics.inc_model_ticks(&tick.target_group);
                outcome.follow_up.push(SpdEvent::RepeatedTimeReached(tick.next()));
            }
            _ => {}
        }

        let time = event.time();
        for context in self.contexts.iter_mut().filter(|c| c.listens_to(event)) {
            let tg_id = context.target_group_id();
            let (Some(target_group), Some(tg_state)) =
                (self.target_groups.get(tg_id), self.target_group_states.get(tg_id))
            else {
                warn!(policy = %context.policy_id(), target_group = %tg_id, "Target group missing");
                continue;
            };

            let started = Instant::now();
            let result = context.handle(event, target_group, tg_state);
            self.metrics.observe_chain_latency(started.elapsed().as_secs_f64());

            let policy = context.policy_id().to_string();
            match result {
                FilterResult::Success(ChainEvent::ScalingRequested(request)) => {
                    self.metrics.inc_scaling_requests(&policy);
                    self.logger.log_scaling_request(
                        &policy,
                        &request.target_group,
                        &format!("{:?}", request.adjustment),
                        time,
                    );
                    outcome.requests.push(request);
                }
                FilterResult::Success(ChainEvent::Filtering(_)) => {}
                FilterResult::Disregard(reason) => {
                    outcome.disregarded += 1;
                    self.metrics.inc_disregards(&policy);
                    self.logger.log_disregard(&policy, &reason, time);
                }
                FilterResult::Wait(reason) => {
                    outcome.waiting += 1;
                    self.metrics.inc_waits();
                    self.logger.log_wait(&policy, &reason, time);
                }
            }

            if !matches!(event, SpdEvent::Measurement(_)) {
                if let Some(evaluator) = context.model_evaluator() {
                    let reward = evaluator.last_reward();
                    if let Some(reward) = reward {
                        self.metrics.set_last_reward(&policy, reward);
                    }
                    if let Ok(decision) = evaluator.decision() {
                        self.logger.log_model_update(&policy, evaluator.name(), decision, reward);
                    }
                }
            }
        }
        outcome
    }

    /// Record that `request` was carried out by the enactment mechanism
    pub fn on_adjustment_enacted(&mut self, request: &ScalingRequest) {
        let Some(context) = self.contexts.iter().find(|c| c.policy_id() == request.policy_id) else {
            warn!(policy = %request.policy_id, "Enactment reported for unknown policy");
            return;
        };
        let policy = context.policy().clone();
        let state = self
            .target_group_states
            .entry(request.target_group.clone())
            .or_insert_with(|| TargetGroupState::new(request.target_group.clone()));
        state.record_enactment(request.time, policy, request.model_decision);
        self.logger
            .log_enactment(&request.policy_id, &request.target_group, request.time, state.len());
    }

    /// Apply a checkpoint to the matching context and its target group history
    pub fn restore(&mut self, values: &SpdAdjustorStateValues) {
        let Some(context) = self
            .contexts
            .iter_mut()
            .find(|c| c.policy_id() == values.scaling_policy_id)
        else {
            warn!(policy = %values.scaling_policy_id, "Checkpoint for unknown policy ignored");
            return;
        };
        context.initialize(values);
        self.logger.log_state_restored(
            &values.scaling_policy_id,
            context.state().number_scales,
            context.state().cool_down_end,
        );

        let tg_id = context.target_group_id().to_string();
        let policies: HashMap<&str, _> = self
            .contexts
            .iter()
            .map(|c| (c.policy_id(), c.policy().clone()))
            .collect();
        let state = self
            .target_group_states
            .entry(tg_id.clone())
            .or_insert_with(|| TargetGroupState::new(tg_id));
        // history is shared, only seed it once
        if !state.is_empty() {
            return;
        }
        for (policy_id, time) in values.enacted_policies.iter().zip(&values.enactment_times) {
            match policies.get(policy_id.as_str()) {
                Some(policy) => state.record_enactment(*time, policy.clone(), None),
                None => debug!(policy = %policy_id, "Enacted policy from checkpoint is not loaded"),
            }
        }
    }

    /// Snapshots of every context, with the history of its target group
    pub fn export_states(&self) -> Vec<SpdAdjustorStateValues> {
        self.contexts
            .iter()
            .map(|context| {
                let mut values = context.export();
                if let Some(state) = self.target_group_states.get(context.target_group_id()) {
                    values.enacted_policies = state.enacted_policy_ids();
                    values.enactment_times = state.enactment_times().to_vec();
                }
                values
            })
            .collect()
    }

    pub fn shutdown(&self, reason: &str) {
        self.logger.log_shutdown(reason);
    }
}
