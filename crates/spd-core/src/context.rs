//! Per-policy adjustor context
//!
//! Couples a policy's filter chain with its live adjustor state and the
//! snapshot used to undo a failed evaluation.

use crate::chain::{ChainEvent, FilterChain, FilterContext, FilterObject, FilterResult};
use crate::events::{SpdAdjustorStateValues, SpdEvent};
use crate::model::ModelEvaluator;
use crate::models::{ScalingPolicy, TargetGroup};
use crate::state::{SpdAdjustorState, TargetGroupState};
use std::sync::Arc;

#[derive(Debug)]
pub struct SpdAdjustorContext {
    policy: Arc<ScalingPolicy>,
    chain: FilterChain,
    state: SpdAdjustorState,
    previous_state: SpdAdjustorState,
}

impl SpdAdjustorContext {
    pub fn new(policy: Arc<ScalingPolicy>, chain: FilterChain) -> Self {
        let state = SpdAdjustorState::new(policy.id.clone());
        Self {
            previous_state: state.clone(),
            policy,
            chain,
            state,
        }
    }

    pub fn policy(&self) -> &Arc<ScalingPolicy> {
        &self.policy
    }

    pub fn policy_id(&self) -> &str {
        &self.policy.id
    }

    pub fn target_group_id(&self) -> &str {
        &self.policy.target_group
    }

    pub fn state(&self) -> &SpdAdjustorState {
        &self.state
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// Evaluator of a model-based policy
    pub fn model_evaluator(&self) -> Option<&dyn ModelEvaluator> {
        self.chain.model_evaluator()
    }

    /// Whether this context evaluates `event` at all
    pub fn listens_to(&self, event: &SpdEvent) -> bool {
        match event {
            SpdEvent::Measurement(_) => true,
            SpdEvent::TimeReached { .. } => self.policy.is_model_based(),
            SpdEvent::RepeatedTimeReached(tick) => {
                self.policy.is_model_based() && tick.target_group == self.policy.target_group
            }
            SpdEvent::StateInitialized(_) => false,
        }
    }

    /// Run `event` through the chain.
    ///
    /// Anything but a scaling request restores the state captured before the
    /// event; the target group history is never touched here.
    pub fn handle(
        &mut self,
        event: &SpdEvent,
        target_group: &TargetGroup,
        target_group_state: &TargetGroupState,
    ) -> FilterResult {
        self.previous_state = self.state.clone();

        let mut ctx = FilterContext {
            policy: &self.policy,
            target_group,
            target_group_state,
            state: &mut self.state,
        };
        let result = self
            .chain
            .process(ChainEvent::Filtering(FilterObject::new(event.clone())), &mut ctx);

        let result = match result {
            // the adjustor is the last filter, so success must carry a request
            FilterResult::Success(ChainEvent::Filtering(_)) => {
                FilterResult::Disregard("chain ended without a scaling request".to_string())
            }
            other => other,
        };
        if !result.is_success() {
            self.state = self.previous_state.clone();
        }
        result
    }

    /// Seed the adjustor state from a checkpoint of this policy
    pub fn initialize(&mut self, values: &SpdAdjustorStateValues) -> bool {
        if values.scaling_policy_id != self.policy.id {
            return false;
        }
        self.state.restore(values);
        self.previous_state = self.state.clone();
        true
    }

    pub fn export(&self) -> SpdAdjustorStateValues {
        self.state.export()
    }
}
