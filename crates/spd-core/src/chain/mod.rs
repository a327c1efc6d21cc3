//! Filter chains
//!
//! Every policy owns one chain. An event enters at the head and each filter
//! either passes it on (possibly transformed), disregards it or asks to wait.
//! The canonical order is:
//!
//! ```text
//! TargetGroupChecker -> Trigger | Model -> Thrashing* -> Cooldown/Interval* -> Adjustor
//! ```
//!
//! Filters mutate the policy's [`SpdAdjustorState`] through a
//! [`FilterContext`]; the owning context rolls the state back when the chain
//! does not end in a scaling request.

mod adjustor;
mod filter_chain;
mod target_group;

#[cfg(test)]
mod tests;

pub use adjustor::Adjustor;
pub use filter_chain::{AnyOfFilter, FilterChain};
pub use target_group::TargetGroupChecker;

use crate::constraint::{CooldownConstraint, IntervalConstraint, ThrashingConstraint};
use crate::events::{ScalingRequest, SpdEvent};
use crate::models::{ScalingPolicy, TargetGroup};
use crate::state::{SpdAdjustorState, TargetGroupState};
use crate::trigger::{ModelTriggerChecker, TriggerChecker, TriggerVerdict};

/// Event travelling through a chain
#[derive(Debug, Clone, PartialEq)]
pub struct FilterObject {
    pub event: SpdEvent,
    pub time: f64,
    /// Decision of the model, set by the model trigger filter
    pub decision: Option<i32>,
}

impl FilterObject {
    pub fn new(event: SpdEvent) -> Self {
        Self {
            time: event.time(),
            event,
            decision: None,
        }
    }
}

/// What a filter hands to its successor
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    Filtering(FilterObject),
    ScalingRequested(ScalingRequest),
}

impl ChainEvent {
    pub fn time(&self) -> f64 {
        match self {
            ChainEvent::Filtering(object) => object.time,
            ChainEvent::ScalingRequested(request) => request.time,
        }
    }
}

/// Result of running one filter (or a whole chain)
#[derive(Debug, Clone, PartialEq)]
pub enum FilterResult {
    Success(ChainEvent),
    Disregard(String),
    /// Not enough information yet; treated like a disregard by the chain
    Wait(String),
}

impl FilterResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FilterResult::Success(_))
    }

    /// The scaling request, if the chain produced one
    pub fn scaling_request(&self) -> Option<&ScalingRequest> {
        match self {
            FilterResult::Success(ChainEvent::ScalingRequested(request)) => Some(request),
            _ => None,
        }
    }
}

/// Everything a filter may look at while processing one event
pub struct FilterContext<'a> {
    pub policy: &'a ScalingPolicy,
    pub target_group: &'a TargetGroup,
    pub target_group_state: &'a TargetGroupState,
    pub state: &'a mut SpdAdjustorState,
}

/// One stage of a filter chain
#[derive(Debug)]
pub enum Filter {
    TargetGroup(TargetGroupChecker),
    Trigger(TriggerChecker),
    Model(ModelTriggerChecker),
    Thrashing(ThrashingConstraint),
    Cooldown(CooldownConstraint),
    Interval(IntervalConstraint),
    Adjustor(Adjustor),
    /// Sub-chain that must pass as a whole
    AllOf(FilterChain),
    /// Sub-filters of which one must pass
    AnyOf(AnyOfFilter),
}

impl Filter {
    pub fn name(&self) -> &'static str {
        match self {
            Filter::TargetGroup(_) => "target_group",
            Filter::Trigger(_) => "trigger",
            Filter::Model(_) => "model_trigger",
            Filter::Thrashing(_) => "thrashing",
            Filter::Cooldown(_) => "cooldown",
            Filter::Interval(_) => "interval",
            Filter::Adjustor(_) => "adjustor",
            Filter::AllOf(_) => "all_of",
            Filter::AnyOf(_) => "any_of",
        }
    }

    pub fn process(&mut self, event: ChainEvent, ctx: &mut FilterContext<'_>) -> FilterResult {
        match self {
            Filter::TargetGroup(checker) => checker.process(event, ctx),
            Filter::Trigger(checker) => process_trigger(checker, event),
            Filter::Model(checker) => checker.process(event),
            Filter::Thrashing(constraint) => constraint.process(event, ctx),
            Filter::Cooldown(constraint) => constraint.process(event, ctx),
            Filter::Interval(constraint) => constraint.process(event, ctx),
            Filter::Adjustor(adjustor) => adjustor.process(event, ctx),
            Filter::AllOf(chain) => chain.process(event, ctx),
            Filter::AnyOf(any) => any.process(event, ctx),
        }
    }
}

fn process_trigger(checker: &mut TriggerChecker, event: ChainEvent) -> FilterResult {
    let object = match event {
        ChainEvent::Filtering(object) => object,
        passthrough => return FilterResult::Success(passthrough),
    };
    let verdict = match &object.event {
        SpdEvent::Measurement(measurement) => checker.check(measurement),
        other => {
            return FilterResult::Disregard(format!(
                "reactive trigger ignores {} events",
                other.kind()
            ))
        }
    };
    match verdict {
        TriggerVerdict::InAccordance => FilterResult::Success(ChainEvent::Filtering(object)),
        TriggerVerdict::Disregard(reason) => FilterResult::Disregard(reason),
        TriggerVerdict::Wait(reason) => FilterResult::Wait(reason),
    }
}
