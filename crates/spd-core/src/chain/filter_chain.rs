use super::{ChainEvent, Filter, FilterContext, FilterResult};
use crate::model::ModelEvaluator;
use tracing::trace;

/// Ordered list of filters run with an explicit cursor
#[derive(Debug, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(Filter::name).collect()
    }

    /// First model evaluator in the chain, searching sub-chains too
    pub fn model_evaluator(&self) -> Option<&dyn ModelEvaluator> {
        self.filters.iter().find_map(|filter| match filter {
            Filter::Model(checker) => Some(checker.evaluator()),
            Filter::AllOf(chain) => chain.model_evaluator(),
            _ => None,
        })
    }

    /// Run `event` through all filters, stopping at the first non-success
    pub fn process(&mut self, event: ChainEvent, ctx: &mut FilterContext<'_>) -> FilterResult {
        let mut current = event;
        let mut cursor = 0;
        while cursor < self.filters.len() {
            let filter = &mut self.filters[cursor];
            match filter.process(current, ctx) {
                FilterResult::Success(next) => current = next,
                stopped => {
                    trace!(
                        policy = %ctx.policy.id,
                        filter = filter.name(),
                        cursor,
                        "Chain stopped"
                    );
                    return stopped;
                }
            }
            cursor += 1;
        }
        FilterResult::Success(current)
    }
}

/// Passes when any sub-filter passes.
///
/// Sub-filters are tried in order with the same input; state changes of a
/// failed alternative are undone before the next one runs. When all fail
/// their reasons are joined with `" AND "`.
#[derive(Debug, Default)]
pub struct AnyOfFilter {
    alternatives: Vec<Filter>,
}

impl AnyOfFilter {
    pub fn new(alternatives: Vec<Filter>) -> Self {
        Self { alternatives }
    }

    pub fn process(&mut self, event: ChainEvent, ctx: &mut FilterContext<'_>) -> FilterResult {
        let mut reasons = Vec::with_capacity(self.alternatives.len());
        let mut wait = None;
        for alternative in &mut self.alternatives {
            let snapshot = ctx.state.clone();
            match alternative.process(event.clone(), ctx) {
                success @ FilterResult::Success(_) => return success,
                FilterResult::Disregard(reason) => reasons.push(reason),
                FilterResult::Wait(reason) => {
                    wait.get_or_insert(reason);
                }
            }
            *ctx.state = snapshot;
        }
        match wait {
            Some(reason) => FilterResult::Wait(reason),
            None if reasons.is_empty() => {
                FilterResult::Disregard("no alternative filters configured".to_string())
            }
            None => FilterResult::Disregard(reasons.join(" AND ")),
        }
    }
}
