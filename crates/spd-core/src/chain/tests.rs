//! Filter chain tests
//!
//! Chains are assembled by hand here so each filter can be checked in
//! isolation and in combination, without going through the interpreter.

#[cfg(test)]
mod fixtures {
    use crate::events::SpdEvent;
    use crate::models::{
        AdjustmentType, BaseModel, Measurement, MetricKind, PolicyKind, RandomModel,
        ScalingPolicy, ScalingTrigger, TargetConstraint, TargetGroup, TargetGroupKind,
    };
    use std::sync::Arc;

    pub fn target_group() -> TargetGroup {
        TargetGroup {
            id: "web".into(),
            name: "web tier".into(),
            kind: TargetGroupKind::ElasticInfrastructure,
            elements: vec!["vm-1".into(), "vm-2".into()],
            initial_size: 2,
            target_constraints: vec![TargetConstraint::Size {
                min_size: 1,
                max_size: 10,
            }],
        }
    }

    pub fn step_policy(id: &str, step_value: i32) -> Arc<ScalingPolicy> {
        Arc::new(ScalingPolicy {
            id: id.into(),
            name: String::new(),
            target_group: "web".into(),
            active: true,
            kind: PolicyKind::Reactive {
                trigger: ScalingTrigger::And { triggers: vec![] },
                adjustment: AdjustmentType::Step { step_value },
            },
            policy_constraints: vec![],
        })
    }

    pub fn absolute_policy(id: &str) -> Arc<ScalingPolicy> {
        Arc::new(ScalingPolicy {
            id: id.into(),
            name: String::new(),
            target_group: "web".into(),
            active: true,
            kind: PolicyKind::Reactive {
                trigger: ScalingTrigger::And { triggers: vec![] },
                adjustment: AdjustmentType::Absolute { goal_value: 4 },
            },
            policy_constraints: vec![],
        })
    }

    pub fn model_policy(id: &str) -> Arc<ScalingPolicy> {
        Arc::new(ScalingPolicy {
            id: id.into(),
            name: String::new(),
            target_group: "web".into(),
            active: true,
            kind: PolicyKind::ModelBased {
                model: BaseModel::Random(RandomModel {
                    min_adjustment: -1,
                    max_adjustment: 1,
                    seed: Some(1),
                }),
            },
            policy_constraints: vec![],
        })
    }

    pub fn cpu(value: f64, time: f64) -> SpdEvent {
        SpdEvent::Measurement(Measurement::new(MetricKind::CpuUtilization, value, "vm-1", time))
    }
}

#[cfg(test)]
mod chain_tests {
    use super::fixtures::*;
    use crate::chain::{
        Adjustor, AnyOfFilter, ChainEvent, Filter, FilterChain, FilterContext, FilterObject,
        FilterResult, TargetGroupChecker,
    };
    use crate::constraint::{CooldownConstraint, IntervalConstraint};
    use crate::events::{RequestedAdjustment, SpdEvent};
    use crate::models::{Measurement, MetricKind};
    use crate::state::{SpdAdjustorState, TargetGroupState};

    fn filtering(event: SpdEvent) -> ChainEvent {
        ChainEvent::Filtering(FilterObject::new(event))
    }

    #[test]
    fn test_adjustor_emits_request_and_advances_state() {
        let tg = target_group();
        let policy = step_policy("up", 2);
        let history = TargetGroupState::new("web");
        let mut state = SpdAdjustorState::new("up");
        let mut chain = FilterChain::new()
            .with_filter(Filter::TargetGroup(TargetGroupChecker::new("web")))
            .with_filter(Filter::Adjustor(Adjustor::new(Some(30.0))));

        let mut ctx = FilterContext {
            policy: &policy,
            target_group: &tg,
            target_group_state: &history,
            state: &mut state,
        };
        let result = chain.process(filtering(cpu(0.9, 12.0)), &mut ctx);

        let request = result.scaling_request().expect("scaling request");
        assert_eq!(request.adjustment, RequestedAdjustment::Step { delta: 2 });
        assert_eq!(request.target_group, "web");
        assert_eq!(request.time, 12.0);
        assert_eq!(state.number_scales, 1);
        assert_eq!(state.cool_down_end, 42.0);
    }

    #[test]
    fn test_foreign_element_disregarded_before_adjustor() {
        let tg = target_group();
        let policy = step_policy("up", 1);
        let history = TargetGroupState::new("web");
        let mut state = SpdAdjustorState::new("up");
        let mut chain = FilterChain::new()
            .with_filter(Filter::TargetGroup(TargetGroupChecker::new("web")))
            .with_filter(Filter::Adjustor(Adjustor::default()));

        let foreign = SpdEvent::Measurement(Measurement::new(
            MetricKind::CpuUtilization,
            0.9,
            "db-1",
            3.0,
        ));
        let mut ctx = FilterContext {
            policy: &policy,
            target_group: &tg,
            target_group_state: &history,
            state: &mut state,
        };
        let result = chain.process(filtering(foreign), &mut ctx);
        assert!(matches!(result, FilterResult::Disregard(ref r) if r.contains("db-1")));
        assert_eq!(state.number_scales, 0);
    }

    #[test]
    fn test_cooldown_limits_operations() {
        let tg = target_group();
        let policy = step_policy("up", 1);
        let history = TargetGroupState::new("web");
        let mut state = SpdAdjustorState::new("up");
        let mut chain = FilterChain::new()
            .with_filter(Filter::Cooldown(CooldownConstraint::new(30.0, 2)))
            .with_filter(Filter::Adjustor(Adjustor::new(Some(30.0))));

        let mut outcomes = Vec::new();
        for time in [0.0, 5.0, 10.0, 31.0] {
            let mut ctx = FilterContext {
                policy: &policy,
                target_group: &tg,
                target_group_state: &history,
                state: &mut state,
            };
            outcomes.push(chain.process(filtering(cpu(0.9, time)), &mut ctx).is_success());
        }
        assert_eq!(outcomes, vec![true, true, false, true]);
        assert_eq!(state.number_scales, 3);
        assert_eq!(state.cool_down_end, 61.0);
        assert_eq!(state.number_of_scales_in_cooldown, 1);
    }

    #[test]
    fn test_interval_spacing() {
        let tg = target_group();
        let policy = step_policy("up", 1);
        let history = TargetGroupState::new("web");
        let mut state = SpdAdjustorState::new("up");
        let mut chain = FilterChain::new()
            .with_filter(Filter::Interval(IntervalConstraint::new(5.0, 20.0)))
            .with_filter(Filter::Adjustor(Adjustor::default()));

        let mut outcomes = Vec::new();
        for time in [1.0, 6.0, 20.0, 26.0] {
            let mut ctx = FilterContext {
                policy: &policy,
                target_group: &tg,
                target_group_state: &history,
                state: &mut state,
            };
            outcomes.push(chain.process(filtering(cpu(0.9, time)), &mut ctx).is_success());
        }
        assert_eq!(outcomes, vec![false, true, false, true]);
    }

    #[test]
    fn test_any_of_joins_reasons_and_undoes_failed_alternatives() {
        let tg = target_group();
        let policy = step_policy("up", 1);
        let history = TargetGroupState::new("web");
        let mut state = SpdAdjustorState::new("up");
        state.record_adjustment(0.0, Some(100.0));

        // an alternative that scales, then gets vetoed by its own cooldown
        let vetoed = FilterChain::new()
            .with_filter(Filter::Adjustor(Adjustor::new(Some(100.0))))
            .with_filter(Filter::Cooldown(CooldownConstraint::new(100.0, 1)));
        let mut any = Filter::AnyOf(AnyOfFilter::new(vec![
            Filter::AllOf(vetoed),
            Filter::Interval(IntervalConstraint::new(0.0, 50.0)),
        ]));

        let before = state.clone();
        let mut ctx = FilterContext {
            policy: &policy,
            target_group: &tg,
            target_group_state: &history,
            state: &mut state,
        };
        let result = any.process(filtering(cpu(0.9, 10.0)), &mut ctx);
        match result {
            FilterResult::Disregard(reason) => {
                assert!(reason.contains(" AND "));
                assert!(reason.contains("cooldown"));
                assert!(reason.contains("interval"));
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_any_of_succeeds_on_first_passing_alternative() {
        let tg = target_group();
        let policy = step_policy("up", 1);
        let history = TargetGroupState::new("web");
        let mut state = SpdAdjustorState::new("up");
        let mut any = Filter::AnyOf(AnyOfFilter::new(vec![
            Filter::Interval(IntervalConstraint::new(100.0, 10.0)),
            Filter::Cooldown(CooldownConstraint::new(10.0, 1)),
        ]));
        let mut ctx = FilterContext {
            policy: &policy,
            target_group: &tg,
            target_group_state: &history,
            state: &mut state,
        };
        assert!(any.process(filtering(cpu(0.9, 1.0)), &mut ctx).is_success());
    }
}

#[cfg(test)]
mod thrashing_tests {
    use super::fixtures::*;
    use crate::chain::{ChainEvent, Filter, FilterContext, FilterObject, FilterResult};
    use crate::constraint::ThrashingConstraint;
    use crate::events::{RepeatedTimeReached, SpdEvent};
    use crate::models::{BaseModel, FuzzyLearningModel, PolicyKind, ScalingPolicy};
    use crate::state::{SpdAdjustorState, TargetGroupState};
    use std::sync::Arc;

    const MIN_NO_THRASHING: f64 = 60.0;

    fn check(
        policy: &ScalingPolicy,
        history: &TargetGroupState,
        time: f64,
        decision: Option<i32>,
    ) -> FilterResult {
        let tg = target_group();
        let mut state = SpdAdjustorState::new(policy.id.clone());
        let mut filter = Filter::Thrashing(ThrashingConstraint::new(MIN_NO_THRASHING));
        let mut object = FilterObject::new(cpu(0.5, time));
        object.decision = decision;
        let mut ctx = FilterContext {
            policy,
            target_group: &tg,
            target_group_state: history,
            state: &mut state,
        };
        filter.process(ChainEvent::Filtering(object), &mut ctx)
    }

    fn history_with(policy: Arc<ScalingPolicy>, time: f64, decision: Option<i32>) -> TargetGroupState {
        let mut history = TargetGroupState::new("web");
        history.record_enactment(time, policy, decision);
        history
    }

    #[test]
    fn test_empty_history_allows_anything() {
        let history = TargetGroupState::new("web");
        assert!(check(&step_policy("down", -1), &history, 0.0, None).is_success());
    }

    #[test]
    fn test_opposite_sign_within_interval_disregarded() {
        let history = history_with(step_policy("up", 2), 100.0, None);
        let down = step_policy("down", -2);

        let early = check(&down, &history, 100.0 + MIN_NO_THRASHING - 0.001, None);
        assert!(matches!(early, FilterResult::Disregard(ref r) if r.contains("thrashing")));
        assert!(check(&down, &history, 100.0 + MIN_NO_THRASHING, None).is_success());
    }

    #[test]
    fn test_same_sign_allowed() {
        let history = history_with(step_policy("up", 2), 100.0, None);
        assert!(check(&step_policy("up-again", 1), &history, 101.0, None).is_success());
    }

    #[test]
    fn test_absolute_adjustments_skip_check() {
        let history = history_with(step_policy("up", 2), 100.0, None);
        assert!(check(&absolute_policy("fixed"), &history, 101.0, None).is_success());

        let history = history_with(absolute_policy("fixed"), 100.0, None);
        assert!(check(&step_policy("down", -1), &history, 101.0, None).is_success());
    }

    #[test]
    fn test_model_decisions_provide_signs() {
        let model = model_policy("random");
        let history = history_with(model.clone(), 100.0, Some(1));
        assert!(matches!(
            check(&model, &history, 110.0, Some(-1)),
            FilterResult::Disregard(_)
        ));
        assert!(check(&model, &history, 110.0, Some(1)).is_success());

        // a neutral last decision never blocks
        let neutral = history_with(model.clone(), 100.0, Some(0));
        assert!(check(&model, &neutral, 110.0, Some(-1)).is_success());
    }

    #[test]
    fn test_learning_models_bypass_during_learning_period() {
        let learning = Arc::new(ScalingPolicy {
            kind: PolicyKind::ModelBased {
                model: BaseModel::FuzzyQLearning(FuzzyLearningModel::new(0.1, 0.9, 0.1, 100.0)),
            },
            ..(*model_policy("fql")).clone()
        });
        let history = history_with(learning.clone(), 100.0, Some(2));
        assert!(check(&learning, &history, 110.0, Some(-2)).is_success());

        let history = history_with(learning.clone(), 1100.0, Some(2));
        assert!(matches!(
            check(&learning, &history, 1110.0, Some(-2)),
            FilterResult::Disregard(_)
        ));
    }

    #[test]
    fn test_timer_events_are_checked_too() {
        let history = history_with(step_policy("up", 2), 100.0, None);
        let tick = SpdEvent::RepeatedTimeReached(RepeatedTimeReached {
            target_group: "web".into(),
            time: 110.0,
            interval: 10.0,
        });
        let tg = target_group();
        let down = step_policy("down", -1);
        let mut state = SpdAdjustorState::new("down");
        let ctx = FilterContext {
            policy: &down,
            target_group: &tg,
            target_group_state: &history,
            state: &mut state,
        };
        let filter = ThrashingConstraint::new(MIN_NO_THRASHING);
        let result = filter.process(ChainEvent::Filtering(FilterObject::new(tick)), &ctx);
        assert!(matches!(result, FilterResult::Disregard(_)));
    }
}

#[cfg(test)]
mod rollback_tests {
    use super::fixtures::*;
    use crate::chain::{Adjustor, Filter, FilterChain};
    use crate::constraint::ThrashingConstraint;
    use crate::context::SpdAdjustorContext;
    use crate::state::TargetGroupState;

    #[test]
    fn test_disregard_restores_previous_snapshot() {
        let tg = target_group();
        let policy = step_policy("down", -1);
        let chain = FilterChain::new()
            .with_filter(Filter::Adjustor(Adjustor::new(Some(30.0))))
            .with_filter(Filter::Thrashing(ThrashingConstraint::new(60.0)));
        let mut context = SpdAdjustorContext::new(policy, chain);

        let mut history = TargetGroupState::new("web");
        history.record_enactment(0.0, step_policy("up", 1), None);

        // the adjustor ran before the veto, its state changes must not survive
        let result = context.handle(&cpu(0.9, 10.0), &tg, &history);
        assert!(!result.is_success());
        assert_eq!(context.state().number_scales, 0);
        assert_eq!(context.state().cool_down_end, 0.0);

        let result = context.handle(&cpu(0.9, 70.0), &tg, &history);
        assert!(result.is_success());
        assert_eq!(context.state().number_scales, 1);
    }
}
