//! Core data models for scaling policy definitions
//!
//! These structures describe target groups, scaling policies, triggers and
//! models. They are loaded once (usually from JSON) and treated as read-only
//! afterwards; runtime state lives in [`crate::state`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default number of samples in a trigger window
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Default number of containers a target group starts with
pub const DEFAULT_INITIAL_SIZE: u32 = 1;

/// A complete scaling policy definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpdModel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_groups: Vec<TargetGroup>,
    #[serde(default)]
    pub scaling_policies: Vec<ScalingPolicy>,
}

impl SpdModel {
    /// Parse a model from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse scaling policy definition")
    }

    /// Load a model from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn target_group(&self, id: &str) -> Option<&TargetGroup> {
        self.target_groups.iter().find(|tg| tg.id == id)
    }
}

/// Kind of resource pool a target group represents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetGroupKind {
    #[default]
    ElasticInfrastructure,
    ServiceGroup,
    CompetingConsumersGroup,
}

/// A scalable pool of resource containers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: TargetGroupKind,
    /// Managed elements (resource containers) belonging to this group.
    /// An empty list accepts measurements from any element.
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default = "default_initial_size")]
    pub initial_size: u32,
    #[serde(default)]
    pub target_constraints: Vec<TargetConstraint>,
}

fn default_initial_size() -> u32 {
    DEFAULT_INITIAL_SIZE
}

impl TargetGroup {
    /// Whether a measurement reported by `entity` concerns this group
    pub fn contains_element(&self, entity: &str) -> bool {
        self.elements.is_empty() || entity == self.id || self.elements.iter().any(|e| e == entity)
    }

    /// Container bounds derived from all size constraints.
    ///
    /// Several size constraints tighten each other: the largest minimum and
    /// the smallest maximum win.
    pub fn size_bounds(&self) -> ContainerBounds {
        let mut bounds = ContainerBounds::unbounded();
        for constraint in &self.target_constraints {
            if let TargetConstraint::Size { min_size, max_size } = constraint {
                bounds.min = bounds.min.max(*min_size);
                bounds.max = bounds.max.min(*max_size);
                bounds.constrained = true;
            }
        }
        bounds
    }

    /// Minimum no-thrashing intervals of all thrashing constraints
    pub fn thrashing_intervals(&self) -> impl Iterator<Item = f64> + '_ {
        self.target_constraints.iter().filter_map(|c| match c {
            TargetConstraint::Thrashing {
                minimum_time_no_thrashing,
            } => Some(*minimum_time_no_thrashing),
            _ => None,
        })
    }
}

/// Constraints attached to a target group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetConstraint {
    Size { min_size: u32, max_size: u32 },
    Thrashing { minimum_time_no_thrashing: f64 },
}

/// Inclusive container count bounds of a target group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerBounds {
    pub min: u32,
    pub max: u32,
    /// False when no size constraint was declared
    pub constrained: bool,
}

impl ContainerBounds {
    pub fn unbounded() -> Self {
        Self {
            min: 0,
            max: u32::MAX,
            constrained: false,
        }
    }

    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            constrained: true,
        }
    }

    /// Clamp `delta` so that `current + delta` stays within the bounds
    pub fn clamp_delta(&self, current: u32, delta: i32) -> i32 {
        let lower = i64::from(self.min) - i64::from(current);
        let upper = i64::from(self.max) - i64::from(current);
        i64::from(delta).clamp(lower.min(upper), upper) as i32
    }

    /// Clamp an absolute container count into the bounds
    pub fn clamp(&self, size: i64) -> u32 {
        size.clamp(i64::from(self.min), i64::from(self.max)) as u32
    }

    /// Position of `current` between min and max in [0, 1], or 0 when unbounded
    pub fn occupancy(&self, current: u32) -> f64 {
        if !self.constrained || self.max <= self.min {
            return 0.0;
        }
        let span = f64::from(self.max - self.min);
        (f64::from(current.saturating_sub(self.min)) / span).clamp(0.0, 1.0)
    }
}

impl Default for ContainerBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// A scaling policy attached to a target group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub target_group: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub kind: PolicyKind,
    #[serde(default)]
    pub policy_constraints: Vec<PolicyConstraint>,
}

fn default_active() -> bool {
    true
}

impl ScalingPolicy {
    pub fn is_model_based(&self) -> bool {
        matches!(self.kind, PolicyKind::ModelBased { .. })
    }

    /// The static adjustment of a reactive policy
    pub fn adjustment(&self) -> Option<&AdjustmentType> {
        match &self.kind {
            PolicyKind::Reactive { adjustment, .. } => Some(adjustment),
            PolicyKind::ModelBased { .. } => None,
        }
    }

    /// Whether the policy is driven by a model that learns online
    pub fn uses_learning_model(&self) -> bool {
        match &self.kind {
            PolicyKind::ModelBased { model } => model.is_learning(),
            PolicyKind::Reactive { .. } => false,
        }
    }

    pub fn interval_constraint(&self) -> Option<(f64, f64)> {
        self.policy_constraints.iter().find_map(|c| match c {
            PolicyConstraint::Interval {
                offset,
                interval_duration,
            } => Some((*offset, *interval_duration)),
            _ => None,
        })
    }

    pub fn cooldown_constraint(&self) -> Option<(f64, u32)> {
        self.policy_constraints.iter().find_map(|c| match c {
            PolicyConstraint::Cooldown {
                cooldown_time,
                max_scaling_operations,
            } => Some((*cooldown_time, *max_scaling_operations)),
            _ => None,
        })
    }
}

/// Reactive (trigger-based) or model-based policy body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyKind {
    Reactive {
        trigger: ScalingTrigger,
        adjustment: AdjustmentType,
    },
    ModelBased {
        model: BaseModel,
    },
}

/// Constraints attached to a single policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConstraint {
    Interval {
        #[serde(default)]
        offset: f64,
        interval_duration: f64,
    },
    Cooldown {
        cooldown_time: f64,
        #[serde(default = "default_max_scaling_operations")]
        max_scaling_operations: u32,
    },
}

fn default_max_scaling_operations() -> u32 {
    1
}

/// Direction of an adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentSign {
    Positive,
    Negative,
    Neutral,
}

impl AdjustmentSign {
    pub fn from_delta(delta: i32) -> Self {
        match delta.signum() {
            1 => AdjustmentSign::Positive,
            -1 => AdjustmentSign::Negative,
            _ => AdjustmentSign::Neutral,
        }
    }
}

/// How a reactive policy changes the size of its target group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Grow or shrink by a percentage of the current size
    Relative { percentage_growth: f64 },
    /// Set the size to a fixed value
    Absolute { goal_value: u32 },
    /// Add a signed number of containers
    Step { step_value: i32 },
}

impl AdjustmentType {
    pub fn sign(&self) -> AdjustmentSign {
        match self {
            AdjustmentType::Relative { percentage_growth } if *percentage_growth > 0.0 => {
                AdjustmentSign::Positive
            }
            AdjustmentType::Relative { percentage_growth } if *percentage_growth < 0.0 => {
                AdjustmentSign::Negative
            }
            AdjustmentType::Relative { .. } => AdjustmentSign::Neutral,
            AdjustmentType::Step { step_value } => AdjustmentSign::from_delta(*step_value),
            // Absolute adjustments have no direction of their own
            AdjustmentType::Absolute { .. } => AdjustmentSign::Neutral,
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, AdjustmentType::Absolute { .. })
    }
}

/// Boolean trigger expression of a reactive policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScalingTrigger {
    Simple(SimpleTrigger),
    And { triggers: Vec<ScalingTrigger> },
    Or { triggers: Vec<ScalingTrigger> },
    Not { trigger: Box<ScalingTrigger> },
}

/// A leaf trigger comparing one aggregated stimulus against an expectation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleTrigger {
    pub stimulus: Stimulus,
    pub condition: TriggerCondition,
    pub expected: ExpectedValue,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub aggregation: AggregationMethod,
}

pub(crate) fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCondition {
    FireOnValue { operator: RelationalOperator },
    FireOnTrend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationalOperator {
    EqualTo,
    GreaterThanOrEqualTo,
    GreaterThan,
    LessThanOrEqualTo,
    LessThan,
}

impl RelationalOperator {
    pub fn holds(&self, actual: f64, expected: f64) -> bool {
        match self {
            RelationalOperator::EqualTo => actual == expected,
            RelationalOperator::GreaterThanOrEqualTo => actual >= expected,
            RelationalOperator::GreaterThan => actual > expected,
            RelationalOperator::LessThanOrEqualTo => actual <= expected,
            RelationalOperator::LessThan => actual < expected,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RelationalOperator::EqualTo => "=",
            RelationalOperator::GreaterThanOrEqualTo => ">=",
            RelationalOperator::GreaterThan => ">",
            RelationalOperator::LessThanOrEqualTo => "<=",
            RelationalOperator::LessThan => "<",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPattern {
    Increasing,
    Decreasing,
    NonIncreasing,
    NonDecreasing,
}

/// Expected value of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExpectedValue {
    Time(f64),
    Count(f64),
    Percentage(f64),
    Trend(TrendPattern),
}

impl ExpectedValue {
    pub fn variant_name(&self) -> &'static str {
        match self {
            ExpectedValue::Time(_) => "time",
            ExpectedValue::Count(_) => "count",
            ExpectedValue::Percentage(_) => "percentage",
            ExpectedValue::Trend(_) => "trend",
        }
    }
}

/// Metrics a stimulus can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    CpuUtilization,
    ResponseTime,
    NetworkUtilization,
    QueueLength,
    ContainerCount,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::CpuUtilization => "cpu_utilization",
            MetricKind::ResponseTime => "response_time",
            MetricKind::NetworkUtilization => "network_utilization",
            MetricKind::QueueLength => "queue_length",
            MetricKind::ContainerCount => "container_count",
        }
    }

    /// Whether triggers on this metric may be compared against `expected`
    pub fn accepts(&self, expected: &ExpectedValue) -> bool {
        match expected {
            ExpectedValue::Trend(_) => true,
            ExpectedValue::Time(_) => matches!(self, MetricKind::ResponseTime),
            ExpectedValue::Percentage(_) => matches!(
                self,
                MetricKind::CpuUtilization | MetricKind::NetworkUtilization
            ),
            ExpectedValue::Count(_) => {
                matches!(self, MetricKind::QueueLength | MetricKind::ContainerCount)
            }
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named source of measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub metric: MetricKind,
    /// Reduce the latest values of all managed elements with this method
    #[serde(default)]
    pub aggregate_over_elements: Option<AggregationMethod>,
}

impl Stimulus {
    pub fn new(metric: MetricKind) -> Self {
        Self {
            metric,
            aggregate_over_elements: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    #[default]
    Average,
    Max,
    Min,
    Sum,
    Median,
}

/// Models a model-based policy can wrap
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BaseModel {
    Random(RandomModel),
    QThresholds(QThresholdsModel),
    FuzzyQLearning(FuzzyLearningModel),
    FuzzySarsa(FuzzyLearningModel),
}

impl BaseModel {
    pub fn is_learning(&self) -> bool {
        matches!(self, BaseModel::FuzzyQLearning(_) | BaseModel::FuzzySarsa(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            BaseModel::Random(_) => "random",
            BaseModel::QThresholds(_) => "q_thresholds",
            BaseModel::FuzzyQLearning(_) => "fuzzy_q_learning",
            BaseModel::FuzzySarsa(_) => "fuzzy_sarsa",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomModel {
    #[serde(default = "default_min_adjustment")]
    pub min_adjustment: i32,
    #[serde(default = "default_max_adjustment")]
    pub max_adjustment: i32,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_min_adjustment() -> i32 {
    -1
}

fn default_max_adjustment() -> i32 {
    1
}

/// Static thresholds bucketing one aggregated stimulus into deltas.
///
/// `thresholds` must be ascending and `deltas` must hold exactly one more
/// entry: values below `thresholds[0]` map to `deltas[0]`, values at or above
/// the last threshold map to the last delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QThresholdsModel {
    pub stimulus: Stimulus,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub aggregation: AggregationMethod,
    pub thresholds: Vec<f64>,
    pub deltas: Vec<i32>,
}

/// Trapezoidal breakpoints of the utilization membership functions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilizationBreakpoints {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

impl Default for UtilizationBreakpoints {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.5,
            gamma: 0.65,
            delta: 0.9,
        }
    }
}

impl UtilizationBreakpoints {
    pub fn is_ordered(&self) -> bool {
        self.alpha < self.beta && self.beta < self.gamma && self.gamma < self.delta
    }
}

/// Reward shaping strategy of a fuzzy learning model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardShaping {
    /// Reward utilization while the SLA holds, penalize violations
    Sla,
    /// SLA reward normalized by container count, with explicit
    /// scale-up penalty and scale-down bonus
    ContainerAware {
        #[serde(default = "default_scale_up_penalty")]
        scale_up_penalty: f64,
        #[serde(default = "default_scale_down_bonus")]
        scale_down_bonus: f64,
    },
}

pub(crate) fn default_scale_up_penalty() -> f64 {
    4.0
}

pub(crate) fn default_scale_down_bonus() -> f64 {
    2.0
}

/// How the emitted decision relates to the container bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionClamping {
    /// Clamp so the resulting container count stays within min/max
    #[default]
    Headroom,
    /// Emit the raw blended action
    Raw,
}

/// Parameters shared by Fuzzy Q-Learning and Fuzzy SARSA
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyLearningModel {
    pub learning_rate: f64,
    pub discount_factor: f64,
    /// Annealing rate of the exploration probability
    pub epsilon: f64,
    /// Lower bound of the annealed exploration probability
    #[serde(default)]
    pub epsilon_floor: Option<f64>,
    pub target_response_time: f64,
    #[serde(default = "default_workload_stimulus")]
    pub workload_stimulus: Stimulus,
    #[serde(default = "default_response_time_stimulus")]
    pub response_time_stimulus: Stimulus,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub response_time_aggregation: AggregationMethod,
    #[serde(default)]
    pub utilization_breakpoints: UtilizationBreakpoints,
    #[serde(default)]
    pub reward: Option<RewardShaping>,
    #[serde(default)]
    pub clamping: DecisionClamping,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_workload_stimulus() -> Stimulus {
    Stimulus {
        metric: MetricKind::CpuUtilization,
        aggregate_over_elements: Some(AggregationMethod::Average),
    }
}

fn default_response_time_stimulus() -> Stimulus {
    Stimulus::new(MetricKind::ResponseTime)
}

impl FuzzyLearningModel {
    /// Model with the given learning parameters and default stimuli
    pub fn new(learning_rate: f64, discount_factor: f64, epsilon: f64, target: f64) -> Self {
        Self {
            learning_rate,
            discount_factor,
            epsilon,
            epsilon_floor: None,
            target_response_time: target,
            workload_stimulus: default_workload_stimulus(),
            response_time_stimulus: default_response_time_stimulus(),
            window_size: DEFAULT_WINDOW_SIZE,
            response_time_aggregation: AggregationMethod::Average,
            utilization_breakpoints: UtilizationBreakpoints::default(),
            reward: None,
            clamping: DecisionClamping::Headroom,
            seed: None,
        }
    }
}

/// A timestamped sample of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub metric: MetricKind,
    pub value: f64,
    /// Managed element (or target group) that reported the value
    #[serde(default)]
    pub entity: String,
    pub time: f64,
}

impl Measurement {
    pub fn new(metric: MetricKind, value: f64, entity: impl Into<String>, time: f64) -> Self {
        Self {
            metric,
            value,
            entity: entity.into(),
            time,
        }
    }
}
