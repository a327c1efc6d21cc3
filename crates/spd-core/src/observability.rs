//! Observability infrastructure for the scaling engine
//!
//! Provides:
//! - Prometheus metrics (scaling requests, disregards, model ticks, chain latency)
//! - Structured logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for chain evaluation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05,
];

/// Global metrics instance (registered once). `None` if registration failed.
static GLOBAL_METRICS: OnceLock<Option<EngineMetricsInner>> = OnceLock::new();

struct EngineMetricsInner {
    scaling_requests: IntCounterVec,
    disregards: IntCounterVec,
    waits: IntCounter,
    model_ticks: IntCounterVec,
    last_reward: GaugeVec,
    active_policies: IntGauge,
    configuration_errors: IntCounter,
    chain_latency_seconds: Histogram,
}

impl EngineMetricsInner {
    fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            scaling_requests: register_int_counter_vec!(
                "spd_scaling_requests_total",
                "Scaling requests emitted per policy",
                &["policy"]
            )?,
            disregards: register_int_counter_vec!(
                "spd_disregards_total",
                "Events disregarded by a filter chain",
                &["policy"]
            )?,
            waits: register_int_counter!(
                "spd_waits_total",
                "Chain evaluations waiting for more data"
            )?,
            model_ticks: register_int_counter_vec!(
                "spd_model_ticks_total",
                "Periodic model evaluations per target group",
                &["target_group"]
            )?,
            last_reward: register_gauge_vec!(
                "spd_model_last_reward",
                "Reward of the latest learning update",
                &["policy"]
            )?,
            active_policies: register_int_gauge!(
                "spd_active_policies",
                "Policies with a working filter chain"
            )?,
            configuration_errors: register_int_counter!(
                "spd_configuration_errors_total",
                "Policies rejected at interpretation time"
            )?,
            chain_latency_seconds: register_histogram!(
                "spd_chain_latency_seconds",
                "Time spent evaluating one filter chain",
                LATENCY_BUCKETS.to_vec()
            )?,
        })
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone, Debug)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match EngineMetricsInner::new() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register engine metrics, metrics disabled");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&EngineMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn inc_scaling_requests(&self, policy: &str) {
        if let Some(m) = self.inner() {
            m.scaling_requests.with_label_values(&[policy]).inc();
        }
    }

    pub fn inc_disregards(&self, policy: &str) {
        if let Some(m) = self.inner() {
            m.disregards.with_label_values(&[policy]).inc();
        }
    }

    pub fn inc_waits(&self) {
        if let Some(m) = self.inner() {
            m.waits.inc();
        }
    }

    pub fn inc_model_ticks(&self, target_group: &str) {
        if let Some(m) = self.inner() {
            m.model_ticks.with_label_values(&[target_group]).inc();
        }
    }

    pub fn set_last_reward(&self, policy: &str, reward: f64) {
        if let Some(m) = self.inner() {
            m.last_reward.with_label_values(&[policy]).set(reward);
        }
    }

    pub fn set_active_policies(&self, count: i64) {
        if let Some(m) = self.inner() {
            m.active_policies.set(count);
        }
    }

    pub fn inc_configuration_errors(&self) {
        if let Some(m) = self.inner() {
            m.configuration_errors.inc();
        }
    }

    pub fn observe_chain_latency(&self, duration_secs: f64) {
        if let Some(m) = self.inner() {
            m.chain_latency_seconds.observe(duration_secs);
        }
    }

    /// Text exposition of everything in the default registry
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Structured logger for engine events
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    engine: String,
}

impl StructuredLogger {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
        }
    }

    /// Log an emitted scaling request
    pub fn log_scaling_request(&self, policy: &str, target_group: &str, adjustment: &str, time: f64) {
        info!(
            event = "scaling_requested",
            engine = %self.engine,
            policy = %policy,
            target_group = %target_group,
            adjustment = %adjustment,
            sim_time = time,
            "Scaling request emitted"
        );
    }

    /// Disregards are expected control flow and stay at debug level
    pub fn log_disregard(&self, policy: &str, reason: &str, time: f64) {
        debug!(
            event = "event_disregarded",
            engine = %self.engine,
            policy = %policy,
            reason = %reason,
            sim_time = time,
            "Event disregarded"
        );
    }

    pub fn log_wait(&self, policy: &str, reason: &str, time: f64) {
        debug!(
            event = "event_pending",
            engine = %self.engine,
            policy = %policy,
            reason = %reason,
            sim_time = time,
            "Waiting for more data"
        );
    }

    pub fn log_configuration_error(&self, policy: &str, error: &str) {
        warn!(
            event = "policy_rejected",
            engine = %self.engine,
            policy = %policy,
            error = %error,
            "Scaling policy rejected"
        );
    }

    pub fn log_model_update(&self, policy: &str, model: &str, decision: i32, reward: Option<f64>) {
        debug!(
            event = "model_updated",
            engine = %self.engine,
            policy = %policy,
            model = %model,
            decision = decision,
            reward = ?reward,
            "Model evaluated"
        );
    }

    pub fn log_enactment(&self, policy: &str, target_group: &str, time: f64, history_len: usize) {
        info!(
            event = "adjustment_enacted",
            engine = %self.engine,
            policy = %policy,
            target_group = %target_group,
            sim_time = time,
            history_len = history_len,
            "Adjustment enacted"
        );
    }

    pub fn log_state_restored(&self, policy: &str, number_scales: u32, cool_down_end: f64) {
        info!(
            event = "state_restored",
            engine = %self.engine,
            policy = %policy,
            number_scales = number_scales,
            cool_down_end = cool_down_end,
            "Adjustor state restored"
        );
    }

    pub fn log_startup(&self, policies: usize, rejected: usize) {
        info!(
            event = "engine_started",
            engine = %self.engine,
            policies = policies,
            rejected = rejected,
            "Scaling engine started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            engine = %self.engine,
            reason = %reason,
            "Scaling engine shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handle_is_shared() {
        let a = EngineMetrics::new();
        let b = a.clone();
        a.inc_scaling_requests("metrics-test");
        b.inc_scaling_requests("metrics-test");
        let text = a.render().unwrap();
        assert!(text.contains("spd_scaling_requests_total"));
    }

    #[test]
    fn test_logger_does_not_panic() {
        let logger = StructuredLogger::new("test");
        logger.log_scaling_request("p", "tg", "step +1", 1.0);
        logger.log_disregard("p", "reason", 2.0);
        logger.log_shutdown("done");
    }
}
