//! Discrete-event replay of a measurement trace
//!
//! Events are kept in a min-heap ordered by simulated time and insertion
//! sequence, so events with equal timestamps run in the order they were
//! scheduled. Scaling requests are applied to simulated container counts and
//! reported back to the engine as enactments, followed by a container count
//! measurement of the target group.

use chrono::{DateTime, Utc};
use serde::Serialize;
use spd_core::{
    ConfigurationError, InterpreterConfig, Measurement, MetricKind, ScalingEngine, ScalingRequest,
    SpdAdjustorStateValues, SpdEvent, SpdModel,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use tabled::Tabled;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Scheduled {
    time: f64,
    seq: u64,
    event: SpdEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events in timestamp order
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EventQueue {
    pub fn push(&mut self, event: SpdEvent) {
        let scheduled = Scheduled {
            time: event.time(),
            seq: self.next_seq,
            event,
        };
        self.next_seq += 1;
        self.heap.push(scheduled);
    }

    pub fn pop(&mut self) -> Option<SpdEvent> {
        self.heap.pop().map(|scheduled| scheduled.event)
    }

    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|scheduled| scheduled.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    pub simulate_enactment: bool,
    /// Last simulated time to process; `None` stops after the last measurement
    pub end_time: Option<f64>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            simulate_enactment: true,
            end_time: None,
        }
    }
}

/// One scaling request seen during the run
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct RequestRecord {
    #[tabled(rename = "Time")]
    pub time: f64,
    #[tabled(rename = "Policy")]
    pub policy: String,
    #[tabled(rename = "Target Group")]
    pub target_group: String,
    #[tabled(rename = "Adjustment")]
    pub adjustment: String,
    #[tabled(rename = "From")]
    pub from: u32,
    #[tabled(rename = "To")]
    pub to: u32,
    #[tabled(rename = "Enacted")]
    pub enacted: bool,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct GroupSummary {
    #[tabled(rename = "Target Group")]
    pub id: String,
    #[tabled(rename = "Initial")]
    pub initial_size: u32,
    #[tabled(rename = "Final")]
    pub final_size: u32,
    #[tabled(rename = "Enactments")]
    pub enactments: usize,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct RejectedPolicy {
    #[tabled(rename = "Policy")]
    pub policy: String,
    #[tabled(rename = "Error")]
    pub error: String,
}

/// Summary of a replay run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub model: String,
    pub generated_at: DateTime<Utc>,
    /// Time of the last processed event
    pub simulated_until: f64,
    pub events_processed: u64,
    pub measurements: u64,
    pub model_ticks: u64,
    pub disregarded: u64,
    pub waiting: u64,
    pub rejected_policies: Vec<RejectedPolicy>,
    pub requests: Vec<RequestRecord>,
    pub target_groups: Vec<GroupSummary>,
}

/// Engine plus simulated environment
pub struct Simulator {
    model_name: String,
    engine: ScalingEngine,
    queue: EventQueue,
    sizes: BTreeMap<String, u32>,
    initial_sizes: BTreeMap<String, u32>,
    errors: Vec<ConfigurationError>,
    last_measurement: Option<f64>,
    options: ReplayOptions,
}

impl Simulator {
    pub fn new(model: &SpdModel, config: InterpreterConfig, options: ReplayOptions) -> Self {
        let (engine, initial_events, errors) = ScalingEngine::from_model(model, config);
        let sizes: BTreeMap<String, u32> = model
            .target_groups
            .iter()
            .map(|tg| (tg.id.clone(), tg.size_bounds().clamp(i64::from(tg.initial_size))))
            .collect();

        let mut queue = EventQueue::default();
        for event in initial_events {
            queue.push(event);
        }

        Self {
            model_name: model.name.clone(),
            engine,
            queue,
            initial_sizes: sizes.clone(),
            sizes,
            errors,
            last_measurement: None,
            options,
        }
    }

    pub fn engine(&self) -> &ScalingEngine {
        &self.engine
    }

    /// Apply checkpoints before any event runs
    pub fn restore(&mut self, checkpoints: &[SpdAdjustorStateValues]) {
        for values in checkpoints {
            self.engine
                .dispatch(&SpdEvent::StateInitialized(values.clone()));
        }
        info!(checkpoints = checkpoints.len(), "Checkpoints applied");
    }

    pub fn schedule_trace(&mut self, trace: Vec<Measurement>) {
        for measurement in trace {
            self.last_measurement = Some(
                self.last_measurement
                    .map_or(measurement.time, |t| t.max(measurement.time)),
            );
            self.queue.push(SpdEvent::Measurement(measurement));
        }
    }

    fn horizon(&self) -> f64 {
        self.options
            .end_time
            .or(self.last_measurement)
            .unwrap_or(0.0)
    }

    /// Process events until the queue is drained or the horizon is passed
    pub fn run(&mut self) -> RunReport {
        let horizon = self.horizon();
        let mut report = RunReport {
            model: self.model_name.clone(),
            generated_at: Utc::now(),
            simulated_until: 0.0,
            events_processed: 0,
            measurements: 0,
            model_ticks: 0,
            disregarded: 0,
            waiting: 0,
            rejected_policies: self
                .errors
                .iter()
                .map(|error| RejectedPolicy {
                    policy: error.policy().to_string(),
                    error: error.to_string(),
                })
                .collect(),
            requests: Vec::new(),
            target_groups: Vec::new(),
        };
        info!(horizon, pending = self.queue.len(), "Replay started");

        while self.queue.peek_time().is_some_and(|time| time <= horizon) {
            let Some(event) = self.queue.pop() else {
                break;
            };
            match &event {
                SpdEvent::Measurement(_) => report.measurements += 1,
                SpdEvent::RepeatedTimeReached(_) | SpdEvent::TimeReached { .. } => {
                    report.model_ticks += 1
                }
                SpdEvent::StateInitialized(_) => {}
            }
            report.events_processed += 1;
            report.simulated_until = event.time();

            let outcome = self.engine.dispatch(&event);
            report.disregarded += outcome.disregarded as u64;
            report.waiting += outcome.waiting as u64;
            for follow_up in outcome.follow_up {
                self.queue.push(follow_up);
            }
            for request in outcome.requests {
                let record = self.enact(&request);
                report.requests.push(record);
            }
        }

        if !self.queue.is_empty() {
            debug!(pending = self.queue.len(), horizon, "Events beyond horizon dropped");
        }

        report.target_groups = self
            .sizes
            .iter()
            .map(|(id, size)| GroupSummary {
                id: id.clone(),
                initial_size: self.initial_sizes.get(id).copied().unwrap_or(*size),
                final_size: *size,
                enactments: self
                    .engine
                    .target_group_state(id)
                    .map_or(0, |state| state.len()),
            })
            .collect();
        info!(
            events = report.events_processed,
            requests = report.requests.len(),
            "Replay finished"
        );
        report
    }

    fn enact(&mut self, request: &ScalingRequest) -> RequestRecord {
        let (bounds, initial_size) = match self.engine.target_group(&request.target_group) {
            Some(tg) => (tg.size_bounds(), tg.initial_size),
            None => {
                warn!(target_group = %request.target_group, "Request for unknown target group");
                (Default::default(), 0)
            }
        };
        let current = *self
            .sizes
            .entry(request.target_group.clone())
            .or_insert(initial_size);
        let target = request.adjustment.resulting_size(current, &bounds);

        let record = RequestRecord {
            time: request.time,
            policy: request.policy_id.clone(),
            target_group: request.target_group.clone(),
            adjustment: describe(request),
            from: current,
            to: target,
            enacted: self.options.simulate_enactment,
        };
        if !self.options.simulate_enactment {
            return record;
        }

        self.sizes.insert(request.target_group.clone(), target);
        self.engine.on_adjustment_enacted(request);
        self.queue.push(SpdEvent::Measurement(Measurement::new(
            MetricKind::ContainerCount,
            f64::from(target),
            request.target_group.clone(),
            request.time,
        )));
        record
    }
}

fn describe(request: &ScalingRequest) -> String {
    use spd_core::RequestedAdjustment;
    match request.adjustment {
        RequestedAdjustment::Step { delta } => format!("step {delta:+}"),
        RequestedAdjustment::Relative { percentage_growth } => {
            format!("relative {percentage_growth:+.0}%")
        }
        RequestedAdjustment::Absolute { target_size } => format!("absolute {target_size}"),
    }
}
