//! Scaling policy decision core
//!
//! This crate turns scaling policy definitions into per-policy filter chains
//! and evaluates measurement and timer events against them:
//! - Metric aggregation over sliding windows
//! - Reactive trigger trees (AND/OR/NOT over value and trend comparisons)
//! - Thrashing, cooldown and interval constraints
//! - Model-based policies (random, thresholds, fuzzy Q-learning, fuzzy SARSA)
//! - Adjustor state with rollback on disregarded events
//!
//! Evaluation is single-threaded and event-driven: each event is processed
//! to completion by [`ScalingEngine::dispatch`] before the next one.

pub mod aggregator;
pub mod chain;
pub mod constraint;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod interpreter;
pub mod model;
pub mod models;
pub mod observability;
pub mod state;
pub mod trigger;

pub use context::SpdAdjustorContext;
pub use engine::{DispatchOutcome, ScalingEngine};
pub use error::{ConfigurationError, NotEmittable};
pub use events::{
    RepeatedTimeReached, RequestedAdjustment, ScalingRequest, SpdAdjustorStateValues, SpdEvent,
};
pub use interpreter::{InterpretationResult, InterpreterConfig, SpdInterpreter};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
