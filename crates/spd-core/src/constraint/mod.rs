//! Constraint filters
//!
//! Constraints sit between the trigger stage and the adjustor. Thrashing
//! constraints come from the target group and look at the shared enactment
//! history; cooldown and interval constraints come from the policy and look
//! at its own adjustor state.

mod cooldown;
mod interval;
mod thrashing;

pub use cooldown::CooldownConstraint;
pub use interval::IntervalConstraint;
pub use thrashing::{ThrashingConstraint, DEFAULT_LEARNING_PERIOD};
