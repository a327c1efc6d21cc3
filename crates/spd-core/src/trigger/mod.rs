//! Trigger evaluation
//!
//! Reactive policies are driven by a [`TriggerChecker`] tree built from the
//! policy's trigger expression. Model-based policies are driven by a
//! [`ModelTriggerChecker`] that asks a model for a decision on every tick.

mod checker;
mod comparator;
mod model_checker;

pub use checker::{TriggerChecker, TriggerLeaf, TriggerVerdict};
pub use comparator::{ComparatorResult, ValueComparator};
pub use model_checker::ModelTriggerChecker;
