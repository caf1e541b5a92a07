//! Dependency-ordered parallel loading.
//!
//! Loading is organized into steps ("parse all objects of category X") that
//! form a DAG. The runner executes a valid topological order with maximal
//! safe concurrency: the transitive closure of priority steps completes
//! first and serialized, heavy steps get a dedicated lane and never run
//! concurrently with each other, light steps accumulate freely into waves.

mod order;
mod runner;
mod step;
mod validator;

pub use order::compute_order;
pub use runner::{RunSummary, ScheduleError, Scheduler};
pub use step::{LoadingStep, StepContext, StepId, StepOutcome};
pub use validator::{Validator, run_validators};
