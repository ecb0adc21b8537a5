//! # Batch scheduler
//!
//! Claims the lowest-index `Pending` item, runs it through the vision and
//! generation stages, records the outcome, pauses, and scans again. One item
//! is in flight at a time; stopping is cooperative and takes effect between
//! items.

mod batch;
mod run_state;
mod types;

pub use batch::BatchScheduler;
pub use run_state::{BatchRunState, StopSignal};
pub use types::{ItemOutcome, RunOutcome, RunSummary, SchedulerOptions};
