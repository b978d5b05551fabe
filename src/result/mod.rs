//! Result and error types for session operations

mod error;

pub use error::{ConditionalError, EngineError, PlaybookError};

use std::time::Duration;

/// Outcome of a single `wait_for_text` call.
///
/// A timeout is a normal outcome, not an error: `found` is `false` and
/// `captured` holds whatever arrived before the deadline (the engine clears
/// its buffer in that case so a stale partial match cannot corrupt the next
/// wait).
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Whether the expected text was found before the timeout.
    pub found: bool,

    /// Everything captured up to and including the match, or the partial
    /// output received before a timeout.
    pub captured: String,
}

/// Aggregated result of one playbook run.
///
/// Purely observational: besides the overall pass/fail there is no
/// control-flow effect. There is no partial-success state; a run either
/// completes all reachable steps or aborts at the first hard failure.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Overall pass/fail for the run.
    pub success: bool,

    /// Steps completed (skipped steps count toward progress).
    pub completed: usize,

    /// Total steps in the playbook.
    pub total: usize,

    /// Per-step elapsed time, in execution order.
    pub step_times: Vec<Duration>,

    /// Custom success message from the playbook's SUCCESS line, if any.
    pub success_message: Option<String>,
}

impl ExecutionReport {
    /// Total wall-clock time across all executed steps.
    pub fn total_time(&self) -> Duration {
        self.step_times.iter().sum()
    }

    /// Longest single step, if any step ran.
    pub fn longest_step(&self) -> Option<Duration> {
        self.step_times.iter().copied().max()
    }
}
