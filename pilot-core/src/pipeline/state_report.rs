//! The external state-reporting collaborator (spec.md §6
//! "`send_state(job, args, state)`"): synchronous, best-effort, failure
//! swallowed. Out of scope to implement for real; the core only needs
//! something to call.

use pilot_common::job::Job;
use tracing::debug;

pub trait StateReporter: Send + Sync {
    fn send_state(&self, job: &Job, state: &str);
}

/// Logs the state transition and otherwise does nothing — stands in for the
/// real PanDA server update call, which is explicitly out of scope
/// (spec.md §1).
#[derive(Default)]
pub struct NoopStateReporter;

impl StateReporter for NoopStateReporter {
    fn send_state(&self, job: &Job, state: &str) {
        debug!(panda_id = job.panda_id, state, "send_state (no-op)");
    }
}
