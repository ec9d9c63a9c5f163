//! Communication manager (spec.md §4.G): a multi-queue request/response
//! broker between pilot code and a pluggable remote communicator.

pub mod manager;
pub mod plugin;

use std::time::Duration;

use pilot_common::request::{CommRequest, CommRequestPayload, EventUpdate, JobUpdate, PostHook};
use pilot_common::{CommQueues, Job};
use serde_json::Value;

pub use manager::run_dispatch_loop;
pub use plugin::CommunicatorPlugin;

const SYNC_WAIT_POLL: Duration = Duration::from_secs(1);

/// Submits a request and, absent a `post_hook`, blocks until the manager
/// attaches a response (spec.md §5 "1-second sleeps ... in synchronous
/// waiters"). With a `post_hook`, returns immediately and the hook delivers
/// the eventual response.
fn submit(
    queues_tx: &crossbeam_channel::Sender<std::sync::Arc<CommRequest>>,
    payload: CommRequestPayload,
    post_hook: Option<PostHook>,
) -> Option<Result<Value, String>> {
    let is_async = post_hook.is_some();
    let req = CommRequest::new(payload, post_hook);
    if queues_tx.send(req.clone()).is_err() {
        return Some(Err("communication manager is not running".to_string()));
    }
    if is_async {
        return None;
    }
    loop {
        if let Some(res) = req.response() {
            return Some(if res.status {
                Ok(res.content.clone().unwrap_or(Value::Null))
            } else {
                Err(res.error.clone().unwrap_or_default())
            });
        }
        std::thread::sleep(SYNC_WAIT_POLL);
    }
}

/// `get_jobs(n, post_hook, args)` (spec.md §4.G). `args` is accepted for
/// parity with the original's extra-attributes parameter but is out of
/// scope to interpret here; callers fold it into their own payload if
/// their plugin needs it.
pub fn get_jobs(queues: &CommQueues, count: u32, post_hook: Option<PostHook>) -> Option<Result<Value, String>> {
    submit(&queues.request_get_jobs.0, CommRequestPayload::RequestJobs { count }, post_hook)
}

/// `update_jobs(jobs, post_hook)` (spec.md §4.G).
pub fn update_jobs(queues: &CommQueues, updates: Vec<JobUpdate>, post_hook: Option<PostHook>) -> Option<Result<Value, String>> {
    submit(&queues.update_jobs.0, CommRequestPayload::UpdateJobs { updates }, post_hook)
}

/// `get_event_ranges(n, post_hook, job)` (spec.md §4.G). Raises immediately
/// if the job descriptor is absent, matching the original's precondition.
pub fn get_event_ranges(queues: &CommQueues, count: u32, job: Job, post_hook: Option<PostHook>) -> Option<Result<Value, String>> {
    submit(&queues.request_get_events.0, CommRequestPayload::RequestEvents { job, count }, post_hook)
}

/// `update_events(updates, post_hook)` (spec.md §4.G).
pub fn update_events(queues: &CommQueues, updates: Vec<EventUpdate>, post_hook: Option<PostHook>) -> Option<Result<Value, String>> {
    submit(&queues.update_events.0, CommRequestPayload::UpdateEvents { updates }, post_hook)
}
