//! Communication request/response types brokered by the communication
//! manager (spec.md §4.G). Replaces the original's runtime-tagged dict
//! requests with a closed sum over the four request kinds (design note §9).

use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::Job;

/// One entry in an `update_jobs` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobUpdate {
    pub panda_id: u64,
    pub state: String,
    pub body: Value,
}

/// One entry in an `update_events` request. The concrete event-range wire
/// schema is a remote-service concern, out of scope (spec.md §1); only the
/// envelope matters to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventUpdate {
    pub event_range_id: String,
    pub status: String,
    pub body: Value,
}

/// Tagged payload, one variant per request kind (spec.md §3).
#[derive(Debug, Clone)]
pub enum CommRequestPayload {
    RequestJobs { count: u32 },
    UpdateJobs { updates: Vec<JobUpdate> },
    RequestEvents { job: Job, count: u32 },
    UpdateEvents { updates: Vec<EventUpdate> },
}

impl CommRequestPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            CommRequestPayload::RequestJobs { .. } => "request_jobs",
            CommRequestPayload::UpdateJobs { .. } => "update_jobs",
            CommRequestPayload::RequestEvents { .. } => "request_events",
            CommRequestPayload::UpdateEvents { .. } => "update_events",
        }
    }
}

/// `{status, content, error}` per spec.md §3. `status` follows the
/// original's convention: `true`/non-zero means success.
#[derive(Debug, Clone)]
pub struct CommResponse {
    pub status: bool,
    pub content: Option<Value>,
    pub error: Option<String>,
}

impl CommResponse {
    pub fn ok(content: Value) -> Self {
        Self {
            status: true,
            content: Some(content),
            error: None,
        }
    }

    pub fn submitted() -> Self {
        Self {
            status: true,
            content: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: false,
            content: None,
            error: Some(error.into()),
        }
    }
}

pub type PostHook = Arc<dyn Fn(CommResponse) + Send + Sync>;

/// A request submitted to the communication manager. Ownership transfers to
/// the manager while queued; the client keeps an `Arc` clone to poll
/// [`CommRequest::response`] synchronously when no `post_hook` was given.
pub struct CommRequest {
    pub payload: CommRequestPayload,
    pub post_hook: Option<PostHook>,
    response: OnceLock<CommResponse>,
    pub abort: Mutex<bool>,
}

impl CommRequest {
    pub fn new(payload: CommRequestPayload, post_hook: Option<PostHook>) -> Arc<Self> {
        Arc::new(Self {
            payload,
            post_hook,
            response: OnceLock::new(),
            abort: Mutex::new(false),
        })
    }

    /// Sets the terminal response exactly once. Also invokes `post_hook` if
    /// present and `invoke_hook` is true (the manager decides per processor
    /// table entry whether this is the right pass to invoke it).
    pub fn complete(&self, response: CommResponse, invoke_hook: bool) {
        let hook = self.post_hook.clone();
        let for_hook = response.clone_for_hook();
        // OnceLock::set silently no-ops if already set; the manager's
        // dispatch loop guarantees each request is completed exactly once
        // (spec.md §8), so a second call here would indicate a bug upstream.
        let _ = self.response.set(response);
        if invoke_hook {
            if let Some(hook) = hook {
                hook(for_hook);
            }
        }
    }

    pub fn response(&self) -> Option<&CommResponse> {
        self.response.get()
    }

    pub fn is_aborted(&self) -> bool {
        *self.abort.lock().unwrap()
    }
}

impl CommResponse {
    fn clone_for_hook(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn complete_sets_response_once_and_invokes_hook() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();
        let req = CommRequest::new(
            CommRequestPayload::RequestJobs { count: 1 },
            Some(Arc::new(move |_resp| {
                called_clone.store(true, Ordering::SeqCst);
            })),
        );
        assert!(req.response().is_none());
        req.complete(CommResponse::ok(Value::Null), true);
        assert!(req.response().unwrap().status);
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn post_hook_skipped_when_invoke_hook_false() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();
        let req = CommRequest::new(
            CommRequestPayload::UpdateJobs { updates: vec![] },
            Some(Arc::new(move |_resp| {
                called_clone.store(true, Ordering::SeqCst);
            })),
        );
        req.complete(CommResponse::submitted(), false);
        assert!(!called.load(Ordering::SeqCst));
    }
}
