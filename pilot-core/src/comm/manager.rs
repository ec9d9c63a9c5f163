//! Communication manager dispatch loop (spec.md §4.G), grounded on
//! `original_source/.../communicationmanager.py::run`/`can_process_request`/
//! `get_processor`.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use pilot_common::request::{CommRequest, CommResponse};
use pilot_common::shutdown::Shutdown;
use pilot_common::CommQueues;
use tracing::info;

use super::plugin::CommunicatorPlugin;

/// Per-stage in-flight concurrency limit (spec.md §4.G: "inbound queues
/// unbounded; in-flight queues limited to 1 each").
const IN_FLIGHT_LIMIT: usize = 1;

/// Runs the manager's single-threaded cooperative dispatch loop until
/// cancelled and drained. One plugin instance is used for the whole loop
/// (selected once at construction, matching `get_processor()` being
/// computed once before `run()`'s loop).
pub fn run_dispatch_loop(queues: &CommQueues, plugin: &dyn CommunicatorPlugin, cancel: &Shutdown) {
    loop {
        let mut did_work = false;

        did_work |= process_entry(
            cancel,
            &queues.request_get_jobs,
            Some((&queues.processing_get_jobs.1, IN_FLIGHT_LIMIT)),
            Some(&queues.processing_get_jobs.0),
            false,
            || plugin.pre_check_get_jobs(),
            |req| plugin.request_get_jobs(&req.payload),
        );

        did_work |= process_entry(
            cancel,
            &queues.request_get_events,
            Some((&queues.processing_get_events.1, IN_FLIGHT_LIMIT)),
            Some(&queues.processing_get_events.0),
            false,
            || plugin.pre_check_get_events(),
            |req| plugin.request_get_events(&req.payload),
        );

        did_work |= process_entry(
            cancel,
            &queues.update_jobs,
            None,
            None,
            true,
            || plugin.pre_check_update_jobs(),
            |req| plugin.update_jobs(&req.payload),
        );

        did_work |= process_entry(
            cancel,
            &queues.update_events,
            None,
            None,
            true,
            || plugin.pre_check_update_events(),
            |req| plugin.update_events(&req.payload),
        );

        did_work |= process_entry(
            cancel,
            &queues.processing_get_jobs,
            None,
            None,
            true,
            || plugin.check_get_jobs_status(),
            |req| plugin.get_jobs(&req.payload),
        );

        did_work |= process_entry(
            cancel,
            &queues.processing_get_events,
            None,
            None,
            true,
            || plugin.check_get_events_status(),
            |req| plugin.get_events(&req.payload),
        );

        if !did_work {
            if cancel.is_set() {
                break;
            }
            std::thread::sleep(Duration::from_secs(1));
        }
    }
    info!("communication manager finished");
}

/// Processes one entry of the fixed processor table for a single pass.
/// Returns whether this entry did work (dequeued and handled a request).
fn process_entry(
    cancel: &Shutdown,
    source: &(Sender<Arc<CommRequest>>, Receiver<Arc<CommRequest>>),
    next_queue_gate: Option<(&Receiver<Arc<CommRequest>>, usize)>,
    next_queue_tx: Option<&Sender<Arc<CommRequest>>>,
    process_req_post_hook: bool,
    pre_check: impl Fn() -> CommResponse,
    handler: impl Fn(&CommRequest) -> CommResponse,
) -> bool {
    if cancel.is_set() {
        while let Ok(req) = source.1.try_recv() {
            info!("is going to stop, aborting request");
            *req.abort.lock().unwrap() = true;
            req.complete(
                CommResponse::failed("Communication manager is stopping, abort this request"),
                true,
            );
        }
        return false;
    }

    if source.1.is_empty() {
        return false;
    }
    if let Some((next_rx, limit)) = next_queue_gate {
        if next_rx.len() >= limit {
            return false;
        }
    }

    let pre = pre_check();
    if !pre.status {
        return false;
    }

    let req = match source.1.try_recv() {
        Ok(r) => r,
        Err(_) => return false,
    };

    let res = handler(&req);

    if !res.status {
        req.complete(res, process_req_post_hook);
    } else if let Some(next_tx) = next_queue_tx {
        let _ = next_tx.send(req);
    } else {
        req.complete(res, process_req_post_hook);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_common::request::CommRequestPayload;

    struct AlwaysSucceeds;

    impl CommunicatorPlugin for AlwaysSucceeds {
        fn pre_check_get_jobs(&self) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
        fn request_get_jobs(&self, _payload: &CommRequestPayload) -> CommResponse {
            CommResponse::submitted()
        }
        fn check_get_jobs_status(&self) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
        fn get_jobs(&self, _payload: &CommRequestPayload) -> CommResponse {
            CommResponse::ok(serde_json::json!([{"PandaID": 1}]))
        }
        fn pre_check_get_events(&self) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
        fn request_get_events(&self, _payload: &CommRequestPayload) -> CommResponse {
            CommResponse::submitted()
        }
        fn check_get_events_status(&self) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
        fn get_events(&self, _payload: &CommRequestPayload) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
        fn pre_check_update_jobs(&self) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
        fn update_jobs(&self, _payload: &CommRequestPayload) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
        fn pre_check_update_events(&self) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
        fn update_events(&self, _payload: &CommRequestPayload) -> CommResponse {
            CommResponse::ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn get_jobs_request_flows_through_in_flight_queue_to_completion() {
        let queues = CommQueues::new();
        let cancel = Shutdown::new();
        let plugin = AlwaysSucceeds;

        let req = CommRequest::new(CommRequestPayload::RequestJobs { count: 1 }, None);
        queues.request_get_jobs.0.send(req.clone()).unwrap();

        // Pass 1: request_get_jobs is dequeued and moved to processing_get_jobs.
        process_entry(
            &cancel,
            &queues.request_get_jobs,
            Some((&queues.processing_get_jobs.1, IN_FLIGHT_LIMIT)),
            Some(&queues.processing_get_jobs.0),
            false,
            || plugin.pre_check_get_jobs(),
            |r| plugin.request_get_jobs(&r.payload),
        );
        assert!(req.response().is_none());
        assert_eq!(queues.processing_get_jobs.1.len(), 1);

        // Pass 2: processing_get_jobs completes the request.
        process_entry(
            &cancel,
            &queues.processing_get_jobs,
            None,
            None,
            true,
            || plugin.check_get_jobs_status(),
            |r| plugin.get_jobs(&r.payload),
        );
        assert!(req.response().unwrap().status);
    }

    #[test]
    fn cancelled_manager_aborts_queued_requests_with_communication_failure() {
        let queues = CommQueues::new();
        let cancel = Shutdown::new();
        cancel.signal();

        let req = CommRequest::new(CommRequestPayload::UpdateJobs { updates: vec![] }, None);
        queues.update_jobs.0.send(req.clone()).unwrap();

        let plugin = AlwaysSucceeds;
        process_entry(
            &cancel,
            &queues.update_jobs,
            None,
            None,
            true,
            || plugin.pre_check_update_jobs(),
            |r| plugin.update_jobs(&r.payload),
        );

        assert!(req.is_aborted());
        assert!(!req.response().unwrap().status);
    }

    #[test]
    fn second_get_jobs_request_waits_while_in_flight_queue_is_full() {
        let queues = CommQueues::new();
        let cancel = Shutdown::new();
        let plugin = AlwaysSucceeds;

        let req_a = CommRequest::new(CommRequestPayload::RequestJobs { count: 1 }, None);
        let req_b = CommRequest::new(CommRequestPayload::RequestJobs { count: 1 }, None);
        queues.request_get_jobs.0.send(req_a).unwrap();
        queues.request_get_jobs.0.send(req_b).unwrap();

        process_entry(
            &cancel,
            &queues.request_get_jobs,
            Some((&queues.processing_get_jobs.1, IN_FLIGHT_LIMIT)),
            Some(&queues.processing_get_jobs.0),
            false,
            || plugin.pre_check_get_jobs(),
            |r| plugin.request_get_jobs(&r.payload),
        );
        assert_eq!(queues.processing_get_jobs.1.len(), 1);
        assert_eq!(queues.request_get_jobs.1.len(), 1);

        // Second pass: in-flight queue is full (limit 1), so the remaining
        // request stays in the inbound queue.
        let did_work = process_entry(
            &cancel,
            &queues.request_get_jobs,
            Some((&queues.processing_get_jobs.1, IN_FLIGHT_LIMIT)),
            Some(&queues.processing_get_jobs.0),
            false,
            || plugin.pre_check_get_jobs(),
            |r| plugin.request_get_jobs(&r.payload),
        );
        assert!(!did_work);
        assert_eq!(queues.request_get_jobs.1.len(), 1);
    }
}
