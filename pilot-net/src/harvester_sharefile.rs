//! File-based IPC communicator plugin (spec.md §4.H), selected via
//! `COMMUNICATOR_PLUGIN=harvestersf`, grounded on the original's
//! `harvestersharefilecommunicator.HarvesterShareFileCommunicator`: it writes
//! a request file to a shared directory and polls for a matching response
//! file, rather than speaking a network protocol. This is the concrete
//! reason spec.md §4.G's in-flight concurrency limit of 1 exists — two
//! concurrent requests of the same kind would overwrite each other's shared
//! files before either response arrived.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pilot_common::request::{CommRequestPayload, CommResponse};
use pilot_core::comm::CommunicatorPlugin;
use serde_json::Value;

/// How long `update_jobs`/`update_events` (single-call, no in-flight stage)
/// wait for harvester to drop an ack file before giving up.
const ACK_POLL_ATTEMPTS: u32 = 5;
const ACK_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct HarvesterShareFileCommunicator {
    dir: PathBuf,
}

impl HarvesterShareFileCommunicator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn request_path(&self, op: &str) -> PathBuf {
        self.dir.join(format!("{op}.request.json"))
    }

    fn response_path(&self, op: &str) -> PathBuf {
        self.dir.join(format!("{op}.response.json"))
    }

    fn submit(&self, op: &str, body: &Value) -> CommResponse {
        match pilot_io::write_json_sync(&self.request_path(op), body) {
            Ok(()) => CommResponse::submitted(),
            Err(e) => CommResponse::failed(e.to_string()),
        }
    }

    /// Non-blocking: reports ready only once harvester has dropped a
    /// response file, consumed by the manager's per-pass pre-check.
    fn poll_ready(&self, op: &str) -> CommResponse {
        if response_exists(&self.response_path(op)) {
            CommResponse::ok(Value::Null)
        } else {
            CommResponse::failed("harvester response not ready")
        }
    }

    fn collect(&self, op: &str) -> CommResponse {
        let path = self.response_path(op);
        match pilot_io::read_json_sync::<Value>(&path) {
            Ok(v) => {
                let _ = std::fs::remove_file(&path);
                CommResponse::ok(v)
            }
            Err(e) => CommResponse::failed(e.to_string()),
        }
    }

    /// `update_jobs`/`update_events` are terminal single calls (no in-flight
    /// stage of their own), so this blocks briefly for harvester's ack
    /// rather than relying on a later pre-check pass.
    fn submit_and_await_ack(&self, op: &str, body: &Value) -> CommResponse {
        if let Err(e) = pilot_io::write_json_sync(&self.request_path(op), body) {
            return CommResponse::failed(e.to_string());
        }
        let response_path = self.response_path(op);
        for _ in 0..ACK_POLL_ATTEMPTS {
            if response_exists(&response_path) {
                return self.collect(op);
            }
            std::thread::sleep(ACK_POLL_INTERVAL);
        }
        CommResponse::failed("harvester did not ack in time")
    }
}

fn response_exists(path: &Path) -> bool {
    path.exists()
}

impl CommunicatorPlugin for HarvesterShareFileCommunicator {
    fn pre_check_get_jobs(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn request_get_jobs(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::RequestJobs { count } = payload else {
            return CommResponse::failed("request_get_jobs called with mismatched payload");
        };
        self.submit("get_jobs", &serde_json::json!({"nJobs": count}))
    }

    fn check_get_jobs_status(&self) -> CommResponse {
        self.poll_ready("get_jobs")
    }

    fn get_jobs(&self, _payload: &CommRequestPayload) -> CommResponse {
        self.collect("get_jobs")
    }

    fn pre_check_get_events(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn request_get_events(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::RequestEvents { job, count } = payload else {
            return CommResponse::failed("request_get_events called with mismatched payload");
        };
        self.submit("get_events", &serde_json::json!({"pandaID": job.panda_id, "nRanges": count}))
    }

    fn check_get_events_status(&self) -> CommResponse {
        self.poll_ready("get_events")
    }

    fn get_events(&self, _payload: &CommRequestPayload) -> CommResponse {
        self.collect("get_events")
    }

    fn pre_check_update_jobs(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn update_jobs(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::UpdateJobs { updates } = payload else {
            return CommResponse::failed("update_jobs called with mismatched payload");
        };
        self.submit_and_await_ack("update_jobs", &serde_json::json!({"jobList": updates}))
    }

    fn pre_check_update_events(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn update_events(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::UpdateEvents { updates } = payload else {
            return CommResponse::failed("update_events called with mismatched payload");
        };
        self.submit_and_await_ack("update_events", &serde_json::json!({"eventRanges": updates}))
    }
}
