//! Default communicator plugin (spec.md §4.H), grounded on the original's
//! `pandacommunicator.PandaCommunicator` being the fallback when
//! `COMMUNICATOR_PLUGIN` is unset. Talks to an illustrative PanDA-server-like
//! REST surface; the wire protocol itself is out of scope (spec.md §1), this
//! exists to exercise the dispatch/concurrency machinery end-to-end.

use pilot_common::request::{CommRequestPayload, CommResponse};
use pilot_core::comm::CommunicatorPlugin;
use serde_json::Value;
use tracing::warn;

pub struct PandaCommunicator {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl PandaCommunicator {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn post(&self, path: &str, body: Value) -> CommResponse {
        match self.client.post(format!("{}/{}", self.endpoint, path)).json(&body).send() {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>() {
                Ok(v) => CommResponse::ok(v),
                Err(e) => CommResponse::failed(e.to_string()),
            },
            Ok(resp) => CommResponse::failed(format!("server returned {}", resp.status())),
            Err(e) => {
                warn!(error = %e, path, "panda communicator request failed");
                CommResponse::failed(e.to_string())
            }
        }
    }
}

impl CommunicatorPlugin for PandaCommunicator {
    fn pre_check_get_jobs(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn request_get_jobs(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::RequestJobs { count } = payload else {
            return CommResponse::failed("request_get_jobs called with mismatched payload");
        };
        match self.post("getJob", serde_json::json!({"nJobs": count})).status {
            true => CommResponse::submitted(),
            false => CommResponse::failed("getJob dispatch rejected"),
        }
    }

    fn check_get_jobs_status(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn get_jobs(&self, _payload: &CommRequestPayload) -> CommResponse {
        self.post("getJob/result", Value::Null)
    }

    fn pre_check_get_events(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn request_get_events(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::RequestEvents { job, count } = payload else {
            return CommResponse::failed("request_get_events called with mismatched payload");
        };
        match self
            .post("getEventRanges", serde_json::json!({"pandaID": job.panda_id, "nRanges": count}))
            .status
        {
            true => CommResponse::submitted(),
            false => CommResponse::failed("getEventRanges dispatch rejected"),
        }
    }

    fn check_get_events_status(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn get_events(&self, _payload: &CommRequestPayload) -> CommResponse {
        self.post("getEventRanges/result", Value::Null)
    }

    fn pre_check_update_jobs(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn update_jobs(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::UpdateJobs { updates } = payload else {
            return CommResponse::failed("update_jobs called with mismatched payload");
        };
        self.post("updateJobsInBulk", serde_json::json!({"jobList": updates}))
    }

    fn pre_check_update_events(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn update_events(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::UpdateEvents { updates } = payload else {
            return CommResponse::failed("update_events called with mismatched payload");
        };
        self.post("updateEventRanges", serde_json::json!({"eventRanges": updates}))
    }
}
