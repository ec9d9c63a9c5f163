//! ACT communicator plugin (spec.md §4.H), selected via
//! `COMMUNICATOR_PLUGIN=act`, grounded on the original's
//! `actcommunicator.ACTCommunicator`. Same trigger-then-poll shape as
//! [`crate::panda::PandaCommunicator`] against a distinct illustrative
//! endpoint namespace.

use pilot_common::request::{CommRequestPayload, CommResponse};
use pilot_core::comm::CommunicatorPlugin;
use serde_json::Value;
use tracing::warn;

pub struct ActCommunicator {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl ActCommunicator {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn post(&self, path: &str, body: Value) -> CommResponse {
        match self.client.post(format!("{}/act/{}", self.endpoint, path)).json(&body).send() {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>() {
                Ok(v) => CommResponse::ok(v),
                Err(e) => CommResponse::failed(e.to_string()),
            },
            Ok(resp) => CommResponse::failed(format!("server returned {}", resp.status())),
            Err(e) => {
                warn!(error = %e, path, "act communicator request failed");
                CommResponse::failed(e.to_string())
            }
        }
    }
}

impl CommunicatorPlugin for ActCommunicator {
    fn pre_check_get_jobs(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn request_get_jobs(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::RequestJobs { count } = payload else {
            return CommResponse::failed("request_get_jobs called with mismatched payload");
        };
        match self.post("jobs/request", serde_json::json!({"count": count})).status {
            true => CommResponse::submitted(),
            false => CommResponse::failed("act job request rejected"),
        }
    }

    fn check_get_jobs_status(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn get_jobs(&self, _payload: &CommRequestPayload) -> CommResponse {
        self.post("jobs/poll", Value::Null)
    }

    fn pre_check_get_events(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn request_get_events(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::RequestEvents { job, count } = payload else {
            return CommResponse::failed("request_get_events called with mismatched payload");
        };
        match self
            .post("events/request", serde_json::json!({"panda_id": job.panda_id, "count": count}))
            .status
        {
            true => CommResponse::submitted(),
            false => CommResponse::failed("act event request rejected"),
        }
    }

    fn check_get_events_status(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn get_events(&self, _payload: &CommRequestPayload) -> CommResponse {
        self.post("events/poll", Value::Null)
    }

    fn pre_check_update_jobs(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn update_jobs(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::UpdateJobs { updates } = payload else {
            return CommResponse::failed("update_jobs called with mismatched payload");
        };
        self.post("jobs/update", serde_json::json!({"updates": updates}))
    }

    fn pre_check_update_events(&self) -> CommResponse {
        CommResponse::ok(Value::Null)
    }

    fn update_events(&self, payload: &CommRequestPayload) -> CommResponse {
        let CommRequestPayload::UpdateEvents { updates } = payload else {
            return CommResponse::failed("update_events called with mismatched payload");
        };
        self.post("events/update", serde_json::json!({"updates": updates}))
    }
}
