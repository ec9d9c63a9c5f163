//! Communicator plugin interface (spec.md §4.H): the contract a backend
//! must provide for each of {`get_jobs`, `get_events`, `update_jobs`,
//! `update_events`}. Built-in plugins live in `pilot-net`; this crate only
//! defines the trait the manager dispatches to.

use pilot_common::request::{CommRequestPayload, CommResponse};

/// A communicator backend. Pre-checks are side-effect-light and report
/// readiness via `CommResponse::status == true` (the original's `status ==
/// 0` convention, expressed as this crate's boolean success convention).
/// Handlers perform the protocol work and return a terminal response for
/// synchronous entries (`update_jobs`/`update_events`) or a transient
/// "submitted" response for asynchronous entries
/// (`request_get_jobs`/`request_get_events`).
pub trait CommunicatorPlugin: Send + Sync {
    fn pre_check_get_jobs(&self) -> CommResponse;
    fn request_get_jobs(&self, payload: &CommRequestPayload) -> CommResponse;
    fn check_get_jobs_status(&self) -> CommResponse;
    fn get_jobs(&self, payload: &CommRequestPayload) -> CommResponse;

    fn pre_check_get_events(&self) -> CommResponse;
    fn request_get_events(&self, payload: &CommRequestPayload) -> CommResponse;
    fn check_get_events_status(&self) -> CommResponse;
    fn get_events(&self, payload: &CommRequestPayload) -> CommResponse;

    fn pre_check_update_jobs(&self) -> CommResponse;
    fn update_jobs(&self, payload: &CommRequestPayload) -> CommResponse;

    fn pre_check_update_events(&self) -> CommResponse;
    fn update_events(&self, payload: &CommRequestPayload) -> CommResponse;
}
