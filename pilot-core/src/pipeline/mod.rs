//! The data-movement pipeline: stage-in worker, stage-out driver/worker, and
//! queue monitor (spec.md §4.B–F), each a long-lived loop over a
//! [`pilot_common::queues::DataQueues`] member.

pub mod log_packager;
pub mod queue_monitor;
pub mod stage_in;
pub mod stage_out;
pub mod state_report;

pub use log_packager::prepare_job_log;
pub use queue_monitor::run_queue_monitor;
pub use stage_in::run_stage_in_worker;
pub use stage_out::{run_stage_out_worker, stage_out_all};
pub use state_report::{NoopStateReporter, StateReporter};
