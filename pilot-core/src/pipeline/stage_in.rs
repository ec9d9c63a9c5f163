//! Stage-in worker (spec.md §4.B), grounded on
//! `original_source/pilot/control/data.py::copytool_in`/`_stage_in`.

use pilot_common::job::{ErrorCode, Job, JobState};
use pilot_common::queues::{dequeue_one, DataQueues};
use pilot_common::shutdown::Shutdown;
use pilot_io::TransferRunner;
use tracing::{info, warn};

use super::state_report::StateReporter;

/// The transfer tool invoked for download/upload, matching the original's
/// hardcoded `rucio`. Out-of-scope protocol detail (spec.md §1); kept as a
/// constant since picking the tool is not itself part of this core.
const TRANSFER_TOOL: &str = "rucio";

/// Sets the child-visible logging format for the transfer tool, matching
/// `_stage_in`'s `os.environ['RUCIO_LOGGING_FORMAT'] = ...` (spec.md §5
/// "Process environment").
fn set_transfer_tool_logging_format() {
    std::env::set_var(
        "RUCIO_LOGGING_FORMAT",
        "%(asctime)s %(levelname)s [%(message)s]",
    );
}

/// Builds the download argv (spec.md §6) and runs it through `runner`.
pub fn stage_in(job: &Job, cancel: &Shutdown, runner: &dyn TransferRunner) -> bool {
    set_transfer_tool_logging_format();

    let in_files = job.input.files.join(",");
    let argv = vec![
        "/usr/bin/env".to_string(),
        TRANSFER_TOOL.to_string(),
        "-v".to_string(),
        "download".to_string(),
        "--no-subdir".to_string(),
        "--rse".to_string(),
        job.input.ddm_endpoint.clone(),
        format!("{}:{}", job.input.scope, in_files),
    ];

    match runner.run(&argv, &job.workdir, cancel) {
        Ok(outcome) => outcome.success,
        Err(e) => {
            warn!(panda_id = job.panda_id, error = %e, "could not execute stage-in transfer tool");
            false
        }
    }
}

/// Drains `data_in` until cancelled, routing each job to `finished_data_in`
/// or `failed_data_in` (spec.md §4.B).
pub fn run_stage_in_worker(
    queues: &DataQueues,
    cancel: &Shutdown,
    reporter: &dyn StateReporter,
    runner: &dyn TransferRunner,
) {
    while !cancel.is_set() {
        let Some(mut job) = dequeue_one(&queues.data_in.1) else {
            continue;
        };

        reporter.send_state(&job, "running");

        if stage_in(&job, cancel, runner) {
            // The original leaves `state` unchanged on this edge (open
            // question in spec.md §9); preserved as observable behavior.
            let _ = queues.finished_data_in.0.send(job);
        } else {
            warn!(panda_id = job.panda_id, "stage-in failed, routing to failed_data_in");
            job.add_error(ErrorCode::StageInFailed, "stage-in transfer failed");
            job.set_state(JobState::Failed);
            let _ = queues.failed_data_in.0.send(job);
        }
    }
    info!("stage-in worker stopping");
}
