//! Queue monitor (spec.md §4.F), grounded on
//! `original_source/pilot/control/data.py::queue_monitoring`.

use pilot_common::job::{JobState, StageoutMode};
use pilot_common::queues::{dequeue_one, DataQueues};
use pilot_common::shutdown::Shutdown;
use pilot_io::TransferRunner;
use tracing::info;

use super::stage_out::stage_out_all;

/// Services `failed_data_in`, `finished_data_out`, and `failed_data_out` in
/// one pass, each with a 1 s blocking dequeue; empty is benign. Waits 1 s on
/// the cancellation signal before each pass and exits before reading any
/// queue once cancelled.
pub fn run_queue_monitor(queues: &DataQueues, cancel: &Shutdown, runner: &dyn TransferRunner) {
    while !cancel.is_set() {
        std::thread::sleep(std::time::Duration::from_secs(1));
        if cancel.is_set() {
            break;
        }

        if let Some(mut job) = dequeue_one(&queues.failed_data_in.1) {
            job.stageout = StageoutMode::Log;
            if stage_out_all(&mut job, cancel, runner) {
                info!(panda_id = job.panda_id, "failed during stage-in, routing to failed_jobs");
                let _ = queues.failed_jobs.0.send(job);
            } else {
                info!(panda_id = job.panda_id, "failed during stage-in and log stage-out, routing to failed_data_out");
                let _ = queues.failed_data_out.0.send(job);
            }
        }

        if let Some(job) = dequeue_one(&queues.finished_data_out.1) {
            let exit_code = job.exit_code.unwrap_or(0);
            let trans_exit_code = job.trans_exit_code.unwrap_or(0);
            if exit_code == 0 && trans_exit_code == 0 {
                info!(panda_id = job.panda_id, "finished stage-out for finished payload");
                let _ = queues.finished_jobs.0.send(job);
            } else {
                info!(panda_id = job.panda_id, "finished stage-out (of log) for failed payload");
                let _ = queues.failed_jobs.0.send(job);
            }
        }

        if let Some(job) = dequeue_one(&queues.failed_data_out.1) {
            info!(panda_id = job.panda_id, "failed during stage-out, routing to failed_jobs");
            let _ = queues.failed_jobs.0.send(job);
        }
    }
    info!("queue monitor stopping");
}
