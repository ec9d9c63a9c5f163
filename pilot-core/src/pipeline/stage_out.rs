//! Stage-out driver and worker (spec.md §4.D/§4.E), grounded on
//! `original_source/pilot/control/data.py::_stage_out`/`_stage_out_all`/
//! `copytool_out`.

use std::collections::HashMap;

use pilot_common::job::{ErrorCode, FileInfo, Job, JobState, StageoutMode};
use pilot_common::queues::{dequeue_one, DataQueues};
use pilot_common::shutdown::Shutdown;
use pilot_io::TransferRunner;
use serde_json::Value;
use tracing::{info, warn};

use super::log_packager::prepare_job_log;

const TRANSFER_TOOL: &str = "rucio";

/// One file (payload output or log) staged out in a single pass.
struct TransferDescriptor {
    name: String,
    scope: String,
    guid: String,
    bytes: u64,
}

fn set_transfer_tool_logging_format() {
    std::env::set_var(
        "RUCIO_LOGGING_FORMAT",
        "{0}%(asctime)s %(levelname)s [%(message)s]",
    );
}

/// Builds the upload argv for one descriptor (spec.md §6) and runs it, then
/// parses `rucio_upload.json` for `{pfn, adler32}` keyed `scope:name`.
/// Returns `None` on spawn/transfer/summary failure.
fn stage_out_one(
    job: &Job,
    descriptor: &TransferDescriptor,
    cancel: &Shutdown,
    runner: &dyn TransferRunner,
) -> Option<(String, String)> {
    set_transfer_tool_logging_format();

    let argv = vec![
        "/usr/bin/env".to_string(),
        TRANSFER_TOOL.to_string(),
        "-v".to_string(),
        "upload".to_string(),
        "--summary".to_string(),
        "--no-register".to_string(),
        "--guid".to_string(),
        descriptor.guid.clone(),
        "--rse".to_string(),
        job.output.primary_endpoint().to_string(),
        "--scope".to_string(),
        descriptor.scope.clone(),
        descriptor.name.clone(),
    ];

    match runner.run(&argv, &job.workdir, cancel) {
        Ok(outcome) if outcome.success => {}
        Ok(_) => {
            warn!(panda_id = job.panda_id, file = %descriptor.name, "upload transfer tool exited non-zero");
            return None;
        }
        Err(e) => {
            warn!(panda_id = job.panda_id, file = %descriptor.name, error = %e, "could not execute upload transfer tool");
            return None;
        }
    };

    let summary_path = job.workdir.join("rucio_upload.json");
    if !summary_path.exists() {
        warn!(panda_id = job.panda_id, path = %summary_path.display(), "no such summary file");
        return None;
    }

    let summary: HashMap<String, Value> = match pilot_io::read_json_sync(&summary_path) {
        Ok(s) => s,
        Err(e) => {
            warn!(panda_id = job.panda_id, error = %e, "failed to parse rucio_upload.json");
            return None;
        }
    };

    let key = format!("{}:{}", descriptor.scope, descriptor.name);
    let entry = summary.get(&key)?;
    let pfn = entry.get("pfn")?.as_str()?.to_string();
    let adler32 = entry.get("adler32")?.as_str()?.to_string();
    Some((pfn, adler32))
}

/// Builds the transfer set and stages it out, accumulating `job.fileinfo`
/// (spec.md §4.D). Returns overall success; the first per-file failure does
/// not abort the remaining transfers in this pass.
pub fn stage_out_all(job: &mut Job, cancel: &Shutdown, runner: &dyn TransferRunner) -> bool {
    let mut descriptors = Vec::new();

    if job.stageout == StageoutMode::All {
        match &job.report {
            Some(report) => {
                for group in &report.output {
                    if let Some(f) = group.sub_files.first() {
                        descriptors.push(TransferDescriptor {
                            name: f.name.clone(),
                            scope: job.output.scope.clone(),
                            guid: f.file_guid.clone(),
                            bytes: f.file_size,
                        });
                    }
                }
            }
            None => {
                warn!(
                    panda_id = job.panda_id,
                    "job object does not contain a job report (payload failed?) - will only stage-out log file"
                );
            }
        }
    }

    let tarball_name = format!("tarball_PandaJob_{}", job.panda_id);
    let log_descriptor = match prepare_job_log(job, &tarball_name) {
        Ok(meta) => TransferDescriptor {
            name: meta.name,
            scope: job.output.log_scope.clone(),
            guid: meta.file_guid,
            bytes: meta.file_size,
        },
        Err(e) => {
            warn!(panda_id = job.panda_id, error = %e, "failed to prepare log tarball");
            job.add_error(ErrorCode::StageOutFailed, "failed to prepare log tarball");
            job.set_state(JobState::Failed);
            return false;
        }
    };

    let mut fileinfo = HashMap::new();
    let mut failed = false;

    for descriptor in descriptors
        .into_iter()
        .filter(|d| job.output.files.contains(&d.name))
        .chain(std::iter::once(log_descriptor))
    {
        match stage_out_one(job, &descriptor, cancel, runner) {
            Some((pfn, adler32)) => {
                fileinfo.insert(
                    descriptor.name.clone(),
                    FileInfo {
                        guid: descriptor.guid,
                        fsize: descriptor.bytes,
                        adler32,
                        surl: pfn,
                    },
                );
            }
            None => failed = true,
        }
    }

    if failed {
        job.add_error(ErrorCode::StageOutFailed, "stage-out failed");
        job.set_state(JobState::Failed);
        false
    } else {
        info!(panda_id = job.panda_id, "stage-out finished correctly");
        job.fileinfo = fileinfo;
        job.set_state(JobState::Finished);
        true
    }
}

/// Drains `data_out` until cancelled, routing each job to
/// `finished_data_out` or `failed_data_out` (spec.md §4.E).
pub fn run_stage_out_worker(queues: &DataQueues, cancel: &Shutdown, runner: &dyn TransferRunner) {
    while !cancel.is_set() {
        let Some(mut job) = dequeue_one(&queues.data_out.1) else {
            continue;
        };

        if stage_out_all(&mut job, cancel, runner) {
            let _ = queues.finished_data_out.0.send(job);
        } else {
            let _ = queues.failed_data_out.0.send(job);
        }
    }
    info!("stage-out worker stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_common::job::{InputDescriptor, OutputDescriptor};
    use pilot_io::CommandOutcome;
    use std::fs;
    use std::path::Path;

    /// Stands in for the real transfer tool: reports a fixed outcome and, on
    /// success, writes the `rucio_upload.json` summary the real tool would
    /// have produced (keyed `scope:name` -> `{pfn, adler32}`), so the
    /// fileinfo-mapping success path can be exercised without a real upload.
    struct FakeRunner {
        success: bool,
        summaries: HashMap<String, (String, String)>,
    }

    impl TransferRunner for FakeRunner {
        fn run(&self, _argv: &[String], cwd: &Path, _cancel: &Shutdown) -> pilot_common::error::Result<CommandOutcome> {
            if self.success {
                let summary: HashMap<String, Value> = self
                    .summaries
                    .iter()
                    .map(|(key, (pfn, adler32))| {
                        (key.clone(), serde_json::json!({"pfn": pfn, "adler32": adler32}))
                    })
                    .collect();
                pilot_io::write_json_sync(&cwd.join("rucio_upload.json"), &summary).unwrap();
            }
            Ok(CommandOutcome {
                success: self.success,
                stdout: String::new(),
                stderr: String::new(),
                exit_code: Some(if self.success { 0 } else { 1 }),
            })
        }
    }

    fn job(workdir: std::path::PathBuf) -> Job {
        Job {
            panda_id: 202,
            task_id: "t".into(),
            jobset_id: "js".into(),
            workdir,
            input: InputDescriptor {
                files: vec![],
                scope: "s".into(),
                ddm_endpoint: "EP1".into(),
            },
            output: OutputDescriptor {
                files: vec!["o1.root".into()],
                scope: "s".into(),
                ddm_endpoints: "EP2".into(),
                log_file: "log.tgz".into(),
                log_scope: "s".into(),
                log_guid: "G".into(),
            },
            report: None,
            state: JobState::Running,
            stageout: StageoutMode::All,
            error_codes: Vec::new(),
            error_messages: Vec::new(),
            fileinfo: HashMap::new(),
            exit_code: None,
            trans_exit_code: None,
        }
    }

    #[test]
    fn missing_summary_after_no_transfer_tool_fails_whole_job() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pilotlog.txt"), b"hi").unwrap();
        let mut j = job(dir.path().to_path_buf());
        let cancel = Shutdown::new();

        // No "rucio" binary exists in the test sandbox, so the real
        // transfer tool invocation fails to spawn and no summary appears.
        let ok = stage_out_all(&mut j, &cancel, &pilot_io::SystemTransferRunner);
        assert!(!ok);
        assert_eq!(j.state, JobState::Failed);
        assert_eq!(j.error_codes, vec![ErrorCode::StageOutFailed]);
    }

    #[test]
    fn log_only_mode_skips_payload_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = job(dir.path().to_path_buf());
        j.stageout = StageoutMode::Log;
        j.report = Some(pilot_common::job::JobReport {
            output: vec![pilot_common::job::OutputGroup {
                sub_files: vec![pilot_common::job::OutputFileMeta {
                    name: "o1.root".into(),
                    file_guid: "GO".into(),
                    file_size: 42,
                }],
            }],
        });
        let cancel = Shutdown::new();
        // Log-only mode never even looks at job.report; only the log
        // tarball is staged (and fails here since no transfer tool exists).
        let ok = stage_out_all(&mut j, &cancel, &pilot_io::SystemTransferRunner);
        assert!(!ok);
        assert!(!j.fileinfo.contains_key("o1.root"));
    }

    /// spec.md §8 scenario 4 ("Full stage-out"): a runner that reports
    /// success and drops the exact summary values the scenario specifies;
    /// asserts the precise `fileinfo` mapping this is the one place a
    /// key-parsing transcription bug would be caught.
    #[test]
    fn full_stage_out_populates_fileinfo_from_upload_summary() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pilotlog.txt"), b"hi").unwrap();
        let mut j = job(dir.path().to_path_buf());
        j.report = Some(pilot_common::job::JobReport {
            output: vec![pilot_common::job::OutputGroup {
                sub_files: vec![pilot_common::job::OutputFileMeta {
                    name: "o1.root".into(),
                    file_guid: "GO".into(),
                    file_size: 42,
                }],
            }],
        });
        let cancel = Shutdown::new();
        let runner = FakeRunner {
            success: true,
            summaries: HashMap::from([
                ("s:o1.root".to_string(), ("srm://x".to_string(), "deadbeef".to_string())),
                ("s:log.tgz".to_string(), ("srm://y".to_string(), "feedface".to_string())),
            ]),
        };

        let ok = stage_out_all(&mut j, &cancel, &runner);
        assert!(ok);
        assert_eq!(j.state, JobState::Finished);

        let out = j.fileinfo.get("o1.root").unwrap();
        assert_eq!(out.guid, "GO");
        assert_eq!(out.fsize, 42);
        assert_eq!(out.adler32, "deadbeef");
        assert_eq!(out.surl, "srm://x");

        let log = j.fileinfo.get("log.tgz").unwrap();
        assert_eq!(log.adler32, "feedface");
        assert_eq!(log.surl, "srm://y");
    }

    /// Drives the real `run_stage_out_worker` loop over live queues so the
    /// success-routing path (not just `stage_out_all` in isolation) is
    /// exercised end to end.
    #[test]
    fn worker_routes_successful_stage_out_to_finished_data_out() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pilotlog.txt"), b"hi").unwrap();
        let queues = DataQueues::new();
        let cancel = Shutdown::new();
        let runner = FakeRunner {
            success: true,
            summaries: HashMap::from([
                ("s:o1.root".to_string(), ("srm://x".to_string(), "deadbeef".to_string())),
                ("s:log.tgz".to_string(), ("srm://y".to_string(), "feedface".to_string())),
            ]),
        };

        let mut j = job(dir.path().to_path_buf());
        j.report = Some(pilot_common::job::JobReport {
            output: vec![pilot_common::job::OutputGroup {
                sub_files: vec![pilot_common::job::OutputFileMeta {
                    name: "o1.root".into(),
                    file_guid: "GO".into(),
                    file_size: 42,
                }],
            }],
        });
        queues.data_out.0.send(j).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| run_stage_out_worker(&queues, &cancel, &runner));
            let routed = queues
                .finished_data_out
                .1
                .recv_timeout(std::time::Duration::from_secs(5))
                .unwrap();
            assert_eq!(routed.state, JobState::Finished);
            assert_eq!(routed.fileinfo.get("o1.root").unwrap().surl, "srm://x");
            cancel.signal();
        });

        assert!(queues.failed_data_out.1.try_recv().is_err());
    }
}
