//! The job record that flows through the data-movement pipeline.
//!
//! Mirrors the shape of `original_source/pilot/control/data.py`'s job
//! dictionary, but as a closed struct: optional sub-records (the job report)
//! are modeled explicitly instead of being probed with dict membership
//! checks.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Closed set of diagnostic codes the core attaches to a job record.
/// Opaque codes propagated from child processes are carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    StageInFailed,
    StageOutFailed,
    CommunicationFailure,
    UnknownException,
    Opaque(i32),
}

/// Monotonic job state. Once `Finished` or `Failed`, never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JobState {
    #[default]
    Unknown,
    Running,
    Finished,
    Failed,
}

impl JobState {
    fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }
}

/// Selects what §4.D's stage-out driver transfers: the full output set plus
/// the log, or the log only (used by the queue monitor's recovery path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StageoutMode {
    #[default]
    All,
    Log,
}

/// One sub-file entry under `metaData.files.output[].subFiles[]` in a real
/// job report, recovered from `_stage_out_all` in the original pilot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFileMeta {
    pub name: String,
    pub file_guid: String,
    pub file_size: u64,
}

/// The optional payload-produced job report. Its presence drives whether
/// stage-out can transfer real outputs or must degrade to log-only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobReport {
    /// Keyed by output group name (`metaData.files.output`); each entry
    /// carries one or more sub-files, of which only the first is used,
    /// matching the original's `f['subFiles'][0]`.
    pub output: Vec<OutputGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputGroup {
    pub sub_files: Vec<OutputFileMeta>,
}

/// Per-file result of a completed stage-out, keyed by output file name in
/// [`Job::fileinfo`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub guid: String,
    pub fsize: u64,
    pub adler32: String,
    pub surl: String,
}

/// Input descriptor: one scope, one source endpoint, an ordered file list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub files: Vec<String>,
    pub scope: String,
    pub ddm_endpoint: String,
}

/// Output descriptor: scope, comma-separated destination endpoints (first
/// authoritative), ordered file list, plus log file identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDescriptor {
    pub files: Vec<String>,
    pub scope: String,
    pub ddm_endpoints: String,
    pub log_file: String,
    pub log_scope: String,
    pub log_guid: String,
}

impl OutputDescriptor {
    /// The first destination endpoint is authoritative (spec.md §4.D).
    pub fn primary_endpoint(&self) -> &str {
        self.ddm_endpoints
            .split(',')
            .next()
            .unwrap_or(&self.ddm_endpoints)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub panda_id: u64,
    pub task_id: String,
    pub jobset_id: String,
    pub workdir: PathBuf,

    pub input: InputDescriptor,
    pub output: OutputDescriptor,
    pub report: Option<JobReport>,

    pub state: JobState,
    pub stageout: StageoutMode,

    pub error_codes: Vec<ErrorCode>,
    pub error_messages: Vec<String>,

    pub fileinfo: HashMap<String, FileInfo>,

    /// Payload/transform exit codes used by the queue monitor to classify
    /// the final outcome of a completed stage-out (spec.md §4.F). Absent
    /// means "treat as 0" (original default).
    pub exit_code: Option<i32>,
    pub trans_exit_code: Option<i32>,
}

impl Job {
    /// Moves the job into `state`, enforcing the monotonic invariant: once
    /// terminal, the state never changes again.
    pub fn set_state(&mut self, state: JobState) {
        debug_assert!(
            !self.state.is_terminal(),
            "job {} state changed after reaching a terminal state ({:?} -> {:?})",
            self.panda_id,
            self.state,
            state
        );
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
    }

    pub fn add_error(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.error_codes.push(code);
        self.error_messages.push(message.into());
    }
}
