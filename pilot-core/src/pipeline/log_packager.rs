//! Log packager contract (spec.md §4.C): `prepare_log(job, tarball_name) ->
//! descriptor`. The tarball construction itself lives in `pilot_io::archive`;
//! this module adapts it to the job record's shape.

use pilot_common::error::Result;
use pilot_common::job::{Job, OutputFileMeta};

/// Builds the job's log tarball and returns its descriptor: `{scope, name,
/// unique_id, byte_size}`, modeled as [`OutputFileMeta`] (name/guid/size)
/// plus the caller already knowing the log's scope from `job.output`.
pub fn prepare_job_log(job: &Job, tarball_name: &str) -> Result<OutputFileMeta> {
    let size = pilot_io::prepare_log(
        &job.workdir,
        &job.output.log_file,
        tarball_name,
        &job.input.files,
        &job.output.files,
    )?;

    Ok(OutputFileMeta {
        name: job.output.log_file.clone(),
        file_guid: job.output.log_guid.clone(),
        file_size: size,
    })
}
