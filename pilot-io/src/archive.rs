//! Log packaging: builds the gzip tarball transferred during stage-out
//! (spec.md §4.C), grounded on `original_source/pilot/control/data.py`'s
//! `prepare_log()`.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use pilot_common::error::{PilotError, Result};
use tar::Builder;
use tracing::debug;
use walkdir::WalkDir;

/// Entries never swept into the log tarball regardless of job contents,
/// matching the original's `force_exclude`.
const FORCE_EXCLUDE: [&str; 2] = ["geomDB", "sqlite200"];

/// Builds `<workdir>/<log_file>` as a gzip tarball containing every entry of
/// `workdir` except `input_files`, `output_files`, and [`FORCE_EXCLUDE`].
/// Archive paths are `<tarball_name>/<original_name>`; symlinks are
/// dereferenced.
///
/// Returns the resulting tarball's size in bytes.
pub fn prepare_log(
    workdir: &Path,
    log_file: &str,
    tarball_name: &str,
    input_files: &[String],
    output_files: &[String],
) -> Result<u64> {
    debug!("preparing log file for {}", workdir.display());

    let exclude: HashSet<&str> = input_files
        .iter()
        .map(String::as_str)
        .chain(output_files.iter().map(String::as_str))
        .chain(FORCE_EXCLUDE.iter().copied())
        .collect();

    let log_path = workdir.join(log_file);
    let gz_file = File::create(&log_path)?;
    let encoder = GzEncoder::new(gz_file, Compression::default());
    let mut tar_builder = Builder::new(encoder);
    tar_builder.follow_symlinks(true);

    let top_level = WalkDir::new(workdir).min_depth(1).max_depth(1);
    for entry in top_level {
        let entry = entry.map_err(|e| PilotError::Generic(e.to_string()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if exclude.contains(name.as_str()) {
            continue;
        }
        let path = entry.path();
        if !path.exists() {
            continue;
        }
        debug!("adding to log: {}", name);
        let arcname = Path::new(tarball_name).join(&name);
        if path.is_dir() {
            tar_builder.append_dir_all(&arcname, path)?;
        } else {
            let mut f = File::open(path)?;
            tar_builder.append_file(&arcname, &mut f)?;
        }
    }

    tar_builder
        .into_inner()
        .map_err(PilotError::from)?
        .finish()
        .map_err(PilotError::from)?;

    let size = fs::metadata(&log_path)?.len();
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn packages_non_excluded_files_and_skips_force_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pilotlog.txt"), b"hello").unwrap();
        fs::write(dir.path().join("input.root"), b"in").unwrap();
        fs::write(dir.path().join("output.root"), b"out").unwrap();
        fs::create_dir(dir.path().join("geomDB")).unwrap();
        File::create(dir.path().join("geomDB/geo.db"))
            .unwrap()
            .write_all(b"x")
            .unwrap();

        let size = prepare_log(
            dir.path(),
            "log.tgz",
            "tarball_PandaJob_1_abc",
            &["input.root".to_string()],
            &["output.root".to_string()],
        )
        .unwrap();
        assert!(size > 0);

        let tar_gz = File::open(dir.path().join("log.tgz")).unwrap();
        let decoder = flate2::read::GzDecoder::new(tar_gz);
        let mut archive = tar::Archive::new(decoder);
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();

        assert!(names.iter().any(|n| n.ends_with("pilotlog.txt")));
        assert!(!names.iter().any(|n| n.contains("input.root")));
        assert!(!names.iter().any(|n| n.contains("output.root")));
        assert!(!names.iter().any(|n| n.contains("geomDB")));
    }
}
