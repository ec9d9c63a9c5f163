//! Synchronous JSON read/write helpers, used for job-report parsing
//! (`rucio_upload.json`, spec.md §4.D) and for the file-based IPC the
//! Harvester share-file communicator uses (spec.md §4.H).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use pilot_common::error::Result;
use serde::{de::DeserializeOwned, Serialize};

pub fn write_json_sync<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, data)?;
    Ok(())
}

pub fn read_json_sync<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let value = serde_json::from_reader(reader)?;
    Ok(value)
}
