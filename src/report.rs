//! CSV Report Writer

use crate::aggregate::OutputRecord;
use crate::error::{AuditError, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column names, in output order
pub const HEADER: [&str; 7] = [
    "AccountId",
    "AccountName",
    "EmailAddress",
    "AccountUserAccess",
    "ContainerId",
    "ContainerName",
    "ContainerUserAccess",
];

/// How the destination file is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate the destination and write into it directly
    #[default]
    InPlace,
    /// Write a sibling `.tmp` file, then rename it over the destination
    Atomic,
}

/// Serialize the header and `records` to any writer, handing the writer back
/// once everything has been flushed into it
pub fn write_records<W: Write>(writer: W, records: &[OutputRecord]) -> csv::Result<W> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(HEADER)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// I/O failures surface as `Io` against the file; only encoding errors stay `Csv`
fn csv_error(path: &Path, err: csv::Error) -> AuditError {
    if err.is_io_error() {
        AuditError::io(path, err.into())
    } else {
        AuditError::Csv(err)
    }
}

fn write_file(path: &Path, records: &[OutputRecord]) -> Result<()> {
    let file = File::create(path).map_err(|e| AuditError::io(path, e))?;
    let file = write_records(file, records).map_err(|e| csv_error(path, e))?;
    file.sync_all().map_err(|e| AuditError::io(path, e))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = OsString::from(path.as_os_str());
    staged.push(".tmp");
    PathBuf::from(staged)
}

/// Write the report to `path`
pub fn write_report(path: &Path, records: &[OutputRecord], mode: WriteMode) -> Result<()> {
    match mode {
        WriteMode::InPlace => write_file(path, records)?,
        WriteMode::Atomic => {
            let staged = staging_path(path);
            debug!(staged = %staged.display(), "Staging report");

            if let Err(e) = write_file(&staged, records) {
                let _ = fs::remove_file(&staged);
                return Err(e);
            }
            fs::rename(&staged, path).map_err(|e| {
                let _ = fs::remove_file(&staged);
                AuditError::io(path, e)
            })?;
        }
    }

    info!(path = %path.display(), rows = records.len(), "Report written");
    Ok(())
}
