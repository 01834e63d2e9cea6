//! Append-only CSV journal of retrieved artifacts.

use super::FetchError;
use std::fs::OpenOptions;
use std::path::Path;

/// Shape of a planner's journal file.
#[derive(Debug, Clone, Copy)]
pub struct JournalSpec {
    /// File name relative to the task directory.
    pub file_name: &'static str,
    pub columns: &'static [&'static str],
}

/// Appends one record, writing the header only when the file is created.
///
/// Callers serialize access per journal file; the append itself is a
/// single buffered write flushed before returning.
pub fn append(dir: &Path, spec: &JournalSpec, record: &[String]) -> Result<(), FetchError> {
    let path = dir.join(spec.file_name);
    let write_header = !path.exists();

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let mut writer = csv::Writer::from_writer(file);
    if write_header {
        writer.write_record(spec.columns)?;
    }
    writer.write_record(record)?;
    writer.flush()?;
    Ok(())
}
