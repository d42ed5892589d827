use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::constants::BYTES_PER_KB;
use crate::error::{IoResultExt, Result};
use crate::external_sort::constants::OUTPUT_BUFFER_SIZE_KB;
use crate::external_sort::record::SortRecord;

/// Destination of the merged, sorted record stream.
///
/// Sinks stage their output and only make it visible on `commit`; if the sort
/// fails, `abort` must leave no file behind at the destination path.
pub trait SortedSink {
    fn accept(&mut self, record: &SortRecord) -> Result<()>;

    /// Finalizes the output and returns the number of records written.
    fn commit(&mut self) -> Result<usize>;

    fn abort(&mut self);
}

/// Creates a temporary file in the same directory as `destination`, so the
/// final rename never crosses file systems.
pub(crate) fn staging_file(destination: &Path) -> Result<NamedTempFile> {
    let parent = match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    NamedTempFile::new_in(&parent).with_path(&parent)
}

pub(crate) fn persist_staged(staged: NamedTempFile, destination: &Path) -> Result<File> {
    staged
        .persist(destination)
        .map_err(|e| e.error)
        .with_path(destination)
}

/// Writes the sorted records back out as normalized `x y z i` text.
pub struct TextSink {
    destination: PathBuf,
    writer: Option<BufWriter<NamedTempFile>>,
    records_written: usize,
}

impl TextSink {
    pub fn create(destination: &Path) -> Result<Self> {
        let staged = staging_file(destination)?;
        Ok(Self {
            destination: destination.to_path_buf(),
            writer: Some(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE_KB * BYTES_PER_KB, staged)),
            records_written: 0,
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl SortedSink for TextSink {
    fn accept(&mut self, record: &SortRecord) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", record.to_text_line()).with_path(&self.destination)?;
            self.records_written += 1;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<usize> {
        if let Some(writer) = self.writer.take() {
            let staged = writer
                .into_inner()
                .map_err(|e| e.into_error())
                .with_path(&self.destination)?;
            staged.as_file().sync_all().with_path(&self.destination)?;
            persist_staged(staged, &self.destination)?;
        }
        Ok(self.records_written)
    }

    fn abort(&mut self) {
        // Dropping the staged file deletes it.
        self.writer.take();
    }
}
