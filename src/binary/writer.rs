use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::binary::codec::{encode_header, expected_file_len, Point};
use crate::constants::*;
use crate::error::{IoResultExt, PointError, Result};
use crate::external_sort::constants::OUTPUT_BUFFER_SIZE_KB;
use crate::external_sort::record::SortRecord;
use crate::external_sort::sink::{persist_staged, staging_file, SortedSink};

/// Streams sorted points into the binary format.
///
/// The body is written to a temporary file behind a placeholder header; the
/// real count is patched in on `commit`, right before the file is renamed to
/// its destination. Until then nothing exists at the destination path.
pub struct BinaryWriter {
    destination: PathBuf,
    writer: Option<BufWriter<NamedTempFile>>,
    records_written: usize,
    last_point: Option<Point>,
}

impl BinaryWriter {
    pub fn create(destination: &Path) -> Result<Self> {
        let staged = staging_file(destination)?;
        let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE_KB * BYTES_PER_KB, staged);
        writer.write_all(&encode_header(0)).with_path(destination)?;

        Ok(Self {
            destination: destination.to_path_buf(),
            writer: Some(writer),
            records_written: 0,
            last_point: None,
        })
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Appends one record. Input that goes backwards in `(x, y, z)` order is
    /// rejected, since every reader relies on the body being sorted.
    pub fn push_point(&mut self, point: &Point) -> Result<()> {
        if let Some(last) = &self.last_point {
            if point.key_cmp(last) == Ordering::Less {
                return Err(PointError::Encoding {
                    index: self.records_written,
                    reason: format!(
                        "input not sorted: ({}, {}, {}) follows ({}, {}, {})",
                        point.x, point.y, point.z, last.x, last.y, last.z
                    ),
                });
            }
        }

        let writer = self.writer.as_mut().ok_or_else(|| PointError::Encoding {
            index: self.records_written,
            reason: "writer already finalized".to_string(),
        })?;
        writer.write_all(&point.encode()).with_path(&self.destination)?;

        self.records_written += 1;
        self.last_point = Some(*point);
        Ok(())
    }

    fn finalize(&mut self) -> Result<usize> {
        let writer = self.writer.take().ok_or_else(|| PointError::Encoding {
            index: self.records_written,
            reason: "writer already finalized".to_string(),
        })?;

        let record_count = i32::try_from(self.records_written).map_err(|_| PointError::Encoding {
            index: self.records_written,
            reason: format!("record count {} exceeds header capacity", self.records_written),
        })?;

        let mut staged = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_path(&self.destination)?;
        {
            let file = staged.as_file_mut();
            file.seek(SeekFrom::Start(0)).with_path(&self.destination)?;
            file.write_all(&encode_header(record_count)).with_path(&self.destination)?;
            file.sync_all().with_path(&self.destination)?;

            let len = file.metadata().with_path(&self.destination)?.len();
            if len != expected_file_len(self.records_written) {
                return Err(PointError::corrupt(
                    &self.destination,
                    format!("wrote {} bytes for {} records", len, self.records_written),
                ));
            }
        }
        persist_staged(staged, &self.destination)?;

        debug!("Wrote {} records to {}", self.records_written, self.destination.display());
        Ok(self.records_written)
    }
}

impl SortedSink for BinaryWriter {
    fn accept(&mut self, record: &SortRecord) -> Result<()> {
        let point = record.to_point().map_err(|reason| PointError::Encoding {
            index: self.records_written,
            reason,
        })?;
        self.push_point(&point)
    }

    fn commit(&mut self) -> Result<usize> {
        self.finalize()
    }

    fn abort(&mut self) {
        // Dropping the staged file deletes it.
        self.writer.take();
    }
}

/// Encodes an already sorted text file (`x y z i` per line) into `output`.
pub fn encode_sorted_text(sorted_text: &Path, output: &Path) -> Result<usize> {
    let file = File::open(sorted_text).with_path(sorted_text)?;
    let reader = BufReader::new(file);
    let mut writer = BinaryWriter::create(output)?;

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_path(sorted_text)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = SortRecord::from_text_line(&line).map_err(|kind| PointError::Parse {
            source_name: sorted_text.display().to_string(),
            line_number: index + 1,
            line: line.clone(),
            kind,
        })?;
        writer.accept(&record)?;
    }

    writer.commit()
}
