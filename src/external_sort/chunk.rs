use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{IoResultExt, PointError, Result};
use crate::external_sort::constants::*;
use crate::external_sort::record::SortRecord;

/// A sorted run spilled to disk.
#[derive(Debug, Clone)]
pub struct ChunkMetadata {
    pub chunk_id: usize,
    pub file_path: PathBuf,
    pub record_count: usize,
    pub file_size_bytes: u64,
}

pub struct ChunkProcessor {
    chunk_size_bytes: usize,
    io_buffer_size: usize,
    temp_directory: PathBuf,
}

impl ChunkProcessor {
    pub fn new(chunk_size_bytes: usize, io_buffer_size: usize, temp_directory: PathBuf) -> Self {
        Self {
            chunk_size_bytes,
            io_buffer_size,
            temp_directory,
        }
    }

    /// Splits one input file into sorted chunk files. Stops at the first
    /// malformed line; chunks created so far are returned through `chunks`
    /// so the caller can clean them up.
    pub async fn process_file_to_chunks(
        &self,
        file_path: &Path,
        first_chunk_id: usize,
        chunks: &mut Vec<ChunkMetadata>,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Result<usize> {
        let file = File::open(file_path).with_path(file_path)?;
        let mut reader = BufReader::with_capacity(self.io_buffer_size, file);
        let mut current_chunk = Vec::new();
        let mut current_size = 0;
        let mut chunk_id = first_chunk_id;
        let mut line_count = 0;
        let mut total_records = 0;

        let mut line = String::new();
        loop {
            if line_count % SHUTDOWN_CHECK_INTERVAL_RECORDS == 0
                && shutdown_flag.load(Ordering::Relaxed) {
                return Err(PointError::Interrupted);
            }

            line.clear();
            let bytes = reader.read_line(&mut line).with_path(file_path)?;
            if bytes == 0 {
                break;
            }
            line_count += 1;

            if line.trim().is_empty() {
                continue;
            }

            let record = SortRecord::from_text_line(&line).map_err(|kind| PointError::Parse {
                source_name: file_path.display().to_string(),
                line_number: line_count,
                line: line.trim_end().to_string(),
                kind,
            })?;
            let record_size = record.estimated_size();

            if current_size + record_size > self.chunk_size_bytes && !current_chunk.is_empty() {
                let chunk_metadata = self.sort_and_write_chunk(
                    chunk_id,
                    std::mem::take(&mut current_chunk),
                )?;
                chunks.push(chunk_metadata);
                chunk_id += 1;
                current_size = 0;
            }

            current_chunk.push(record);
            current_size += record_size;
            total_records += 1;

            if line_count % PROGRESS_REPORT_INTERVAL_RECORDS == 0 {
                debug!("{}: {} lines read, {} chunks so far", file_path.display(), line_count, chunks.len());
            }
        }

        if !current_chunk.is_empty() {
            let chunk_metadata = self.sort_and_write_chunk(chunk_id, current_chunk)?;
            chunks.push(chunk_metadata);
        }

        debug!("{} completed: {} lines, {} records", file_path.display(), line_count, total_records);
        Ok(total_records)
    }

    pub fn sort_and_write_chunk(
        &self,
        chunk_id: usize,
        mut records: Vec<SortRecord>,
    ) -> Result<ChunkMetadata> {
        // Stable, so equal keys keep input order.
        records.par_sort_by(|a, b| a.key_cmp(b));

        let chunk_file = self.temp_directory.join(format!(
            "{}{}{}",
            CHUNK_FILE_PREFIX,
            chunk_id,
            CHUNK_FILE_EXTENSION
        ));

        let file = File::create(&chunk_file).with_path(&chunk_file)?;
        let mut writer = BufWriter::with_capacity(self.io_buffer_size, file);

        for record in &records {
            writeln!(writer, "{}", record.to_text_line()).with_path(&chunk_file)?;
        }

        writer.flush().with_path(&chunk_file)?;
        let file_size = std::fs::metadata(&chunk_file).with_path(&chunk_file)?.len();

        debug!("Spilled chunk {} ({} records, {} bytes)", chunk_id, records.len(), file_size);

        Ok(ChunkMetadata {
            chunk_id,
            file_path: chunk_file,
            record_count: records.len(),
            file_size_bytes: file_size,
        })
    }

    pub fn cleanup_chunk(&self, chunk: &ChunkMetadata) -> Result<()> {
        if chunk.file_path.exists() {
            std::fs::remove_file(&chunk.file_path).with_path(&chunk.file_path)?;
        }
        Ok(())
    }

    pub fn cleanup_all_chunks(&self, chunks: &[ChunkMetadata]) {
        for chunk in chunks {
            if let Err(e) = self.cleanup_chunk(chunk) {
                warn!("Failed to cleanup chunk {}: {}", chunk.chunk_id, e);
            }
        }
    }

    pub fn estimate_chunk_count(&self, file_size: u64) -> usize {
        if file_size == 0 {
            return 1;
        }

        let file_size_usize = file_size.min(usize::MAX as u64) as usize;
        let estimated_chunks = file_size_usize.saturating_add(self.chunk_size_bytes - 1) / self.chunk_size_bytes;
        estimated_chunks.max(1)
    }
}
