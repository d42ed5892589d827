use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufRead};
use std::path::Path;
use std::cmp::Reverse;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{IoResultExt, PointError, Result};
use crate::external_sort::chunk::ChunkMetadata;
use crate::external_sort::constants::*;
use crate::external_sort::record::SortRecord;
use crate::external_sort::sink::SortedSink;

const MERGE_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

pub struct ChunkMerger {
    io_buffer_size: usize,
}

#[derive(Debug)]
struct MergeEntry {
    record: SortRecord,
    chunk_id: usize,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    // Chunks are created in input order, so breaking ties by chunk id keeps
    // the merge stable.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.record
            .key_cmp(&other.record)
            .then_with(|| self.chunk_id.cmp(&other.chunk_id))
    }
}

struct ChunkReader<'a> {
    reader: BufReader<File>,
    path: &'a Path,
    line: String,
    line_number: usize,
}

impl<'a> ChunkReader<'a> {
    fn open(path: &'a Path, io_buffer_size: usize) -> Result<Self> {
        let file = File::open(path).with_path(path)?;
        Ok(Self {
            reader: BufReader::with_capacity(io_buffer_size, file),
            path,
            line: String::new(),
            line_number: 0,
        })
    }

    fn next_record(&mut self) -> Result<Option<SortRecord>> {
        loop {
            self.line.clear();
            let bytes = self.reader.read_line(&mut self.line).with_path(self.path)?;
            if bytes == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return SortRecord::from_text_line(trimmed)
                .map(Some)
                .map_err(|kind| PointError::Parse {
                    source_name: self.path.display().to_string(),
                    line_number: self.line_number,
                    line: trimmed.to_string(),
                    kind,
                });
        }
    }
}

impl ChunkMerger {
    pub fn new(io_buffer_size: usize) -> Self {
        Self { io_buffer_size }
    }

    /// K-way merges the sorted chunk files into `sink`, always emitting the
    /// smallest head across all chunks. Returns the number of records merged.
    pub async fn merge_chunks<S: SortedSink>(
        &self,
        chunks: &[ChunkMetadata],
        sink: &mut S,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        self.validate_chunks(chunks)?;

        let mut chunk_readers = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            chunk_readers.push(ChunkReader::open(&chunk.file_path, self.io_buffer_size)?);
        }

        let mut merge_heap = BinaryHeap::with_capacity(MERGE_HEAP_INITIAL_CAPACITY.max(chunks.len()));

        for (chunk_id, reader) in chunk_readers.iter_mut().enumerate() {
            if let Some(record) = reader.next_record()? {
                merge_heap.push(Reverse(MergeEntry { record, chunk_id }));
            }
        }

        let mut records_written = 0;
        let total_estimated_records: usize = chunks.iter().map(|c| c.record_count).sum();
        let mut last_progress_time = Instant::now();

        while let Some(Reverse(merge_entry)) = merge_heap.pop() {
            if records_written % SHUTDOWN_CHECK_INTERVAL_RECORDS == 0
                && shutdown_flag.load(Ordering::Relaxed) {
                return Err(PointError::Interrupted);
            }

            sink.accept(&merge_entry.record)?;
            records_written += 1;

            if let Some(next_record) = chunk_readers[merge_entry.chunk_id].next_record()? {
                merge_heap.push(Reverse(MergeEntry {
                    record: next_record,
                    chunk_id: merge_entry.chunk_id,
                }));
            }

            if last_progress_time.elapsed() >= MERGE_PROGRESS_INTERVAL {
                let progress_pct = if total_estimated_records > 0 {
                    (records_written as f64 / total_estimated_records as f64 * 100.0).min(100.0)
                } else {
                    0.0
                };
                info!("Merge progress: {:.1}% ({} records)", progress_pct, records_written);
                last_progress_time = Instant::now();
            }
        }

        debug!("Merged {} chunks into {} records", chunks.len(), records_written);
        Ok(records_written)
    }

    pub fn validate_chunks(&self, chunks: &[ChunkMetadata]) -> Result<()> {
        for chunk in chunks {
            if !chunk.file_path.exists() {
                return Err(PointError::Io {
                    path: chunk.file_path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("chunk {} is missing", chunk.chunk_id),
                    ),
                });
            }
        }
        Ok(())
    }
}
