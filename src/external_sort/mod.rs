pub mod config;
pub mod constants;
pub mod processor;
pub mod record;
pub mod chunk;
pub mod merger;
pub mod sink;

#[cfg(test)]
mod tests;

pub use config::ExternalSortConfig;
pub use processor::ExternalSortProcessor;
pub use record::SortRecord;
pub use sink::{SortedSink, TextSink};

use crate::binary::BinaryWriter;
use crate::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ExternalSortStats {
    pub total_records: usize,
    pub records_written: usize,
    pub chunks_created: usize,
    pub files_processed: usize,
    pub processing_time_ms: u64,
    pub sort_time_ms: u64,
    pub merge_time_ms: u64,
}

/// Sorts the input text files into a sorted text file.
pub async fn sort_to_text(
    input_files: &[PathBuf],
    output_file: &Path,
    config: ExternalSortConfig,
) -> Result<ExternalSortStats> {
    let mut processor = ExternalSortProcessor::new(config)?;
    let mut sink = TextSink::create(output_file)?;
    processor.process(input_files, &mut sink).await
}

/// Sorts the input text files and encodes them into the binary point format.
pub async fn sort_and_encode(
    input_files: &[PathBuf],
    output_file: &Path,
    config: ExternalSortConfig,
) -> Result<ExternalSortStats> {
    let mut processor = ExternalSortProcessor::new(config)?;
    let mut sink = BinaryWriter::create(output_file)?;
    processor.process(input_files, &mut sink).await
}
