use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::constants::BYTES_PER_MB;
use crate::error::{IoResultExt, Result};
use crate::external_sort::constants::RUN_DIR_PREFIX;
use crate::external_sort::{ExternalSortConfig, ExternalSortStats};
use crate::external_sort::chunk::{ChunkMetadata, ChunkProcessor};
use crate::external_sort::merger::ChunkMerger;
use crate::external_sort::sink::SortedSink;

pub struct ExternalSortProcessor {
    config: ExternalSortConfig,
    /// Spill directory owned by this run; removed when the processor drops.
    run_directory: TempDir,
    chunk_processor: ChunkProcessor,
    merger: ChunkMerger,
    shutdown_flag: Arc<AtomicBool>,
    chunks: Vec<ChunkMetadata>,
    stats: ExternalSortStats,
}

impl ExternalSortProcessor {
    pub fn new(config: ExternalSortConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.temp_directory).with_path(&config.temp_directory)?;
        let run_directory = tempfile::Builder::new()
            .prefix(RUN_DIR_PREFIX)
            .tempdir_in(&config.temp_directory)
            .with_path(&config.temp_directory)?;
        debug!("Spilling chunks to {}", run_directory.path().display());

        let chunk_processor = ChunkProcessor::new(
            config.effective_chunk_bytes(),
            config.io_buffer_size_bytes(),
            run_directory.path().to_path_buf(),
        );

        let merger = ChunkMerger::new(config.merge_buffer_size_bytes());

        Ok(Self {
            config,
            run_directory,
            chunk_processor,
            merger,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            chunks: Vec::new(),
            stats: ExternalSortStats::default(),
        })
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    /// Sorts every input file by `(x, y, z)` and streams the result into
    /// `sink`. On any failure the spilled chunks are removed and the sink is
    /// aborted, so no output file is left claiming to be complete.
    pub async fn process<S: SortedSink>(
        &mut self,
        input_files: &[PathBuf],
        sink: &mut S,
    ) -> Result<ExternalSortStats> {
        let start_time = Instant::now();
        self.stats = ExternalSortStats::default();

        let result = self.run(input_files, sink).await;
        self.cleanup();

        match result {
            Ok(records_written) => {
                self.stats.records_written = records_written;
                self.stats.processing_time_ms = start_time.elapsed().as_millis() as u64;
                info!(
                    "Sorted {} records from {} files using {} chunks in {} ms",
                    self.stats.total_records,
                    self.stats.files_processed,
                    self.stats.chunks_created,
                    self.stats.processing_time_ms
                );
                Ok(self.stats.clone())
            }
            Err(e) => {
                sink.abort();
                Err(e)
            }
        }
    }

    async fn run<S: SortedSink>(&mut self, input_files: &[PathBuf], sink: &mut S) -> Result<usize> {
        if self.config.verbose {
            info!("Starting external sort of {} input files", input_files.len());
            info!("Chunk budget: {:.1} MB", self.chunk_budget_mb());
        }

        let sort_start = Instant::now();
        for file_path in input_files {
            self.process_file(file_path).await?;
        }
        self.stats.sort_time_ms = sort_start.elapsed().as_millis() as u64;
        self.stats.chunks_created = self.chunks.len();

        let merge_start = Instant::now();
        let merged = self
            .merger
            .merge_chunks(&self.chunks, sink, self.shutdown_flag.clone())
            .await?;
        let written = sink.commit()?;
        self.stats.merge_time_ms = merge_start.elapsed().as_millis() as u64;

        debug!("Merged {} records, sink committed {}", merged, written);
        Ok(written)
    }

    pub(crate) async fn process_file(&mut self, file_path: &Path) -> Result<()> {
        if let Ok(metadata) = std::fs::metadata(file_path) {
            debug!(
                "{}: {} bytes, ~{} chunks",
                file_path.display(),
                metadata.len(),
                self.chunk_processor.estimate_chunk_count(metadata.len())
            );
        }

        let first_chunk_id = self.chunks.len();
        let records = self
            .chunk_processor
            .process_file_to_chunks(file_path, first_chunk_id, &mut self.chunks, self.shutdown_flag.clone())
            .await?;

        self.stats.total_records += records;
        self.stats.files_processed += 1;
        Ok(())
    }

    fn chunk_budget_mb(&self) -> f64 {
        self.config.effective_chunk_bytes() as f64 / BYTES_PER_MB as f64
    }

    pub fn run_directory(&self) -> &Path {
        self.run_directory.path()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    pub fn cleanup(&mut self) {
        self.chunk_processor.cleanup_all_chunks(&self.chunks);
        self.chunks.clear();
    }
}
