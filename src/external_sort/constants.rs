pub const DEFAULT_MEMORY_USAGE_PERCENT: f64 = 60.0;
pub const DEFAULT_CHUNK_SIZE_KB: usize = 256 * 1024;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const DEFAULT_MERGE_BUFFER_SIZE_KB: usize = 256;

pub const MIN_MEMORY_USAGE_PERCENT: f64 = 10.0;
pub const MAX_MEMORY_USAGE_PERCENT: f64 = 90.0;
pub const MIN_CHUNK_SIZE_KB: usize = 1;
pub const MAX_CHUNK_SIZE_KB: usize = 4 * 1024 * 1024;
pub const MIN_IO_BUFFER_SIZE_KB: usize = 1;

pub const CHUNK_FILE_PREFIX: &str = "chunk_";
pub const CHUNK_FILE_EXTENSION: &str = ".txt";
pub const TEMP_DIR_NAME: &str = "cloud_sift_sort_temp";
pub const RUN_DIR_PREFIX: &str = "run_";

pub const PROGRESS_REPORT_INTERVAL_RECORDS: usize = 1_000_000;
pub const SHUTDOWN_CHECK_INTERVAL_RECORDS: usize = 1000;

/// Per-record bookkeeping on top of the line text: parsed fields, `String`
/// header and `Vec` slot.
pub const ESTIMATED_RECORD_OVERHEAD_BYTES: usize = 64;

pub const MERGE_HEAP_INITIAL_CAPACITY: usize = 1024;
pub const OUTPUT_BUFFER_SIZE_KB: usize = 512;
