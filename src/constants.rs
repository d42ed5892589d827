pub const BYTES_PER_KB: usize = 1024;
pub const BYTES_PER_MB: usize = 1_048_576;
pub const PERCENT_100: f64 = 100.0;

// Binary file layout
pub const HEADER_SIZE_BYTES: usize = 4;
pub const RECORD_SIZE_BYTES: usize = 14;
pub const COORDINATE_SIZE_BYTES: usize = 4;
pub const INTENSITY_SIZE_BYTES: usize = 2;

// Text record layout: "x y z i"
pub const TEXT_RECORD_FIELDS: usize = 4;
pub const FIELD_NAMES: [&str; TEXT_RECORD_FIELDS] = ["x", "y", "z", "intensity"];

// Query defaults
pub const DEFAULT_BLOCK_SIZE_BYTES: usize = 64 * BYTES_PER_KB;
pub const DEFAULT_MEMORY_BUDGET_BYTES: usize = 16 * BYTES_PER_MB;
pub const DEFAULT_BIN_WIDTH: f64 = 1.0;
pub const MAX_HISTOGRAM_BINS: usize = 1 << 24;
// One f64 center plus one u64 count per bin
pub const HISTOGRAM_BIN_SIZE_BYTES: usize = 16;
pub const VALUE_SIZE_BYTES: usize = 8;
pub const DUMP_IO_BUFFER_SIZE_KB: usize = 256;

// Logging
pub const LOG_TARGET_CRATE: &str = "cloud_sift";
