// Error taxonomy shared by every stage
pub mod error;

// Constants used across the crate
pub mod constants;

// Logging setup for the binaries
pub mod utils;

// External Sort module - text points to sorted sequence
pub mod external_sort;

// Fixed-width binary file format: codec, writer, block reader
pub mod binary;

// Range queries and statistics over the sorted binary file
pub mod query;

// Re-export main types for convenience
pub use binary::{BinaryWriter, Point, PointFile, QueryContext};
pub use error::{PointError, Result};
pub use external_sort::{ExternalSortConfig, ExternalSortProcessor, ExternalSortStats};
pub use query::{run_query, QueryConfig, QueryReport, TargetVariable};
