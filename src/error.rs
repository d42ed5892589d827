//! Error types for sorting, encoding and querying point files.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for cloud-sift operations
pub type Result<T> = std::result::Result<T, PointError>;

/// Why a text line could not be turned into a point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Line does not have exactly four fields
    FieldCount { found: usize },
    /// Field is not a decimal number (or not an integer, for intensity)
    InvalidNumber { field: &'static str, value: String },
    /// Field parsed as NaN or infinity
    NonFinite { field: &'static str },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::FieldCount { found } => {
                write!(f, "expected 4 fields, found {found}")
            }
            ParseErrorKind::InvalidNumber { field, value } => {
                write!(f, "field '{field}' is not a valid number: '{value}'")
            }
            ParseErrorKind::NonFinite { field } => write!(f, "field '{field}' is not finite"),
        }
    }
}

/// Error type for cloud-sift operations
#[derive(Error, Debug)]
pub enum PointError {
    /// Malformed text record
    #[error("Parse error in '{source_name}' at line {line_number}: {kind} (line: {line:?})")]
    Parse {
        source_name: String,
        line_number: usize,
        line: String,
        kind: ParseErrorKind,
    },

    /// Record cannot be represented in the binary schema
    #[error("Encoding error at record {index}: {reason}")]
    Encoding { index: usize, reason: String },

    /// Header/body mismatch, truncated record or unsorted body
    #[error("Corrupt file '{path}': {reason}")]
    CorruptFile { path: String, reason: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid argument '{parameter}': {reason}")]
    InvalidArgument { parameter: String, reason: String },

    /// A record inside the search-bracketed range lies outside the queried x interval
    #[error("Range invariant violated at record {index}: x = {observed} outside [{min_x}, {max_x}]")]
    RangeInvariantViolation {
        index: usize,
        min_x: f64,
        max_x: f64,
        observed: f32,
    },

    #[error("No data in candidate range")]
    NoData,

    #[error("Interrupted by shutdown signal")]
    Interrupted,
}

impl PointError {
    pub fn invalid_argument(parameter: &str, reason: impl Into<String>) -> Self {
        PointError::InvalidArgument {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        PointError::CorruptFile {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Attaches the offending path to raw I/O errors.
pub trait IoResultExt<T> {
    fn with_path(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| PointError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
