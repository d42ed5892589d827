use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::constants::*;
use crate::error::PointError;

/// Scalar the histogram and moments are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetVariable {
    Z,
    #[value(alias = "i")]
    #[serde(alias = "i")]
    Intensity,
}

impl fmt::Display for TargetVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetVariable::Z => write!(f, "z"),
            TargetVariable::Intensity => write!(f, "intensity"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Total bytes the query may hold: one block plus any buffered values.
    pub memory_budget_bytes: usize,
    pub block_size_bytes: usize,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub bin_width: f64,
    pub target: TargetVariable,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            block_size_bytes: DEFAULT_BLOCK_SIZE_BYTES,
            min_x: f64::MIN,
            max_x: f64::MAX,
            min_y: f64::MIN,
            max_y: f64::MAX,
            bin_width: DEFAULT_BIN_WIDTH,
            target: TargetVariable::Z,
        }
    }
}

impl QueryConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.min_x.is_nan() || self.max_x.is_nan() || self.min_x > self.max_x {
            return Err(PointError::invalid_argument(
                "min_x",
                format!("min_x ({}) must not exceed max_x ({})", self.min_x, self.max_x),
            ));
        }

        if self.min_y.is_nan() || self.max_y.is_nan() || self.min_y > self.max_y {
            return Err(PointError::invalid_argument(
                "min_y",
                format!("min_y ({}) must not exceed max_y ({})", self.min_y, self.max_y),
            ));
        }

        if !self.bin_width.is_finite() || self.bin_width <= 0.0 {
            return Err(PointError::invalid_argument(
                "bin_width",
                format!("must be a positive number, got {}", self.bin_width),
            ));
        }

        if self.block_size_bytes < RECORD_SIZE_BYTES {
            return Err(PointError::invalid_argument(
                "block_size",
                format!("must hold at least one {}-byte record", RECORD_SIZE_BYTES),
            ));
        }

        if self.memory_budget_bytes < self.block_size_bytes {
            return Err(PointError::invalid_argument(
                "memory_budget",
                format!(
                    "{} bytes cannot hold a {}-byte block",
                    self.memory_budget_bytes, self.block_size_bytes
                ),
            ));
        }

        Ok(())
    }

    /// Bytes left for buffering target values once the block is allocated.
    pub fn value_buffer_bytes(&self) -> usize {
        self.memory_budget_bytes.saturating_sub(self.block_size_bytes)
    }
}
