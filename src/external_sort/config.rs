use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use anyhow::Result;
use crate::constants::{BYTES_PER_KB, PERCENT_100};
use crate::error::PointError;
use crate::external_sort::constants::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalSortConfig {
    pub memory_usage_percent: f64,
    pub chunk_size_kb: usize,
    pub io_buffer_size_kb: usize,
    pub merge_buffer_size_kb: usize,
    pub temp_directory: PathBuf,
    pub verbose: bool,
}

impl Default for ExternalSortConfig {
    fn default() -> Self {
        Self {
            memory_usage_percent: DEFAULT_MEMORY_USAGE_PERCENT,
            chunk_size_kb: DEFAULT_CHUNK_SIZE_KB,
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            merge_buffer_size_kb: DEFAULT_MERGE_BUFFER_SIZE_KB,
            temp_directory: std::env::temp_dir().join(TEMP_DIR_NAME),
            verbose: false,
        }
    }
}

impl ExternalSortConfig {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.memory_usage_percent < MIN_MEMORY_USAGE_PERCENT
            || self.memory_usage_percent > MAX_MEMORY_USAGE_PERCENT {
            return Err(PointError::invalid_argument(
                "memory_usage_percent",
                format!(
                    "must be between {} and {}",
                    MIN_MEMORY_USAGE_PERCENT, MAX_MEMORY_USAGE_PERCENT
                ),
            ));
        }

        if self.chunk_size_kb < MIN_CHUNK_SIZE_KB || self.chunk_size_kb > MAX_CHUNK_SIZE_KB {
            return Err(PointError::invalid_argument(
                "chunk_size_kb",
                format!("must be between {} and {} KB", MIN_CHUNK_SIZE_KB, MAX_CHUNK_SIZE_KB),
            ));
        }

        if self.io_buffer_size_kb < MIN_IO_BUFFER_SIZE_KB
            || self.merge_buffer_size_kb < MIN_IO_BUFFER_SIZE_KB {
            return Err(PointError::invalid_argument(
                "io_buffer_size_kb",
                format!("buffers must be at least {} KB", MIN_IO_BUFFER_SIZE_KB),
            ));
        }

        Ok(())
    }

    pub fn memory_limit_bytes(&self) -> usize {
        use sysinfo::System;
        let mut system = System::new();
        system.refresh_memory();

        let total_memory = system.total_memory() as f64;
        (total_memory * self.memory_usage_percent / PERCENT_100) as usize
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size_kb * BYTES_PER_KB
    }

    /// Chunk budget actually used for sorting: the configured chunk size,
    /// capped by the share of physical memory we are allowed to use.
    pub fn effective_chunk_bytes(&self) -> usize {
        let limit = self.memory_limit_bytes();
        if limit == 0 {
            self.chunk_size_bytes()
        } else {
            self.chunk_size_bytes().min(limit)
        }
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }

    pub fn merge_buffer_size_bytes(&self) -> usize {
        self.merge_buffer_size_kb * BYTES_PER_KB
    }
}
