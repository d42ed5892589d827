//! Block-granular random access over the sorted point file.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use byteorder::ReadBytesExt;
use tracing::{debug, trace};

use crate::binary::codec::{decode_header, expected_file_len, record_offset, FileEndian};
use crate::constants::*;
use crate::error::{IoResultExt, PointError, Result};

/// An open, header-validated point file.
pub struct PointFile {
    file: File,
    path: PathBuf,
    record_count: usize,
}

impl PointFile {
    /// Opens the file and reads its header once. The header must account for
    /// every byte of the body.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).with_path(path)?;
        let file_len = file.metadata().with_path(path)?.len();

        let mut header_bytes = [0u8; HEADER_SIZE_BYTES];
        let header = match file.read_exact(&mut header_bytes) {
            Ok(()) => decode_header(&header_bytes)?,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(PointError::corrupt(
                    path,
                    format!("file is {} bytes, shorter than the header", file_len),
                ));
            }
            Err(e) => return Err(e).with_path(path),
        };

        if header < 0 {
            return Err(PointError::corrupt(path, format!("negative record count {}", header)));
        }

        let record_count = header as usize;
        let expected = expected_file_len(record_count);
        if file_len != expected {
            return Err(PointError::corrupt(
                path,
                format!(
                    "header claims {} records ({} bytes) but file has {} bytes",
                    record_count, expected, file_len
                ),
            ));
        }

        debug!("Opened {} with {} records", path.display(), record_count);
        Ok(Self {
            file,
            path: path.to_path_buf(),
            record_count,
        })
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Reads into `buf` from `offset` until it is full or the file ends.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.file.seek(SeekFrom::Start(offset)).with_path(&self.path)?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).with_path(&self.path),
            }
        }
        Ok(filled)
    }
}

/// Parallel columns for one block of records. Slots past `len` hold stale
/// data from earlier reads and must not be looked at.
#[derive(Debug)]
pub struct Block {
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
    pub zs: Vec<f32>,
    pub is: Vec<i16>,
    len: usize,
}

impl Block {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: vec![0.0; capacity],
            ys: vec![0.0; capacity],
            zs: vec![0.0; capacity],
            is: vec![0; capacity],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.xs.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn xs(&self) -> &[f32] {
        &self.xs[..self.len]
    }

    pub fn ys(&self) -> &[f32] {
        &self.ys[..self.len]
    }

    pub fn zs(&self) -> &[f32] {
        &self.zs[..self.len]
    }

    pub fn intensities(&self) -> &[i16] {
        &self.is[..self.len]
    }
}

/// All mutable state of one query: the single resident block, its raw byte
/// buffer and the disk-read counter. Concurrent queries each need their own.
pub struct QueryContext {
    block: Block,
    raw: Vec<u8>,
    block_reads: u64,
}

impl QueryContext {
    pub fn new(block_size_bytes: usize) -> Result<Self> {
        let capacity = block_size_bytes / RECORD_SIZE_BYTES;
        if capacity == 0 {
            return Err(PointError::invalid_argument(
                "block_size",
                format!(
                    "{} bytes cannot hold a single {}-byte record",
                    block_size_bytes, RECORD_SIZE_BYTES
                ),
            ));
        }

        Ok(Self {
            block: Block::with_capacity(capacity),
            raw: vec![0u8; capacity * RECORD_SIZE_BYTES],
            block_reads: 0,
        })
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn block_capacity(&self) -> usize {
        self.block.capacity()
    }

    pub fn block_reads(&self) -> u64 {
        self.block_reads
    }

    pub fn reset_block_reads(&mut self) {
        self.block_reads = 0;
    }

    /// Loads up to one block of records starting at `byte_offset`, which must
    /// be `4 + k * 14`. Returns the number of whole records loaded; a trailing
    /// partial record is dropped and 0 means end of file.
    pub fn read_block(&mut self, file: &mut PointFile, byte_offset: u64) -> Result<usize> {
        let body_offset = byte_offset.checked_sub(HEADER_SIZE_BYTES as u64);
        match body_offset {
            Some(body) if body % RECORD_SIZE_BYTES as u64 == 0 => {}
            _ => {
                return Err(PointError::invalid_argument(
                    "byte_offset",
                    format!("{} is not aligned to a record boundary", byte_offset),
                ));
            }
        }

        self.block.len = 0;
        self.block_reads += 1;
        let bytes_read = file.read_at(byte_offset, &mut self.raw)?;
        let records = bytes_read / RECORD_SIZE_BYTES;

        for (slot, record) in self.raw[..records * RECORD_SIZE_BYTES]
            .chunks_exact(RECORD_SIZE_BYTES)
            .enumerate()
        {
            let mut cursor = record;
            self.block.xs[slot] = cursor.read_f32::<FileEndian>().with_path(&file.path)?;
            self.block.ys[slot] = cursor.read_f32::<FileEndian>().with_path(&file.path)?;
            self.block.zs[slot] = cursor.read_f32::<FileEndian>().with_path(&file.path)?;
            self.block.is[slot] = cursor.read_i16::<FileEndian>().with_path(&file.path)?;
        }
        self.block.len = records;

        trace!("Block read #{} at offset {}: {} records", self.block_reads, byte_offset, records);
        Ok(records)
    }

    pub fn read_records(&mut self, file: &mut PointFile, record_index: usize) -> Result<usize> {
        self.read_block(file, record_offset(record_index))
    }
}
