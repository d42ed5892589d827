//! Fixed-width record layout of the sorted point file.
//!
//! Header: one big-endian `i32` record count. Body: `count` records of
//! `f32 x | f32 y | f32 z | i16 intensity`, 14 bytes each, no padding.

use byteorder::{BigEndian, ByteOrder};
use std::cmp::Ordering;

use crate::constants::*;
use crate::error::{PointError, Result};

/// Byte order used by writer and readers alike.
pub type FileEndian = BigEndian;

const Y_OFFSET: usize = COORDINATE_SIZE_BYTES;
const Z_OFFSET: usize = 2 * COORDINATE_SIZE_BYTES;
const INTENSITY_OFFSET: usize = 3 * COORDINATE_SIZE_BYTES;
const INTENSITY_END: usize = INTENSITY_OFFSET + INTENSITY_SIZE_BYTES;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: i16,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32, intensity: i16) -> Self {
        Self { x, y, z, intensity }
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE_BYTES] {
        let mut buf = [0u8; RECORD_SIZE_BYTES];
        self.encode_into(&mut buf);
        buf
    }

    /// Writes the record into the first 14 bytes of `buf`.
    pub fn encode_into(&self, buf: &mut [u8]) {
        FileEndian::write_f32(&mut buf[..Y_OFFSET], self.x);
        FileEndian::write_f32(&mut buf[Y_OFFSET..Z_OFFSET], self.y);
        FileEndian::write_f32(&mut buf[Z_OFFSET..INTENSITY_OFFSET], self.z);
        FileEndian::write_i16(&mut buf[INTENSITY_OFFSET..INTENSITY_END], self.intensity);
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < RECORD_SIZE_BYTES {
            return Err(PointError::CorruptFile {
                path: "<buffer>".to_string(),
                reason: format!(
                    "truncated record: {} bytes, expected {}",
                    buf.len(),
                    RECORD_SIZE_BYTES
                ),
            });
        }
        Ok(Self {
            x: FileEndian::read_f32(&buf[..Y_OFFSET]),
            y: FileEndian::read_f32(&buf[Y_OFFSET..Z_OFFSET]),
            z: FileEndian::read_f32(&buf[Z_OFFSET..INTENSITY_OFFSET]),
            intensity: FileEndian::read_i16(&buf[INTENSITY_OFFSET..INTENSITY_END]),
        })
    }

    /// Lexicographic `(x, y, z)` order.
    pub fn key_cmp(&self, other: &Self) -> Ordering {
        cmp_f32(self.x, other.x)
            .then_with(|| cmp_f32(self.y, other.y))
            .then_with(|| cmp_f32(self.z, other.z))
    }
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

pub fn encode_header(record_count: i32) -> [u8; HEADER_SIZE_BYTES] {
    let mut buf = [0u8; HEADER_SIZE_BYTES];
    FileEndian::write_i32(&mut buf, record_count);
    buf
}

pub fn decode_header(buf: &[u8]) -> Result<i32> {
    if buf.len() < HEADER_SIZE_BYTES {
        return Err(PointError::CorruptFile {
            path: "<buffer>".to_string(),
            reason: format!("truncated header: {} bytes", buf.len()),
        });
    }
    Ok(FileEndian::read_i32(&buf[..HEADER_SIZE_BYTES]))
}

/// Byte offset of the record with the given index.
pub fn record_offset(record_index: usize) -> u64 {
    (HEADER_SIZE_BYTES + record_index * RECORD_SIZE_BYTES) as u64
}

/// Expected file length for a header claiming `record_count` records.
pub fn expected_file_len(record_count: usize) -> u64 {
    record_offset(record_count)
}
