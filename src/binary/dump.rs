use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::binary::reader::{PointFile, QueryContext};
use crate::constants::{BYTES_PER_KB, DUMP_IO_BUFFER_SIZE_KB};
use crate::error::{IoResultExt, PointError, Result};

/// Converts a binary point file back to `x y z i` text, two decimals per
/// coordinate, reading one block at a time.
pub fn dump_to_text(binary: &Path, text: &Path, block_size_bytes: usize) -> Result<usize> {
    let mut file = PointFile::open(binary)?;
    let mut ctx = QueryContext::new(block_size_bytes)?;
    let output = File::create(text).with_path(text)?;
    let mut writer = BufWriter::with_capacity(DUMP_IO_BUFFER_SIZE_KB * BYTES_PER_KB, output);

    let total = file.record_count();
    let mut index = 0;
    while index < total {
        let loaded = ctx.read_records(&mut file, index)?;
        if loaded == 0 {
            return Err(PointError::corrupt(
                binary,
                format!("short read at record {} of {}", index, total),
            ));
        }

        let block = ctx.block();
        for k in 0..loaded {
            writeln!(
                writer,
                "{:.2} {:.2} {:.2} {}",
                block.xs[k], block.ys[k], block.zs[k], block.is[k]
            )
            .with_path(text)?;
        }
        index += loaded;
    }

    writer.flush().with_path(text)?;
    info!("Dumped {} records in {} block reads", total, ctx.block_reads());
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{BinaryWriter, Point};
    use crate::external_sort::SortedSink;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_dump_round_trips_text() {
        let temp_dir = tempdir().unwrap();
        let binary = temp_dir.path().join("points.bin");
        let text = temp_dir.path().join("points.txt");

        let mut writer = BinaryWriter::create(&binary).unwrap();
        writer.push_point(&Point::new(0.5, 1.25, -3.0, 7)).unwrap();
        writer.push_point(&Point::new(1.0, 0.0, 2.2, -12)).unwrap();
        writer.push_point(&Point::new(2.0, 9.0, 0.0, 0)).unwrap();
        writer.commit().unwrap();

        // Two-record blocks force more than one read.
        assert_eq!(dump_to_text(&binary, &text, 28).unwrap(), 3);
        let content = fs::read_to_string(&text).unwrap();
        assert_eq!(content, "0.50 1.25 -3.00 7\n1.00 0.00 2.20 -12\n2.00 9.00 0.00 0\n");
    }
}
