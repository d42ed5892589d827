//! Binary search over the sorted file, one block per probe.
//!
//! Predicates are monotonic in x: false for a prefix of the file, true for
//! the rest. `find_first` returns the first index where the predicate holds,
//! or the record count if it never does.

use tracing::debug;

use crate::binary::{PointFile, QueryContext};
use crate::error::{PointError, Result};

/// First index `i` with `x[i] >= x0`.
pub fn lower_bound(ctx: &mut QueryContext, file: &mut PointFile, x0: f64) -> Result<usize> {
    find_first(ctx, file, |x| f64::from(x) >= x0)
}

/// First index `i` with `x[i] > x0`; the last record with `x <= x0` sits just
/// before it.
pub fn upper_bound(ctx: &mut QueryContext, file: &mut PointFile, x0: f64) -> Result<usize> {
    find_first(ctx, file, |x| f64::from(x) > x0)
}

pub fn find_first<P>(ctx: &mut QueryContext, file: &mut PointFile, pred: P) -> Result<usize>
where
    P: Fn(f32) -> bool,
{
    let capacity = ctx.block_capacity();
    let mut lo = 0;
    let mut hi = file.record_count();

    // Invariant: pred is false below `lo` and true from `hi` on.
    while lo < hi {
        // Once the window fits in one block, load all of it.
        let start = if hi - lo <= capacity { lo } else { lo + (hi - lo) / 2 };

        let loaded = ctx.read_records(file, start)?;
        if loaded == 0 {
            return Err(PointError::corrupt(
                file.path(),
                format!("short read at record {} of {}", start, file.record_count()),
            ));
        }

        let window = loaded.min(hi - start);
        let xs = &ctx.block().xs()[..window];
        check_sorted(file, xs, start)?;

        let first = xs[0];
        let last = xs[window - 1];
        debug!(lo, hi, start, window, first, last, "boundary probe");

        if pred(first) {
            hi = start;
        } else if !pred(last) {
            lo = start + window;
        } else {
            let offset = xs.iter().position(|&x| pred(x)).unwrap_or(window);
            return Ok(start + offset);
        }
    }

    Ok(lo)
}

fn check_sorted(file: &PointFile, xs: &[f32], start: usize) -> Result<()> {
    if let Some(k) = xs.windows(2).position(|pair| pair[1] < pair[0]) {
        return Err(PointError::corrupt(
            file.path(),
            format!(
                "records not sorted by x: x[{}] = {} follows x[{}] = {}",
                start + k + 1,
                xs[k + 1],
                start + k,
                xs[k]
            ),
        ));
    }
    Ok(())
}
