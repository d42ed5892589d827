use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::binary::{PointFile, QueryContext};
use crate::constants::VALUE_SIZE_BYTES;
use crate::error::{PointError, Result};
use crate::query::config::{QueryConfig, TargetVariable};
use crate::query::histogram::{value_range, Histogram};
use crate::query::moments::Moments;
use crate::query::search::{lower_bound, upper_bound};

#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    /// Candidate index range `[start, end)` bracketing `min_x..=max_x`.
    pub candidate_start: usize,
    pub candidate_end: usize,
    /// Records in the candidate range whose y passed the filter.
    pub point_count: u64,
    pub bin_count: usize,
    pub target: TargetVariable,
    /// `None` when no point matched.
    pub moments: Option<Moments>,
    pub block_reads: u64,
}

impl QueryReport {
    pub fn candidate_len(&self) -> usize {
        self.candidate_end - self.candidate_start
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }
}

fn fmt_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{:.6}", v))
}

impl fmt::Display for QueryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target:             {}", self.target)?;
        writeln!(f, "Candidate range:    [{}, {})", self.candidate_start, self.candidate_end)?;
        writeln!(f, "Points:             {}", self.point_count)?;
        writeln!(f, "Histogram bins:     {}", self.bin_count)?;
        let moments = self.moments.as_ref();
        writeln!(f, "Mean:               {}", fmt_optional(moments.map(|m| m.mean)))?;
        writeln!(f, "Standard deviation: {}", fmt_optional(moments.map(|m| m.stddev)))?;
        writeln!(f, "Skewness:           {}", fmt_optional(moments.and_then(|m| m.skewness)))?;
        writeln!(f, "Kurtosis:           {}", fmt_optional(moments.and_then(|m| m.kurtosis)))?;
        write!(f, "Block reads:        {}", self.block_reads)
    }
}

/// Opens `path` and answers one range-and-statistics query within the
/// configured memory budget.
pub fn run_query(path: &Path, config: &QueryConfig) -> Result<QueryReport> {
    config.validate()?;
    let mut file = PointFile::open(path)?;
    let mut ctx = QueryContext::new(config.block_size_bytes)?;
    execute(&mut ctx, &mut file, config)
}

/// Runs a query against an already opened file with the caller's context.
pub fn execute(ctx: &mut QueryContext, file: &mut PointFile, config: &QueryConfig) -> Result<QueryReport> {
    config.validate()?;

    let start = lower_bound(ctx, file, config.min_x)?;
    let end = upper_bound(ctx, file, config.max_x)?.max(start);
    debug!(start, end, reads = ctx.block_reads(), "candidate range located");

    let (histogram, point_count) = build_histogram(ctx, file, config, start, end)?;
    let moments = histogram.as_ref().map(Moments::from_histogram).transpose()?;
    debug_assert_eq!(histogram.as_ref().map_or(0, Histogram::total), point_count);

    if point_count == 0 {
        info!("No points in x [{}, {}], y [{}, {})", config.min_x, config.max_x, config.min_y, config.max_y);
    }

    Ok(QueryReport {
        candidate_start: start,
        candidate_end: end,
        point_count,
        bin_count: histogram.as_ref().map_or(0, Histogram::bin_count),
        target: config.target,
        moments,
        block_reads: ctx.block_reads(),
    })
}

/// Bins the target values of the candidate range within what the block
/// leaves of the memory budget. Values are buffered when they fit next to the
/// bins; otherwise the range is scanned twice, first for the value range and
/// then for the bins. Bins that alone exceed the budget are `InvalidArgument`.
fn build_histogram(
    ctx: &mut QueryContext,
    file: &mut PointFile,
    config: &QueryConfig,
    start: usize,
    end: usize,
) -> Result<(Option<Histogram>, u64)> {
    let candidates = end - start;
    if candidates == 0 {
        return Ok((None, 0));
    }
    let available = config.value_buffer_bytes();

    let mut values = None;
    let mut range: Option<(f64, f64)> = None;
    let mut point_count = 0u64;
    if candidates.saturating_mul(VALUE_SIZE_BYTES) <= available {
        let mut buffered = Vec::with_capacity(candidates);
        scan_range(ctx, file, config, start, end, |value| buffered.push(value))?;
        range = value_range(buffered.iter().copied());
        point_count = buffered.len() as u64;
        values = Some(buffered);
    } else {
        scan_range(ctx, file, config, start, end, |value| {
            range = Some(match range {
                None => (value, value),
                Some((lo, hi)) => (f64::min(lo, value), f64::max(hi, value)),
            });
            point_count += 1;
        })?;
    }

    let Some((min_value, max_value)) = range else {
        return Ok((None, 0));
    };

    let bin_count = Histogram::bin_count_for(min_value, max_value, config.bin_width)?;
    let bin_bytes = Histogram::footprint_bytes(bin_count);
    if bin_bytes > available {
        return Err(PointError::invalid_argument(
            "bin_width",
            format!(
                "{} bins over [{}, {}] need {} bytes but the memory budget leaves {}",
                bin_count, min_value, max_value, bin_bytes, available
            ),
        ));
    }

    match values {
        Some(values) if values.len() * VALUE_SIZE_BYTES + bin_bytes <= available => {
            debug!(values = values.len(), bin_count, "single-pass histogram");
            let histogram = Histogram::from_values(&values, config.bin_width)?;
            Ok((Some(histogram), point_count))
        }
        values => {
            // Release the buffered values before the bins are allocated.
            drop(values);
            debug!(point_count, bin_count, "two-pass histogram");
            let mut histogram = Histogram::new(min_value, max_value, config.bin_width)?;
            scan_range(ctx, file, config, start, end, |value| histogram.add(value))?;
            Ok((Some(histogram), point_count))
        }
    }
}

/// Visits the target value of every record in `[start, end)` whose y lies in
/// `[min_y, max_y)`. Every record in the range must have x within
/// `[min_x, max_x]`.
fn scan_range<F>(
    ctx: &mut QueryContext,
    file: &mut PointFile,
    config: &QueryConfig,
    start: usize,
    end: usize,
    mut visit: F,
) -> Result<()>
where
    F: FnMut(f64),
{
    let mut index = start;
    while index < end {
        let loaded = ctx.read_records(file, index)?;
        if loaded == 0 {
            return Err(PointError::corrupt(
                file.path(),
                format!("short read at record {} of {}", index, file.record_count()),
            ));
        }

        let take = loaded.min(end - index);
        let block = ctx.block();
        for k in 0..take {
            let x = block.xs[k];
            if f64::from(x) < config.min_x || f64::from(x) > config.max_x {
                return Err(PointError::RangeInvariantViolation {
                    index: index + k,
                    min_x: config.min_x,
                    max_x: config.max_x,
                    observed: x,
                });
            }

            let y = f64::from(block.ys[k]);
            if y >= config.min_y && y < config.max_y {
                visit(match config.target {
                    TargetVariable::Z => f64::from(block.zs[k]),
                    TargetVariable::Intensity => f64::from(block.is[k]),
                });
            }
        }
        index += take;
    }
    Ok(())
}
