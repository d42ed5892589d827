use crate::constants::{HISTOGRAM_BIN_SIZE_BYTES, MAX_HISTOGRAM_BINS};
use crate::error::{PointError, Result};

/// Fixed-width histogram over `[min_value, max_value]`.
///
/// Bin `k` covers `[min + k*w, min + (k+1)*w)`; the maximum value itself is
/// counted in the last bin so that `ceil((max - min) / w)` bins always suffice.
#[derive(Debug, Clone)]
pub struct Histogram {
    min_value: f64,
    bin_width: f64,
    centers: Vec<f64>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn new(min_value: f64, max_value: f64, bin_width: f64) -> Result<Self> {
        let bin_count = Self::bin_count_for(min_value, max_value, bin_width)?;

        let centers = (0..bin_count)
            .map(|k| min_value + k as f64 * bin_width + bin_width / 2.0)
            .collect();

        Ok(Self {
            min_value,
            bin_width,
            centers,
            counts: vec![0; bin_count],
        })
    }

    /// Number of bins needed to cover `[min_value, max_value]`, validated
    /// against `MAX_HISTOGRAM_BINS`. Nothing is allocated.
    pub fn bin_count_for(min_value: f64, max_value: f64, bin_width: f64) -> Result<usize> {
        if !bin_width.is_finite() || bin_width <= 0.0 {
            return Err(PointError::invalid_argument(
                "bin_width",
                format!("must be a positive number, got {}", bin_width),
            ));
        }
        if !min_value.is_finite() || !max_value.is_finite() || min_value > max_value {
            return Err(PointError::invalid_argument(
                "value_range",
                format!("invalid histogram range [{}, {}]", min_value, max_value),
            ));
        }

        let span_bins = ((max_value - min_value) / bin_width).ceil();
        if span_bins > MAX_HISTOGRAM_BINS as f64 {
            return Err(PointError::invalid_argument(
                "bin_width",
                format!(
                    "{} is too small for range [{}, {}]: more than {} bins",
                    bin_width, min_value, max_value, MAX_HISTOGRAM_BINS
                ),
            ));
        }
        Ok((span_bins as usize).max(1))
    }

    /// Heap bytes held by a histogram with `bin_count` bins.
    pub fn footprint_bytes(bin_count: usize) -> usize {
        bin_count.saturating_mul(HISTOGRAM_BIN_SIZE_BYTES)
    }

    /// Builds a histogram over the range spanned by `values`.
    pub fn from_values(values: &[f64], bin_width: f64) -> Result<Self> {
        let (min_value, max_value) = value_range(values.iter().copied()).ok_or(PointError::NoData)?;
        let mut histogram = Self::new(min_value, max_value, bin_width)?;
        for &value in values {
            histogram.add(value);
        }
        Ok(histogram)
    }

    pub fn bin_index(&self, value: f64) -> usize {
        let raw = ((value - self.min_value) / self.bin_width).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.counts.len() - 1)
        }
    }

    pub fn add(&mut self, value: f64) {
        let index = self.bin_index(value);
        self.counts[index] += 1;
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `(center, count)` pairs for every bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.centers.iter().copied().zip(self.counts.iter().copied())
    }
}

/// Minimum and maximum of a value stream, `None` if it is empty.
pub fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |range, v| match range {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
