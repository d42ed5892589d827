use serde::Serialize;

use crate::error::{PointError, Result};
use crate::query::histogram::Histogram;

/// Descriptive statistics of the binned target values. Bin centers stand in
/// for the raw values, weighted by bin counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Moments {
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
    /// `None` for a single point or zero spread.
    pub skewness: Option<f64>,
    /// Excess kurtosis; `None` for zero spread.
    pub kurtosis: Option<f64>,
}

impl Moments {
    pub fn from_histogram(histogram: &Histogram) -> Result<Self> {
        let total_count = histogram.total();
        if total_count == 0 {
            return Err(PointError::NoData);
        }
        let total = total_count as f64;

        let mean = histogram
            .bins()
            .map(|(center, count)| count as f64 * center)
            .sum::<f64>()
            / total;

        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for (center, count) in histogram.bins() {
            let count = count as f64;
            let d = center - mean;
            let d2 = d * d;
            m2 += count * d2;
            m3 += count * d2 * d;
            m4 += count * d2 * d2;
        }

        let stddev = (m2 / total).sqrt();

        let skewness = if total_count > 1 && m2 > 0.0 {
            let sample_variance = m2 / (total - 1.0);
            Some((m3 / total) / sample_variance.powf(1.5))
        } else {
            None
        };

        let kurtosis = if m2 > 0.0 {
            Some(total * (m4 / (m2 * m2)) - 3.0)
        } else {
            None
        };

        Ok(Self {
            mean,
            stddev,
            skewness,
            kurtosis,
        })
    }
}
