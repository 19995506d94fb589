use hdrhistogram::Histogram;
use serde::Serialize;

/// Quantiles reported for every distribution, in wire order.
pub const QUANTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.99, 0.999, 0.9999];

/// A complete distribution summary for one histogram.
/// Field order matches the order the StatsD encoder emits them in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileSet {
    pub count: i64,
    pub max: i64,
    pub mean: f64,
    pub min: i64,
    pub stddev: f64,
    pub variance: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
    pub p9999: f64,
}

impl PercentileSet {
    /// Extract a full summary from an HdrHistogram.
    /// Returns zeroed values if the histogram is empty.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        let q = |quantile: f64| hist.value_at_quantile(quantile) as f64;
        let stddev = hist.stdev();

        Self {
            count: to_i64(hist.len()),
            max: to_i64(hist.max()),
            mean: hist.mean(),
            min: to_i64(hist.min()),
            stddev,
            variance: stddev * stddev,
            p50: q(QUANTILES[0]),
            p75: q(QUANTILES[1]),
            p95: q(QUANTILES[2]),
            p99: q(QUANTILES[3]),
            p999: q(QUANTILES[4]),
            p9999: q(QUANTILES[5]),
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub fn empty() -> Self {
        Self {
            count: 0,
            max: 0,
            mean: 0.0,
            min: 0,
            stddev: 0.0,
            variance: 0.0,
            p50: 0.0,
            p75: 0.0,
            p95: 0.0,
            p99: 0.0,
            p999: 0.0,
            p9999: 0.0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
