use hdrhistogram::Histogram as Hdr;
use parking_lot::Mutex;

use super::percentiles::PercentileSet;

/// Significant figures kept by every distribution.
pub(crate) const HIST_SIGFIG: u8 = 3;

/// Statistical summary of a stream of observed non-negative values.
///
/// Backed by an auto-resizing HdrHistogram behind a mutex, so
/// `snapshot()` reads count, moments and quantiles from one state.
/// HdrHistogram only tracks unsigned values; callers with signed
/// observations must shift them into range themselves.
pub struct Histogram {
    inner: Mutex<Hdr<u64>>,
}

pub type HistogramSnapshot = PercentileSet;

impl Histogram {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(new_hdr()),
        }
    }

    /// Record one observation. The domain is `0..=u64::MAX`.
    pub fn update(&self, v: u64) {
        // Auto-resize only fails on u64 overflow of the range; drop such a sample.
        let _ = self.inner.lock().record(v);
    }

    pub fn clear(&self) {
        self.inner.lock().reset();
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().len()
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        PercentileSet::from_histogram(&self.inner.lock())
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn new_hdr() -> Hdr<u64> {
    // Auto-resizing: lowest discernible value 1, upper bound grows on demand.
    Hdr::<u64>::new(HIST_SIGFIG).expect("histogram creation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn snapshot_tracks_updates() {
        let h = Histogram::new();
        h.update(19);
        h.update(47);
        let s = h.snapshot();
        assert_eq!(s.count, 2);
        assert_eq!(s.min, 19);
        assert_eq!(s.max, 47);
        assert_eq!(s.mean, 33.0);
        assert_eq!(s.stddev, 14.0);
        assert_eq!(s.variance, 196.0);
    }

    #[test]
    fn zero_is_the_lower_bound() {
        let h = Histogram::new();
        h.update(0);
        h.update(3);
        let s = h.snapshot();
        assert_eq!(s.count, 2);
        assert_eq!(s.min, 0);
        assert_eq!(s.mean, 1.5);
    }

    #[test]
    fn grows_past_initial_bounds() {
        let h = Histogram::new();
        h.update(60_000_000_000);
        assert_eq!(h.count(), 1);
        assert!(h.snapshot().max >= 59_000_000_000);
    }

    #[test]
    fn clear_resets_everything() {
        let h = Histogram::new();
        h.update(5);
        h.clear();
        assert_eq!(h.snapshot(), PercentileSet::empty());
    }

    #[test]
    fn concurrent_updates_are_all_counted() {
        let h = Arc::new(Histogram::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let h = h.clone();
                std::thread::spawn(move || {
                    for v in 0..1000u64 {
                        h.update(v);
                    }
                })
            })
            .collect();
        for t in handles {
            t.join().unwrap();
        }
        assert_eq!(h.snapshot().count, 8000);
    }
}
