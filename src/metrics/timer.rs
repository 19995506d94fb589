use std::time::{Duration, Instant};

use hdrhistogram::Histogram as Hdr;
use parking_lot::Mutex;
use serde::Serialize;

use super::histogram::new_hdr;
use super::meter::{MeterCore, MeterSnapshot};
use super::percentiles::PercentileSet;

/// Distribution of elapsed times (nanoseconds) plus the rate at which
/// they are recorded. Both halves sit behind one lock so a snapshot's
/// histogram count and meter count always agree.
pub struct Timer {
    inner: Mutex<Inner>,
}

struct Inner {
    hist: Hdr<u64>,
    meter: MeterCore,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub histogram: PercentileSet,
    pub meter: MeterSnapshot,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                hist: new_hdr(),
                meter: MeterCore::new(Instant::now()),
            }),
        }
    }

    /// Record one event that took `d`.
    pub fn update(&self, d: Duration) {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        let mut inner = self.inner.lock();
        let _ = inner.hist.record(nanos);
        inner.meter.mark(1, Instant::now());
    }

    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f`, recording how long it took.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = f();
        self.update_since(start);
        out
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let mut inner = self.inner.lock();
        let histogram = PercentileSet::from_histogram(&inner.hist);
        let meter = inner.meter.snapshot(Instant::now());
        TimerSnapshot { histogram, meter }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
