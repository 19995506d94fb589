use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

// ─── Configuration ───────────────────────────────────────────────

/// Moving averages advance in fixed 5 s steps.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

// ─── Public types ────────────────────────────────────────────────

/// Rate-of-events tracker: a total count plus 1/5/15-minute
/// exponentially weighted moving averages and a lifetime mean rate.
///
/// There is no background ticker. Elapsed ticks are applied lazily on the
/// next `mark()` or `snapshot()`.
pub struct Meter {
    inner: Mutex<MeterCore>,
}

/// Rates are events per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

impl Meter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MeterCore::new(Instant::now())),
        }
    }

    pub fn mark(&self, n: i64) {
        self.inner.lock().mark(n, Instant::now());
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        self.inner.lock().snapshot(Instant::now())
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Shared core (also embedded in Timer) ────────────────────────

pub(crate) struct MeterCore {
    count: i64,
    start: Instant,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl MeterCore {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            count: 0,
            start: now,
            last_tick: now,
            m1: Ewma::minutes(1.0),
            m5: Ewma::minutes(5.0),
            m15: Ewma::minutes(15.0),
        }
    }

    pub(crate) fn mark(&mut self, n: i64, now: Instant) {
        self.tick_if_necessary(now);
        self.count += n;
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    pub(crate) fn snapshot(&mut self, now: Instant) -> MeterSnapshot {
        self.tick_if_necessary(now);

        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            self.count as f64 / elapsed
        } else {
            0.0
        };

        MeterSnapshot {
            count: self.count,
            rate1: self.m1.rate,
            rate5: self.m5.rate,
            rate15: self.m15.rate,
            rate_mean,
        }
    }

    /// Catch up on every whole tick since the last one.
    fn tick_if_necessary(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = elapsed.as_nanos() / TICK_INTERVAL.as_nanos();
        if ticks == 0 {
            return;
        }
        // Bounded by the u32 range; older history has decayed to nothing anyway.
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        self.last_tick += TICK_INTERVAL * ticks;
        for _ in 0..ticks {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
        }
    }
}

// ─── EWMA ────────────────────────────────────────────────────────

struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: i64,
    initialized: bool,
}

impl Ewma {
    fn minutes(m: f64) -> Self {
        let alpha = 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / m).exp();
        Self {
            alpha,
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    fn update(&mut self, n: i64) {
        self.uncounted += n;
    }

    /// The first tick seeds the average with the instantaneous rate.
    fn tick(&mut self) {
        let instant = self.uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant - self.rate);
        } else {
            self.rate = instant;
            self.initialized = true;
        }
    }
}
