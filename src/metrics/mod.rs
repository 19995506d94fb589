pub mod healthcheck;
pub mod histogram;
pub mod meter;
pub mod percentiles;
pub mod registry;
pub mod scalar;
pub mod timer;

use std::sync::Arc;

use serde::Serialize;

pub use healthcheck::{Healthcheck, HealthcheckSnapshot};
pub use histogram::{Histogram, HistogramSnapshot};
pub use meter::{Meter, MeterSnapshot};
pub use percentiles::PercentileSet;
pub use registry::{MetricSource, Registry};
pub use scalar::{Counter, Gauge, GaugeFloat};
pub use timer::{Timer, TimerSnapshot};

/// A registered metric instance.
///
/// The set of kinds is closed; every exporter dispatch is an exhaustive
/// `match`. Handles are `Arc`s so the registry can hand out clones and drop
/// its lock before anything is snapshotted.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeFloat(Arc<GaugeFloat>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
    Healthcheck(Arc<Healthcheck>),
}

impl Metric {
    /// Point-in-time read of this metric. Each kind guarantees its own
    /// fields come from the same underlying state.
    pub fn snapshot(&self) -> MetricSnapshot {
        match self {
            Metric::Counter(c) => MetricSnapshot::Counter { count: c.count() },
            Metric::Gauge(g) => MetricSnapshot::Gauge { value: g.value() },
            Metric::GaugeFloat(g) => MetricSnapshot::GaugeFloat { value: g.value() },
            Metric::Histogram(h) => MetricSnapshot::Histogram(h.snapshot()),
            Metric::Meter(m) => MetricSnapshot::Meter(m.snapshot()),
            Metric::Timer(t) => MetricSnapshot::Timer(t.snapshot()),
            Metric::Healthcheck(h) => MetricSnapshot::Healthcheck(h.snapshot()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) => "gauge",
            Metric::GaugeFloat(_) => "gauge_float",
            Metric::Histogram(_) => "histogram",
            Metric::Meter(_) => "meter",
            Metric::Timer(_) => "timer",
            Metric::Healthcheck(_) => "healthcheck",
        }
    }
}

impl std::fmt::Debug for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Metric").field(&self.kind()).finish()
    }
}

macro_rules! impl_from_handle {
    ($($kind:ident),* $(,)?) => {
        $(
            impl From<Arc<$kind>> for Metric {
                fn from(m: Arc<$kind>) -> Self {
                    Metric::$kind(m)
                }
            }
        )*
    };
}

impl_from_handle!(Counter, Gauge, GaugeFloat, Histogram, Meter, Timer, Healthcheck);

/// Immutable statistical payload produced by [`Metric::snapshot`].
/// Also what the JSON debug endpoint serializes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricSnapshot {
    Counter { count: i64 },
    Gauge { value: i64 },
    GaugeFloat { value: f64 },
    Histogram(HistogramSnapshot),
    Meter(MeterSnapshot),
    Timer(TimerSnapshot),
    Healthcheck(HealthcheckSnapshot),
}
