//! Per-metric dispatch: one snapshot in, all of its lines out.

use super::line::{encode_line, Value};
use super::{TimerMeanNaming, COUNTER, GAUGE};
use crate::config::ExporterConfig;
use crate::metrics::{MeterSnapshot, MetricSnapshot, PercentileSet};

/// The parts of the config that shape every line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFormat {
    pub prefix: String,
    pub rate: f32,
    pub timer_mean_naming: TimerMeanNaming,
}

impl LineFormat {
    pub fn new(prefix: impl Into<String>, rate: f32) -> Self {
        Self {
            prefix: prefix.into(),
            rate,
            timer_mean_naming: TimerMeanNaming::default(),
        }
    }

    fn gauge<'a>(&self, out: &mut Vec<u8>, name: &str, field: &str, v: impl Into<Value<'a>>) {
        encode_line(out, &self.prefix, name, field, v.into(), GAUGE, self.rate);
    }
}

impl From<&ExporterConfig> for LineFormat {
    fn from(c: &ExporterConfig) -> Self {
        Self {
            prefix: c.prefix.clone(),
            rate: c.rate,
            timer_mean_naming: c.timer_mean_naming,
        }
    }
}

/// Append every line for `snap` to `out`. Returns the number of lines
/// written; kinds that are not exported produce zero.
pub fn encode_metric(
    fmt: &LineFormat,
    name: &str,
    snap: &MetricSnapshot,
    out: &mut Vec<u8>,
) -> usize {
    let before = line_count(out);

    match snap {
        MetricSnapshot::Counter { count } => {
            encode_line(out, &fmt.prefix, name, "", Value::Int(*count), COUNTER, fmt.rate);
        }
        MetricSnapshot::Gauge { value } => fmt.gauge(out, name, "", *value),
        MetricSnapshot::GaugeFloat { value } => fmt.gauge(out, name, "", *value),
        MetricSnapshot::Histogram(h) => distribution(fmt, name, h, "mean", out),
        MetricSnapshot::Meter(m) => rates(fmt, name, m, "mean", out),
        MetricSnapshot::Timer(t) => {
            let (value_mean, rate_mean) = match fmt.timer_mean_naming {
                TimerMeanNaming::Compat => ("mean", "mean"),
                TimerMeanNaming::Distinct => ("mean_value", "mean_rate"),
            };
            distribution(fmt, name, &t.histogram, value_mean, out);
            rates(fmt, name, &t.meter, rate_mean, out);
        }
        MetricSnapshot::Healthcheck(_) => {}
    }

    line_count(out) - before
}

/// count, max, mean, min, stddev, variance, p50 … p9999.
fn distribution(fmt: &LineFormat, name: &str, h: &PercentileSet, mean: &str, out: &mut Vec<u8>) {
    fmt.gauge(out, name, "count", h.count);
    fmt.gauge(out, name, "max", h.max);
    fmt.gauge(out, name, mean, h.mean);
    fmt.gauge(out, name, "min", h.min);
    fmt.gauge(out, name, "stddev", h.stddev);
    fmt.gauge(out, name, "variance", h.variance);
    fmt.gauge(out, name, "p50", h.p50);
    fmt.gauge(out, name, "p75", h.p75);
    fmt.gauge(out, name, "p95", h.p95);
    fmt.gauge(out, name, "p99", h.p99);
    fmt.gauge(out, name, "p999", h.p999);
    fmt.gauge(out, name, "p9999", h.p9999);
}

/// count, m1, m5, m15, mean.
fn rates(fmt: &LineFormat, name: &str, m: &MeterSnapshot, mean: &str, out: &mut Vec<u8>) {
    fmt.gauge(out, name, "count", m.count);
    fmt.gauge(out, name, "m1", m.rate1);
    fmt.gauge(out, name, "m5", m.rate5);
    fmt.gauge(out, name, "m15", m.rate15);
    fmt.gauge(out, name, mean, m.rate_mean);
}

fn line_count(buf: &[u8]) -> usize {
    buf.iter().filter(|&&b| b == b'\n').count()
}
