use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use statsd_exporter::metrics::{Counter, Gauge, GaugeFloat, Healthcheck, Histogram, Meter, Timer};
use statsd_exporter::metrics::Registry;
use statsd_exporter::Result;

// ─── Handles ─────────────────────────────────────────────────────

/// One metric of every kind, registered under fixed demo names.
pub struct DemoMetrics {
    pub counter: Arc<Counter>,
    pub gauge: Arc<Gauge>,
    pub gauge_float: Arc<GaugeFloat>,
    pub histogram: Arc<Histogram>,
    pub meter: Arc<Meter>,
    pub timer: Arc<Timer>,
    pub health: Arc<Healthcheck>,
}

impl DemoMetrics {
    pub fn register(registry: &Registry) -> Result<Self> {
        let m = Self {
            counter: Arc::new(Counter::new()),
            gauge: Arc::new(Gauge::new()),
            gauge_float: Arc::new(GaugeFloat::new()),
            histogram: Arc::new(Histogram::new()),
            meter: Arc::new(Meter::new()),
            timer: Arc::new(Timer::new()),
            health: Arc::new(Healthcheck::new(|h| {
                if rand::thread_rng().gen_bool(0.5) {
                    h.healthy();
                } else {
                    h.unhealthy("baz");
                }
            })),
        };

        registry.register("demo.counter", m.counter.clone())?;
        registry.register("demo.gauge", m.gauge.clone())?;
        registry.register("demo.gauge_float", m.gauge_float.clone())?;
        registry.register("demo.histogram", m.histogram.clone())?;
        registry.register("demo.meter", m.meter.clone())?;
        registry.register("demo.timer", m.timer.clone())?;
        registry.register("demo.healthcheck", m.health.clone())?;
        Ok(m)
    }
}

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `workers` pairs of updater tasks against every demo metric.
/// All of them stop when `cancel` fires.
pub fn run(
    metrics: Arc<DemoMetrics>,
    workers: u32,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(workers as usize * 2 + 1);

    for worker_id in 0..workers {
        // Mirrors a "down" and an "up" producer per worker.
        for (slot, low, high, period_ms) in [(0u64, 19, 47, 300u64), (1, 47, 19, 400)] {
            let metrics = metrics.clone();
            let cancel = cancel.clone();
            let seed = 1000 + u64::from(worker_id) * 2 + slot;
            handles.push(tokio::spawn(async move {
                worker(seed, metrics, low, high, Duration::from_millis(period_ms), cancel).await;
            }));
        }
    }

    // Health probe, checked once per second.
    let cancel_health = cancel.clone();
    handles.push(tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = cancel_health.cancelled() => break,
                _ = tick.tick() => metrics.health.check(),
            }
        }
    }));

    handles
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    seed: u64,
    metrics: Arc<DemoMetrics>,
    a: i64,
    b: i64,
    period: Duration,
    cancel: CancellationToken,
) {
    // Each worker gets its own deterministic RNG.
    let mut rng = StdRng::seed_from_u64(seed);

    loop {
        let t0 = Instant::now();

        metrics.counter.inc(b);
        metrics.counter.dec(a);
        metrics.gauge.update(a);
        metrics.gauge_float.update(a as f64 + rng.gen_range(0.0..1.0));
        metrics.histogram.update(rng.gen_range(a.min(b)..=a.max(b)) as u64);
        metrics.meter.mark(a);

        // Jitter keeps the producers from lining up on the same instant.
        let jitter = Duration::from_millis(rng.gen_range(0..50));
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(period + jitter) => {}
        }

        metrics.timer.update_since(t0);
    }
}
