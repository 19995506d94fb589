//! The flush loop: on every tick, snapshot the whole registry, encode it
//! and push it to the collector.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::encode::{encode_metric, LineFormat};
use super::transport::{Connection, LineSink, Network};
use crate::config::ExporterConfig;
use crate::error::Result;
use crate::metrics::MetricSource;

// ─── Single pass ─────────────────────────────────────────────────

/// What one registry pass pushed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub metrics: usize,
    pub lines: usize,
    pub bytes: usize,
}

/// Write one snapshot of every metric in `source` to `sink`, then flush once.
///
/// Each metric's lines go out in a single `write_lines` call. The first
/// failing write ends the pass: nothing after it is written and the sink is
/// not flushed. Every write and the final flush are bounded by `timeout`.
pub async fn flush_once<S, M>(
    sink: &mut S,
    source: &M,
    format: &LineFormat,
    timeout: Duration,
) -> io::Result<FlushStats>
where
    S: LineSink,
    M: MetricSource + ?Sized,
{
    let mut stats = FlushStats::default();
    let mut buf = Vec::with_capacity(1024);

    for (name, metric) in source.entries() {
        buf.clear();
        let lines = encode_metric(format, &name, &metric.snapshot(), &mut buf);
        if lines == 0 {
            continue;
        }
        bounded(timeout, sink.write_lines(&buf)).await?;
        stats.metrics += 1;
        stats.lines += lines;
        stats.bytes += buf.len();
    }

    bounded(timeout, sink.flush()).await?;
    Ok(stats)
}

async fn bounded(timeout: Duration, fut: impl Future<Output = io::Result<()>>) -> io::Result<()> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("collector did not accept data within {timeout:?}"),
        )),
    }
}

// ─── Exporter ────────────────────────────────────────────────────

enum State {
    Connected(Connection),
    /// The last tick failed; the next dial happens no earlier than `retry_at`.
    Disconnected { retry_at: Instant },
}

/// Periodic StatsD exporter over a [`MetricSource`].
///
/// A failed tick closes the connection and schedules a reconnect with
/// exponential backoff; the backoff resets after the next successful flush.
pub struct Exporter<M> {
    config: ExporterConfig,
    format: LineFormat,
    source: M,
    state: State,
    backoff: Duration,
}

impl<M: MetricSource> Exporter<M> {
    /// Validate `config` and dial the collector. Failing to connect here is
    /// fatal: the caller gets the error and no loop is started.
    pub async fn connect(config: ExporterConfig, source: M) -> Result<Self> {
        config.validate()?;
        let conn = Connection::dial(config.network, &config.addr, config.max_packet_bytes).await?;
        info!(
            network = config.network.as_str(),
            addr = %config.addr,
            "connected to statsd collector"
        );

        Ok(Self {
            format: LineFormat::from(&config),
            backoff: config.reconnect.initial(),
            config,
            source,
            state: State::Connected(conn),
        })
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected(_))
    }

    /// Tick until `cancel` fires. Ticks never overlap; a slow pass delays
    /// the next one instead of queueing it.
    pub async fn run(mut self, cancel: CancellationToken) {
        let period = self.config.flush_interval();
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        info!(interval_ms = self.config.flush_interval_ms, "statsd exporter running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                tick = ticks.next() => {
                    if tick.is_none() {
                        break;
                    }
                    self.tick().await;
                }
            }
        }

        self.shutdown().await;
        info!("statsd exporter stopped");
    }

    /// One tick: reconnect if due, then push a full snapshot.
    pub async fn tick(&mut self) {
        if let State::Disconnected { retry_at } = self.state {
            if Instant::now() < retry_at {
                debug!("statsd reconnect not due yet; skipping tick");
                return;
            }
            let dialed = Connection::dial(
                self.config.network,
                &self.config.addr,
                self.config.max_packet_bytes,
            )
            .await;
            match dialed {
                Ok(conn) => {
                    info!(addr = %self.config.addr, "reconnected to statsd collector");
                    self.state = State::Connected(conn);
                }
                Err(e) => {
                    warn!(error = %e, "statsd reconnect failed");
                    self.schedule_reconnect();
                    return;
                }
            }
        }

        let State::Connected(conn) = &mut self.state else {
            return;
        };

        let timeout = self.config.write_timeout();
        match flush_once(conn, &self.source, &self.format, timeout).await {
            Ok(stats) => {
                debug!(
                    metrics = stats.metrics,
                    lines = stats.lines,
                    bytes = stats.bytes,
                    "statsd flush complete"
                );
                self.backoff = self.config.reconnect.initial();
            }
            Err(e) => {
                warn!(
                    error = %e,
                    addr = %self.config.addr,
                    "statsd flush failed; closing connection"
                );
                if let Err(e) = bounded(timeout, conn.close()).await {
                    debug!(error = %e, "statsd close failed");
                }
                self.schedule_reconnect();
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        let wait = self.backoff;
        self.state = State::Disconnected {
            retry_at: Instant::now() + wait,
        };
        self.backoff = self.config.reconnect.next(wait);
        let retry_in_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        debug!(retry_in_ms, "statsd reconnect scheduled");
    }

    async fn shutdown(&mut self) {
        if let State::Connected(conn) = &mut self.state {
            if let Err(e) = bounded(self.config.write_timeout(), conn.close()).await {
                debug!(error = %e, "statsd close failed");
            }
        }
    }
}

// ─── Entry points ────────────────────────────────────────────────

/// Connect, then run the exporter on its own task.
///
/// Cancel the returned token to stop it; the handle resolves once the
/// connection is closed.
pub async fn spawn<M>(
    config: ExporterConfig,
    source: M,
) -> Result<(JoinHandle<()>, CancellationToken)>
where
    M: MetricSource + 'static,
{
    let exporter = Exporter::connect(config, source).await?;
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(exporter.run(cancel.clone()));
    Ok((handle, cancel))
}

/// Positional shorthand: export `source` every `flush_interval` until
/// `cancel` fires, with every other setting at its default.
pub async fn statsd<M: MetricSource>(
    source: M,
    flush_interval: Duration,
    prefix: &str,
    network: Network,
    addr: &str,
    rate: f32,
    cancel: CancellationToken,
) -> Result<()> {
    let config = ExporterConfig {
        network,
        addr: addr.to_owned(),
        flush_interval_ms: u64::try_from(flush_interval.as_millis()).unwrap_or(u64::MAX),
        prefix: prefix.to_owned(),
        rate,
        ..ExporterConfig::default()
    };
    Exporter::connect(config, source).await?.run(cancel).await;
    Ok(())
}
