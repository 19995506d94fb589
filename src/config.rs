//! Exporter config loader (strict YAML parsing + range validation).

use std::fs;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ExporterError, Result};
use crate::statsd::{Network, TimerMeanNaming, MAX_UDP_PAYLOAD};

// ─── Loading ─────────────────────────────────────────────────────

pub fn load_from_file(path: &str) -> Result<Settings> {
    let s = fs::read_to_string(path).map_err(|source| ExporterError::ReadConfig {
        path: path.to_owned(),
        source,
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<Settings> {
    let cfg: Settings = serde_yaml::from_str(s)
        .map_err(|e| ExporterError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

// ─── Top level ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ExporterError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.exporter.validate()?;
        self.demo.validate()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ExporterConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

// ─── Exporter section ────────────────────────────────────────────

/// Everything the flush loop needs, fixed at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    #[serde(default)]
    pub network: Network,

    /// Collector address, e.g. `127.0.0.1:8125`.
    #[serde(default = "default_addr")]
    pub addr: String,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Prepended as `<prefix>.`; empty means the `statsd` fallback.
    #[serde(default)]
    pub prefix: String,

    /// Sample rate; only values strictly between 0 and 1 reach the wire.
    #[serde(default)]
    pub rate: f32,

    #[serde(default)]
    pub timer_mean_naming: TimerMeanNaming,

    /// Per-datagram cap for UDP. Ignored for TCP.
    #[serde(default = "default_max_packet_bytes")]
    pub max_packet_bytes: usize,

    /// Upper bound on a single write or flush against the collector.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            addr: default_addr(),
            flush_interval_ms: default_flush_interval_ms(),
            prefix: String::new(),
            rate: 0.0,
            timer_mean_naming: TimerMeanNaming::default(),
            max_packet_bytes: default_max_packet_bytes(),
            write_timeout_ms: default_write_timeout_ms(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.addr.trim().is_empty() {
            return Err(ExporterError::Config("exporter.addr must not be empty".into()));
        }
        if !(100..=3_600_000).contains(&self.flush_interval_ms) {
            return Err(ExporterError::Config(
                "exporter.flush_interval_ms must be between 100 and 3600000".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.rate) {
            return Err(ExporterError::Config(
                "exporter.rate must be between 0 and 1".into(),
            ));
        }
        if !(512..=MAX_UDP_PAYLOAD).contains(&self.max_packet_bytes) {
            return Err(ExporterError::Config(format!(
                "exporter.max_packet_bytes must be between 512 and {MAX_UDP_PAYLOAD}"
            )));
        }
        if self.write_timeout_ms == 0 {
            return Err(ExporterError::Config(
                "exporter.write_timeout_ms must be greater than 0".into(),
            ));
        }
        self.reconnect.validate()
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

fn default_addr() -> String {
    "127.0.0.1:8125".into()
}
fn default_flush_interval_ms() -> u64 {
    10_000
}
fn default_max_packet_bytes() -> usize {
    MAX_UDP_PAYLOAD
}
fn default_write_timeout_ms() -> u64 {
    5_000
}

/// Exponential backoff between reconnect attempts after a failed tick.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectPolicy {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl ReconnectPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.initial_backoff_ms == 0 {
            return Err(ExporterError::Config(
                "exporter.reconnect.initial_backoff_ms must be greater than 0".into(),
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ExporterError::Config(
                "exporter.reconnect.max_backoff_ms must be >= initial_backoff_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Double `current`, capped at the configured maximum.
    pub fn next(&self, current: Duration) -> Duration {
        current
            .saturating_mul(2)
            .min(Duration::from_millis(self.max_backoff_ms))
    }
}

fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    30_000
}

// ─── Demo binary section ─────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    /// Where the JSON snapshot endpoint listens.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Concurrent updater tasks per metric kind.
    #[serde(default = "default_workers")]
    pub workers: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: default_workers(),
        }
    }
}

impl DemoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 || self.workers > 500 {
            return Err(ExporterError::Config(
                "demo.workers must be between 1 and 500".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}
fn default_workers() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = load_from_str("version: 1\n").expect("must parse");
        assert_eq!(cfg.exporter.addr, "127.0.0.1:8125");
        assert_eq!(cfg.exporter.network, Network::Udp);
        assert_eq!(cfg.exporter.flush_interval(), Duration::from_secs(10));
        assert_eq!(cfg.exporter.rate, 0.0);
        assert_eq!(cfg.exporter.timer_mean_naming, TimerMeanNaming::Compat);
        assert_eq!(cfg.demo.workers, 10);
    }

    #[test]
    fn full_exporter_section() {
        let yaml = r#"
version: 1
exporter:
  network: tcp
  addr: "10.0.0.5:8125"
  flush_interval_ms: 2000
  prefix: "app"
  rate: 0.5
  timer_mean_naming: distinct
  max_packet_bytes: 1432
  write_timeout_ms: 250
  reconnect:
    initial_backoff_ms: 100
    max_backoff_ms: 800
"#;
        let cfg = load_from_str(yaml).expect("must parse");
        let e = &cfg.exporter;
        assert_eq!(e.network, Network::Tcp);
        assert_eq!(e.prefix, "app");
        assert_eq!(e.rate, 0.5);
        assert_eq!(e.timer_mean_naming, TimerMeanNaming::Distinct);
        assert_eq!(e.max_packet_bytes, 1432);
        assert_eq!(e.write_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let bad = "version: 1\nexporter:\n  adr: \"x:1\"\n";
        let err = load_from_str(bad).expect_err("must fail");
        assert!(matches!(err, ExporterError::Config(_)));
    }

    #[test]
    fn wrong_version_is_rejected() {
        assert!(load_from_str("version: 2\n").is_err());
    }

    #[test]
    fn rate_out_of_range_is_rejected() {
        assert!(load_from_str("version: 1\nexporter:\n  rate: 1.5\n").is_err());
        assert!(load_from_str("version: 1\nexporter:\n  rate: -0.1\n").is_err());
    }

    #[test]
    fn backoff_doubles_up_to_max() {
        let p = ReconnectPolicy {
            initial_backoff_ms: 100,
            max_backoff_ms: 300,
        };
        let d = p.initial();
        let d = p.next(d);
        assert_eq!(d, Duration::from_millis(200));
        assert_eq!(p.next(d), Duration::from_millis(300));
    }

    #[test]
    fn inverted_backoff_is_rejected() {
        let bad = r#"
version: 1
exporter:
  reconnect:
    initial_backoff_ms: 1000
    max_backoff_ms: 10
"#;
        assert!(load_from_str(bad).is_err());
    }
}
