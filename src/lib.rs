//! Periodic StatsD export of in-process metrics.
//!
//! Producers update [`metrics::Counter`]s, [`metrics::Histogram`]s and the
//! rest through `Arc` handles registered in a [`metrics::Registry`]. An
//! [`statsd::Exporter`] snapshots the registry on a fixed interval and
//! writes one newline-terminated StatsD line per field to a TCP or UDP
//! collector.

pub mod config;
pub mod error;
pub mod metrics;
pub mod statsd;

pub use error::{ExporterError, Result};
