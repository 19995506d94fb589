//! StatsD line encoding and the periodic flush loop.

pub mod encode;
pub mod exporter;
pub mod line;
pub mod transport;

use serde::Deserialize;

pub use encode::{encode_metric, LineFormat};
pub use exporter::{flush_once, spawn, statsd, Exporter};
pub use line::{encode_line, Value};
pub use transport::{Connection, LineSink, Network};

/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Type suffix for counters.
pub const COUNTER: &str = "|c";
/// Type suffix for gauges and every derived statistic.
pub const GAUGE: &str = "|g";

/// How the two `mean` fields of a timer are named on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMeanNaming {
    /// `mean` twice: once for the distribution, once for the rate.
    #[default]
    Compat,
    /// `mean_value` and `mean_rate`.
    Distinct,
}
