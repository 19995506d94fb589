#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;

use statsd_exporter::config::ExporterConfig;
use statsd_exporter::metrics::{Counter, GaugeFloat, Registry, Timer};
use statsd_exporter::statsd::{self, Exporter, Network};
use statsd_exporter::ExporterError;

const WAIT: Duration = Duration::from_secs(5);

fn config(network: Network, addr: String, prefix: &str) -> ExporterConfig {
    let mut c = ExporterConfig::default();
    c.network = network;
    c.addr = addr;
    c.prefix = prefix.into();
    c.flush_interval_ms = 100;
    c.write_timeout_ms = 1000;
    c.reconnect.initial_backoff_ms = 100;
    c.reconnect.max_backoff_ms = 400;
    c
}

#[tokio::test]
async fn tcp_counter_reaches_collector() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let registry = Arc::new(Registry::new());
    let c = Arc::new(Counter::new());
    c.inc(42);
    registry.register("requests", c).unwrap();

    let (handle, cancel) = statsd::spawn(config(Network::Tcp, addr, "app"), registry)
        .await
        .unwrap();
    let (peer, _) = listener.accept().await.unwrap();
    let mut lines = BufReader::new(peer).lines();

    let first = tokio::time::timeout(WAIT, lines.next_line())
        .await
        .expect("a tick within the deadline")
        .unwrap();
    assert_eq!(first.as_deref(), Some("app.requests:42|c"));

    cancel.cancel();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn udp_gauge_without_prefix_uses_fallback() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = collector.local_addr().unwrap().to_string();

    let registry = Arc::new(Registry::new());
    let g = Arc::new(GaugeFloat::new());
    g.update(7.5);
    registry.register("db.pool", g).unwrap();

    let (handle, cancel) = statsd::spawn(config(Network::Udp, addr, ""), registry)
        .await
        .unwrap();

    let mut buf = vec![0u8; 65_536];
    let n = tokio::time::timeout(WAIT, collector.recv(&mut buf))
        .await
        .expect("a datagram within the deadline")
        .unwrap();
    assert_eq!(&buf[..n], b"statsd.db_pool:7.5|g\n");

    cancel.cancel();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn timer_sends_seventeen_lines_per_tick() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = collector.local_addr().unwrap().to_string();

    let registry = Arc::new(Registry::new());
    let t = Arc::new(Timer::new());
    t.update(Duration::from_millis(3));
    registry.register("rpc", t).unwrap();

    let (handle, cancel) = statsd::spawn(config(Network::Udp, addr, "svc"), registry)
        .await
        .unwrap();

    let mut buf = vec![0u8; 65_536];
    let n = tokio::time::timeout(WAIT, collector.recv(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let text = std::str::from_utf8(&buf[..n]).unwrap();
    assert_eq!(text.lines().count(), 17);
    assert!(text.lines().all(|l| l.starts_with("svc.rpc.") && l.ends_with("|g")));

    cancel.cancel();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn reconnects_after_peer_goes_away() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let registry = Arc::new(Registry::new());
    registry.register("requests", Arc::new(Counter::new())).unwrap();

    let (handle, cancel) = statsd::spawn(config(Network::Tcp, addr, "app"), registry)
        .await
        .unwrap();

    // Drop the first connection; writes start failing and the exporter redials.
    let (first, _) = listener.accept().await.unwrap();
    drop(first);

    let (second, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("exporter should reconnect")
        .unwrap();
    let mut lines = BufReader::new(second).lines();
    let line = tokio::time::timeout(WAIT, lines.next_line())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line.as_deref(), Some("app.requests:0|c"));

    cancel.cancel();
    tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn unreachable_collector_is_fatal_at_construction() {
    let addr = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().to_string()
    };
    let res = Exporter::connect(config(Network::Tcp, addr, "app"), Registry::new()).await;
    assert!(matches!(res, Err(ExporterError::Connect { .. })));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_dialing() {
    let mut c = config(Network::Udp, "127.0.0.1:8125".into(), "app");
    c.rate = 2.0;
    let res = Exporter::connect(c, Registry::new()).await;
    assert!(matches!(res, Err(ExporterError::Config(_))));
}

#[tokio::test]
async fn positional_entry_point_stops_on_cancel() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = collector.local_addr().unwrap().to_string();
    let registry = Arc::new(Registry::new());
    let c = Arc::new(Counter::new());
    c.inc(1);
    registry.register("hits", c).unwrap();

    let cancel = CancellationToken::new();
    let exporter = statsd::statsd(
        registry,
        Duration::from_millis(100),
        "app",
        Network::Udp,
        &addr,
        0.5,
        cancel.clone(),
    );
    let collect = async {
        let mut buf = vec![0u8; 1024];
        let n = tokio::time::timeout(WAIT, collector.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        cancel.cancel();
        buf.truncate(n);
        buf
    };

    let (res, got) = tokio::time::timeout(WAIT, async { tokio::join!(exporter, collect) })
        .await
        .unwrap();
    res.unwrap();
    assert_eq!(got, b"app.hits:1|c|@0.500000\n");
}
