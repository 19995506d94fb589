use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use serde::Deserialize;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, UdpSocket};
use tracing::warn;

use crate::error::{ExporterError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    #[default]
    Udp,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Udp => "udp",
        }
    }
}

/// Where the flush routine writes encoded lines.
///
/// `write_lines` receives whole lines only. Nothing is guaranteed to reach
/// the collector until `flush` returns.
pub trait LineSink: Send {
    fn write_lines(&mut self, buf: &[u8]) -> impl Future<Output = io::Result<()>> + Send;
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// A live connection to the collector.
pub enum Connection {
    Tcp(BufWriter<TcpStream>),
    Udp(PacketWriter),
}

impl Connection {
    pub async fn dial(network: Network, addr: &str, max_packet_bytes: usize) -> Result<Self> {
        let connect_err = |source| ExporterError::Connect {
            network: network.as_str(),
            addr: addr.to_owned(),
            source,
        };

        match network {
            Network::Tcp => {
                let stream = TcpStream::connect(addr).await.map_err(connect_err)?;
                stream.set_nodelay(true).map_err(connect_err)?;
                Ok(Connection::Tcp(BufWriter::new(stream)))
            }
            Network::Udp => {
                let target = resolve(addr).await.map_err(connect_err)?;
                let local: SocketAddr = if target.is_ipv4() {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(local).await.map_err(connect_err)?;
                socket.connect(target).await.map_err(connect_err)?;
                Ok(Connection::Udp(PacketWriter::new(socket, max_packet_bytes)))
            }
        }
    }
}

async fn resolve(addr: &str) -> io::Result<SocketAddr> {
    tokio::net::lookup_host(addr).await?.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing")
    })
}

impl LineSink for Connection {
    async fn write_lines(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Connection::Tcp(w) => w.write_all(buf).await,
            Connection::Udp(p) => p.write_lines(buf).await,
        }
    }

    async fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(w) => w.flush().await,
            Connection::Udp(p) => p.flush().await,
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(w) => w.shutdown().await,
            Connection::Udp(p) => {
                p.packet.clear();
                Ok(())
            }
        }
    }
}

// ─── UDP packet assembly ─────────────────────────────────────────

/// Packs lines into datagrams of at most `max` bytes, never splitting a
/// line. A line that alone exceeds `max` can never be sent and is dropped.
pub struct PacketWriter {
    socket: UdpSocket,
    packet: Vec<u8>,
    max: usize,
}

impl PacketWriter {
    pub fn new(socket: UdpSocket, max: usize) -> Self {
        Self {
            socket,
            packet: Vec::with_capacity(max),
            max,
        }
    }

    async fn write_lines(&mut self, buf: &[u8]) -> io::Result<()> {
        for line in buf.split_inclusive(|&b| b == b'\n') {
            if line.len() > self.max {
                warn!(
                    bytes = line.len(),
                    max = self.max,
                    "statsd line larger than a datagram; dropped"
                );
                continue;
            }
            if !self.packet.is_empty() && self.packet.len() + line.len() > self.max {
                self.send_packet().await?;
            }
            self.packet.extend_from_slice(line);
        }
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        if self.packet.is_empty() {
            return Ok(());
        }
        self.send_packet().await
    }

    async fn send_packet(&mut self) -> io::Result<()> {
        let res = self.socket.send(&self.packet).await;
        // A failed datagram is gone either way; don't resend it on the next flush.
        self.packet.clear();
        res.map(|_| ())
    }
}
