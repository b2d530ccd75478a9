//! Datagram listener for UDP and Unix sockets.
//!
//! # Responsibilities
//! - Bind the configured UDP address or Unix datagram path
//! - Decode each datagram as one RFC3164 message
//! - Push decoded messages onto the pipeline queue
//! - Stop once shutdown fires

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::{UdpSocket, UnixDatagram};
use tokio::sync::mpsc;

use super::rfc3164::{self, SyslogMessage};
use crate::lifecycle::ShutdownSignal;

/// Largest datagram accepted; longer ones are truncated by the kernel.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Where the syslog listener binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyslogAddress {
    Udp(SocketAddr),
    Unix(PathBuf),
}

impl fmt::Display for SyslogAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyslogAddress::Udp(addr) => write!(f, "udp://{addr}"),
            SyslogAddress::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind syslog listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to receive a datagram.
    #[error("failed to receive syslog datagram: {0}")]
    Receive(#[source] std::io::Error),
}

enum Socket {
    Udp(UdpSocket),
    Unix { socket: UnixDatagram, path: PathBuf },
}

/// A bound syslog socket.
pub struct SyslogListener {
    socket: Socket,
}

impl SyslogListener {
    /// Bind to the configured address.
    ///
    /// A stale Unix socket file left by a previous run is removed first.
    pub async fn bind(address: &SyslogAddress) -> Result<Self, ListenerError> {
        let bind_err = |source| ListenerError::Bind {
            address: address.to_string(),
            source,
        };

        let socket = match address {
            SyslogAddress::Udp(addr) => Socket::Udp(UdpSocket::bind(addr).await.map_err(bind_err)?),
            SyslogAddress::Unix(path) => {
                if path.exists() {
                    std::fs::remove_file(path).map_err(bind_err)?;
                }
                Socket::Unix {
                    socket: UnixDatagram::bind(path).map_err(bind_err)?,
                    path: path.clone(),
                }
            }
        };

        tracing::info!(address = %address, "Syslog listener bound");
        Ok(Self { socket })
    }

    /// Local UDP address, if bound to one.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            Socket::Udp(socket) => socket.local_addr().ok(),
            Socket::Unix { .. } => None,
        }
    }

    async fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &self.socket {
            Socket::Udp(socket) => socket.recv_from(buf).await.map(|(n, _)| n),
            Socket::Unix { socket, .. } => socket.recv_from(buf).await.map(|(n, _)| n),
        }
    }

    /// Receive datagrams until shutdown or until the queue is closed.
    pub async fn run(self, tx: mpsc::Sender<SyslogMessage>, mut shutdown: ShutdownSignal) {
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            let received = tokio::select! {
                res = self.recv(&mut buf) => res,
                _ = shutdown.recv() => {
                    tracing::info!("Syslog listener received shutdown signal");
                    break;
                }
            };

            let len = match received {
                Ok(len) => len,
                Err(e) => {
                    tracing::warn!(error = %ListenerError::Receive(e), "Dropping datagram");
                    continue;
                }
            };

            let message = decode(&buf[..len]);
            if tx.send(message).await.is_err() {
                tracing::info!("Message queue closed, stopping syslog listener");
                break;
            }
        }
    }
}

impl Drop for SyslogListener {
    fn drop(&mut self) {
        if let Socket::Unix { path, .. } = &self.socket {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Decode one datagram into a message, keeping undecodable payloads.
pub fn decode(datagram: &[u8]) -> SyslogMessage {
    let text = String::from_utf8_lossy(datagram);
    let text = text.trim_end_matches(['\n', '\r', '\0']);

    match rfc3164::parse(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable syslog datagram");
            SyslogMessage::undecodable(text)
        }
    }
}
