//! Syslog ingress subsystem.
//!
//! # Data Flow
//! ```text
//! Nginx access_log syslog:server=...
//!     → listener.rs (UDP or unix datagram socket, one message per datagram)
//!     → rfc3164.rs (PRI, timestamp, hostname, tag, content)
//!     → bounded mpsc queue
//!     → observation pipeline worker
//! ```
//!
//! # Design Decisions
//! - Undecodable datagrams are forwarded with an empty tag so they are
//!   counted as received and rejected downstream
//! - A full queue applies backpressure to the receive loop; the kernel
//!   socket buffer absorbs bursts

pub mod listener;
pub mod rfc3164;

pub use listener::{ListenerError, SyslogAddress, SyslogListener};
pub use rfc3164::SyslogMessage;
