//! Access-log line parsing.
//!
//! # Data Flow
//! ```text
//! syslog content ("time:0.12 status=200 hostname=srv1")
//!     → line.rs (tokenize, classify metric/label tokens)
//!     → ParsedLine { metrics, labels }
//!     → handed to the observation pipeline
//! ```
//!
//! # Design Decisions
//! - Pure function, no shared state: safe to call from any task
//! - One malformed token rejects the whole line (label positions must
//!   stay stable for every metric sharing an identity)
//! - Label order is the order of appearance in the line

pub mod line;

pub use line::{parse, LabelSet, ParseError, ParsedLine, ParsedMetric, HOSTNAME_LABEL};
