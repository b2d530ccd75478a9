//! RFC3164 (BSD syslog) message decoding.
//!
//! ```text
//! <190>Oct 19 10:00:00 srv1 nginx: time:0.1 status=200 hostname=srv1
//! └PRI┘└── TIMESTAMP ──┘└HOST┘└TAG┘ └─────────── CONTENT ───────────┘
//! ```
//!
//! Nginx may be configured with `nohostname`, in which case the word after
//! the timestamp is already the tag.

use thiserror::Error;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const TIMESTAMP_LEN: usize = 15;
const MAX_TAG_LEN: usize = 32;

/// Error type for RFC3164 decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rfc3164Error {
    #[error("missing priority")]
    MissingPriority,
    #[error("invalid priority: {0:?}")]
    InvalidPriority(String),
}

/// A decoded syslog message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyslogMessage {
    pub facility: u8,
    pub severity: u8,
    /// Raw `Mmm dd hh:mm:ss` header timestamp, if present.
    pub timestamp: Option<String>,
    pub hostname: String,
    pub tag: String,
    pub content: String,
}

impl SyslogMessage {
    /// Message carrying only undecodable content.
    ///
    /// Tag and hostname are left empty so the pipeline rejects it.
    pub fn undecodable(raw: &str) -> Self {
        Self {
            content: raw.to_string(),
            ..Self::default()
        }
    }
}

fn parse_priority(input: &str) -> Result<(u8, &str), Rfc3164Error> {
    let rest = input.strip_prefix('<').ok_or(Rfc3164Error::MissingPriority)?;
    let end = rest.find('>').ok_or(Rfc3164Error::MissingPriority)?;
    let digits = &rest[..end];
    let pri = digits
        .parse::<u8>()
        .ok()
        .filter(|p| !digits.is_empty() && digits.len() <= 3 && *p <= 191)
        .ok_or_else(|| Rfc3164Error::InvalidPriority(digits.to_string()))?;
    Ok((pri, &rest[end + 1..]))
}

/// Recognise `Mmm dd hh:mm:ss` (day may be space padded).
fn is_timestamp(candidate: &str) -> bool {
    let b = candidate.as_bytes();
    if b.len() != TIMESTAMP_LEN || !candidate.is_char_boundary(3) {
        return false;
    }
    let digit = |i: usize| b[i].is_ascii_digit();
    MONTHS.contains(&&candidate[..3])
        && b[3] == b' '
        && (b[4] == b' ' || digit(4))
        && digit(5)
        && b[6] == b' '
        && digit(7)
        && digit(8)
        && b[9] == b':'
        && digit(10)
        && digit(11)
        && b[12] == b':'
        && digit(13)
        && digit(14)
}

/// Looks like `tag:` or `tag[pid]:` rather than a hostname.
fn is_tag_word(word: &str) -> bool {
    word.ends_with(':') || word.contains('[')
}

/// Split `tag[pid]: content` into tag and content.
///
/// Without a terminating colon within the tag length limit the whole input
/// is content and the tag is empty.
fn split_tag(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .take(MAX_TAG_LEN + 1)
        .find(|&(_, c)| matches!(c, ':' | '[' | ' '))
        .map(|(i, _)| i);

    let Some(end) = end else {
        return ("", input);
    };
    let tag = &input[..end];
    let mut rest = &input[end..];

    if let Some(after_pid) = rest.strip_prefix('[') {
        match after_pid.find(']') {
            Some(close) => rest = &after_pid[close + 1..],
            None => return ("", input),
        }
    }

    match rest.strip_prefix(':') {
        Some(content) if !tag.is_empty() => (tag, content.strip_prefix(' ').unwrap_or(content)),
        _ => ("", input),
    }
}

/// Decode one RFC3164 message.
pub fn parse(input: &str) -> Result<SyslogMessage, Rfc3164Error> {
    let (pri, mut rest) = parse_priority(input)?;

    let mut timestamp = None;
    if let Some(candidate) = rest.get(..TIMESTAMP_LEN) {
        if is_timestamp(candidate) {
            timestamp = Some(candidate.to_string());
            rest = rest[TIMESTAMP_LEN..].trim_start_matches(' ');
        }
    }

    let mut hostname = "";
    if let Some((word, after)) = rest.split_once(' ') {
        if !is_tag_word(word) {
            hostname = word;
            rest = after;
        }
    }

    let (tag, content) = split_tag(rest);

    Ok(SyslogMessage {
        facility: pri / 8,
        severity: pri % 8,
        timestamp,
        hostname: hostname.to_string(),
        tag: tag.to_string(),
        content: content.to_string(),
    })
}
