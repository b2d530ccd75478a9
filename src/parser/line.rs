//! Tokenizer for the `key:value` / `key=value` log format.
//!
//! Nginx is expected to emit lines such as:
//!
//! ```text
//! time:$request_time upstream_time:$upstream_response_time status=$status host="$host" hostname=$hostname
//! ```
//!
//! Every `key:value` token is a metric observation, every `key=value` token
//! is a label shared by all metrics of the line.

use thiserror::Error;

/// Label that every non-empty line must carry.
pub const HOSTNAME_LABEL: &str = "hostname";

/// Error type for line parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Token has no delimiter, both delimiters, or an empty key.
    #[error("malformed token: {0:?}")]
    MalformedToken(String),
    /// Metric value is not a finite number.
    #[error("invalid value for metric {0:?}")]
    InvalidMetricValue(String),
    /// The same label name appears twice.
    #[error("duplicate label {0:?}")]
    DuplicateLabel(String),
    /// No non-empty `hostname` label.
    #[error("missing mandatory \"hostname\" label")]
    MissingHostname,
}

/// A single numeric observation extracted from a line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMetric {
    pub name: String,
    pub value: f64,
}

/// Ordered label names and values, aligned by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
    values: Vec<String>,
}

impl LabelSet {
    /// Append a label. Fails if the name is already present.
    pub fn push(&mut self, name: String, value: String) -> Result<(), ParseError> {
        if self.names.contains(&name) {
            return Err(ParseError::DuplicateLabel(name));
        }
        self.names.push(name);
        self.values.push(value);
        Ok(())
    }

    /// Look up a label value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i].as_str())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(name, value)` pairs in line order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Result of parsing one log line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    /// Metrics in the order their tokens appear.
    pub metrics: Vec<ParsedMetric>,
    /// Labels shared by every metric of the line.
    pub labels: LabelSet,
}

enum Token<'a> {
    Metric(&'a str, &'a str),
    Label(&'a str, &'a str),
}

fn classify(token: &str) -> Result<Token<'_>, ParseError> {
    let malformed = || ParseError::MalformedToken(token.to_string());

    match (token.find(':'), token.find('=')) {
        (Some(_), Some(_)) | (None, None) => Err(malformed()),
        (Some(i), None) if i > 0 => Ok(Token::Metric(&token[..i], &token[i + 1..])),
        (None, Some(i)) if i > 0 => Ok(Token::Label(&token[..i], &token[i + 1..])),
        _ => Err(malformed()),
    }
}

/// Strip one pair of surrounding double quotes, if present.
fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_value(key: &str, raw: &str) -> Result<f64, ParseError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidMetricValue(key.to_string()))
}

/// Parse one access-log line into metrics and labels.
///
/// Blank input yields an empty [`ParsedLine`]. Any other input must carry a
/// non-empty `hostname` label.
pub fn parse(line: &str) -> Result<ParsedLine, ParseError> {
    let mut parsed = ParsedLine::default();
    let mut saw_token = false;

    for token in line.split_whitespace() {
        saw_token = true;
        match classify(token)? {
            Token::Metric(key, raw) => {
                let value = parse_value(key, raw)?;
                parsed.metrics.push(ParsedMetric {
                    name: key.to_string(),
                    value,
                });
            }
            Token::Label(key, raw) => {
                parsed
                    .labels
                    .push(key.to_string(), unquote(raw).to_string())?;
            }
        }
    }

    if saw_token && parsed.labels.get(HOSTNAME_LABEL).map_or(true, str::is_empty) {
        return Err(ParseError::MissingHostname);
    }

    Ok(parsed)
}
