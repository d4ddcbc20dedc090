//! Module that contains all the different message types sent in the network.

use crate::error::WireError;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt, str::FromStr};

const REQUEST_ENTRY_TAG: &str = "reqEntry";
const REPLY_OK_TAG: &str = "respOk";

/// Enum that represents the protocol messages exchanged between coordinators.
///
/// On the wire a message is a single comma separated line:
/// `reqEntry,<index>,<timestamp>` or `respOk,<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// A process asks every other process for permission to enter.
    RequestEntry { index: usize, timestamp: u64 },
    /// A process grants permission. The index is `None` only when the peer sent the
    /// bare legacy `respOk` form, in which case the sender must be recovered from the
    /// address the message arrived from.
    ReplyOk { index: Option<usize> },
}

/// Struct that represents the first line sent on every connection so the receiver knows which
/// configured endpoint is talking to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub address: String,
}

impl Message {
    pub fn request_entry(index: usize, timestamp: u64) -> Self {
        Self::RequestEntry { index, timestamp }
    }

    pub fn reply_ok(index: usize) -> Self {
        Self::ReplyOk { index: Some(index) }
    }

    /// Function that returns the message in its line format.
    pub fn to_wire_string(&self) -> String {
        match self {
            Self::RequestEntry { index, timestamp } => {
                format!("{REQUEST_ENTRY_TAG},{index},{timestamp}")
            }
            Self::ReplyOk { index: Some(index) } => format!("{REPLY_OK_TAG},{index}"),
            Self::ReplyOk { index: None } => REPLY_OK_TAG.to_string(),
        }
    }

    /// Function that parses a message from its line format.
    pub fn from_wire_string(line: &str) -> Result<Self, WireError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(WireError::Empty);
        }

        let mut fields = line.split(',').map(str::trim);
        let tag = fields.next().unwrap_or_default();
        let rest: Vec<&str> = fields.collect();

        match tag {
            REQUEST_ENTRY_TAG => match rest.as_slice() {
                [index, timestamp] => Ok(Self::RequestEntry {
                    index: parse_field("index", index)?,
                    timestamp: parse_timestamp(timestamp)?,
                }),
                _ => Err(WireError::FieldCount {
                    tag: REQUEST_ENTRY_TAG,
                    expected: 2,
                    got: rest.len(),
                }),
            },
            REPLY_OK_TAG => match rest.as_slice() {
                [] => Ok(Self::ReplyOk { index: None }),
                [index] => Ok(Self::ReplyOk {
                    index: Some(parse_field("index", index)?),
                }),
                _ => Err(WireError::FieldCount {
                    tag: REPLY_OK_TAG,
                    expected: 1,
                    got: rest.len(),
                }),
            },
            other => Err(WireError::UnknownTag(other.to_string())),
        }
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, WireError> {
    value.parse().map_err(|_| WireError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// A receiver must be able to move its clock past the timestamp, so the largest value is refused.
fn parse_timestamp(value: &str) -> Result<u64, WireError> {
    match parse_field("timestamp", value)? {
        u64::MAX => Err(WireError::InvalidField {
            field: "timestamp",
            value: value.to_string(),
        }),
        timestamp => Ok(timestamp),
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

impl FromStr for Message {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire_string(s)
    }
}

impl Handshake {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Function that returns the handshake as a JSON formatted `String`.
    pub fn to_json_string(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::to_string(self)?)
    }

    /// Function that parses the handshake from a JSON formatted `String`.
    pub fn from_json_string(line: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::from_str::<Self>(line)?)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
