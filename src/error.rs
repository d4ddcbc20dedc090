//! Error types used across the crate.

use thiserror::Error;

/// Failure to decode a payload received from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("empty payload")]
    Empty,
    #[error("unknown message tag `{0}`")]
    UnknownTag(String),
    #[error("`{tag}` expects {expected} field(s), got {got}")]
    FieldCount {
        tag: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("field `{field}` is not a non-negative integer: `{value}`")]
    InvalidField { field: &'static str, value: String },
}

/// Invalid process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("the peer address list is empty")]
    NoPeers,
    #[error("own index {index} is out of range for {peers} peer(s)")]
    IndexOutOfRange { index: usize, peers: usize },
    #[error("address `{0}` appears more than once in the peer list")]
    DuplicateAddress(String),
    #[error("request rate must be a finite non-negative number, got {0}")]
    InvalidRate(String),
}

/// Local intent that is not valid in the coordinator's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MutexError {
    #[error("entry already requested or held")]
    AlreadyRequested,
    #[error("release called outside the critical section")]
    NotInSection,
    #[error("the logical clock cannot advance any further")]
    ClockExhausted,
}

/// Failure talking to a running peer loop from the application side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("the peer loop has stopped")]
    Stopped,
    #[error(transparent)]
    Rejected(#[from] MutexError),
}
