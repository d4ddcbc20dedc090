//! Process configuration: who the peers are and which one we are.

use crate::error::ConfigError;
use clap::Parser;
use std::{collections::HashSet, time::Duration};

pub const DEFAULT_DIAL_RETRY: Duration = Duration::from_millis(500);

/// Configuration shared, in the same order, by every process of the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listen addresses of all processes, indexed by process index.
    pub peers: Vec<String>,
    /// Index of this process in `peers`.
    pub index: usize,
    pub debug: bool,
    /// Delay between attempts to dial a peer that is not reachable yet.
    pub dial_retry: Duration,
}

impl Config {
    pub fn new(peers: Vec<String>, index: usize) -> Self {
        Self {
            peers,
            index,
            debug: false,
            dial_retry: DEFAULT_DIAL_RETRY,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_dial_retry(mut self, dial_retry: Duration) -> Self {
        self.dial_retry = dial_retry;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peers.is_empty() {
            return Err(ConfigError::NoPeers);
        }
        if self.index >= self.peers.len() {
            return Err(ConfigError::IndexOutOfRange {
                index: self.index,
                peers: self.peers.len(),
            });
        }

        let mut seen = HashSet::new();
        for address in &self.peers {
            if !seen.insert(address.as_str()) {
                return Err(ConfigError::DuplicateAddress(address.clone()));
            }
        }
        Ok(())
    }

    pub fn own_address(&self) -> &str {
        &self.peers[self.index]
    }

    /// Index of the process listening on exactly `address`.
    pub fn index_of(&self, address: &str) -> Option<usize> {
        self.peers.iter().position(|peer| peer == address)
    }
}

/// Command line of the demo binary.
#[derive(Debug, Parser)]
#[command(
    name = "ricart-agrawala",
    about = "Take turns in a critical section shared by N processes",
    version
)]
pub struct Args {
    /// Index of this process in the address list
    pub index: usize,

    /// Listen address of every process, in the same order on all of them
    #[arg(required = true, num_args = 1..)]
    pub addresses: Vec<String>,

    /// Print protocol traces
    #[arg(short, long)]
    pub debug: bool,

    /// Critical section entries to perform before exiting (0 runs forever)
    #[arg(short, long, default_value_t = 10)]
    pub rounds: u64,

    /// Mean entry requests per second
    #[arg(long, default_value_t = 1.0)]
    pub rate: f64,

    /// Time spent inside the critical section, in milliseconds
    #[arg(long, default_value_t = 200)]
    pub hold_ms: u64,

    /// Seed of the request timing generator (defaults to the process index)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Milliseconds between attempts to dial an unreachable peer
    #[arg(long, default_value_t = 500)]
    pub dial_retry_ms: u64,
}

impl Args {
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        if !self.rate.is_finite() || self.rate < 0. {
            return Err(ConfigError::InvalidRate(self.rate.to_string()));
        }

        let config = Config::new(self.addresses.clone(), self.index)
            .with_debug(self.debug)
            .with_dial_retry(Duration::from_millis(self.dial_retry_ms));
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
