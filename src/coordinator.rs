//! Ricart-Agrawala mutual exclusion state machine.
//!
//! The coordinator never touches the network. Every operation mutates the local state and
//! returns the [`Effect`]s the caller must carry out, so the same code drives the tokio peer
//! loop and the deterministic simulations in the tests.

use crate::clock::LamportClock;
use crate::error::MutexError;
use crate::message::Message;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Enum that tells where a process stands with respect to the critical section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutexState {
    #[default]
    Idle,
    Wanting,
    InSection,
}

/// Something the coordinator asks its driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Deliver `message` to the process with index `to`.
    Send { to: usize, message: Message },
    /// Tell the application that its pending entry request has been granted.
    Granted,
}

/// Snapshot of a coordinator, published by the peer loop after every event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub state: MutexState,
    pub clock: u64,
    pub request_timestamp: u64,
    pub replies: usize,
    pub deferred: usize,
}

/// Total order on requests: lower timestamp first, ties broken by lower process index.
pub fn precedes(ts1: u64, id1: usize, ts2: u64, id2: usize) -> bool {
    ts1 < ts2 || (ts1 == ts2 && id1 < id2)
}

/// Per-process coordinator state.
#[derive(Debug, Clone)]
pub struct Coordinator {
    index: usize,
    peers: usize,
    state: MutexState,
    clock: LamportClock,
    request_timestamp: u64,
    replied: BTreeSet<usize>,
    deferred: BTreeSet<usize>,
}

impl Coordinator {
    /// Creates the coordinator of process `index` in a system of `peers` processes.
    pub fn new(index: usize, peers: usize) -> Self {
        Self {
            index,
            peers,
            state: MutexState::Idle,
            clock: LamportClock::new(),
            request_timestamp: 0,
            replied: BTreeSet::new(),
            deferred: BTreeSet::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn peers(&self) -> usize {
        self.peers
    }

    pub fn state(&self) -> MutexState {
        self.state
    }

    pub fn clock(&self) -> u64 {
        self.clock.current()
    }

    /// Timestamp of the current or most recent own request.
    pub fn request_timestamp(&self) -> u64 {
        self.request_timestamp
    }

    /// Number of distinct peers that replied to the current request.
    pub fn reply_count(&self) -> usize {
        self.replied.len()
    }

    /// Peers owed a reply once this process leaves the critical section.
    pub fn deferred(&self) -> impl Iterator<Item = usize> + '_ {
        self.deferred.iter().copied()
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            clock: self.clock(),
            request_timestamp: self.request_timestamp,
            replies: self.replied.len(),
            deferred: self.deferred.len(),
        }
    }

    fn is_peer(&self, index: usize) -> bool {
        index < self.peers && index != self.index
    }

    /// Stamps a new request and broadcasts it to every other process.
    ///
    /// Only valid while idle. A system of one process is granted on the spot.
    pub fn request_entry(&mut self) -> Result<Vec<Effect>, MutexError> {
        if self.state != MutexState::Idle {
            return Err(MutexError::AlreadyRequested);
        }

        self.request_timestamp = self.clock.tick().ok_or(MutexError::ClockExhausted)?;
        self.replied.clear();
        self.state = MutexState::Wanting;

        debug!(
            index = self.index,
            timestamp = self.request_timestamp,
            "requesting entry"
        );

        let message = Message::request_entry(self.index, self.request_timestamp);
        let mut effects: Vec<Effect> = (0..self.peers)
            .filter(|&to| to != self.index)
            .map(|to| Effect::Send { to, message })
            .collect();

        if self.peers <= 1 {
            self.state = MutexState::InSection;
            effects.push(Effect::Granted);
        }

        Ok(effects)
    }

    /// Leaves the critical section and flushes every deferred reply.
    pub fn release_entry(&mut self) -> Result<Vec<Effect>, MutexError> {
        if self.state != MutexState::InSection {
            return Err(MutexError::NotInSection);
        }

        let reply = Message::reply_ok(self.index);
        let effects = std::mem::take(&mut self.deferred)
            .into_iter()
            .map(|to| Effect::Send { to, message: reply })
            .collect::<Vec<_>>();
        self.state = MutexState::Idle;

        debug!(
            index = self.index,
            flushed = effects.len(),
            "released entry"
        );

        Ok(effects)
    }

    /// Handles a request from process `from` stamped with `timestamp`.
    ///
    /// Replies right away unless this process is inside the section or holds an earlier
    /// request, in which case `from` is deferred until release.
    pub fn on_request_entry(&mut self, from: usize, timestamp: u64) -> Vec<Effect> {
        if !self.is_peer(from) {
            warn!(index = self.index, from, "dropping request from unknown process");
            return Vec::new();
        }

        if self.clock.observe(timestamp).is_none() {
            warn!(
                index = self.index,
                from, timestamp, "dropping request with a timestamp the clock cannot pass"
            );
            return Vec::new();
        }

        let grant = match self.state {
            MutexState::Idle => true,
            MutexState::Wanting => {
                precedes(timestamp, from, self.request_timestamp, self.index)
            }
            MutexState::InSection => false,
        };

        if grant {
            debug!(index = self.index, from, timestamp, "replying ok");
            vec![Effect::Send {
                to: from,
                message: Message::reply_ok(self.index),
            }]
        } else {
            debug!(index = self.index, from, timestamp, "deferring reply");
            self.deferred.insert(from);
            Vec::new()
        }
    }

    /// Handles a reply from process `from`. Entry is granted on the last missing reply.
    pub fn on_reply_ok(&mut self, from: usize) -> Vec<Effect> {
        if !self.is_peer(from) {
            warn!(index = self.index, from, "dropping reply from unknown process");
            return Vec::new();
        }
        if self.state != MutexState::Wanting {
            debug!(index = self.index, from, state = ?self.state, "ignoring stray reply");
            return Vec::new();
        }
        if !self.replied.insert(from) {
            debug!(index = self.index, from, "ignoring duplicate reply");
            return Vec::new();
        }

        if self.replied.len() == self.peers - 1 {
            self.state = MutexState::InSection;
            debug!(
                index = self.index,
                timestamp = self.request_timestamp,
                "entry granted"
            );
            vec![Effect::Granted]
        } else {
            Vec::new()
        }
    }

    /// Dispatches a decoded message whose sender has been resolved to `from`.
    ///
    /// The resolved sender wins over the index a request claims for itself.
    pub fn handle(&mut self, from: usize, message: Message) -> Vec<Effect> {
        match message {
            Message::RequestEntry { index, timestamp } => {
                if index != from {
                    warn!(
                        index = self.index,
                        from, claimed = index, "request names a different sender"
                    );
                }
                self.on_request_entry(from, timestamp)
            }
            Message::ReplyOk { .. } => self.on_reply_ok(from),
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
