//! Distributed mutual exclusion with the Ricart-Agrawala algorithm.
//!
//! Every process runs a [`Peer`] loop around a [`Coordinator`]. A process that wants the
//! critical section stamps a request with its Lamport clock and broadcasts it; it enters once
//! all other processes replied. A process that is inside the section, or that holds an older
//! request, defers its reply until it leaves.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod log;
pub mod message;
pub mod peer;
pub mod poisson;
pub mod transport;

pub use config::Config;
pub use coordinator::{precedes, Coordinator, Effect, MutexState, Status};
pub use error::{ConfigError, MutexError, PeerError, WireError};
pub use message::Message;
pub use peer::{Intent, Peer, PeerHandle};
pub use transport::{Delivery, Inbound, Link, MemoryLink, MemoryNetwork, TcpLink};
