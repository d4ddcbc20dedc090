//! Point-to-point links between processes.
//!
//! A [`Link`] only knows how to hand a payload to a named endpoint. Inbound traffic comes out
//! of an unbounded channel of [`Delivery`] values, in the order each sender wrote it.

use crate::log;
use crate::message::Handshake;
use color_print::cformat;
use futures::{SinkExt, StreamExt};
use std::{
    collections::HashMap,
    error::Error,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::sleep,
};
use tokio_util::codec::{Framed, LinesCodec};

/// A payload received from the endpoint configured as `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub from: String,
    pub payload: String,
}

pub type Inbound = UnboundedReceiver<Delivery>;

/// Outbound half of the transport. Sending never blocks and never reports failure.
pub trait Link: Send + Sync {
    fn send(&self, to: &str, payload: String);
}

impl<L: Link + ?Sized> Link for Arc<L> {
    fn send(&self, to: &str, payload: String) {
        (**self).send(to, payload)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// TCP transport: newline framed payloads, one connection per destination.
pub struct TcpLink {
    address: String,
    dial_retry: Duration,
    writers: Mutex<HashMap<String, UnboundedSender<String>>>,
    acceptor: JoinHandle<()>,
}

impl TcpLink {
    /// Function that listens on `address` and identifies itself to peers with the same string.
    pub async fn bind(
        address: &str,
        dial_retry: Duration,
    ) -> Result<(Self, Inbound), Box<dyn Error + Send + Sync>> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self::from_listener(listener, address, dial_retry))
    }

    /// Function that wraps an already bound listener, `address` being the configured name of it.
    pub fn from_listener(
        listener: TcpListener,
        address: impl Into<String>,
        dial_retry: Duration,
    ) -> (Self, Inbound) {
        let (tx, rx) = mpsc::unbounded_channel();
        let acceptor = tokio::spawn(Self::accept_loop(listener, tx));

        let link = Self {
            address: address.into(),
            dial_retry,
            writers: Mutex::new(HashMap::new()),
            acceptor,
        };
        (link, rx)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn accept_loop(listener: TcpListener, tx: UnboundedSender<Delivery>) {
        loop {
            let (stream, remote) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::error(&format!("Failed to accept a connection: {e}"));
                    continue;
                }
            };

            log::debug(&cformat!("Accepted a <bold>connection</bold> from {remote}."));

            let tx = tx.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, tx).await {
                    log::error(&format!("Connection from {remote} failed: {e}"));
                }
            });
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        tx: UnboundedSender<Delivery>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut lines = Framed::new(stream, LinesCodec::new());

        let from = match lines.next().await {
            Some(line) => Handshake::from_json_string(&line?)?.address,
            None => return Ok(()),
        };

        while let Some(line) = lines.next().await {
            let payload = line?;
            if tx.send(Delivery { from: from.clone(), payload }).is_err() {
                // receiving side is gone
                return Ok(());
            }
        }
        Ok(())
    }

    /// Writer task for a single destination. Keeps redialing until the link is dropped.
    async fn write_loop(
        own_address: String,
        to: String,
        mut rx: UnboundedReceiver<String>,
        dial_retry: Duration,
    ) {
        let handshake = match Handshake::new(own_address).to_json_string() {
            Ok(line) => line,
            Err(e) => {
                log::error(&format!("Couldn't encode the handshake: {e}"));
                return;
            }
        };

        let mut pending: Option<String> = None;
        let mut attempts = 0u32;

        loop {
            let stream = match TcpStream::connect(&to).await {
                Ok(stream) => stream,
                Err(e) => {
                    if pending.is_none() && rx.is_closed() && rx.is_empty() {
                        return;
                    }
                    if attempts == 0 {
                        log::warn(&cformat!(
                            "Couldn't connect to <bold>{to}</bold> ({e}), retrying."
                        ));
                    }
                    attempts += 1;
                    sleep(dial_retry).await;
                    continue;
                }
            };
            attempts = 0;

            let mut lines = Framed::new(stream, LinesCodec::new());
            if let Err(e) = lines.send(handshake.clone()).await {
                log::warn(&format!("Handshake with {to} failed: {e}"));
                sleep(dial_retry).await;
                continue;
            }
            log::debug(&cformat!("Connected to <bold>{to}</bold>."));

            loop {
                let payload = match pending.take() {
                    Some(payload) => payload,
                    None => match rx.recv().await {
                        Some(payload) => payload,
                        None => return,
                    },
                };

                if let Err(e) = lines.send(payload.clone()).await {
                    log::warn(&format!("Lost connection to {to}: {e}"));
                    pending = Some(payload);
                    break;
                }
            }
        }
    }
}

impl Link for TcpLink {
    /// Must be called from within a tokio runtime: the first send to a destination spawns its
    /// writer task.
    fn send(&self, to: &str, payload: String) {
        let mut writers = lock(&self.writers);

        if let Some(writer) = writers.get(to) {
            match writer.send(payload) {
                Ok(()) => return,
                Err(returned) => {
                    writers.remove(to);
                    return self.spawn_writer(&mut writers, to, returned.0);
                }
            }
        }
        self.spawn_writer(&mut writers, to, payload);
    }
}

impl TcpLink {
    fn spawn_writer(
        &self,
        writers: &mut HashMap<String, UnboundedSender<String>>,
        to: &str,
        payload: String,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        // rx is alive, this cannot fail
        let _ = tx.send(payload);
        tokio::spawn(Self::write_loop(
            self.address.clone(),
            to.to_string(),
            rx,
            self.dial_retry,
        ));
        writers.insert(to.to_string(), tx);
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

/// In-process network routing payloads by exact address.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    routes: Arc<Mutex<HashMap<String, UnboundedSender<Delivery>>>>,
}

/// Endpoint on a [`MemoryNetwork`].
#[derive(Clone)]
pub struct MemoryLink {
    address: String,
    network: MemoryNetwork,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Function that registers `address` and returns its link and inbound stream.
    pub fn join(&self, address: impl Into<String>) -> (MemoryLink, Inbound) {
        let address = address.into();
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.routes).insert(address.clone(), tx);

        let link = MemoryLink {
            address,
            network: self.clone(),
        };
        (link, rx)
    }

    /// Function that removes `address`; later sends to it are dropped.
    pub fn leave(&self, address: &str) {
        lock(&self.routes).remove(address);
    }
}

impl MemoryLink {
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Link for MemoryLink {
    fn send(&self, to: &str, payload: String) {
        let routes = lock(&self.network.routes);
        let delivered = routes.get(to).is_some_and(|route| {
            route
                .send(Delivery {
                    from: self.address.clone(),
                    payload,
                })
                .is_ok()
        });

        if !delivered {
            log::warn(&cformat!("Dropping message to unknown endpoint <bold>{to}</bold>."));
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
