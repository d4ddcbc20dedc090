//! The per-process decision loop.
//!
//! One tokio task owns the [`Coordinator`] and serializes every event that can touch it: the
//! application's enter/exit intents and the payloads delivered by the transport. Each event is
//! handled to completion before the next one is polled, so the coordinator needs no lock.

use crate::coordinator::{Coordinator, Effect, MutexState, Status};
use crate::error::{ConfigError, MutexError, PeerError};
use crate::log;
use crate::message::Message;
use crate::transport::{Delivery, Inbound, Link};
use crate::Config;
use color_print::cformat;
use tokio::sync::{mpsc, watch};

/// Enum that represents what the application can ask of its peer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Enter,
    Exit,
}

/// State owned by the decision loop task.
pub struct Peer<L: Link> {
    config: Config,
    coordinator: Coordinator,
    link: L,
    granted: mpsc::UnboundedSender<Result<(), MutexError>>,
    status: watch::Sender<Status>,
    detached: bool,
}

/// Application side of a running peer loop.
pub struct PeerHandle {
    intents: mpsc::Sender<Intent>,
    granted: mpsc::UnboundedReceiver<Result<(), MutexError>>,
    status: watch::Receiver<Status>,
    /// `Enter` reached the loop and its answer has not been consumed yet.
    requested: bool,
    inside: bool,
}

impl<L: Link + 'static> Peer<L> {
    /// Function that validates `config` and starts the loop on the current tokio runtime.
    ///
    /// The loop keeps answering peers after the returned handle is dropped; if it was inside the
    /// critical section at that point it releases it.
    pub fn spawn(config: Config, link: L, inbound: Inbound) -> Result<PeerHandle, ConfigError> {
        config.validate()?;

        let (intents_tx, intents_rx) = mpsc::channel(1);
        let (granted_tx, granted_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(Status::default());

        let peer = Self {
            coordinator: Coordinator::new(config.index, config.peers.len()),
            config,
            link,
            granted: granted_tx,
            status: status_tx,
            detached: false,
        };

        log::debug(&cformat!(
            "Starting process <bold>{}</bold> of <bold>{}</bold>.",
            peer.config.index,
            peer.config.peers.len()
        ));

        let _handle = tokio::spawn(peer.run(intents_rx, inbound));

        Ok(PeerHandle {
            intents: intents_tx,
            granted: granted_rx,
            status: status_rx,
            requested: false,
            inside: false,
        })
    }

    async fn run(mut self, mut intents: mpsc::Receiver<Intent>, mut inbound: Inbound) {
        let mut inbound_open = true;

        loop {
            tokio::select! {
                intent = intents.recv(), if !self.detached => match intent {
                    Some(intent) => self.on_intent(intent),
                    None => self.detach(),
                },
                delivery = inbound.recv(), if inbound_open => match delivery {
                    Some(delivery) => self.on_delivery(delivery),
                    None => {
                        log::warn("The transport closed its inbound stream.");
                        inbound_open = false;
                    }
                },
                else => break,
            }

            self.status.send_replace(self.coordinator.status());
        }

        log::debug("Peer loop stopped.");
    }

    fn on_intent(&mut self, intent: Intent) {
        let result = match intent {
            Intent::Enter => {
                log::debug("Application asks for the critical section.");
                self.coordinator.request_entry()
            }
            Intent::Exit => {
                log::debug("Application leaves the critical section.");
                self.coordinator.release_entry()
            }
        };

        match result {
            Ok(effects) => self.execute(effects),
            Err(e) => {
                log::warn(&format!("Ignoring {intent:?}: {e}."));
                if intent == Intent::Enter {
                    // the application is waiting for an answer
                    let _ = self.granted.send(Err(e));
                }
            }
        }
    }

    /// The application went away; nobody will ever send `Exit` again.
    fn detach(&mut self) {
        self.detached = true;
        if self.coordinator.state() == MutexState::InSection {
            self.release_abandoned();
        }
    }

    fn release_abandoned(&mut self) {
        log::warn("Releasing a critical section abandoned by the application.");
        match self.coordinator.release_entry() {
            Ok(effects) => self.execute(effects),
            Err(e) => log::error(&format!("{e}")),
        }
    }

    fn on_delivery(&mut self, delivery: Delivery) {
        let message = match Message::from_wire_string(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                log::error(&cformat!(
                    "Dropping malformed message from <bold>{}</bold>: {e}.",
                    delivery.from
                ));
                return;
            }
        };

        log::debug(&format!("<<<---- {message} from {}", delivery.from));

        let sender = self.config.index_of(&delivery.from);
        let from = match (message, sender) {
            (Message::RequestEntry { index, .. }, None) => index,
            (Message::ReplyOk { index: Some(index) }, _) => index,
            (_, Some(sender)) => sender,
            (Message::ReplyOk { index: None }, None) => {
                log::error(&cformat!(
                    "Dropping reply from unknown address <bold>{}</bold>.",
                    delivery.from
                ));
                return;
            }
        };

        let effects = self.coordinator.handle(from, message);
        self.execute(effects);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { to, message } => match self.config.peers.get(to) {
                    Some(address) => {
                        log::debug(&format!("---->> {message} to {address}"));
                        self.link.send(address, message.to_wire_string());
                    }
                    None => log::error(&format!("No address for process {to}.")),
                },
                Effect::Granted if self.detached => self.release_abandoned(),
                Effect::Granted => {
                    log::debug("Entered the critical section.");
                    // publish before waking the application so it never reads a stale state
                    self.status.send_replace(self.coordinator.status());
                    // the handle may be gone, the grant is then released on detach
                    let _ = self.granted.send(Ok(()));
                }
            }
        }
    }
}

impl PeerHandle {
    /// Function that requests the critical section and waits until every peer agreed.
    ///
    /// Cancel safe: if the future is dropped while waiting, the request stays pending and the
    /// next call resumes waiting for it instead of asking again.
    pub async fn enter(&mut self) -> Result<(), PeerError> {
        if self.inside {
            return Err(MutexError::AlreadyRequested.into());
        }

        if !self.requested {
            self.intents
                .send(Intent::Enter)
                .await
                .map_err(|_| PeerError::Stopped)?;
            self.requested = true;
        }

        let answer = self.granted.recv().await.ok_or(PeerError::Stopped)?;
        self.requested = false;
        answer?;

        self.inside = true;
        Ok(())
    }

    /// Function that leaves the critical section, releasing every deferred reply.
    pub async fn exit(&mut self) -> Result<(), PeerError> {
        if !self.inside {
            return Err(MutexError::NotInSection.into());
        }

        self.intents
            .send(Intent::Exit)
            .await
            .map_err(|_| PeerError::Stopped)?;
        self.inside = false;
        Ok(())
    }

    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// Watch channel updated after every event the loop handles.
    pub fn status(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }
}
