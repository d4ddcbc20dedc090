#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use ricart_agrawala::PeerHandle;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::sleep;

/// Counts processes inside the critical section and remembers the worst overlap seen.
#[derive(Default)]
pub struct Occupancy {
    inside: AtomicUsize,
    max_inside: AtomicUsize,
    entries: AtomicUsize,
}

impl Occupancy {
    pub fn enter(&self) {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inside.fetch_max(now, Ordering::SeqCst);
        self.entries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max_inside(&self) -> usize {
        self.max_inside.load(Ordering::SeqCst)
    }

    pub fn entries(&self) -> usize {
        self.entries.load(Ordering::SeqCst)
    }
}

/// Enters and leaves `rounds` times, holding the section for `hold`.
pub async fn take_turns(
    mut peer: PeerHandle,
    occupancy: Arc<Occupancy>,
    rounds: usize,
    hold: Duration,
) -> PeerHandle {
    for _ in 0..rounds {
        peer.enter().await.unwrap();
        occupancy.enter();
        sleep(hold).await;
        occupancy.exit();
        peer.exit().await.unwrap();
    }
    peer
}
