//! Peer discovery bridge: turns discovery announcements into connections.
//!
//! Discovery is at-least-once: the same peer may be announced many times.
//! Every new peer gets its own connect task, so a slow or failing peer
//! never holds up the next one. A peer that already has a connect in
//! flight is skipped until that attempt finishes. Failures are logged and
//! forgotten; discovery will announce the peer again.
//!
//! Connect tasks belong to the bridge. When the bridge stops, any attempt
//! still pending is aborted.

use std::collections::HashMap;
use std::sync::Arc;

use lanchat_transport::{NetworkHost, PeerId, PeerInfo};
use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinHandle, JoinSet};
use tracing::{debug, warn};

/// Connects the local host to every peer discovery reports.
pub struct DiscoveryBridge<H: NetworkHost> {
    host: Arc<H>,
    connects: JoinSet<()>,
    in_flight: HashMap<Id, PeerId>,
}

enum Step {
    Announced(Option<PeerInfo>),
    Finished(Result<(Id, ()), JoinError>),
}

impl<H: NetworkHost> DiscoveryBridge<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            connects: JoinSet::new(),
            in_flight: HashMap::new(),
        }
    }

    /// Handles one announcement by starting a connect attempt in the
    /// background. Returns immediately.
    ///
    /// Returns `false` when nothing was started: the announcement was for
    /// the local peer, or a connect to that peer is already running.
    pub fn on_peer_discovered(&mut self, peer: PeerInfo) -> bool {
        if &peer.peer_id == self.host.local_peer_id() {
            return false;
        }
        if self.in_flight.values().any(|id| id == &peer.peer_id) {
            debug!(peer = %peer.peer_id, "connect already in flight, skipping");
            return false;
        }

        let host = Arc::clone(&self.host);
        let peer_id = peer.peer_id.clone();
        let task = self.connects.spawn(async move {
            match host.connect(&peer).await {
                Ok(()) => debug!(peer = %peer.peer_id, "connected to discovered peer"),
                Err(e) => warn!(
                    peer = %peer.peer_id,
                    addrs = ?peer.addrs,
                    error = %e,
                    "failed to connect to discovered peer"
                ),
            }
        });
        self.in_flight.insert(task.id(), peer_id);
        true
    }

    /// Number of connect attempts still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Handles announcements until the channel closes, then aborts any
    /// connect still pending.
    pub async fn run(mut self, mut announcements: mpsc::Receiver<PeerInfo>) {
        loop {
            let step = tokio::select! {
                peer = announcements.recv() => Step::Announced(peer),
                Some(done) = self.connects.join_next_with_id(), if !self.connects.is_empty() => {
                    Step::Finished(done)
                }
            };

            match step {
                Step::Announced(Some(peer)) => {
                    self.on_peer_discovered(peer);
                }
                Step::Announced(None) => break,
                Step::Finished(done) => self.finished(done),
            }
        }
        debug!("discovery channel closed");
        self.shutdown().await;
    }

    /// Runs the bridge on its own task.
    pub fn spawn(self, announcements: mpsc::Receiver<PeerInfo>) -> JoinHandle<()> {
        tokio::spawn(self.run(announcements))
    }

    /// Aborts every pending connect and waits for the tasks to wind down.
    pub async fn shutdown(mut self) {
        if !self.connects.is_empty() {
            debug!(pending = self.connects.len(), "aborting pending connects");
        }
        self.connects.shutdown().await;
        self.in_flight.clear();
    }

    fn finished(&mut self, done: Result<(Id, ()), JoinError>) {
        let id = match done {
            Ok((id, ())) => id,
            Err(e) => {
                if e.is_panic() {
                    warn!(error = %e, "connect task panicked");
                }
                e.id()
            }
        };
        self.in_flight.remove(&id);
    }
}
