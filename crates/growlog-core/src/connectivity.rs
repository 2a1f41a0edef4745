//! Online/offline signal supplied by the host application.
//!
//! The queue never probes the network itself. Whoever knows about
//! connectivity (a reachability poll, an OS notification) calls
//! [`ConnectivitySignal::set_online`]; the queue reads the current value and
//! flush triggers wait on [`OnlineTransitions`].

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinkState {
    online: bool,
    /// Number of offline to online transitions so far
    reconnects: u64,
}

/// Shared connectivity flag. Clones observe and update the same state.
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<LinkState>>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(LinkState {
            online,
            reconnects: 0,
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        self.tx.borrow().online
    }

    /// Record the current state. Returns `true` if this was an offline to
    /// online transition.
    pub fn set_online(&self, online: bool) -> bool {
        let mut reconnected = false;
        self.tx.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            if online {
                state.reconnects += 1;
                reconnected = true;
            }
            true
        });
        if reconnected {
            tracing::info!("Connectivity restored");
        } else if !online {
            tracing::debug!("Connectivity signal reports offline");
        }
        reconnected
    }

    /// Listen for offline to online transitions from now on
    pub fn transitions(&self) -> OnlineTransitions {
        let rx = self.tx.subscribe();
        let seen = rx.borrow().reconnects;
        OnlineTransitions { rx, seen }
    }
}

/// Stream of reconnect events, one per offline to online transition
#[derive(Debug)]
pub struct OnlineTransitions {
    rx: watch::Receiver<LinkState>,
    seen: u64,
}

impl OnlineTransitions {
    /// Wait for the next transition.
    ///
    /// Returns its ordinal, or `None` once every [`ConnectivitySignal`]
    /// handle is gone and all earlier transitions were delivered.
    pub async fn next(&mut self) -> Option<u64> {
        loop {
            let reconnects = self.rx.borrow_and_update().reconnects;
            if self.seen < reconnects {
                self.seen += 1;
                return Some(self.seen);
            }
            self.rx.changed().await.ok()?;
        }
    }
}
