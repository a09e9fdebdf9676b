use std::sync::Arc;

use tokio::sync::watch;

use crate::models::Session;

/// The current-session context shared by the monitor loop and the attendance machine.
///
/// Written only by the session poll; everyone else reads.
#[derive(Clone)]
pub struct SessionTracker {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    /// Replaces the session wholesale. Returns true if anything changed.
    pub fn publish(&self, next: Option<Session>) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }
}
