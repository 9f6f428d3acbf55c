//! Live change notifications.
//!
//! Every committed write publishes one [`ChangeEvent`] per touched collection.
//! Readers subscribe and re-run the ledger fold when something they watch
//! changes; events carry no payload beyond what changed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Investors,
    Transactions,
    Eggs,
    Debts,
    Settings,
    Users,
    Logs,
    Notifications,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    /// The whole collection was replaced (backup import).
    Replaced,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub id: Option<Uuid>,
}

impl ChangeEvent {
    pub fn new(collection: Collection, kind: ChangeKind, id: Option<Uuid>) -> Self {
        Self {
            collection,
            kind,
            id,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl ChangeBus {
    pub(crate) fn publish(&self, events: Vec<ChangeEvent>) {
        for event in events {
            // no receivers is fine
            let _ = self.sender.send(event);
        }
    }

    pub(crate) fn subscribe(&self, collections: &[Collection]) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            collections: collections.to_vec(),
        }
    }
}

/// Receiver side of a live subscription, filtered by collection.
///
/// An empty filter receives every event.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    collections: Vec<Collection>,
}

impl Subscription {
    /// Waits for the next matching event. Returns `None` once the engine is
    /// gone. A lagging subscriber skips the events it missed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::next`].
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        self.collections.is_empty() || self.collections.contains(&event.collection)
    }
}
