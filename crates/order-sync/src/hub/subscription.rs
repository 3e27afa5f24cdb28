use crate::model::{SubscriberKey, SyncEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// The client side of one live connection.
///
/// A transport adapter owns this and forwards `events` onto its socket. When the receiver
/// yields `None` the hub has dropped the connection (liveness timeout or explicit disconnect)
/// and the client must re-subscribe and re-fetch current state.
#[derive(Debug)]
pub struct Subscription {
    pub id: ConnectionId,
    pub key: SubscriberKey,
    pub events: mpsc::Receiver<SyncEvent>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Next event if one is already waiting.
    pub fn try_recv(&mut self) -> Option<SyncEvent> {
        self.events.try_recv().ok()
    }
}

/// The hub side of one live connection.
#[derive(Debug)]
pub(crate) struct Connection {
    pub key: SubscriberKey,
    pub sender: mpsc::Sender<SyncEvent>,
    pub last_seen: Instant,
}
