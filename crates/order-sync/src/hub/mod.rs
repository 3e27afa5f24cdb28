//! # Realtime Fan-out Hub
//!
//! The hub keeps one table of live connections and pushes every published [`SyncEvent`] to the
//! connections whose [`SubscriberKey`] is in the event's audience.
//!
//! ```text
//!  TenantDesk ──publish(event)──► FanoutHub ──try_send──► Subscription (kitchen screen)
//!                                    │        ──try_send──► Subscription (customer app)
//!                                    │        ──try_send──► Subscription (driver app)
//!                                    └── index: SubscriberKey → {ConnectionId}
//! ```
//!
//! ## Delivery Contract
//!
//! - Best effort. Publishing never blocks: a subscriber whose buffer is full misses the event.
//! - No history. A connection only sees events published while it is registered; clients that
//!   reconnect re-fetch current state through the polling surface.
//! - Liveness. [`FanoutHub::sweep`] drops connections with no heartbeat inside the liveness
//!   window; their stream ends and they must re-subscribe.
//!
//! The hub is transport-agnostic: a socket adapter reads from [`Subscription::events`] and calls
//! [`FanoutHub::heartbeat`] / [`FanoutHub::disconnect`].

mod subscription;

pub use subscription::{ConnectionId, Subscription};

use crate::model::{SubscriberKey, SyncEvent};
use dashmap::DashMap;
use std::collections::HashSet;
use std::time::Duration;
use subscription::Connection;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct FanoutHub {
    connections: DashMap<ConnectionId, Connection>,
    index: DashMap<SubscriberKey, HashSet<ConnectionId>>,
    buffer: usize,
    liveness: Duration,
}

impl FanoutHub {
    pub fn new(buffer: usize, liveness: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            index: DashMap::new(),
            buffer: buffer.max(1),
            liveness,
        }
    }

    /// Registers a new connection for `key`.
    pub fn subscribe(&self, key: SubscriberKey) -> Subscription {
        let id = Uuid::new_v4();
        let (sender, events) = mpsc::channel(self.buffer);
        self.connections.insert(
            id,
            Connection {
                key: key.clone(),
                sender,
                last_seen: Instant::now(),
            },
        );
        self.index.entry(key.clone()).or_default().insert(id);
        info!(conn_id = %id, %key, "Subscribed");
        Subscription { id, key, events }
    }

    /// Pushes `event` to every live connection in its audience. Returns how many got it.
    pub fn publish(&self, event: &SyncEvent) -> usize {
        let mut targets: Vec<ConnectionId> = Vec::new();
        for key in event.audience.keys() {
            if let Some(ids) = self.index.get(&key) {
                targets.extend(ids.iter().copied());
            }
        }

        let mut delivered = 0;
        let mut closed = Vec::new();
        for id in targets {
            let Some(conn) = self.connections.get(&id) else {
                continue;
            };
            match conn.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(conn_id = %id, key = %conn.key, kind = event.kind(), "Subscriber lagging, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }
        for id in closed {
            self.disconnect(&id);
        }

        debug!(kind = event.kind(), delivered, "Published");
        delivered
    }

    /// Marks a connection as alive. `false` if it is no longer registered.
    pub fn heartbeat(&self, id: &ConnectionId) -> bool {
        match self.connections.get_mut(id) {
            Some(mut conn) => {
                conn.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Removes a connection. Its event stream ends once buffered events are read.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        let Some((_, conn)) = self.connections.remove(id) else {
            return false;
        };
        let now_empty = match self.index.get_mut(&conn.key) {
            Some(mut ids) => {
                ids.remove(id);
                ids.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.index.remove_if(&conn.key, |_, ids| ids.is_empty());
        }
        info!(conn_id = %id, key = %conn.key, "Disconnected");
        true
    }

    /// Drops every connection idle for longer than the liveness window.
    pub fn sweep(&self, now: Instant) -> usize {
        let stale: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|entry| now.saturating_duration_since(entry.last_seen) > self.liveness)
            .map(|entry| *entry.key())
            .collect();
        for id in &stale {
            self.disconnect(id);
        }
        if !stale.is_empty() {
            info!(dropped = stale.len(), "Liveness sweep");
        }
        stale.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn subscriber_count(&self, key: &SubscriberKey) -> usize {
        self.index.get(key).map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn liveness(&self) -> Duration {
        self.liveness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;
    use chrono::Utc;

    fn location(driver: &str) -> SyncEvent {
        SyncEvent::driver_location(
            driver,
            GeoPoint::new(1.0, 2.0),
            GeoPoint::new(1.0, 2.0),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_only_matching_keys() {
        let hub = FanoutHub::new(8, Duration::from_secs(60));
        let mut d1 = hub.subscribe(SubscriberKey::driver("d-1"));
        let mut d2 = hub.subscribe(SubscriberKey::driver("d-2"));

        assert_eq!(hub.publish(&location("d-1")), 1);
        assert!(d1.try_recv().is_some());
        assert!(d2.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_full_buffer_drops_instead_of_blocking() {
        let hub = FanoutHub::new(1, Duration::from_secs(60));
        let mut sub = hub.subscribe(SubscriberKey::driver("d-1"));
        assert_eq!(hub.publish(&location("d-1")), 1);
        assert_eq!(hub.publish(&location("d-1")), 0);
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
        // Still registered after lagging.
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_cleaned_up_on_publish() {
        let hub = FanoutHub::new(4, Duration::from_secs(60));
        let sub = hub.subscribe(SubscriberKey::driver("d-1"));
        drop(sub);
        assert_eq!(hub.publish(&location("d-1")), 0);
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.subscriber_count(&SubscriberKey::driver("d-1")), 0);
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_connections() {
        let hub = FanoutHub::new(4, Duration::from_millis(200));
        let mut idle = hub.subscribe(SubscriberKey::tenant("t-1"));
        let active = hub.subscribe(SubscriberKey::tenant("t-1"));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(hub.heartbeat(&active.id));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(hub.sweep(Instant::now()), 1);
        assert!(idle.recv().await.is_none());
        assert!(hub.heartbeat(&active.id));
        assert_eq!(hub.subscriber_count(&SubscriberKey::tenant("t-1")), 1);
    }
}
