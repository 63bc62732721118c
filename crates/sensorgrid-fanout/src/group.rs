use crate::message::OutboundFrame;
use async_trait::async_trait;
use sensorgrid_domain::DomainResult;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Per-subscriber channel depth. A subscriber that falls this far behind
/// starts losing frames rather than slowing anyone else down.
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// Opaque identity of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Sink a frame is fanned out through, one per tenant group.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GroupPublisher: Send + Sync {
    async fn publish(&self, frame: OutboundFrame) -> DomainResult<()>;
}

struct RegistryState {
    /// conn -> outbound channel, created once per connection
    senders: HashMap<ConnectionId, mpsc::Sender<OutboundFrame>>,
    /// conn -> current group; one membership per connection
    memberships: HashMap<ConnectionId, String>,
    /// group -> member connections
    groups: HashMap<String, HashSet<ConnectionId>>,
}

impl RegistryState {
    fn leave(&mut self, conn: ConnectionId) {
        if let Some(group) = self.memberships.remove(&conn) {
            if let Some(members) = self.groups.get_mut(&group) {
                members.remove(&conn);
                if members.is_empty() {
                    self.groups.remove(&group);
                }
            }
        }
    }
}

/// In-process named-group fan-out registry.
///
/// Each connection holds exactly one group membership. A group switch is
/// unsubscribe-then-subscribe under a single write lock, so no frame is
/// ever delivered through two memberships; publishes landing inside the
/// swap may see neither, which callers accept over duplicate delivery.
pub struct GroupRegistry {
    state: RwLock<RegistryState>,
    next_connection_id: AtomicU64,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                senders: HashMap::new(),
                memberships: HashMap::new(),
                groups: HashMap::new(),
            }),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Register a connection and hand back its frame stream. The
    /// connection starts with no group membership.
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<OutboundFrame>) {
        let conn = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        self.state.write().await.senders.insert(conn, tx);
        debug!(connection = conn.0, "live connection registered");
        (conn, rx)
    }

    /// Place the connection in `group`, atomically leaving any previous
    /// group under the same lock.
    pub async fn subscribe(&self, conn: ConnectionId, group: &str) {
        let mut state = self.state.write().await;
        if !state.senders.contains_key(&conn) {
            warn!(connection = conn.0, group = %group, "subscribe from unknown connection");
            return;
        }
        state.leave(conn);
        state.memberships.insert(conn, group.to_string());
        state.groups.entry(group.to_string()).or_default().insert(conn);
        debug!(connection = conn.0, group = %group, "subscribed");
    }

    pub async fn unsubscribe(&self, conn: ConnectionId) {
        self.state.write().await.leave(conn);
    }

    /// Deterministically remove the connection and its membership.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut state = self.state.write().await;
        state.leave(conn);
        state.senders.remove(&conn);
        debug!(connection = conn.0, "live connection removed");
    }

    pub async fn current_group(&self, conn: ConnectionId) -> Option<String> {
        self.state.read().await.memberships.get(&conn).cloned()
    }

    pub async fn group_size(&self, group: &str) -> usize {
        self.state
            .read()
            .await
            .groups
            .get(group)
            .map_or(0, HashSet::len)
    }

    async fn fan_out(&self, frame: OutboundFrame) {
        // Snapshot the senders under the read lock, then deliver outside
        // it so one slow subscriber cannot hold up the registry.
        let targets: Vec<(ConnectionId, mpsc::Sender<OutboundFrame>)> = {
            let state = self.state.read().await;
            let Some(members) = state.groups.get(&frame.group) else {
                debug!(group = %frame.group, "publish to empty group");
                return;
            };
            members
                .iter()
                .filter_map(|conn| state.senders.get(conn).map(|tx| (*conn, tx.clone())))
                .collect()
        };

        let mut dead = Vec::new();
        for (conn, tx) in targets {
            match tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(connection = conn.0, group = %frame.group, "subscriber lagging, frame dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => dead.push(conn),
            }
        }

        if !dead.is_empty() {
            let mut state = self.state.write().await;
            for conn in dead {
                state.leave(conn);
                state.senders.remove(&conn);
            }
        }
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupPublisher for GroupRegistry {
    async fn publish(&self, frame: OutboundFrame) -> DomainResult<()> {
        self.fan_out(frame).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn frame(group: &str) -> OutboundFrame {
        OutboundFrame::encode(group, &json!({"temp": 1})).unwrap()
    }

    #[tokio::test]
    async fn test_publish_reaches_group_members_only() {
        let registry = Arc::new(GroupRegistry::new());
        let (acme_conn, mut acme_rx) = registry.connect().await;
        let (other_conn, mut other_rx) = registry.connect().await;
        registry.subscribe(acme_conn, "acme-co").await;
        registry.subscribe(other_conn, "globex").await;

        registry.publish(frame("acme-co")).await.unwrap();

        assert_eq!(acme_rx.recv().await.unwrap().group, "acme-co");
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_switch_leaves_exactly_one_membership() {
        let registry = Arc::new(GroupRegistry::new());
        let (conn, mut rx) = registry.connect().await;
        registry.subscribe(conn, "acme-co").await;
        registry.subscribe(conn, "bob-user").await;

        assert_eq!(registry.current_group(conn).await.as_deref(), Some("bob-user"));
        assert_eq!(registry.group_size("acme-co").await, 0);
        assert_eq!(registry.group_size("bob-user").await, 1);

        // A publish to the old group must not be received after the switch
        registry.publish(frame("acme-co")).await.unwrap();
        assert!(rx.try_recv().is_err());

        registry.publish(frame("bob-user")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().group, "bob-user");
    }

    #[tokio::test]
    async fn test_no_replay_for_late_subscriber() {
        let registry = Arc::new(GroupRegistry::new());
        registry.publish(frame("acme-co")).await.unwrap();

        let (conn, mut rx) = registry.connect().await;
        registry.subscribe(conn, "acme-co").await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_leaves_group() {
        let registry = Arc::new(GroupRegistry::new());
        let (conn, _rx) = registry.connect().await;
        registry.subscribe(conn, "acme-co").await;
        registry.disconnect(conn).await;

        assert_eq!(registry.group_size("acme-co").await, 0);
        assert!(registry.current_group(conn).await.is_none());
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_others() {
        let registry = Arc::new(GroupRegistry::new());
        let (slow, _slow_rx) = registry.connect().await;
        let (fast, mut fast_rx) = registry.connect().await;
        registry.subscribe(slow, "acme-co").await;
        registry.subscribe(fast, "acme-co").await;

        // Saturate the slow subscriber's channel, then keep publishing
        for _ in 0..(SUBSCRIBER_CHANNEL_CAPACITY + 10) {
            registry.publish(frame("acme-co")).await.unwrap();
        }

        let mut received = 0;
        while fast_rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_CHANNEL_CAPACITY);
    }
}
