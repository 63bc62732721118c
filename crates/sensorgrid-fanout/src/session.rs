use crate::group::{ConnectionId, GroupRegistry};
use crate::message::OutboundFrame;
use sensorgrid_domain::{DomainError, DomainResult, Role};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// One live subscriber connection and its group-membership protocol.
///
/// Ordinary tenants are pinned to their own group for the lifetime of
/// the connection. Elevated roles start unsubscribed and may attach to
/// any tenant group, swapping out of the previous one first.
pub struct SubscriberSession {
    registry: Arc<GroupRegistry>,
    connection: ConnectionId,
    role: Role,
    home_group: String,
}

impl SubscriberSession {
    /// Open a session for an authenticated subscriber. Non-elevated
    /// roles are subscribed to their tenant group immediately.
    pub async fn open(
        registry: Arc<GroupRegistry>,
        role: Role,
        home_group: &str,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (connection, rx) = registry.connect().await;
        if !role.is_elevated() {
            registry.subscribe(connection, home_group).await;
        }
        debug!(
            connection = ?connection,
            home_group = %home_group,
            elevated = role.is_elevated(),
            "subscriber session opened"
        );
        (
            Self {
                registry,
                connection,
                role,
                home_group: home_group.to_string(),
            },
            rx,
        )
    }

    /// Attach to an arbitrary tenant group. Elevated roles only; the swap
    /// out of any previous group is atomic.
    pub async fn switch_group(&self, group: &str) -> DomainResult<()> {
        if !self.role.is_elevated() {
            return Err(DomainError::PermissionDenied(format!(
                "role {:?} may not subscribe outside its own tenant group",
                self.role
            )));
        }
        self.registry.subscribe(self.connection, group).await;
        Ok(())
    }

    pub async fn current_group(&self) -> Option<String> {
        self.registry.current_group(self.connection).await
    }

    pub fn home_group(&self) -> &str {
        &self.home_group
    }

    /// Leave any group and deregister the connection. Must run before the
    /// connection handler terminates so no orphaned membership remains.
    pub async fn close(self) {
        self.registry.disconnect(self.connection).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tenant_session_pinned_to_home_group() {
        let registry = Arc::new(GroupRegistry::new());
        let (session, _rx) =
            SubscriberSession::open(registry.clone(), Role::Viewer, "acme-co").await;

        assert_eq!(session.current_group().await.as_deref(), Some("acme-co"));
        assert!(matches!(
            session.switch_group("globex").await,
            Err(DomainError::PermissionDenied(_))
        ));
        assert_eq!(session.current_group().await.as_deref(), Some("acme-co"));
    }

    #[tokio::test]
    async fn test_elevated_session_starts_unsubscribed() {
        let registry = Arc::new(GroupRegistry::new());
        let (session, _rx) =
            SubscriberSession::open(registry.clone(), Role::Admin, "acme-co").await;

        assert!(session.current_group().await.is_none());
        session.switch_group("globex").await.unwrap();
        assert_eq!(session.current_group().await.as_deref(), Some("globex"));
    }

    #[tokio::test]
    async fn test_close_removes_membership() {
        let registry = Arc::new(GroupRegistry::new());
        let (session, _rx) =
            SubscriberSession::open(registry.clone(), Role::Viewer, "acme-co").await;
        session.close().await;
        assert_eq!(registry.group_size("acme-co").await, 0);
    }
}
