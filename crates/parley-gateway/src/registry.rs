use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use parley_types::events::ServerEvent;

/// One live, authenticated realtime session. Created fully formed at
/// handshake time; the identity fields are never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Session {
    pub conn_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl Session {
    /// Build a session plus the receiver its socket send task will drain.
    pub fn new(user_id: Uuid, name: String) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                conn_id: Uuid::new_v4(),
                user_id,
                name,
                tx,
            },
            rx,
        )
    }

    /// Queue an event for this session. Returns false if the session's
    /// receiver is gone (socket task exited).
    pub fn push(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Process-wide set of live sessions, keyed by connection id so one user
/// can hold several concurrent sessions.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a session. Re-registering the same conn_id replaces the old
    /// entry, so a session is never delivered to twice.
    pub async fn register(&self, session: Session) {
        self.inner.write().await.insert(session.conn_id, session);
    }

    /// Remove a session. A no-op if the id is already gone.
    pub async fn unregister(&self, conn_id: Uuid) {
        self.inner.write().await.remove(&conn_id);
    }

    /// Copy of the current sessions. Fan-out iterates this copy so no lock
    /// is held while events are queued.
    pub async fn snapshot(&self) -> Vec<Session> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reregistering_a_session_never_duplicates_it() {
        let registry = Registry::new();
        let (session, _rx) = Session::new(Uuid::new_v4(), "alice".into());

        registry.register(session.clone()).await;
        registry.register(session.clone()).await;
        assert_eq!(registry.len().await, 1);

        registry.unregister(session.conn_id).await;
        assert!(registry.is_empty().await);

        // Removing an absent session is fine.
        registry.unregister(session.conn_id).await;
    }

    #[tokio::test]
    async fn one_user_can_hold_several_sessions() {
        let registry = Registry::new();
        let user_id = Uuid::new_v4();
        let (a, _rx_a) = Session::new(user_id, "alice".into());
        let (b, _rx_b) = Session::new(user_id, "alice".into());

        registry.register(a).await;
        registry.register(b).await;
        assert_eq!(registry.len().await, 2);
    }
}
