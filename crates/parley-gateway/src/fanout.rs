use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use parley_db::Database;
use parley_types::PUBLIC_CHANNEL_ID;
use parley_types::events::ServerEvent;
use parley_types::models::Message;

use crate::access::{self, Access};
use crate::registry::Registry;

/// Delivers persisted messages and typing events to every registered
/// session that may see the target channel. Best-effort and unordered: a
/// dead session is dropped from the registry and the fan-out continues.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Registry,
    db: Arc<Database>,
}

impl Broadcaster {
    pub fn new(registry: Registry, db: Arc<Database>) -> Self {
        Self { registry, db }
    }

    /// Push a freshly persisted message to every authorized session except
    /// the author's own.
    pub async fn broadcast_message(&self, message: &Message) {
        let sessions = self.registry.snapshot().await;
        let candidates: HashSet<Uuid> = sessions
            .iter()
            .map(|s| s.user_id)
            .filter(|uid| *uid != message.author)
            .collect();
        let authorized = self.authorized_users(&message.channel_id, candidates).await;

        for session in sessions {
            if session.user_id == message.author || !authorized.contains(&session.user_id) {
                continue;
            }
            let event = ServerEvent::NewMessage {
                id: message.id,
                content: message.content.clone(),
                author: message.author,
                author_name: message.author_name.clone(),
                channel_id: message.channel_id.clone(),
                created_at: message.created_at,
            };
            if !session.push(event) {
                warn!("dropping dead session for {} ({})", session.name, session.conn_id);
                self.registry.unregister(session.conn_id).await;
            }
        }
    }

    /// Push a typing state change to every authorized session. The
    /// originating user's sessions are excluded, so nobody is told about
    /// their own typing (including their other devices).
    pub async fn broadcast_typing(
        &self,
        user_id: Uuid,
        name: &str,
        channel_id: &str,
        is_typing: bool,
    ) {
        let sessions = self.registry.snapshot().await;
        let candidates: HashSet<Uuid> = sessions
            .iter()
            .map(|s| s.user_id)
            .filter(|uid| *uid != user_id)
            .collect();
        let authorized = self.authorized_users(channel_id, candidates).await;

        for session in sessions {
            if session.user_id == user_id || !authorized.contains(&session.user_id) {
                continue;
            }
            let event = if is_typing {
                ServerEvent::Typing {
                    user_id,
                    channel_id: channel_id.to_string(),
                    name: name.to_string(),
                }
            } else {
                ServerEvent::StopTyping {
                    user_id,
                    channel_id: channel_id.to_string(),
                    name: name.to_string(),
                }
            };
            if !session.push(event) {
                warn!("dropping dead session for {} ({})", session.name, session.conn_id);
                self.registry.unregister(session.conn_id).await;
            }
        }
    }

    /// Evaluate channel access for each candidate user. The public channel
    /// sentinel admits everyone without a store round trip; everything else
    /// goes through the evaluator off the async runtime.
    async fn authorized_users(&self, channel_id: &str, candidates: HashSet<Uuid>) -> HashSet<Uuid> {
        if channel_id == PUBLIC_CHANNEL_ID {
            return candidates;
        }

        let db = self.db.clone();
        let channel_id = channel_id.to_string();
        let result = tokio::task::spawn_blocking(move || {
            let mut authorized = HashSet::new();
            for user_id in candidates {
                match access::check_access(&db, user_id, &channel_id) {
                    Ok(Access::Granted) => {
                        authorized.insert(user_id);
                    }
                    Ok(Access::Denied) | Ok(Access::ChannelNotFound) => {}
                    Err(e) => {
                        warn!("access check failed for {} in {}: {:#}", user_id, channel_id, e);
                    }
                }
            }
            authorized
        })
        .await;

        match result {
            Ok(authorized) => authorized,
            Err(e) => {
                warn!("access check task failed: {}", e);
                HashSet::new()
            }
        }
    }

}
