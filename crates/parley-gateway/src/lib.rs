pub mod access;
pub mod connection;
pub mod fanout;
pub mod registry;
pub mod typing;

use std::sync::Arc;

use parley_db::Database;

use crate::fanout::Broadcaster;
use crate::registry::Registry;
use crate::typing::TypingTracker;

/// The realtime subsystem, wired together once per process and handed to
/// both the WebSocket route and the HTTP handlers that trigger broadcasts.
#[derive(Clone)]
pub struct Gateway {
    pub db: Arc<Database>,
    pub registry: Registry,
    pub broadcaster: Broadcaster,
    pub typing: TypingTracker,
}

impl Gateway {
    pub fn new(db: Arc<Database>) -> Self {
        let registry = Registry::new();
        let broadcaster = Broadcaster::new(registry.clone(), db.clone());
        let typing = TypingTracker::new(broadcaster.clone());
        Self {
            db,
            registry,
            broadcaster,
            typing,
        }
    }
}
