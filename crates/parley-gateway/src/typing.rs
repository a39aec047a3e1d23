use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::fanout::Broadcaster;

/// How long a typing episode lives without a keepalive before it is
/// auto-expired with a stop-typing broadcast.
pub const TYPING_TIMEOUT: Duration = Duration::from_secs(30);

/// Tracks who is typing where. Each (user, channel) episode carries an
/// epoch; the expiry task only acts if its epoch is still the one in the
/// map, so superseded or explicitly stopped timers fire as no-ops. No
/// cancellation primitive is needed.
#[derive(Clone)]
pub struct TypingTracker {
    inner: Arc<TypingInner>,
}

struct TypingInner {
    episodes: RwLock<HashMap<(Uuid, String), u64>>,
    next_epoch: AtomicU64,
    broadcaster: Broadcaster,
    timeout: Duration,
}

impl TypingTracker {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self::with_timeout(broadcaster, TYPING_TIMEOUT)
    }

    pub fn with_timeout(broadcaster: Broadcaster, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(TypingInner {
                episodes: RwLock::new(HashMap::new()),
                next_epoch: AtomicU64::new(0),
                broadcaster,
                timeout,
            }),
        }
    }

    /// Mark the user as typing and arm a fresh expiry timer. Clients send
    /// this as a keepalive too: a repeat call re-broadcasts and resets the
    /// window, and the previous timer becomes a no-op.
    pub async fn start_typing(&self, user_id: Uuid, name: &str, channel_id: &str) {
        let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
        self.inner
            .episodes
            .write()
            .await
            .insert((user_id, channel_id.to_string()), epoch);

        self.inner
            .broadcaster
            .broadcast_typing(user_id, name, channel_id, true)
            .await;

        let tracker = self.clone();
        let name = name.to_string();
        let channel_id = channel_id.to_string();
        let deadline = tokio::time::Instant::now() + self.inner.timeout;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tracker.expire(user_id, &name, &channel_id, epoch).await;
        });
    }

    /// Explicit stop. Clears the episode and broadcasts immediately; the
    /// still-pending timer finds a changed map and does nothing.
    pub async fn stop_typing(&self, user_id: Uuid, name: &str, channel_id: &str) {
        let was_typing = self
            .inner
            .episodes
            .write()
            .await
            .remove(&(user_id, channel_id.to_string()))
            .is_some();

        if was_typing {
            self.inner
                .broadcaster
                .broadcast_typing(user_id, name, channel_id, false)
                .await;
        }
    }

    /// Timer body. Re-checks the shared state at fire time: only the epoch
    /// that is still in the map may end the episode.
    async fn expire(&self, user_id: Uuid, name: &str, channel_id: &str, epoch: u64) {
        let still_current = {
            let mut episodes = self.inner.episodes.write().await;
            let key = (user_id, channel_id.to_string());
            match episodes.get(&key) {
                Some(current) if *current == epoch => {
                    episodes.remove(&key);
                    true
                }
                _ => false,
            }
        };

        if still_current {
            debug!("typing episode for {} in {} expired", user_id, channel_id);
            self.inner
                .broadcaster
                .broadcast_typing(user_id, name, channel_id, false)
                .await;
        }
    }

    /// Implicit stop on disconnect: every channel the user was typing in is
    /// resolved as stopped, with the usual broadcast.
    pub async fn clear_user(&self, user_id: Uuid, name: &str) {
        let cleared: Vec<String> = {
            let mut episodes = self.inner.episodes.write().await;
            let channels: Vec<String> = episodes
                .keys()
                .filter(|(uid, _)| *uid == user_id)
                .map(|(_, channel)| channel.clone())
                .collect();
            for channel in &channels {
                episodes.remove(&(user_id, channel.clone()));
            }
            channels
        };

        for channel_id in cleared {
            self.inner
                .broadcaster
                .broadcast_typing(user_id, name, &channel_id, false)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, Session};
    use parley_db::Database;
    use parley_types::PUBLIC_CHANNEL_ID;
    use parley_types::events::ServerEvent;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::mpsc::error::TryRecvError;

    struct Fixture {
        tracker: TypingTracker,
        alice: Uuid,
        bob_rx: UnboundedReceiver<ServerEvent>,
        _alice_rx: UnboundedReceiver<ServerEvent>,
    }

    /// Alice types, bob observes. Public channel only, so expiry never
    /// touches the blocking pool and paused-clock tests stay deterministic.
    async fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let registry = Registry::new();
        let broadcaster = Broadcaster::new(registry.clone(), db);
        let tracker = TypingTracker::with_timeout(broadcaster, TYPING_TIMEOUT);

        let alice = Uuid::new_v4();
        let (alice_session, _alice_rx) = Session::new(alice, "alice".into());
        registry.register(alice_session).await;

        let (bob_session, bob_rx) = Session::new(Uuid::new_v4(), "bob".into());
        registry.register(bob_session).await;

        Fixture {
            tracker,
            alice,
            bob_rx,
            _alice_rx,
        }
    }

    /// Let spawned timer tasks run after a clock advance.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    fn expect_typing(rx: &mut UnboundedReceiver<ServerEvent>) {
        match rx.try_recv().unwrap() {
            ServerEvent::Typing { .. } => {}
            other => panic!("expected typing, got {:?}", other),
        }
    }

    fn expect_stop(rx: &mut UnboundedReceiver<ServerEvent>) {
        match rx.try_recv().unwrap() {
            ServerEvent::StopTyping { .. } => {}
            other => panic!("expected stop-typing, got {:?}", other),
        }
    }

    fn expect_silence(rx: &mut UnboundedReceiver<ServerEvent>) {
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_expiry_fires_exactly_once() {
        let mut fx = fixture().await;

        fx.tracker
            .start_typing(fx.alice, "alice", PUBLIC_CHANNEL_ID)
            .await;
        expect_typing(&mut fx.bob_rx);

        tokio::time::advance(TYPING_TIMEOUT + Duration::from_secs(1)).await;
        settle().await;

        expect_stop(&mut fx.bob_rx);
        expect_silence(&mut fx.bob_rx);

        // Much later: nothing else fires.
        tokio::time::advance(TYPING_TIMEOUT * 3).await;
        settle().await;
        expect_silence(&mut fx.bob_rx);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_stop_supersedes_the_timer() {
        let mut fx = fixture().await;

        fx.tracker
            .start_typing(fx.alice, "alice", PUBLIC_CHANNEL_ID)
            .await;
        expect_typing(&mut fx.bob_rx);

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        fx.tracker
            .stop_typing(fx.alice, "alice", PUBLIC_CHANNEL_ID)
            .await;
        expect_stop(&mut fx.bob_rx);

        // The original timer fires later as a no-op.
        tokio::time::advance(TYPING_TIMEOUT).await;
        settle().await;
        expect_silence(&mut fx.bob_rx);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_resets_the_expiry_window() {
        let mut fx = fixture().await;

        fx.tracker
            .start_typing(fx.alice, "alice", PUBLIC_CHANNEL_ID)
            .await;
        expect_typing(&mut fx.bob_rx);

        // Keepalive 20s in: re-broadcasts and re-arms.
        tokio::time::advance(Duration::from_secs(20)).await;
        settle().await;
        fx.tracker
            .start_typing(fx.alice, "alice", PUBLIC_CHANNEL_ID)
            .await;
        expect_typing(&mut fx.bob_rx);

        // 40s after the first start: the first timer has fired as a no-op.
        tokio::time::advance(Duration::from_secs(20)).await;
        settle().await;
        expect_silence(&mut fx.bob_rx);

        // The refreshed window runs out.
        tokio::time::advance(Duration::from_secs(11)).await;
        settle().await;
        expect_stop(&mut fx.bob_rx);
        expect_silence(&mut fx.bob_rx);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_start_broadcasts_nothing() {
        let mut fx = fixture().await;

        fx.tracker
            .stop_typing(fx.alice, "alice", PUBLIC_CHANNEL_ID)
            .await;
        expect_silence(&mut fx.bob_rx);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_resolves_all_pending_episodes() {
        let mut fx = fixture().await;

        fx.tracker
            .start_typing(fx.alice, "alice", PUBLIC_CHANNEL_ID)
            .await;
        expect_typing(&mut fx.bob_rx);

        fx.tracker.clear_user(fx.alice, "alice").await;
        expect_stop(&mut fx.bob_rx);

        // The orphaned timer is a no-op.
        tokio::time::advance(TYPING_TIMEOUT * 2).await;
        settle().await;
        expect_silence(&mut fx.bob_rx);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_episodes_expire_independently() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let registry = Registry::new();
        let broadcaster = Broadcaster::new(registry.clone(), db);
        let tracker = TypingTracker::new(broadcaster);

        let alice = Uuid::new_v4();
        let carol = Uuid::new_v4();
        let (bob_session, mut bob_rx) = Session::new(Uuid::new_v4(), "bob".into());
        registry.register(bob_session).await;

        tracker.start_typing(alice, "alice", PUBLIC_CHANNEL_ID).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        tracker.start_typing(carol, "carol", PUBLIC_CHANNEL_ID).await;

        expect_typing(&mut bob_rx);
        expect_typing(&mut bob_rx);

        // Alice's episode expires first; carol's is still live.
        tokio::time::advance(Duration::from_secs(21)).await;
        settle().await;
        match bob_rx.try_recv().unwrap() {
            ServerEvent::StopTyping { user_id, .. } => assert_eq!(user_id, alice),
            other => panic!("expected alice's stop, got {:?}", other),
        }
        expect_silence(&mut bob_rx);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        match bob_rx.try_recv().unwrap() {
            ServerEvent::StopTyping { user_id, .. } => assert_eq!(user_id, carol),
            other => panic!("expected carol's stop, got {:?}", other),
        }
    }
}
