use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, Stream, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use parley_db::Database;
use parley_types::events::{ClientFrame, LoginFrame, ServerEvent};

use crate::Gateway;
use crate::registry::Session;

/// How long an unauthenticated connection may wait before sending its
/// handshake frame.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Drive a single WebSocket connection: credential handshake, then the
/// authenticated frame loop. Registration happens only after the handshake
/// succeeds, and every exit path unregisters and resolves pending typing.
pub async fn handle_connection(socket: WebSocket, gateway: Gateway) {
    let (mut sender, mut receiver) = socket.split();

    let (user_id, name) = match wait_for_login(&mut receiver, &gateway.db).await {
        Some(identity) => identity,
        None => {
            warn!("WebSocket handshake rejected, closing");
            let frame = serde_json::to_string(&ServerEvent::WrongCredentials).unwrap();
            let _ = sender.send(Message::Text(frame.into())).await;
            let _ = sender.close().await;
            return;
        }
    };

    info!("{} ({}) connected", name, user_id);

    let (session, mut events_rx) = Session::new(user_id, name.clone());
    let conn_id = session.conn_id;
    gateway.registry.register(session).await;

    let hello = ServerEvent::Authenticated {
        user_id,
        name: name.clone(),
    };
    if sender
        .send(Message::Text(serde_json::to_string(&hello).unwrap().into()))
        .await
        .is_err()
    {
        gateway.registry.unregister(conn_id).await;
        return;
    }

    // Forward queued broadcasts to the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let text = serde_json::to_string(&event).unwrap();
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Drive the typing coordinator from client frames.
    let typing = gateway.typing.clone();
    let recv_name = name.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Typing { channel_id }) => {
                        typing.start_typing(user_id, &recv_name, &channel_id).await;
                    }
                    Ok(ClientFrame::StopTyping { channel_id }) => {
                        typing.stop_typing(user_id, &recv_name, &channel_id).await;
                    }
                    // Unknown frame types are ignored, not errors.
                    Err(e) => debug!("{} ({}) ignored frame: {}", recv_name, user_id, e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears down the other.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    gateway.registry.unregister(conn_id).await;
    gateway.typing.clear_user(user_id, &name).await;
    info!("{} ({}) disconnected", name, user_id);
}

/// The first frame must carry credentials; anything else, a verification
/// failure, or silence past the deadline rejects the connection before it
/// ever reaches the registry.
async fn wait_for_login<S>(receiver: &mut S, db: &Arc<Database>) -> Option<(Uuid, String)>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let msg = tokio::time::timeout(LOGIN_TIMEOUT, receiver.next())
        .await
        .ok()??
        .ok()?;

    let Message::Text(text) = msg else {
        return None;
    };
    verify_login(db, &text).await
}

/// Parse a candidate handshake frame and check it against the store.
async fn verify_login(db: &Arc<Database>, frame: &str) -> Option<(Uuid, String)> {
    let login: LoginFrame = serde_json::from_str(frame).ok()?;

    let db = db.clone();
    let user = tokio::task::spawn_blocking(move || {
        db.verify_credentials(&login.username, &login.password)
    })
    .await
    .ok()?
    .ok()??;

    let user_id = user.id.parse().ok()?;
    Some((user_id, user.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use parley_db::credentials::hash_password;

    fn db_with_alice() -> Arc<Database> {
        let db = Database::open_in_memory().unwrap();
        let hash = hash_password("secret99").unwrap();
        db.create_user(&Uuid::new_v4().to_string(), "alice", &hash, "Alice")
            .unwrap();
        Arc::new(db)
    }

    async fn login_with(db: &Arc<Database>, frames: Vec<Message>) -> Option<(Uuid, String)> {
        let mut frames = stream::iter(frames.into_iter().map(Ok::<_, axum::Error>));
        wait_for_login(&mut frames, db).await
    }

    #[tokio::test]
    async fn valid_credentials_resolve_the_user() {
        let db = db_with_alice();
        let frame = Message::Text(r#"{"username":"alice","password":"secret99"}"#.into());

        let (_, name) = login_with(&db, vec![frame]).await.unwrap();
        assert_eq!(name, "Alice");
    }

    #[tokio::test]
    async fn non_json_first_frame_is_rejected() {
        let db = db_with_alice();
        let frame = Message::Text("hello there".into());

        assert!(login_with(&db, vec![frame]).await.is_none());
    }

    #[tokio::test]
    async fn non_credential_first_frame_is_rejected() {
        let db = db_with_alice();
        // Well-formed JSON, but a protocol frame rather than a handshake.
        let frame = Message::Text(r#"{"type":"typing","channel_id":"public-chat"}"#.into());

        assert!(login_with(&db, vec![frame]).await.is_none());
    }

    #[tokio::test]
    async fn binary_first_frame_is_rejected() {
        let db = db_with_alice();
        let frame = Message::Binary(vec![1, 2, 3].into());

        assert!(login_with(&db, vec![frame]).await.is_none());
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let db = db_with_alice();
        let frame = Message::Text(r#"{"username":"mallory","password":"secret99"}"#.into());

        assert!(login_with(&db, vec![frame]).await.is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let db = db_with_alice();
        let frame = Message::Text(r#"{"username":"alice","password":"guess"}"#.into());

        assert!(login_with(&db, vec![frame]).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_connection_times_out() {
        let db = db_with_alice();
        let mut never = stream::pending::<Result<Message, axum::Error>>();

        assert!(wait_for_login(&mut never, &db).await.is_none());
    }
}
