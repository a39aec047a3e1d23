use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// First frame on a fresh realtime connection. Anything else, or a failed
/// verification, closes the socket.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginFrame {
    pub username: String,
    pub password: String,
}

/// Frames sent by an authenticated client. Unrecognized `type` tags fail to
/// parse and are ignored by the session loop (forward compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    Typing { channel_id: String },
    StopTyping { channel_id: String },
}

/// Events pushed to clients. The `state` tag is the wire discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Handshake accepted; the session is now registered.
    Authenticated { user_id: Uuid, name: String },

    /// Handshake rejected; the connection closes right after this frame.
    WrongCredentials,

    /// A message was persisted in a channel the recipient can access.
    NewMessage {
        id: Uuid,
        content: String,
        author: Uuid,
        author_name: String,
        channel_id: String,
        created_at: i64,
    },

    /// A user started (or refreshed) a typing episode.
    Typing {
        user_id: Uuid,
        channel_id: String,
        name: String,
    },

    /// A typing episode ended, explicitly or by timeout.
    StopTyping {
        user_id: Uuid,
        channel_id: String,
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_use_kebab_case_type_tags() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"stop-typing","channel_id":"public-chat"}"#).unwrap();
        match frame {
            ClientFrame::StopTyping { channel_id } => assert_eq!(channel_id, "public-chat"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn unknown_client_frame_fails_to_parse() {
        let result = serde_json::from_str::<ClientFrame>(r#"{"type":"ping"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn server_events_are_flat_state_tagged_objects() {
        let event = ServerEvent::Typing {
            user_id: Uuid::nil(),
            channel_id: "public-chat".into(),
            name: "alice".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["state"], "typing");
        assert_eq!(value["channel_id"], "public-chat");
        assert_eq!(value["name"], "alice");

        let rejected = serde_json::to_value(&ServerEvent::WrongCredentials).unwrap();
        assert_eq!(rejected["state"], "wrong-credentials");
    }

    #[test]
    fn new_message_projection_carries_all_fields() {
        let event = ServerEvent::NewMessage {
            id: Uuid::nil(),
            content: "hi".into(),
            author: Uuid::nil(),
            author_name: "alice".into(),
            channel_id: "public-chat".into(),
            created_at: 1_700_000_000,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["state"], "new-message");
        assert_eq!(value["author_name"], "alice");
        assert_eq!(value["created_at"], 1_700_000_000);
    }
}
