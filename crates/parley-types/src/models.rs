use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Channel kinds. Membership rows are only meaningful for `Dm` and
/// `GroupChat`; the public channel is open to every registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Dm,
    GroupChat,
    PublicChat,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::GroupChat => "group_chat",
            Self::PublicChat => "public_chat",
        }
    }

    /// Unknown strings yield `None`; access checks treat that as denied.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dm" => Some(Self::Dm),
            "group_chat" => Some(Self::GroupChat),
            "public_chat" => Some(Self::PublicChat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub author: Uuid,
    pub author_name: String,
    pub channel_id: String,
    /// Unix seconds; messages order by this, ascending.
    pub created_at: i64,
}
