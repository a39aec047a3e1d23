use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

// -- Requests --

/// Every mutating endpoint re-verifies these; there are no session tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub username: String,
    pub password: String,
    pub channel_name: String,
    /// Usernames to enroll alongside the creator.
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditChannelRequest {
    pub username: String,
    pub password: String,
    pub channel_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub username: String,
    pub password: String,
    pub message: String,
}

// -- Responses --

/// Bare `{state: tag}` body for endpoints with nothing else to report.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub state: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserCreatedResponse {
    pub state: &'static str,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ChannelCreatedResponse {
    pub state: &'static str,
    pub channel_id: String,
}

#[derive(Debug, Serialize)]
pub struct DmStartedResponse {
    pub state: &'static str,
    pub channel_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageSentResponse {
    pub state: &'static str,
    pub message_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    pub channel_id: String,
    pub channel_name: String,
}

#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    pub channels: Vec<ChannelSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
}
