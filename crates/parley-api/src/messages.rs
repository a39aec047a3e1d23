use axum::Json;
use axum::extract::{Path, State};
use tracing::warn;
use uuid::Uuid;

use parley_db::models::MessageRow;
use parley_gateway::access::{self, Access};
use parley_types::api::{Credentials, MessageListResponse, MessageSentResponse, SendMessageRequest};
use parley_types::models::Message;

use crate::auth::require_user;
use crate::error::{ApiError, ApiResult};
use crate::{AppState, run_blocking};

pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<MessageListResponse>> {
    let user = require_user(&state, req.username, req.password).await?;
    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let db = state.db.clone();
    let rows = run_blocking(move || -> Result<Vec<MessageRow>, ApiError> {
        match access::check_access(&db, user_id, &channel_id).map_err(ApiError::Internal)? {
            Access::Granted => {}
            Access::Denied => return Err(ApiError::NoAccess),
            Access::ChannelNotFound => return Err(ApiError::ChannelNotFound),
        }
        db.get_messages(&channel_id).map_err(ApiError::Internal)
    })
    .await?;

    let messages = rows.into_iter().map(project).collect();
    Ok(Json(MessageListResponse { messages }))
}

/// Persist the message, then hand it to the fan-out engine before replying.
pub async fn send_message(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<MessageSentResponse>> {
    let user = require_user(&state, req.username, req.password).await?;
    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let content = req.message.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::MissingFields);
    }

    let message_id = Uuid::new_v4();
    let created_at = chrono::Utc::now().timestamp();

    let db = state.db.clone();
    let message = {
        let content = content.clone();
        let channel_id = channel_id.clone();
        let author_name = user.name.clone();
        run_blocking(move || -> Result<Message, ApiError> {
            match access::check_access(&db, user_id, &channel_id).map_err(ApiError::Internal)? {
                Access::Granted => {}
                Access::Denied => return Err(ApiError::NoAccess),
                Access::ChannelNotFound => return Err(ApiError::ChannelNotFound),
            }

            db.insert_message(
                &message_id.to_string(),
                &content,
                &user_id.to_string(),
                &channel_id,
                created_at,
            )
            .map_err(ApiError::Internal)?;

            Ok(Message {
                id: message_id,
                content,
                author: user_id,
                author_name,
                channel_id,
                created_at,
            })
        })
        .await?
    };

    state.broadcaster.broadcast_message(&message).await;

    Ok(Json(MessageSentResponse {
        state: "message-sent",
        message_id,
    }))
}

fn project(row: MessageRow) -> Message {
    let id = row.id.parse().unwrap_or_else(|e| {
        warn!("corrupt message id '{}': {}", row.id, e);
        Uuid::default()
    });
    let author = row.author_id.parse().unwrap_or_else(|e| {
        warn!("corrupt author_id '{}' on message '{}': {}", row.author_id, row.id, e);
        Uuid::default()
    });
    Message {
        id,
        content: row.content,
        author,
        author_name: row.author_name,
        channel_id: row.channel_id,
        created_at: row.created_at,
    }
}
