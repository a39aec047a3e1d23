use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use parley_types::PUBLIC_CHANNEL_ID;
use parley_types::api::{
    ChannelCreatedResponse, ChannelListResponse, ChannelSummary, CreateChannelRequest, Credentials,
    DmStartedResponse, EditChannelRequest, StateResponse,
};

use crate::auth::require_user;
use crate::error::{ApiError, ApiResult};
use crate::{AppState, run_blocking};

/// Channels the caller belongs to explicitly. The public channel is always
/// reachable and is not listed.
pub async fn get_channels(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<ChannelListResponse>> {
    let user = require_user(&state, req.username, req.password).await?;

    let db = state.db.clone();
    let rows = run_blocking(move || db.channels_for_user(&user.id)).await?;

    let channels = rows
        .into_iter()
        .map(|row| ChannelSummary {
            channel_id: row.id,
            channel_name: row.name.unwrap_or_default(),
        })
        .collect();

    Ok(Json(ChannelListResponse { channels }))
}

pub async fn create_channel(
    State(state): State<AppState>,
    Json(req): Json<CreateChannelRequest>,
) -> ApiResult<Json<ChannelCreatedResponse>> {
    let creator = require_user(&state, req.username, req.password).await?;

    let channel_name = req.channel_name.trim().to_string();
    if channel_name.is_empty() {
        return Err(ApiError::MissingFields);
    }
    let members: Vec<String> = req
        .members
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if members.is_empty() {
        return Err(ApiError::NoMembers);
    }

    let db = state.db.clone();
    let channel_id = run_blocking(move || -> Result<String, ApiError> {
        // Resolve everybody before creating anything.
        let mut member_ids = vec![creator.id.clone()];
        for username in &members {
            let user = db
                .get_user_by_username(username)
                .map_err(ApiError::Internal)?
                .ok_or(ApiError::ContainsInvalidUser)?;
            if user.id != creator.id {
                member_ids.push(user.id);
            }
        }

        let channel_id = Uuid::new_v4().to_string();
        db.create_channel(&channel_id, Some(&channel_name), "group_chat")
            .map_err(ApiError::Internal)?;
        for member_id in &member_ids {
            db.create_membership(member_id, &channel_id)
                .map_err(ApiError::Internal)?;
        }
        Ok(channel_id)
    })
    .await?;

    Ok(Json(ChannelCreatedResponse {
        state: "channel-created",
        channel_id,
    }))
}

pub async fn start_dm(
    State(state): State<AppState>,
    Path(other_user_id): Path<String>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<DmStartedResponse>> {
    let caller = require_user(&state, req.username, req.password).await?;

    let db = state.db.clone();
    let channel_id = run_blocking(move || -> Result<String, ApiError> {
        let other = db
            .get_user_by_id(&other_user_id)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::OtherUserNotFound)?;

        let channel_id = Uuid::new_v4().to_string();
        db.create_channel(&channel_id, Some(&other.name), "dm")
            .map_err(ApiError::Internal)?;
        db.create_membership(&caller.id, &channel_id)
            .map_err(ApiError::Internal)?;
        db.create_membership(&other.id, &channel_id)
            .map_err(ApiError::Internal)?;
        Ok(channel_id)
    })
    .await?;

    Ok(Json(DmStartedResponse {
        state: "dm-started",
        channel_id,
    }))
}

pub async fn edit_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(req): Json<EditChannelRequest>,
) -> ApiResult<Json<StateResponse>> {
    let user = require_user(&state, req.username, req.password).await?;

    let channel_name = req.channel_name.trim().to_string();
    if channel_name.is_empty() {
        return Err(ApiError::MissingFields);
    }

    let db = state.db.clone();
    run_blocking(move || -> Result<(), ApiError> {
        let channel = db
            .get_channel(&channel_id)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::ChannelNotFound)?;

        // The public channel is nobody's to rename.
        if channel.id == PUBLIC_CHANNEL_ID || channel.channel_type == "public_chat" {
            return Err(ApiError::NoAccess);
        }
        if !db
            .membership_exists(&user.id, &channel.id)
            .map_err(ApiError::Internal)?
        {
            return Err(ApiError::NoAccess);
        }

        db.rename_channel(&channel.id, &channel_name)
            .map_err(ApiError::Internal)?;
        Ok(())
    })
    .await?;

    Ok(Json(StateResponse {
        state: "channel-edited",
    }))
}
