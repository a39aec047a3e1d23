use axum::Json;
use axum::extract::State;
use uuid::Uuid;

use parley_db::credentials::{hash_password, verify_password};
use parley_db::models::UserRow;
use parley_types::api::{Credentials, SignUpRequest, StateResponse, UserCreatedResponse};

use crate::error::{ApiError, ApiResult};
use crate::{AppState, run_blocking};

/// Resolve and verify the credentials every endpoint carries. A single
/// `wrong-credentials` tag covers unknown users and bad passwords here;
/// login reports the two separately.
pub(crate) async fn require_user(
    state: &AppState,
    username: String,
    password: String,
) -> ApiResult<UserRow> {
    let db = state.db.clone();
    run_blocking(move || -> Result<UserRow, ApiError> {
        db.verify_credentials(&username, &password)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::WrongCredentials)
    })
    .await
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<Json<UserCreatedResponse>> {
    let username = req.username.trim().to_string();
    let name = req.name.trim().to_string();
    if username.is_empty() || req.password.is_empty() || name.is_empty() {
        return Err(ApiError::MissingFields);
    }

    let db = state.db.clone();
    let password = req.password;
    let user_id = run_blocking(move || -> Result<Uuid, ApiError> {
        if db
            .get_user_by_username(&username)
            .map_err(ApiError::Internal)?
            .is_some()
        {
            return Err(ApiError::UserAlreadyExists);
        }

        let hash = hash_password(&password).map_err(ApiError::Internal)?;
        let user_id = Uuid::new_v4();
        db.create_user(&user_id.to_string(), &username, &hash, &name)
            .map_err(ApiError::Internal)?;
        Ok(user_id)
    })
    .await?;

    Ok(Json(UserCreatedResponse {
        state: "user-created",
        user_id,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<StateResponse>> {
    let db = state.db.clone();
    run_blocking(move || -> Result<(), ApiError> {
        let user = db
            .get_user_by_username(&req.username)
            .map_err(ApiError::Internal)?
            .ok_or(ApiError::EmailNotRegistered)?;
        if !verify_password(&req.password, &user.password) {
            return Err(ApiError::WrongPassword);
        }
        Ok(())
    })
    .await?;

    Ok(Json(StateResponse {
        state: "correct-credentials",
    }))
}
