use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use parley_types::api::StateResponse;

/// Handler failures, each mapped to a `{state: <tag>}` body and a status.
/// Everything here is recovered at the handler boundary; nothing escapes
/// the request scope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or empty fields")]
    MissingFields,
    #[error("username already taken")]
    UserAlreadyExists,
    #[error("username not registered")]
    EmailNotRegistered,
    #[error("wrong password")]
    WrongPassword,
    #[error("credentials rejected")]
    WrongCredentials,
    #[error("no access to channel")]
    NoAccess,
    #[error("channel not found")]
    ChannelNotFound,
    #[error("channel needs at least one member")]
    NoMembers,
    #[error("member list contains an unknown user")]
    ContainsInvalidUser,
    #[error("other user not found")]
    OtherUserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingFields => (StatusCode::BAD_REQUEST, "missing-fields"),
            Self::UserAlreadyExists => (StatusCode::BAD_REQUEST, "user-already-exists"),
            Self::EmailNotRegistered => (StatusCode::NOT_FOUND, "email-not-registered"),
            Self::WrongPassword => (StatusCode::FORBIDDEN, "wrong-password"),
            Self::WrongCredentials => (StatusCode::FORBIDDEN, "wrong-credentials"),
            Self::NoAccess => (StatusCode::FORBIDDEN, "no-access"),
            Self::ChannelNotFound => (StatusCode::NOT_FOUND, "channel-not-found"),
            Self::NoMembers => (StatusCode::BAD_REQUEST, "no-members"),
            Self::ContainsInvalidUser => (StatusCode::BAD_REQUEST, "contains-invalid-user"),
            Self::OtherUserNotFound => (StatusCode::NOT_FOUND, "other-user-not-found"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal-error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!("internal error: {:#}", e);
        }
        let (status, state) = self.parts();
        (status, Json(StateResponse { state })).into_response()
    }
}
