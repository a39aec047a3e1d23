pub mod auth;
pub mod channels;
pub mod error;
pub mod messages;

use std::sync::Arc;

use parley_db::Database;
use parley_gateway::fanout::Broadcaster;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub broadcaster: Broadcaster,
}

/// Run blocking store work off the async runtime (rusqlite holds a mutex).
pub(crate) async fn run_blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    E: Into<ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task join error: {}", e)))?
        .map_err(Into::into)
}
