pub mod attachments;
pub mod groups;
pub mod health;
pub mod logs;
pub mod messages;
pub mod users;

use minichat_shared::errors::{AppError, AppResult};

/// Runs blocking store work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}
