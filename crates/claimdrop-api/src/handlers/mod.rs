pub mod claims;
pub mod health;
pub mod notifications;

use claimdrop_core::AppError;
use std::future::Future;
use std::time::Duration;

/// Run `operation` under a deadline. On expiry the future is dropped, which
/// cancels any in-flight registry or store call; completed writes stay.
pub(crate) async fn with_deadline<T, F>(
    deadline: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, deadline_ms = deadline.as_millis() as u64, "Deadline exceeded");
            Err(AppError::Timeout(format!(
                "{} exceeded {:?}",
                operation, deadline
            )))
        }
    }
}
