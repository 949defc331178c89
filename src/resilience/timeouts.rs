//! Deadline enforcement for worker calls.

use std::future::Future;
use std::time::Duration;

use crate::transport::InvokeError;

/// Run `fut` with a deadline, mapping expiry to [`InvokeError::Timeout`].
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, InvokeError>
where
    F: Future<Output = Result<T, InvokeError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(InvokeError::Timeout(deadline)),
    }
}
