/// Full-replace reconciliation of the proxy's routing and user tables
pub mod accounts;
pub mod routing;

use crate::error::{SyncError, SyncResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

pub use accounts::reconcile_accounts;
pub use routing::reconcile_routing;

/// Run `pass` to completion or fail with `DeadlineExceeded`.
///
/// The in-flight operation is dropped on expiry; it is never retried.
pub async fn with_deadline<F, T>(operation: &str, deadline: Duration, pass: F) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>>,
{
    match timeout(deadline, pass).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(operation = %operation, deadline_sec = deadline.as_secs(), "deadline exceeded");
            Err(SyncError::deadline(operation, deadline))
        }
    }
}
