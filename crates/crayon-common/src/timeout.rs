use std::future::Future;
use std::time::Duration;

use crate::{Error, Result};

/// Run a fallible external call with an upper bound on its duration.
///
/// Expiry is reported as [`Error::Timeout`] so callers can route it down the
/// same path as any other transport failure.
pub async fn with_timeout<T, F>(operation: &str, after: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: operation.to_string(),
            after,
        }),
    }
}
