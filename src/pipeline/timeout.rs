//! Time boxing for collaborator calls
//!
//! ```ignore
//! let value = with_timeout(Duration::from_secs(300), collaborator.generate(&request), "generation").await?;
//! ```
//!
//! The wrapped future is dropped when the time box expires, which cancels it.

use std::future::Future;
use std::time::Duration;

use crate::types::{FactweaveError, Result};

/// Run `future`, failing with `FactweaveError::Timeout` after `timeout`
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(FactweaveError::timeout(operation_name, timeout)),
    }
}
