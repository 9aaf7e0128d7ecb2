//! Async deadline helpers.
//!
//! Every socket operation in the protocol is bounded by a fixed deadline;
//! exceeding it is a recoverable [`MaildropError::Timeout`] that aborts the
//! current exchange only.

use std::future::Future;
use std::time::Duration;

use crate::error::{MaildropError, Result};

/// Default bound on a single socket read or write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Default bound on establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Run `fut` under `limit`, mapping elapse to [`MaildropError::Timeout`].
pub async fn deadline<F>(limit: Duration, fut: F) -> Result<F::Output>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| MaildropError::Timeout)
}
