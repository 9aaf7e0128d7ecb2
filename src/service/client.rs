//! Maildrop client: a single request/response exchange.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::config::ClientConfig;
use crate::core::codec::ClientCodec;
use crate::core::wire::{Request, Response};
use crate::error::{MaildropError, Result};
use crate::utils::timeout::deadline;

/// Drive exactly one exchange against the server.
///
/// Sends `request` and, for a read, awaits and decodes the response; a
/// create yields `None` because the protocol defines no acknowledgment
/// frame. The socket is closed on every path, and nothing is retried.
pub async fn exchange(config: &ClientConfig, request: Request) -> Result<Option<Response>> {
    let stream = deadline(
        config.connect_timeout,
        TcpStream::connect((config.host.as_str(), config.port)),
    )
    .await??;
    debug!(host = %config.host, port = config.port, "Connected");

    let mut framed = Framed::new(stream, ClientCodec);

    let wants_response = matches!(request, Request::Read { .. });
    deadline(config.io_timeout, framed.send(request)).await??;

    if !wants_response {
        return Ok(None);
    }

    match deadline(config.io_timeout, framed.next()).await? {
        Some(response) => Ok(Some(response?)),
        // Server hung up without a response frame.
        None => Err(MaildropError::ConnectionClosed),
    }
}
