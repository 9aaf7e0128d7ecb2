//! Maildrop server: sequential accept loop and per-connection sessions.
//!
//! Each connection is driven through exactly one protocol exchange: one
//! request in, and for a read, one response out. Connections are handled
//! strictly one at a time, so the mailbox is owned by the accept loop and
//! never shared; every error while servicing a connection is local to that
//! connection and the loop carries on.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use tokio_util::codec::Framed;

use crate::config::ServerConfig;
use crate::core::codec::ServerCodec;
use crate::core::wire::{Request, Response, StoredMessage};
use crate::error::{ProtocolError, Result};
use crate::mailbox::Mailbox;
use crate::utils::timeout::deadline;

/// Start the server and run until ctrl-c.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    // Create internal shutdown channel
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    // Set up ctrl-c handler that sends to our internal shutdown channel
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    serve_with_shutdown(config, shutdown_rx).await
}

/// Start the server with an external shutdown channel.
pub async fn serve_with_shutdown(
    config: &ServerConfig,
    shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "Listening");

    serve_on(listener, config.io_timeout, shutdown_rx).await
}

/// Accept loop over an already-bound listener (useful for embedding and
/// tests, where the listener is bound to an ephemeral port first).
///
/// The mailbox is created here, lives as long as the loop, and is mutated
/// only between accepts; there is no concurrent connection handling.
pub async fn serve_on(
    listener: TcpListener,
    io_timeout: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let mut mailbox = Mailbox::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!(pending = mailbox.len(), "Shutting down");
                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        info!(peer = %peer, "Connection accepted");
                        if let Err(e) = handle_connection(stream, &mut mailbox, io_timeout).await {
                            warn!(peer = %peer, error = %e, "Connection aborted");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

/// Drive one connection through its single exchange.
///
/// The mailbox is only mutated after the request has fully validated; a
/// decode failure, timeout, or transport error leaves it untouched.
async fn handle_connection(
    stream: TcpStream,
    mailbox: &mut Mailbox,
    io_timeout: Duration,
) -> Result<()> {
    let mut framed = Framed::new(stream, ServerCodec);

    let request = match deadline(io_timeout, framed.next()).await? {
        Some(request) => request?,
        // Peer closed before sending a complete header.
        None => return Err(ProtocolError::TooShort.into()),
    };
    debug!(user = %request.username(), "Request validated");

    // Bytes past the declared frame are a framing violation, the same as a
    // short payload.
    let trailing = framed.read_buffer().len();
    if trailing > 0 {
        let declared = declared_payload_len(&request);
        return Err(ProtocolError::LengthMismatch {
            expected: declared,
            actual: declared + trailing,
        }
        .into());
    }

    match request {
        Request::Create {
            username,
            recipient,
            body,
        } => {
            info!(from = %username, to = %recipient, "Message stored");
            // No acknowledgment frame is defined; the connection just
            // closes after the append.
            mailbox.append(StoredMessage {
                sender: username,
                recipient,
                body,
            });
        }
        Request::Read { username } => {
            let (batch, more_available) = mailbox.take_for(&username);
            let count = batch.len();
            let response = Response::from_batch(batch, more_available);
            deadline(io_timeout, framed.send(response)).await??;
            info!(user = %username, count, more_available, "Messages delivered");
        }
    }

    Ok(())
}

/// Payload length the request's frame declared, reconstructed for error
/// reporting.
fn declared_payload_len(request: &Request) -> usize {
    match request {
        Request::Read { username } => username.len(),
        Request::Create {
            username,
            recipient,
            body,
        } => username.len() + recipient.len() + body.len(),
    }
}
