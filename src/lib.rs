//! # Maildrop Protocol
//!
//! A minimal message-drop protocol over TCP: a client either deposits a
//! text message for a named recipient ("create") or retrieves all pending
//! messages addressed to itself ("read"); the server holds undelivered
//! messages in memory and serves them on demand.
//!
//! The wire format is a compact, length-prefixed binary framing with strict
//! field-validation rules; see [`core`] for the byte layout. Retrieval is
//! destructive: a message is delivered to its recipient at most once, in
//! batches of up to 255 with a continuation flag when more remain.
//!
//! ## Components
//! - [`core`]: frame types, byte-level encoding, stream codecs
//! - [`mailbox`]: the in-memory store of undelivered messages
//! - [`service`]: server accept loop and one-shot client exchange
//! - [`config`]: validated server/client configuration
//! - [`error`]: the protocol/encoding/transport error taxonomy
//!
//! ## Example
//! ```no_run
//! use maildrop_protocol::config::ServerConfig;
//! use maildrop_protocol::service::server;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> maildrop_protocol::Result<()> {
//!     let config = ServerConfig::default();
//!     server::serve(&config).await
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod mailbox;
pub mod service;
pub mod utils;

pub use crate::core::wire::{Request, Response, ResponseItem, StoredMessage};
pub use crate::error::{EncodingError, MaildropError, ProtocolError, Result};
pub use crate::mailbox::Mailbox;
