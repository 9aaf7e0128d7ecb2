//! # Error Types
//!
//! Error handling for the maildrop protocol.
//!
//! This module defines all error variants that can occur during protocol
//! operations, from low-level I/O failures to frame-validation violations.
//!
//! ## Error Categories
//! - **Protocol Errors**: malformed or rule-violating frames received from a peer
//! - **Encoding Errors**: field bounds or UTF-8 violations caught before/after framing
//! - **Timeout / Transport Errors**: socket I/O that exceeded its deadline or failed
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// Violations of the wire protocol's framing and field-validation rules.
///
/// Each variant corresponds to one named validation step; the steps run in
/// a fixed order, so a peer always sees the earliest applicable error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame too short for a complete header")]
    TooShort,

    #[error("incorrect magic number")]
    InvalidMagic,

    #[error("unknown type discriminant: {0}")]
    InvalidType(u8),

    #[error("username length field must be at least 1")]
    InvalidUsernameLength,

    #[error("recipient/body length fields are not valid for this message type")]
    InvalidFieldForType,

    #[error("length mismatch: expected {expected} payload bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid sub-header on item #{0}")]
    InvalidSubHeader(usize),

    #[error("continuation flag must be 0 or 1, got {0}")]
    InvalidContinuationFlag(u8),
}

/// Failures while building field contents for the wire, or decoding them
/// back into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("{field} must be 1-{max} bytes, got {actual}")]
    FieldLength {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("response batch of {0} items exceeds the 255-item cap")]
    BatchTooLarge(usize),
}

/// Top-level error type for all maildrop operations.
#[derive(Error, Debug)]
pub enum MaildropError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("operation timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Type alias for Results using MaildropError
pub type Result<T> = std::result::Result<T, MaildropError>;
