//! Frame types and their byte-level encoding.
//!
//! Everything in this module is pure: encoding produces a complete frame as
//! [`Bytes`], decoding consumes a complete frame as a byte slice. Streaming
//! concerns (waiting for a full frame to arrive) live in
//! [`crate::core::codec`].
//!
//! Validation runs as named, ordered steps so a malformed frame always
//! reports the earliest violated rule: header length, magic, type
//! discriminant, per-field length rules, exact payload length, UTF-8.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{EncodingError, ProtocolError, Result};

/// Magic number identifying a valid frame.
pub const MAGIC: u16 = 0xAE73;

/// Type discriminant for a read request.
pub const TYPE_READ: u8 = 1;
/// Type discriminant for a create request.
pub const TYPE_CREATE: u8 = 2;
/// Type discriminant for a message response.
pub const TYPE_RESPONSE: u8 = 3;

/// Fixed request header: magic(2) + type(1) + username len(1) +
/// recipient len(1) + body len(2).
pub const REQUEST_HEADER_LEN: usize = 7;
/// Fixed response header: magic(2) + type(1) + item count(1) + flag(1).
pub const RESPONSE_HEADER_LEN: usize = 5;
/// Per-item sub-header: sender len(1) + body len(2).
pub const ITEM_HEADER_LEN: usize = 3;

/// Maximum username/recipient/sender length in bytes.
pub const MAX_NAME_LEN: usize = 255;
/// Maximum message body length in bytes.
pub const MAX_BODY_LEN: usize = 65_535;
/// Maximum number of items delivered in one response.
pub const MAX_BATCH: usize = 255;

/// A message held by the server until its recipient reads it.
///
/// Created when a valid create request is decoded, owned exclusively by the
/// [`crate::mailbox::Mailbox`], and destroyed when delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub sender: String,
    pub recipient: String,
    pub body: String,
}

/// A client request, either side of the protocol's single exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Retrieve all pending messages addressed to `username`.
    Read { username: String },
    /// Deposit `body` for `recipient`, signed by `username`.
    Create {
        username: String,
        recipient: String,
        body: String,
    },
}

/// One delivered message as it appears on the wire: the recipient is
/// implicit (it is the reader), so only sender and body are carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseItem {
    pub sender: String,
    pub body: String,
}

/// The server's answer to a read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// At most [`MAX_BATCH`] messages, oldest first.
    pub items: Vec<ResponseItem>,
    /// True iff more matching messages remained queued after this batch.
    pub more_available: bool,
}

/// Validated request header fields. Parsing this is the first half of
/// request decoding; it needs only [`REQUEST_HEADER_LEN`] bytes, which lets
/// the streaming codec reject garbage before the payload arrives.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RequestHeader {
    pub(crate) kind: u8,
    pub(crate) username_len: usize,
    pub(crate) recipient_len: usize,
    pub(crate) body_len: usize,
}

impl RequestHeader {
    /// Parse and validate the fixed header. `buf` must hold at least
    /// [`REQUEST_HEADER_LEN`] bytes.
    pub(crate) fn parse(buf: &[u8]) -> std::result::Result<Self, ProtocolError> {
        debug_assert!(buf.len() >= REQUEST_HEADER_LEN);

        let magic = u16::from_be_bytes([buf[0], buf[1]]);
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        let kind = buf[2];
        if kind != TYPE_READ && kind != TYPE_CREATE {
            return Err(ProtocolError::InvalidType(kind));
        }

        let username_len = buf[3] as usize;
        if username_len < 1 {
            return Err(ProtocolError::InvalidUsernameLength);
        }

        let recipient_len = buf[4] as usize;
        let body_len = u16::from_be_bytes([buf[5], buf[6]]) as usize;

        // A read carries no recipient or body; a create carries both.
        let fields_valid = match kind {
            TYPE_READ => recipient_len == 0 && body_len == 0,
            _ => recipient_len >= 1 && body_len >= 1,
        };
        if !fields_valid {
            return Err(ProtocolError::InvalidFieldForType);
        }

        Ok(Self {
            kind,
            username_len,
            recipient_len,
            body_len,
        })
    }

    /// Number of payload bytes the header declares after itself.
    pub(crate) fn payload_len(&self) -> usize {
        self.username_len + self.recipient_len + self.body_len
    }
}

/// Validated response header fields.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResponseHeader {
    pub(crate) item_count: usize,
    pub(crate) more_available: bool,
}

impl ResponseHeader {
    /// Parse and validate the fixed header. `buf` must hold at least
    /// [`RESPONSE_HEADER_LEN`] bytes.
    pub(crate) fn parse(buf: &[u8]) -> std::result::Result<Self, ProtocolError> {
        debug_assert!(buf.len() >= RESPONSE_HEADER_LEN);

        let magic = u16::from_be_bytes([buf[0], buf[1]]);
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        let kind = buf[2];
        if kind != TYPE_RESPONSE {
            return Err(ProtocolError::InvalidType(kind));
        }

        let flag = buf[4];
        if flag > 1 {
            return Err(ProtocolError::InvalidContinuationFlag(flag));
        }

        Ok(Self {
            item_count: buf[3] as usize,
            more_available: flag == 1,
        })
    }
}

impl Request {
    /// Encode this request as a complete frame.
    ///
    /// Fails with [`EncodingError`] if any field violates its length bound;
    /// nothing is emitted in that case.
    pub fn to_bytes(&self) -> std::result::Result<Bytes, EncodingError> {
        match self {
            Request::Read { username } => {
                let username_len = check_name("username", username)?;
                let mut buf = BytesMut::with_capacity(REQUEST_HEADER_LEN + username.len());
                buf.put_u16(MAGIC);
                buf.put_u8(TYPE_READ);
                buf.put_u8(username_len);
                buf.put_u8(0);
                buf.put_u16(0);
                buf.put_slice(username.as_bytes());
                Ok(buf.freeze())
            }
            Request::Create {
                username,
                recipient,
                body,
            } => {
                let username_len = check_name("username", username)?;
                let recipient_len = check_name("recipient", recipient)?;
                let body_len = check_body("body", body)?;
                let mut buf = BytesMut::with_capacity(
                    REQUEST_HEADER_LEN + username.len() + recipient.len() + body.len(),
                );
                buf.put_u16(MAGIC);
                buf.put_u8(TYPE_CREATE);
                buf.put_u8(username_len);
                buf.put_u8(recipient_len);
                buf.put_u16(body_len);
                buf.put_slice(username.as_bytes());
                buf.put_slice(recipient.as_bytes());
                buf.put_slice(body.as_bytes());
                Ok(buf.freeze())
            }
        }
    }

    /// Decode a complete request frame.
    ///
    /// `buf` must contain the whole frame and nothing else; surplus or
    /// missing payload bytes are a [`ProtocolError::LengthMismatch`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < REQUEST_HEADER_LEN {
            return Err(ProtocolError::TooShort.into());
        }
        let header = RequestHeader::parse(buf)?;

        let expected = header.payload_len();
        let actual = buf.len() - REQUEST_HEADER_LEN;
        if actual != expected {
            return Err(ProtocolError::LengthMismatch { expected, actual }.into());
        }

        let payload = &buf[REQUEST_HEADER_LEN..];
        let (username, rest) = payload.split_at(header.username_len);
        let username = decode_utf8("username", username)?;

        if header.kind == TYPE_READ {
            return Ok(Request::Read { username });
        }

        let (recipient, body) = rest.split_at(header.recipient_len);
        Ok(Request::Create {
            username,
            recipient: decode_utf8("recipient", recipient)?,
            body: decode_utf8("body", body)?,
        })
    }

    /// The username the request was made under.
    pub fn username(&self) -> &str {
        match self {
            Request::Read { username } | Request::Create { username, .. } => username,
        }
    }
}

impl Response {
    /// A response carrying no messages.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            more_available: false,
        }
    }

    /// Build a response from a batch taken out of the mailbox. The batch
    /// must already be capped at [`MAX_BATCH`]; `more_available` reports
    /// whether matches remained queued past the cap.
    pub fn from_batch(batch: Vec<StoredMessage>, more_available: bool) -> Self {
        Self {
            items: batch
                .into_iter()
                .map(|message| ResponseItem {
                    sender: message.sender,
                    body: message.body,
                })
                .collect(),
            more_available,
        }
    }

    /// Encode this response as a complete frame.
    pub fn to_bytes(&self) -> std::result::Result<Bytes, EncodingError> {
        if self.items.len() > MAX_BATCH {
            return Err(EncodingError::BatchTooLarge(self.items.len()));
        }

        let payload: usize = self
            .items
            .iter()
            .map(|item| ITEM_HEADER_LEN + item.sender.len() + item.body.len())
            .sum();
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LEN + payload);
        buf.put_u16(MAGIC);
        buf.put_u8(TYPE_RESPONSE);
        buf.put_u8(self.items.len() as u8);
        buf.put_u8(u8::from(self.more_available));

        for item in &self.items {
            let sender_len = check_name("sender", &item.sender)?;
            let body_len = check_body("body", &item.body)?;
            buf.put_u8(sender_len);
            buf.put_u16(body_len);
            buf.put_slice(item.sender.as_bytes());
            buf.put_slice(item.body.as_bytes());
        }

        Ok(buf.freeze())
    }

    /// Decode a complete response frame.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < RESPONSE_HEADER_LEN {
            return Err(ProtocolError::TooShort.into());
        }
        let header = ResponseHeader::parse(buf)?;

        let mut items = Vec::with_capacity(header.item_count);
        let mut offset = RESPONSE_HEADER_LEN;
        for index in 1..=header.item_count {
            let (item, consumed) = decode_item(&buf[offset..], index)?;
            items.push(item);
            offset += consumed;
        }

        // The frame ends with the last item; the request path rejects
        // surplus bytes, so the response path does too.
        if offset != buf.len() {
            return Err(ProtocolError::LengthMismatch {
                expected: offset - RESPONSE_HEADER_LEN,
                actual: buf.len() - RESPONSE_HEADER_LEN,
            }
            .into());
        }

        Ok(Self {
            items,
            more_available: header.more_available,
        })
    }
}

/// Decode one response item from the front of `buf`. Returns the item and
/// the number of bytes it occupied. `index` is 1-based, for error reports.
fn decode_item(buf: &[u8], index: usize) -> Result<(ResponseItem, usize)> {
    if buf.len() < ITEM_HEADER_LEN {
        return Err(ProtocolError::TooShort.into());
    }

    let sender_len = buf[0] as usize;
    let body_len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
    if sender_len < 1 || body_len < 1 {
        return Err(ProtocolError::InvalidSubHeader(index).into());
    }

    let total = ITEM_HEADER_LEN + sender_len + body_len;
    if buf.len() < total {
        return Err(ProtocolError::TooShort.into());
    }

    let sender = decode_utf8("sender", &buf[ITEM_HEADER_LEN..ITEM_HEADER_LEN + sender_len])?;
    let body = decode_utf8("body", &buf[ITEM_HEADER_LEN + sender_len..total])?;
    Ok((ResponseItem { sender, body }, total))
}

fn check_name(field: &'static str, value: &str) -> std::result::Result<u8, EncodingError> {
    let actual = value.len();
    if actual < 1 || actual > MAX_NAME_LEN {
        return Err(EncodingError::FieldLength {
            field,
            max: MAX_NAME_LEN,
            actual,
        });
    }
    Ok(actual as u8)
}

fn check_body(field: &'static str, value: &str) -> std::result::Result<u16, EncodingError> {
    let actual = value.len();
    if actual < 1 || actual > MAX_BODY_LEN {
        return Err(EncodingError::FieldLength {
            field,
            max: MAX_BODY_LEN,
            actual,
        });
    }
    Ok(actual as u16)
}

fn decode_utf8(field: &'static str, raw: &[u8]) -> std::result::Result<String, EncodingError> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| EncodingError::InvalidUtf8(field))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::MaildropError;

    fn read(username: &str) -> Request {
        Request::Read {
            username: username.to_string(),
        }
    }

    fn create(username: &str, recipient: &str, body: &str) -> Request {
        Request::Create {
            username: username.to_string(),
            recipient: recipient.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn read_request_roundtrip() {
        let original = read("alice");
        let bytes = original.to_bytes().unwrap();
        assert_eq!(bytes.len(), REQUEST_HEADER_LEN + 5);
        assert_eq!(&bytes[..2], &[0xAE, 0x73]);

        let decoded = Request::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn create_request_roundtrip() {
        let original = create("alice", "bob", "hi");
        let bytes = original.to_bytes().unwrap();
        assert_eq!(bytes.len(), REQUEST_HEADER_LEN + 5 + 3 + 2);

        let decoded = Request::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn read_request_header_has_zero_length_fields() {
        let bytes = read("ab").to_bytes().unwrap();
        assert_eq!(bytes[4], 0);
        assert_eq!(&bytes[5..7], &[0, 0]);
    }

    #[test]
    fn unicode_fields_measured_in_bytes() {
        let original = create("åsa", "björn", "hëllo wörld");
        let bytes = original.to_bytes().unwrap();
        // "åsa" is 4 bytes, not 3 characters.
        assert_eq!(bytes[3], 4);

        let decoded = Request::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn encode_rejects_out_of_bound_names() {
        assert!(matches!(
            read("").to_bytes(),
            Err(EncodingError::FieldLength {
                field: "username",
                ..
            })
        ));
        assert!(matches!(
            read(&"x".repeat(256)).to_bytes(),
            Err(EncodingError::FieldLength {
                field: "username",
                ..
            })
        ));
        assert!(matches!(
            create("alice", &"r".repeat(256), "hi").to_bytes(),
            Err(EncodingError::FieldLength {
                field: "recipient",
                ..
            })
        ));
    }

    #[test]
    fn encode_accepts_boundary_lengths() {
        let request = create(&"u".repeat(255), &"r".repeat(255), &"b".repeat(65_535));
        let bytes = request.to_bytes().unwrap();
        let decoded = Request::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn encode_rejects_out_of_bound_body() {
        assert!(matches!(
            create("alice", "bob", "").to_bytes(),
            Err(EncodingError::FieldLength { field: "body", .. })
        ));
        assert!(matches!(
            create("alice", "bob", &"b".repeat(65_536)).to_bytes(),
            Err(EncodingError::FieldLength { field: "body", .. })
        ));
    }

    #[test]
    fn decode_rejects_short_header() {
        let err = Request::from_bytes(&[0xAE, 0x73, 1]).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::TooShort)
        ));
    }

    #[test]
    fn decode_rejects_bad_magic_first() {
        // Everything else about this frame is invalid too; the magic check
        // must fire before any of it is looked at.
        let err = Request::from_bytes(&[0xDE, 0xAD, 9, 0, 7, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidMagic)
        ));
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let err = Request::from_bytes(&[0xAE, 0x73, 3, 1, 0, 0, 0, b'a']).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidType(3))
        ));
    }

    #[test]
    fn decode_rejects_zero_username_length() {
        let err = Request::from_bytes(&[0xAE, 0x73, 1, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidUsernameLength)
        ));
    }

    #[test]
    fn decode_rejects_read_with_nonzero_fields() {
        // Read with a recipient-length field.
        let err = Request::from_bytes(&[0xAE, 0x73, 1, 1, 1, 0, 0, b'a', b'b']).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidFieldForType)
        ));

        // Read with a body-length field.
        let err = Request::from_bytes(&[0xAE, 0x73, 1, 1, 0, 0, 2, b'a', b'h', b'i']).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidFieldForType)
        ));
    }

    #[test]
    fn decode_rejects_create_with_zero_fields() {
        let err = Request::from_bytes(&[0xAE, 0x73, 2, 1, 0, 0, 2, b'a', b'h', b'i']).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidFieldForType)
        ));
    }

    #[test]
    fn decode_rejects_payload_length_mismatch() {
        // Header declares 5 username bytes, frame carries 3.
        let err = Request::from_bytes(&[0xAE, 0x73, 1, 5, 0, 0, 0, b'a', b'b', b'c']).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::LengthMismatch {
                expected: 5,
                actual: 3
            })
        ));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let err = Request::from_bytes(&[0xAE, 0x73, 1, 2, 0, 0, 0, 0xFF, 0xFE]).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Encoding(EncodingError::InvalidUtf8("username"))
        ));
    }

    fn sample_response(count: usize, more_available: bool) -> Response {
        Response {
            items: (0..count)
                .map(|i| ResponseItem {
                    sender: format!("sender{i}"),
                    body: format!("body {i}"),
                })
                .collect(),
            more_available,
        }
    }

    #[test]
    fn response_roundtrip() {
        let original = sample_response(3, true);
        let bytes = original.to_bytes().unwrap();
        assert_eq!(&bytes[..5], &[0xAE, 0x73, 3, 3, 1]);

        let decoded = Response::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn empty_response_roundtrip() {
        let bytes = Response::empty().to_bytes().unwrap();
        assert_eq!(bytes.len(), RESPONSE_HEADER_LEN);

        let decoded = Response::from_bytes(&bytes).unwrap();
        assert!(decoded.items.is_empty());
        assert!(!decoded.more_available);
    }

    #[test]
    fn response_encode_rejects_oversized_batch() {
        let err = sample_response(256, true).to_bytes().unwrap_err();
        assert!(matches!(err, EncodingError::BatchTooLarge(256)));
    }

    #[test]
    fn response_decode_rejects_wrong_type() {
        let err = Response::from_bytes(&[0xAE, 0x73, 1, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidType(1))
        ));
    }

    #[test]
    fn response_decode_rejects_bad_continuation_flag() {
        let err = Response::from_bytes(&[0xAE, 0x73, 3, 0, 2]).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidContinuationFlag(2))
        ));
    }

    #[test]
    fn response_decode_names_bad_item_index() {
        // Item #1 is fine; item #2 declares a zero-length sender.
        let mut bytes = BytesMut::new();
        bytes.put_u16(MAGIC);
        bytes.put_u8(TYPE_RESPONSE);
        bytes.put_u8(2);
        bytes.put_u8(0);
        bytes.put_u8(1);
        bytes.put_u16(2);
        bytes.put_slice(b"ahi");
        bytes.put_u8(0);
        bytes.put_u16(2);
        bytes.put_slice(b"hi");

        let err = Response::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::InvalidSubHeader(2))
        ));
    }

    #[test]
    fn response_decode_rejects_trailing_bytes() {
        let mut bytes = BytesMut::from(&sample_response(1, false).to_bytes().unwrap()[..]);
        bytes.put_u8(0x00);

        let err = Response::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn response_decode_rejects_truncated_item() {
        let bytes = sample_response(2, false).to_bytes().unwrap();
        let err = Response::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(
            err,
            MaildropError::Protocol(ProtocolError::TooShort)
        ));
    }

    #[test]
    fn from_batch_drops_recipient() {
        let response = Response::from_batch(
            vec![StoredMessage {
                sender: "alice".into(),
                recipient: "bob".into(),
                body: "hi".into(),
            }],
            false,
        );
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].sender, "alice");
        assert_eq!(response.items[0].body, "hi");
    }
}
