//! Tokio codecs framing maildrop messages over a byte stream.
//!
//! Both codecs validate the fixed header as soon as it is buffered, so an
//! unrelated or garbled peer is rejected before its payload is consumed.
//! Payload-level validation is delegated to [`crate::core::wire`] once a
//! complete frame has arrived.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::core::wire::{
    Request, RequestHeader, Response, ResponseHeader, ITEM_HEADER_LEN, REQUEST_HEADER_LEN,
    RESPONSE_HEADER_LEN,
};
use crate::error::{MaildropError, ProtocolError};

/// Server-side codec: decodes [`Request`] frames, encodes [`Response`]
/// frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerCodec;

impl Decoder for ServerCodec {
    type Item = Request;
    type Error = MaildropError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>, MaildropError> {
        if src.len() < REQUEST_HEADER_LEN {
            return Ok(None);
        }

        let header = RequestHeader::parse(src)?;
        let frame_len = REQUEST_HEADER_LEN + header.payload_len();
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        Request::from_bytes(&frame).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Request>, MaildropError> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None if src.is_empty() => Ok(None),
            None if src.len() < REQUEST_HEADER_LEN => Err(ProtocolError::TooShort.into()),
            None => {
                // Header was valid (decode would have errored otherwise);
                // the peer closed before delivering the declared payload.
                let header = RequestHeader::parse(src)?;
                Err(ProtocolError::LengthMismatch {
                    expected: header.payload_len(),
                    actual: src.len() - REQUEST_HEADER_LEN,
                }
                .into())
            }
        }
    }
}

impl Encoder<Response> for ServerCodec {
    type Error = MaildropError;

    fn encode(&mut self, response: Response, dst: &mut BytesMut) -> Result<(), MaildropError> {
        let bytes = response.to_bytes()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Client-side codec: encodes [`Request`] frames, decodes [`Response`]
/// frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientCodec;

impl Decoder for ClientCodec {
    type Item = Response;
    type Error = MaildropError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Response>, MaildropError> {
        if src.len() < RESPONSE_HEADER_LEN {
            return Ok(None);
        }

        let header = ResponseHeader::parse(src)?;

        // Walk the item sub-headers that have arrived so far to learn the
        // full frame length, rejecting invalid sub-headers as soon as they
        // are visible.
        let mut frame_len = RESPONSE_HEADER_LEN;
        for index in 1..=header.item_count {
            let rest = &src[frame_len..];
            if rest.len() < ITEM_HEADER_LEN {
                return Ok(None);
            }
            let sender_len = rest[0] as usize;
            let body_len = u16::from_be_bytes([rest[1], rest[2]]) as usize;
            if sender_len < 1 || body_len < 1 {
                return Err(ProtocolError::InvalidSubHeader(index).into());
            }
            frame_len += ITEM_HEADER_LEN + sender_len + body_len;
            if src.len() < frame_len {
                src.reserve(frame_len - src.len());
                return Ok(None);
            }
        }

        let frame = src.split_to(frame_len);
        Response::from_bytes(&frame).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Response>, MaildropError> {
        match self.decode(src)? {
            Some(response) => Ok(Some(response)),
            None if src.is_empty() => Ok(None),
            None => Err(ProtocolError::TooShort.into()),
        }
    }
}

impl Encoder<Request> for ClientCodec {
    type Error = MaildropError;

    fn encode(&mut self, request: Request, dst: &mut BytesMut) -> Result<(), MaildropError> {
        let bytes = request.to_bytes()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}
