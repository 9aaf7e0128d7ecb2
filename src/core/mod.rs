//! # Core Protocol Components
//!
//! Frame types, byte-level encoding, and stream codecs.
//!
//! This module is the foundation of the protocol: it owns the wire format
//! and every structural invariant a frame must satisfy.
//!
//! ## Wire Format
//! ```text
//! Request:  [Magic(2)] [Type(1)] [UsernameLen(1)] [RecipientLen(1)] [BodyLen(2)]
//!           [Username] [Recipient?] [Body?]
//! Response: [Magic(2)] [Type(1)] [ItemCount(1)] [MoreAvailable(1)]
//!           ItemCount x ([SenderLen(1)] [BodyLen(2)] [Sender] [Body])
//! ```
//! All multi-byte fields are big-endian. Magic is 0xAE73.
//!
//! ## Components
//! - **Wire**: pure encode/decode with every validation as a named step
//! - **Codec**: tokio codecs for framing over byte streams

pub mod codec;
pub mod wire;
