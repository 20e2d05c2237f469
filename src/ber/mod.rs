//! BER (Basic Encoding Rules) codec for SNMP.
//!
//! Encoding writes into a reverse buffer ([`EncodeBuf`]) so that lengths are
//! known before their headers are written. Decoding ([`Decoder`]) is
//! zero-copy over [`bytes::Bytes`] and permissive: a malformed element
//! inside a well-framed container decodes as an incorrect `Null` rather than
//! failing the whole message. Only framing faults (truncation, bad length
//! octets) abort decoding.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
pub use tag::*;

use bytes::Bytes;

use crate::error::Result;
use crate::value::AsnValue;

/// Decode exactly one BER element from the start of `data`.
///
/// Trailing bytes after the element are ignored.
pub fn decode(data: impl Into<Bytes>) -> Result<AsnValue> {
    Decoder::new(data.into()).read_value()
}

/// Encode a value into a freshly allocated buffer.
pub fn encode(value: &AsnValue) -> Result<Bytes> {
    let mut buf = EncodeBuf::with_capacity(value.encoded_len());
    value.encode(&mut buf)?;
    Ok(buf.finish())
}
