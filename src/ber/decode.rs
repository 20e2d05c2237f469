//! BER decoding.
//!
//! Zero-copy decoding using `Bytes` to avoid allocations. Offsets reported in
//! errors and [`Span`]s are absolute positions in the buffer the top-level
//! decoder was created from.

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::value::{AsnData, AsnValue, Exception, OctetSubtype, Span, Unsigned32Kind};
use bytes::Bytes;

/// Deepest nesting of constructed elements [`Decoder::read_value`] accepts.
///
/// An SNMP message nests five levels (message, PDU, varbind list, varbind,
/// value).
pub const MAX_DEPTH: usize = 32;

/// BER decoder that reads from a byte buffer.
pub struct Decoder {
    data: Bytes,
    offset: usize,
    base: usize,
    depth: usize,
}

impl Decoder {
    /// Create a new decoder from bytes.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            offset: 0,
            base: 0,
            depth: 0,
        }
    }

    /// Create a decoder from a byte slice (copies the data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Absolute offset of the next byte.
    pub fn offset(&self) -> usize {
        self.base + self.offset
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Check if we've reached the end.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Read a tag byte.
    pub fn read_tag(&mut self) -> Result<u8> {
        let Some(&byte) = self.data.get(self.offset) else {
            tracing::debug!(target: "snmp_stack::ber", { snmp.offset = self.offset() }, "truncated data: unexpected end of input");
            return Err(Error::decode(self.offset(), DecodeErrorKind::TruncatedData));
        };
        self.offset += 1;
        Ok(byte)
    }

    /// Read a length field.
    pub fn read_length(&mut self) -> Result<usize> {
        let (len, consumed) = decode_length(&self.data[self.offset..], self.offset())?;
        self.offset += consumed;
        Ok(len)
    }

    /// Read raw bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        if self.offset.saturating_add(len) > self.data.len() {
            tracing::debug!(target: "snmp_stack::ber", { snmp.offset = self.offset(), needed = len, available = self.remaining() }, "declared length exceeds available data");
            return Err(Error::decode(
                self.offset(),
                DecodeErrorKind::TlvOverflow {
                    declared: len,
                    available: self.remaining(),
                },
            ));
        }
        let bytes = self.data.slice(self.offset..self.offset + len);
        self.offset += len;
        Ok(bytes)
    }

    /// Read one complete element, recursing into constructed types.
    ///
    /// Framing faults (truncation, bad length octets) are errors. Content
    /// faults produce an incorrect `Null` in place of the element.
    pub fn read_value(&mut self) -> Result<AsnValue> {
        let start = self.offset();
        let tag = self.read_tag()?;
        let len = self.read_length()?;
        let header_len = self.offset() - start;
        let content_offset = self.offset();
        let content = self.read_bytes(len)?;

        let span = Span {
            offset: start,
            header_len,
            content_len: len,
        };

        if tag::is_constructed(tag) {
            if self.depth >= MAX_DEPTH {
                tracing::debug!(target: "snmp_stack::ber", { snmp.offset = start, max = MAX_DEPTH }, "constructed elements nested too deep");
                return Err(Error::decode(
                    start,
                    DecodeErrorKind::NestingTooDeep { max: MAX_DEPTH },
                ));
            }
            let mut inner = Decoder {
                data: content,
                offset: 0,
                base: content_offset,
                depth: self.depth + 1,
            };
            let mut items = Vec::new();
            while !inner.is_empty() {
                items.push(inner.read_value()?);
            }
            return Ok(AsnValue::decoded(AsnData::Sequence(tag, items), span));
        }

        match decode_primitive(tag, &content) {
            Some(data) => Ok(AsnValue::decoded(data, span)),
            None => {
                tracing::debug!(target: "snmp_stack::ber", { snmp.offset = start, tag = tag, length = len }, "undecodable element, marking invalid");
                Ok(AsnValue::invalid(tag, span))
            }
        }
    }

    /// Read one element that must be a constructed type with `expected` tag,
    /// returning its children.
    pub fn read_constructed(&mut self, expected: u8) -> Result<(Vec<AsnValue>, Span)> {
        let start = self.offset();
        let value = self.read_value()?;
        if value.tag() != expected {
            tracing::debug!(target: "snmp_stack::ber", { snmp.offset = start, expected = expected, actual = value.tag() }, "unexpected tag");
            return Err(Error::decode(
                start,
                DecodeErrorKind::UnexpectedTag {
                    expected,
                    actual: value.tag(),
                },
            ));
        }
        let span = value.span().unwrap_or(Span {
            offset: start,
            header_len: 0,
            content_len: 0,
        });
        Ok((value.into_items().unwrap_or_default(), span))
    }

    /// Get the underlying bytes for the entire buffer.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }
}

/// Interpret the content of a primitive element. `None` means the content is
/// malformed for its tag, or the tag is unknown.
fn decode_primitive(tag: u8, content: &Bytes) -> Option<AsnData> {
    match tag {
        tag::universal::INTEGER => decode_signed(content).map(AsnData::Integer),
        tag::universal::NULL => content.is_empty().then_some(AsnData::Null),
        tag::universal::OBJECT_IDENTIFIER => Oid::from_ber(content).ok().map(AsnData::ObjectId),
        tag::universal::BIT_STRING => {
            let (&unused, bits) = content.split_first()?;
            if unused > 7 || (bits.is_empty() && unused != 0) {
                return None;
            }
            Some(AsnData::BitString(unused, content.slice(1..)))
        }
        tag::application::COUNTER64 => decode_unsigned(content).map(AsnData::Unsigned64),
        t => {
            if let Some(kind) = Unsigned32Kind::from_tag(t) {
                let v = decode_unsigned(content)?;
                return u32::try_from(v).ok().map(|v| AsnData::Unsigned32(kind, v));
            }
            if let Some(subtype) = OctetSubtype::from_tag(t) {
                return Some(AsnData::OctetString(subtype, content.clone()));
            }
            if let Some(e) = Exception::from_tag(t) {
                return content.is_empty().then_some(AsnData::Exception(e));
            }
            None
        }
    }
}

/// Two's-complement INTEGER, 1 to 8 bytes. Non-minimal encodings are accepted.
fn decode_signed(content: &[u8]) -> Option<i64> {
    let (&first, _) = content.split_first()?;
    let significant = strip_redundant_sign(content);
    if significant.len() > 8 {
        return None;
    }
    let init: i64 = if first & 0x80 != 0 { -1 } else { 0 };
    Some(
        significant
            .iter()
            .fold(init, |acc, &b| (acc << 8) | i64::from(b)),
    )
}

/// Drop leading bytes that only repeat the sign.
fn strip_redundant_sign(content: &[u8]) -> &[u8] {
    let mut s = content;
    while s.len() > 1 {
        let redundant = (s[0] == 0x00 && s[1] & 0x80 == 0) || (s[0] == 0xFF && s[1] & 0x80 != 0);
        if !redundant {
            break;
        }
        s = &s[1..];
    }
    s
}

/// Unsigned value encoded as INTEGER content. Leading zero bytes are
/// skipped; at most 8 significant bytes are accepted.
fn decode_unsigned(content: &[u8]) -> Option<u64> {
    if content.is_empty() {
        return None;
    }
    let mut s = content;
    while s.len() > 1 && s[0] == 0 {
        s = &s[1..];
    }
    if s.len() > 8 {
        return None;
    }
    Some(s.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}
