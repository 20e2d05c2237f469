//! BER encoding.
//!
//! Uses a reverse buffer approach: writes from end backwards to avoid
//! needing to pre-calculate lengths.

use super::length::encode_length;
use super::tag;
use crate::error::Result;
use bytes::Bytes;

/// Buffer for BER encoding that writes backwards.
///
/// Content is written first, then the length and tag are prepended. Calls
/// must therefore be made in reverse wire order: the last element of a
/// SEQUENCE is pushed first.
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create a new encode buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    /// Create a new encode buffer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Push a single byte (prepends to front).
    pub fn push_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Push multiple bytes (prepends to front, keeping their order).
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    /// Push a BER length encoding.
    pub fn push_length(&mut self, len: usize) -> Result<()> {
        let (bytes, count) = encode_length(len)?;
        self.buf.extend_from_slice(&bytes[..count]);
        Ok(())
    }

    /// Push a BER tag.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Get the current length of encoded data.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encode a constructed type (SEQUENCE, PDU, etc).
    ///
    /// Calls the closure to encode contents, then wraps with length and tag.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let start_len = self.len();
        f(self)?;
        let content_len = self.len() - start_len;
        self.push_length(content_len)?;
        self.push_tag(tag);
        Ok(())
    }

    /// Encode a SEQUENCE.
    pub fn push_sequence<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.push_constructed(tag::universal::SEQUENCE, f)
    }

    /// Encode a primitive TLV from already-ordered content bytes.
    pub fn push_primitive(&mut self, tag: u8, content: &[u8]) -> Result<()> {
        self.push_bytes(content);
        self.push_length(content.len())?;
        self.push_tag(tag);
        Ok(())
    }

    /// Encode an INTEGER.
    pub fn push_integer(&mut self, value: i64) -> Result<()> {
        let (arr, len) = encode_integer_stack(value);
        self.push_primitive(tag::universal::INTEGER, &arr[8 - len..])
    }

    /// Encode an unsigned integer with a specific tag (Counter32, Gauge32,
    /// TimeTicks, Counter64).
    pub fn push_unsigned(&mut self, tag: u8, value: u64) -> Result<()> {
        let (arr, len) = encode_unsigned_stack(value);
        self.push_primitive(tag, &arr[9 - len..])
    }

    /// Encode an OCTET STRING-shaped value with the given tag.
    pub fn push_octet_string(&mut self, tag: u8, data: &[u8]) -> Result<()> {
        self.push_primitive(tag, data)
    }

    /// Encode a NULL.
    pub fn push_null(&mut self) -> Result<()> {
        self.push_primitive(tag::universal::NULL, &[])
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &crate::oid::Oid) -> Result<()> {
        let ber = oid.to_ber()?;
        self.push_primitive(tag::universal::OBJECT_IDENTIFIER, &ber)
    }

    /// Finalize and return the encoded bytes.
    ///
    /// The buffer is reversed to produce the correct order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }

    /// Finalize and return as `Vec<u8>`.
    pub fn finish_vec(mut self) -> Vec<u8> {
        self.buf.reverse();
        self.buf
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of content bytes for a minimal two's-complement INTEGER.
///
/// A leading 0x00 (0xFF) octet is dropped only while the following octet
/// keeps the sign bit clear (set).
pub const fn integer_content_len(value: i64) -> usize {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    if value >= 0 {
        while start < 7 && bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0 {
            start += 1;
        }
    } else {
        while start < 7 && bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0 {
            start += 1;
        }
    }
    8 - start
}

/// Number of content bytes for an unsigned value encoded as a non-negative INTEGER.
pub const fn unsigned_content_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    // one extra bit for the sign
    bits / 8 + 1
}

/// Encode a signed 64-bit integer in minimal BER form.
///
/// The valid bytes are at the END of the array.
#[inline]
fn encode_integer_stack(value: i64) -> ([u8; 8], usize) {
    (value.to_be_bytes(), integer_content_len(value))
}

/// Encode an unsigned 64-bit integer, adding a 0x00 prefix when the MSB is set.
///
/// The valid bytes are at the END of the array.
#[inline]
fn encode_unsigned_stack(value: u64) -> ([u8; 9], usize) {
    let mut result = [0u8; 9];
    result[1..].copy_from_slice(&value.to_be_bytes());
    (result, unsigned_content_len(value))
}
