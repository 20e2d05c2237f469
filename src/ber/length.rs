//! BER length encoding and decoding.
//!
//! Length encoding follows X.690 Section 8.1.3:
//! - Short form: Single byte, bit 8=0, value 0-127
//! - Long form: Initial byte (bit 8=1, bits 7-1=count), followed by length bytes
//! - Indefinite form (0x80): Rejected
//!
//! At most three length octets are supported, so the largest content this
//! codec frames is 16 MiB - 1.

use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, Result};

/// Maximum number of long-form length octets.
pub const MAX_LENGTH_OCTETS: usize = 3;

/// Largest length representable with [`MAX_LENGTH_OCTETS`].
pub const MAX_LENGTH: usize = 0xFF_FFFF;

/// Encode a length value (returns bytes in reverse order for prepending).
///
/// Uses short form for lengths <= 127, long form otherwise.
pub fn encode_length(len: usize) -> Result<([u8; 4], usize)> {
    let mut buf = [0u8; 4];

    if len <= 127 {
        buf[0] = len as u8;
        Ok((buf, 1))
    } else if len <= 0xFF {
        buf[0] = len as u8;
        buf[1] = 0x81;
        Ok((buf, 2))
    } else if len <= 0xFFFF {
        buf[0] = len as u8;
        buf[1] = (len >> 8) as u8;
        buf[2] = 0x82;
        Ok((buf, 3))
    } else if len <= MAX_LENGTH {
        buf[0] = len as u8;
        buf[1] = (len >> 8) as u8;
        buf[2] = (len >> 16) as u8;
        buf[3] = 0x83;
        Ok((buf, 4))
    } else {
        Err(Error::encode(EncodeErrorKind::LengthOverflow { length: len }))
    }
}

/// Number of bytes [`encode_length`] produces for `len`.
#[inline]
pub const fn length_len(len: usize) -> usize {
    if len <= 127 {
        1
    } else if len <= 0xFF {
        2
    } else if len <= 0xFFFF {
        3
    } else {
        4
    }
}

/// Decode a length from bytes, returning (length, bytes_consumed)
///
/// The `base_offset` parameter is used to report error offsets correctly
/// when this is called from within a decoder.
pub fn decode_length(data: &[u8], base_offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    if first == 0x80 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::IndefiniteLength,
        ));
    }

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let num_octets = (first & 0x7F) as usize;
    if num_octets > MAX_LENGTH_OCTETS {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthTooLong { octets: num_octets },
        ));
    }

    let Some(octets) = data.get(1..1 + num_octets) else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    let len = octets
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);

    Ok((len, 1 + num_octets))
}
