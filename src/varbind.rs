//! Variable binding (VarBind) type.
//!
//! A VarBind pairs an OID with a value.

use crate::ber::{EncodeBuf, length_len, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::value::{AsnData, AsnValue};

/// Variable binding - an OID-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    /// The object identifier.
    pub oid: Oid,
    /// The value.
    pub value: AsnValue,
}

impl VarBind {
    /// Create a new VarBind.
    pub fn new(oid: Oid, value: impl Into<AsnValue>) -> Self {
        Self {
            oid,
            value: value.into(),
        }
    }

    /// Create a VarBind with a NULL value (for GET requests).
    pub fn null(oid: Oid) -> Self {
        Self {
            oid,
            value: AsnValue::null(),
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) -> Result<()> {
        buf.push_sequence(|buf| {
            self.value.encode(buf)?;
            buf.push_oid(&self.oid)
        })
    }

    /// Exact encoded size of this VarBind in bytes.
    pub fn encoded_size(&self) -> usize {
        let oid_content = self.oid.ber_len();
        let oid_len = 1 + length_len(oid_content) + oid_content;
        let content_len = oid_len + self.value.encoded_len();
        1 + length_encoded(content_len)
    }

    /// Convert one decoded element (`SEQUENCE { oid, value }`) into a VarBind.
    ///
    /// `index` is the 0-based position in the list, used for error reporting.
    pub fn from_asn(element: AsnValue, index: usize) -> Result<Self> {
        let offset = element.span().map(|s| s.offset).unwrap_or_default();
        let malformed = || Error::decode(offset, DecodeErrorKind::MalformedVarBind { index });

        if element.tag() != tag::universal::SEQUENCE {
            return Err(malformed());
        }
        let mut items = element.into_items().ok_or_else(malformed)?.into_iter();
        let (Some(name), Some(value), None) = (items.next(), items.next(), items.next()) else {
            return Err(malformed());
        };
        match name.into_data() {
            AsnData::ObjectId(oid) => Ok(VarBind { oid, value }),
            _ => Err(malformed()),
        }
    }
}

#[inline]
fn length_encoded(content_len: usize) -> usize {
    length_len(content_len) + content_len
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// Encodes a list of VarBinds as a SEQUENCE of `SEQUENCE { oid, value }`.
pub fn encode_varbind_list(buf: &mut EncodeBuf, varbinds: &[VarBind]) -> Result<()> {
    buf.push_sequence(|buf| {
        for vb in varbinds.iter().rev() {
            vb.encode(buf)?;
        }
        Ok(())
    })
}

/// Exact encoded size of a VarBind list.
pub fn varbind_list_size(varbinds: &[VarBind]) -> usize {
    let content: usize = varbinds.iter().map(VarBind::encoded_size).sum();
    1 + length_encoded(content)
}

/// Converts a decoded varbind-list element into VarBinds.
pub fn decode_varbind_list(list: AsnValue) -> Result<Vec<VarBind>> {
    let offset = list.span().map(|s| s.offset).unwrap_or_default();
    if list.tag() != tag::universal::SEQUENCE {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::UnexpectedTag {
                expected: tag::universal::SEQUENCE,
                actual: list.tag(),
            },
        ));
    }
    list.into_items()
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, element)| VarBind::from_asn(element, i))
        .collect()
}
