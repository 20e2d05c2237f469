//! BER value tree.
//!
//! [`AsnValue`] is one node of a decoded or constructed BER element: a typed
//! payload ([`AsnData`]), the wire tag, and, for decoded values, the
//! position of the element inside the original buffer ([`Span`]).
//!
//! Decoding is permissive. An element whose tag is unknown, or whose content
//! is malformed inside an otherwise well-framed container, decodes as
//! `Null` with [`is_correct`](AsnValue::is_correct) set to `false` and its
//! original tag preserved, so that sibling elements still decode.

use crate::ber::{EncodeBuf, integer_content_len, length_len, tag, unsigned_content_len};
use crate::error::{EncodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::util::encode_hex;
use bytes::Bytes;

/// Position of a decoded element inside the buffer it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Offset of the tag byte.
    pub offset: usize,
    /// Bytes used by tag and length.
    pub header_len: usize,
    /// Bytes of content.
    pub content_len: usize,
}

impl Span {
    /// Total bytes occupied by the element.
    pub fn total_len(&self) -> usize {
        self.header_len + self.content_len
    }

    /// Offset of the first content byte.
    pub fn content_offset(&self) -> usize {
        self.offset + self.header_len
    }
}

/// Application types carried as an unsigned 32-bit INTEGER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unsigned32Kind {
    Counter32,
    /// Gauge32, also Unsigned32.
    Gauge32,
    TimeTicks,
}

impl Unsigned32Kind {
    pub fn tag(self) -> u8 {
        match self {
            Self::Counter32 => tag::application::COUNTER32,
            Self::Gauge32 => tag::application::GAUGE32,
            Self::TimeTicks => tag::application::TIMETICKS,
        }
    }

    pub fn from_tag(t: u8) -> Option<Self> {
        match t {
            tag::application::COUNTER32 => Some(Self::Counter32),
            tag::application::GAUGE32 => Some(Self::Gauge32),
            tag::application::TIMETICKS => Some(Self::TimeTicks),
            _ => None,
        }
    }
}

/// Subtypes sharing the OCTET STRING content layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OctetSubtype {
    /// Plain OCTET STRING (0x04).
    Octets,
    /// IpAddress (0x40), 4 bytes network order.
    IpAddress,
    /// Opaque (0x44), BER-wrapped arbitrary data.
    Opaque,
}

impl OctetSubtype {
    pub fn tag(self) -> u8 {
        match self {
            Self::Octets => tag::universal::OCTET_STRING,
            Self::IpAddress => tag::application::IP_ADDRESS,
            Self::Opaque => tag::application::OPAQUE,
        }
    }

    pub fn from_tag(t: u8) -> Option<Self> {
        match t {
            tag::universal::OCTET_STRING => Some(Self::Octets),
            tag::application::IP_ADDRESS => Some(Self::IpAddress),
            tag::application::OPAQUE => Some(Self::Opaque),
            _ => None,
        }
    }
}

/// SNMPv2c exception values, sent in place of a varbind value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exception {
    /// The object is not implemented.
    NoSuchObject,
    /// The object exists but has no such instance.
    NoSuchInstance,
    /// No lexicographic successor exists.
    EndOfMibView,
}

impl Exception {
    pub fn tag(self) -> u8 {
        match self {
            Self::NoSuchObject => tag::context::NO_SUCH_OBJECT,
            Self::NoSuchInstance => tag::context::NO_SUCH_INSTANCE,
            Self::EndOfMibView => tag::context::END_OF_MIB_VIEW,
        }
    }

    pub fn from_tag(t: u8) -> Option<Self> {
        match t {
            tag::context::NO_SUCH_OBJECT => Some(Self::NoSuchObject),
            tag::context::NO_SUCH_INSTANCE => Some(Self::NoSuchInstance),
            tag::context::END_OF_MIB_VIEW => Some(Self::EndOfMibView),
            _ => None,
        }
    }
}

/// Typed payload of an [`AsnValue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsnData {
    /// INTEGER, signed, up to 8 content bytes.
    Integer(i64),
    /// Counter32 / Gauge32 / TimeTicks.
    Unsigned32(Unsigned32Kind, u32),
    /// Counter64.
    Unsigned64(u64),
    /// OCTET STRING and its application subtypes.
    OctetString(OctetSubtype, Bytes),
    /// BIT STRING: unused bits in the final octet, then the bits.
    BitString(u8, Bytes),
    /// OBJECT IDENTIFIER.
    ObjectId(Oid),
    /// NULL.
    Null,
    /// Any constructed element: SEQUENCE (0x30), PDUs (0xA0..=0xA8), ...
    Sequence(u8, Vec<AsnValue>),
    /// noSuchObject / noSuchInstance / endOfMibView.
    Exception(Exception),
}

impl AsnData {
    /// Wire tag implied by the payload.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Integer(_) => tag::universal::INTEGER,
            Self::Unsigned32(kind, _) => kind.tag(),
            Self::Unsigned64(_) => tag::application::COUNTER64,
            Self::OctetString(subtype, _) => subtype.tag(),
            Self::BitString(..) => tag::universal::BIT_STRING,
            Self::ObjectId(_) => tag::universal::OBJECT_IDENTIFIER,
            Self::Null => tag::universal::NULL,
            Self::Sequence(t, _) => *t,
            Self::Exception(e) => e.tag(),
        }
    }
}

/// One BER element.
#[derive(Debug, Clone)]
pub struct AsnValue {
    tag: u8,
    data: AsnData,
    span: Option<Span>,
    correct: bool,
}

/// Equality compares tag, payload and correctness; decode position is ignored.
impl PartialEq for AsnValue {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.correct == other.correct && self.data == other.data
    }
}

impl Eq for AsnValue {}

impl From<AsnData> for AsnValue {
    fn from(data: AsnData) -> Self {
        Self {
            tag: data.tag(),
            data,
            span: None,
            correct: true,
        }
    }
}

impl AsnValue {
    pub fn integer(v: i64) -> Self {
        AsnData::Integer(v).into()
    }

    pub fn counter32(v: u32) -> Self {
        AsnData::Unsigned32(Unsigned32Kind::Counter32, v).into()
    }

    pub fn gauge32(v: u32) -> Self {
        AsnData::Unsigned32(Unsigned32Kind::Gauge32, v).into()
    }

    pub fn timeticks(v: u32) -> Self {
        AsnData::Unsigned32(Unsigned32Kind::TimeTicks, v).into()
    }

    pub fn counter64(v: u64) -> Self {
        AsnData::Unsigned64(v).into()
    }

    pub fn octet_string(data: impl Into<Bytes>) -> Self {
        AsnData::OctetString(OctetSubtype::Octets, data.into()).into()
    }

    pub fn ip_address(addr: [u8; 4]) -> Self {
        AsnData::OctetString(OctetSubtype::IpAddress, Bytes::copy_from_slice(&addr)).into()
    }

    pub fn opaque(data: impl Into<Bytes>) -> Self {
        AsnData::OctetString(OctetSubtype::Opaque, data.into()).into()
    }

    pub fn bit_string(unused_bits: u8, data: impl Into<Bytes>) -> Self {
        AsnData::BitString(unused_bits, data.into()).into()
    }

    pub fn oid(oid: Oid) -> Self {
        AsnData::ObjectId(oid).into()
    }

    pub fn null() -> Self {
        AsnData::Null.into()
    }

    /// A universal SEQUENCE (0x30).
    pub fn sequence(items: Vec<AsnValue>) -> Self {
        AsnData::Sequence(tag::universal::SEQUENCE, items).into()
    }

    /// A constructed element with an explicit tag (e.g. a PDU).
    pub fn constructed(tag: u8, items: Vec<AsnValue>) -> Self {
        AsnData::Sequence(tag | tag::CONSTRUCTED, items).into()
    }

    pub fn exception(e: Exception) -> Self {
        AsnData::Exception(e).into()
    }

    pub fn no_such_object() -> Self {
        Self::exception(Exception::NoSuchObject)
    }

    pub fn no_such_instance() -> Self {
        Self::exception(Exception::NoSuchInstance)
    }

    pub fn end_of_mib_view() -> Self {
        Self::exception(Exception::EndOfMibView)
    }

    /// A decoded element whose content was understood.
    pub(crate) fn decoded(data: AsnData, span: Span) -> Self {
        Self {
            tag: data.tag(),
            data,
            span: Some(span),
            correct: true,
        }
    }

    /// A decoded element that could not be interpreted: `Null`, flagged
    /// incorrect, keeping the tag seen on the wire.
    pub(crate) fn invalid(tag: u8, span: Span) -> Self {
        Self {
            tag,
            data: AsnData::Null,
            span: Some(span),
            correct: false,
        }
    }

    /// Wire tag. For incorrect values this is the tag that was received.
    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn data(&self) -> &AsnData {
        &self.data
    }

    pub fn into_data(self) -> AsnData {
        self.data
    }

    /// Position in the decoded buffer, `None` for values not produced by
    /// decoding.
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// `false` when decoding failed for this element.
    pub fn is_correct(&self) -> bool {
        self.correct
    }

    /// Whether this element or any descendant failed to decode.
    pub fn has_errors(&self) -> bool {
        !self.correct
            || matches!(&self.data, AsnData::Sequence(_, items) if items.iter().any(Self::has_errors))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match &self.data {
            AsnData::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// INTEGER narrowed to `i32`, as used by request ids and error fields.
    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    pub fn as_u32(&self) -> Option<u32> {
        match &self.data {
            AsnData::Unsigned32(_, v) => Some(*v),
            AsnData::Integer(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match &self.data {
            AsnData::Unsigned64(v) => Some(*v),
            AsnData::Unsigned32(_, v) => Some(u64::from(*v)),
            AsnData::Integer(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            AsnData::OctetString(_, data) | AsnData::BitString(_, data) => Some(data),
            _ => None,
        }
    }

    /// OCTET STRING content as UTF-8, when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            AsnData::OctetString(OctetSubtype::Octets, data) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&Oid> {
        match &self.data {
            AsnData::ObjectId(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<std::net::Ipv4Addr> {
        match &self.data {
            AsnData::OctetString(OctetSubtype::IpAddress, data) => {
                let octets: [u8; 4] = data[..].try_into().ok()?;
                Some(octets.into())
            }
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<Exception> {
        match &self.data {
            AsnData::Exception(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_exception(&self) -> bool {
        self.as_exception().is_some()
    }

    /// Children of a constructed element.
    pub fn items(&self) -> Option<&[AsnValue]> {
        match &self.data {
            AsnData::Sequence(_, items) => Some(items),
            _ => None,
        }
    }

    pub fn into_items(self) -> Option<Vec<AsnValue>> {
        match self.data {
            AsnData::Sequence(_, items) => Some(items),
            _ => None,
        }
    }

    /// Content bytes this value encodes to.
    pub fn content_len(&self) -> usize {
        match &self.data {
            AsnData::Integer(v) => integer_content_len(*v),
            AsnData::Unsigned32(_, v) => unsigned_content_len(u64::from(*v)),
            AsnData::Unsigned64(v) => unsigned_content_len(*v),
            AsnData::OctetString(_, data) => data.len(),
            AsnData::BitString(_, data) => data.len() + 1,
            AsnData::ObjectId(oid) => oid.ber_len(),
            AsnData::Null | AsnData::Exception(_) => 0,
            AsnData::Sequence(_, items) => items.iter().map(Self::encoded_len).sum(),
        }
    }

    /// Total bytes (tag + length + content) [`encode`](Self::encode) writes.
    pub fn encoded_len(&self) -> usize {
        let content = self.content_len();
        1 + length_len(content) + content
    }

    /// Encode into a reverse buffer.
    ///
    /// Incorrect values encode as NULL.
    pub fn encode(&self, buf: &mut EncodeBuf) -> Result<()> {
        match &self.data {
            AsnData::Integer(v) => buf.push_integer(*v),
            AsnData::Unsigned32(kind, v) => buf.push_unsigned(kind.tag(), u64::from(*v)),
            AsnData::Unsigned64(v) => buf.push_unsigned(tag::application::COUNTER64, *v),
            AsnData::OctetString(subtype, data) => buf.push_octet_string(subtype.tag(), data),
            AsnData::BitString(unused, data) => {
                if *unused > 7 {
                    return Err(Error::encode(EncodeErrorKind::InvalidUnusedBits(*unused)));
                }
                buf.push_constructed(tag::universal::BIT_STRING, |buf| {
                    buf.push_bytes(data);
                    buf.push_byte(*unused);
                    Ok(())
                })
            }
            AsnData::ObjectId(oid) => buf.push_oid(oid),
            AsnData::Null => buf.push_null(),
            AsnData::Sequence(t, items) => buf.push_constructed(*t, |buf| {
                for item in items.iter().rev() {
                    item.encode(buf)?;
                }
                Ok(())
            }),
            AsnData::Exception(e) => buf.push_primitive(e.tag(), &[]),
        }
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        crate::ber::encode(self)
    }
}

impl std::fmt::Display for AsnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.correct {
            return write!(f, "Invalid(tag=0x{:02X})", self.tag);
        }
        match &self.data {
            AsnData::Integer(v) => write!(f, "{}", v),
            AsnData::Unsigned32(Unsigned32Kind::TimeTicks, v) => {
                let secs = v / 100;
                let days = secs / 86400;
                let hours = (secs % 86400) / 3600;
                let mins = (secs % 3600) / 60;
                let s = secs % 60;
                write!(f, "{}d {}h {}m {}s", days, hours, mins, s)
            }
            AsnData::Unsigned32(_, v) => write!(f, "{}", v),
            AsnData::Unsigned64(v) => write!(f, "{}", v),
            AsnData::OctetString(OctetSubtype::IpAddress, _) => match self.as_ip() {
                Some(ip) => write!(f, "{}", ip),
                None => write!(f, "IpAddress(0x{})", encode_hex(self.as_bytes().unwrap_or(&[]))),
            },
            AsnData::OctetString(OctetSubtype::Opaque, data) => {
                write!(f, "Opaque(0x{})", encode_hex(data))
            }
            AsnData::OctetString(OctetSubtype::Octets, data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => write!(f, "0x{}", encode_hex(data)),
            },
            AsnData::BitString(unused, data) => {
                write!(f, "BitString(unused={}, 0x{})", unused, encode_hex(data))
            }
            AsnData::ObjectId(oid) => write!(f, "{}", oid),
            AsnData::Null => write!(f, "NULL"),
            AsnData::Sequence(t, items) => {
                write!(f, "[0x{:02X}: ", t)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            AsnData::Exception(Exception::NoSuchObject) => write!(f, "noSuchObject"),
            AsnData::Exception(Exception::NoSuchInstance) => write!(f, "noSuchInstance"),
            AsnData::Exception(Exception::EndOfMibView) => write!(f, "endOfMibView"),
        }
    }
}

/// Convenience conversions for creating [`AsnValue`] from common Rust types.
///
/// ```
/// use snmp_stack::AsnValue;
/// use std::net::Ipv4Addr;
///
/// let v: AsnValue = 42i64.into();
/// assert_eq!(v.as_i64(), Some(42));
///
/// let v: AsnValue = "hello".into();
/// assert_eq!(v.as_str(), Some("hello"));
///
/// let v: AsnValue = Ipv4Addr::new(10, 0, 0, 1).into();
/// assert_eq!(v.as_ip(), Some(Ipv4Addr::new(10, 0, 0, 1)));
/// ```
impl From<i64> for AsnValue {
    fn from(v: i64) -> Self {
        Self::integer(v)
    }
}

impl From<i32> for AsnValue {
    fn from(v: i32) -> Self {
        Self::integer(i64::from(v))
    }
}

impl From<&str> for AsnValue {
    fn from(s: &str) -> Self {
        Self::octet_string(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for AsnValue {
    fn from(s: String) -> Self {
        Self::octet_string(Bytes::from(s))
    }
}

impl From<&[u8]> for AsnValue {
    fn from(data: &[u8]) -> Self {
        Self::octet_string(Bytes::copy_from_slice(data))
    }
}

impl From<Bytes> for AsnValue {
    fn from(data: Bytes) -> Self {
        Self::octet_string(data)
    }
}

impl From<Oid> for AsnValue {
    fn from(oid: Oid) -> Self {
        Self::oid(oid)
    }
}

impl From<std::net::Ipv4Addr> for AsnValue {
    fn from(addr: std::net::Ipv4Addr) -> Self {
        Self::ip_address(addr.octets())
    }
}

impl From<u64> for AsnValue {
    fn from(v: u64) -> Self {
        Self::counter64(v)
    }
}
