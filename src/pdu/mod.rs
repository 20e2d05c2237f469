//! SNMP Protocol Data Units (PDUs).
//!
//! A [`Pdu`] carries the whole community-based message: the envelope
//! (`version`, `community`) and the inner PDU. It encodes to and decodes from
//! `SEQUENCE { version, community, [tag] { ... } }`.

mod bulk;

pub use bulk::{BulkFailure, BulkSplit};

use std::net::SocketAddr;

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, integer_content_len, length_len, tag, unsigned_content_len};
use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::value::{AsnData, AsnValue, OctetSubtype, Unsigned32Kind};
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list, varbind_list_size};
use crate::version::Version;

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
    SetRequest = 0xA3,
    TrapV1 = 0xA4,
    GetBulkRequest = 0xA5,
    InformRequest = 0xA6,
    TrapV2 = 0xA7,
    Report = 0xA8,
}

impl PduType {
    /// Create from tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xA0 => Some(Self::GetRequest),
            0xA1 => Some(Self::GetNextRequest),
            0xA2 => Some(Self::Response),
            0xA3 => Some(Self::SetRequest),
            0xA4 => Some(Self::TrapV1),
            0xA5 => Some(Self::GetBulkRequest),
            0xA6 => Some(Self::InformRequest),
            0xA7 => Some(Self::TrapV2),
            0xA8 => Some(Self::Report),
            _ => None,
        }
    }

    /// Get the tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetRequest => write!(f, "GetRequest"),
            Self::GetNextRequest => write!(f, "GetNextRequest"),
            Self::Response => write!(f, "Response"),
            Self::SetRequest => write!(f, "SetRequest"),
            Self::TrapV1 => write!(f, "TrapV1"),
            Self::GetBulkRequest => write!(f, "GetBulkRequest"),
            Self::InformRequest => write!(f, "InformRequest"),
            Self::TrapV2 => write!(f, "TrapV2"),
            Self::Report => write!(f, "Report"),
        }
    }
}

/// SNMPv1 generic trap types (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum GenericTrap {
    ColdStart = 0,
    WarmStart = 1,
    LinkDown = 2,
    LinkUp = 3,
    AuthenticationFailure = 4,
    EgpNeighborLoss = 5,
    /// Vendor-specific trap, see `specific_trap`.
    EnterpriseSpecific = 6,
}

impl GenericTrap {
    /// Create from integer value.
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::ColdStart),
            1 => Some(Self::WarmStart),
            2 => Some(Self::LinkDown),
            3 => Some(Self::LinkUp),
            4 => Some(Self::AuthenticationFailure),
            5 => Some(Self::EgpNeighborLoss),
            6 => Some(Self::EnterpriseSpecific),
            _ => None,
        }
    }

    /// Get the integer value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Header fields of an SNMPv1 Trap PDU (RFC 1157 Section 4.1.6).
///
/// The trap's variable bindings live in [`Pdu::varbinds`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapV1 {
    /// Enterprise OID (sysObjectID of the entity generating the trap)
    pub enterprise: Oid,
    /// Agent address
    pub agent_addr: [u8; 4],
    /// Generic trap type
    pub generic_trap: i32,
    /// Specific trap code (meaningful when generic_trap is enterpriseSpecific)
    pub specific_trap: i32,
    /// Time since the network entity was last (re)initialized, in hundredths of seconds
    pub time_stamp: u32,
}

impl TrapV1 {
    pub fn new(
        enterprise: Oid,
        agent_addr: [u8; 4],
        generic_trap: GenericTrap,
        specific_trap: i32,
        time_stamp: u32,
    ) -> Self {
        Self {
            enterprise,
            agent_addr,
            generic_trap: generic_trap.as_i32(),
            specific_trap,
            time_stamp,
        }
    }

    /// Get the generic trap type as an enum.
    pub fn generic_trap_enum(&self) -> Option<GenericTrap> {
        GenericTrap::from_i32(self.generic_trap)
    }

    /// Check if this is an enterprise-specific trap.
    pub fn is_enterprise_specific(&self) -> bool {
        self.generic_trap == GenericTrap::EnterpriseSpecific as i32
    }

    /// Convert to the SNMPv2 snmpTrapOID.0 value (RFC 3584 Section 3.1).
    ///
    /// Generic traps 0-5 map to `snmpTraps.{generic + 1}`; enterprise-specific
    /// traps map to `enterprise.0.specific`.
    ///
    /// ```rust
    /// use snmp_stack::pdu::{GenericTrap, TrapV1};
    /// use snmp_stack::oid;
    ///
    /// let trap = TrapV1::new(oid!(1, 3, 6, 1, 4, 1, 9999), [10, 0, 0, 1], GenericTrap::LinkDown, 0, 0);
    /// assert_eq!(trap.v2_trap_oid(), oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3));
    ///
    /// let trap = TrapV1::new(oid!(1, 3, 6, 1, 4, 1, 9999), [10, 0, 0, 1], GenericTrap::EnterpriseSpecific, 42, 0);
    /// assert_eq!(trap.v2_trap_oid(), oid!(1, 3, 6, 1, 4, 1, 9999, 0, 42));
    /// ```
    pub fn v2_trap_oid(&self) -> Oid {
        if self.is_enterprise_specific() {
            self.enterprise.append([0, self.specific_trap.max(0) as u64])
        } else {
            crate::oid!(1, 3, 6, 1, 6, 3, 1, 1, 5).child((self.generic_trap.max(0) + 1) as u64)
        }
    }

    fn content_len(&self, varbinds: &[VarBind]) -> usize {
        let enterprise = self.enterprise.ber_len();
        (1 + length_len(enterprise) + enterprise)
            + 6
            + integer_tlv_len(self.generic_trap.into())
            + integer_tlv_len(self.specific_trap.into())
            + 2
            + unsigned_content_len(self.time_stamp.into())
            + varbind_list_size(varbinds)
    }
}

/// A complete community-based SNMP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub version: Version,
    pub community: Bytes,
    pub pdu_type: PduType,
    /// Request ID for correlating requests and responses
    pub request_id: i32,
    pub error_status: ErrorStatus,
    /// 1-based index of the varbind that caused `error_status`, 0 if none
    pub error_index: i32,
    /// GETBULK only; occupies the error-status slot on the wire.
    pub non_repeaters: i32,
    /// GETBULK only; occupies the error-index slot on the wire.
    pub max_repetitions: i32,
    pub varbinds: Vec<VarBind>,
    /// Present for [`PduType::TrapV1`] only.
    pub trap: Option<TrapV1>,
    /// Sender address, set by the receiving side.
    pub source: Option<SocketAddr>,
}

impl Pdu {
    /// Create an empty PDU of the given type (v2c, community "public").
    pub fn new(pdu_type: PduType) -> Self {
        Self {
            version: Version::V2c,
            community: Bytes::from_static(b"public"),
            pdu_type,
            request_id: 0,
            error_status: ErrorStatus::NoError,
            error_index: 0,
            non_repeaters: 0,
            max_repetitions: 0,
            varbinds: Vec::new(),
            trap: None,
            source: None,
        }
    }

    /// Create a GET request PDU.
    pub fn get_request(request_id: i32, oids: &[Oid]) -> Self {
        Self {
            request_id,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
            ..Self::new(PduType::GetRequest)
        }
    }

    /// Create a GETNEXT request PDU.
    pub fn get_next_request(request_id: i32, oids: &[Oid]) -> Self {
        Self {
            request_id,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
            ..Self::new(PduType::GetNextRequest)
        }
    }

    /// Create a SET request PDU.
    pub fn set_request(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            request_id,
            varbinds,
            ..Self::new(PduType::SetRequest)
        }
    }

    /// Create a GETBULK request PDU.
    pub fn get_bulk(request_id: i32, non_repeaters: i32, max_repetitions: i32, oids: &[Oid]) -> Self {
        Self {
            request_id,
            non_repeaters,
            max_repetitions,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
            ..Self::new(PduType::GetBulkRequest)
        }
    }

    /// Create an SNMPv2 trap. The caller supplies sysUpTime.0 and snmpTrapOID.0
    /// as the first two varbinds.
    pub fn trap_v2(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            request_id,
            varbinds,
            ..Self::new(PduType::TrapV2)
        }
    }

    /// Create an InformRequest.
    pub fn inform(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            request_id,
            varbinds,
            ..Self::new(PduType::InformRequest)
        }
    }

    /// Create an SNMPv1 trap.
    pub fn trap_v1(trap: TrapV1, varbinds: Vec<VarBind>) -> Self {
        Self {
            version: Version::V1,
            varbinds,
            trap: Some(trap),
            ..Self::new(PduType::TrapV1)
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Set the community.
    pub fn with_community(mut self, community: impl Into<Bytes>) -> Self {
        self.community = community.into();
        self
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error_status != ErrorStatus::NoError
    }

    /// Turn an error response into [`Error::Snmp`].
    ///
    /// The error carries the reply's source address and, when `error_index`
    /// points at a varbind, that varbind's OID.
    ///
    /// ```
    /// use snmp_stack::{Error, ErrorStatus, Pdu, oid};
    ///
    /// let request = Pdu::get_request(7, &[oid!(1, 3, 6, 1, 2, 1, 1, 9, 0)]);
    /// assert!(request.to_response().into_result().is_ok());
    ///
    /// let reply = request.to_error_response(ErrorStatus::NoSuchName, 1);
    /// match reply.into_result() {
    ///     Err(Error::Snmp { status, index, oid, .. }) => {
    ///         assert_eq!(status, ErrorStatus::NoSuchName);
    ///         assert_eq!(index, 1);
    ///         assert_eq!(oid, Some(oid!(1, 3, 6, 1, 2, 1, 1, 9, 0)));
    ///     }
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// ```
    pub fn into_result(self) -> Result<Self> {
        if !self.is_error() {
            return Ok(self);
        }
        let index = u32::try_from(self.error_index).unwrap_or(0);
        let oid = (index as usize)
            .checked_sub(1)
            .and_then(|i| self.varbinds.get(i))
            .map(|vb| vb.oid.clone());
        Err(Error::Snmp {
            target: self.source,
            status: self.error_status,
            index,
            oid,
        })
    }

    /// Create a Response PDU from this PDU.
    ///
    /// The response copies envelope, request_id and variable bindings.
    pub fn to_response(&self) -> Self {
        Self {
            version: self.version,
            community: self.community.clone(),
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: ErrorStatus::NoError,
            error_index: 0,
            non_repeaters: 0,
            max_repetitions: 0,
            varbinds: self.varbinds.clone(),
            trap: None,
            source: None,
        }
    }

    /// Create a Response PDU echoing the request varbinds with an error.
    pub fn to_error_response(&self, error_status: ErrorStatus, error_index: i32) -> Self {
        Self {
            error_status,
            error_index,
            ..self.to_response()
        }
    }

    /// Check if this is a notification PDU (Trap or Inform).
    pub fn is_notification(&self) -> bool {
        matches!(
            self.pdu_type,
            PduType::TrapV1 | PduType::TrapV2 | PduType::InformRequest
        )
    }

    /// Check if this is a confirmed-class PDU (requires response).
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.pdu_type,
            PduType::GetRequest
                | PduType::GetNextRequest
                | PduType::GetBulkRequest
                | PduType::SetRequest
                | PduType::InformRequest
        )
    }

    /// The two integers written after request-id.
    fn second_third(&self) -> (i32, i32) {
        if self.pdu_type == PduType::GetBulkRequest {
            (self.non_repeaters, self.max_repetitions)
        } else {
            (self.error_status.as_i32(), self.error_index)
        }
    }

    fn pdu_content_len(&self) -> usize {
        if let (PduType::TrapV1, Some(trap)) = (self.pdu_type, &self.trap) {
            return trap.content_len(&self.varbinds);
        }
        let (second, third) = self.second_third();
        integer_tlv_len(self.request_id.into())
            + integer_tlv_len(second.into())
            + integer_tlv_len(third.into())
            + varbind_list_size(&self.varbinds)
    }

    /// Exact number of bytes [`encode`](Self::encode) produces.
    pub fn encoded_len(&self) -> usize {
        let pdu_content = self.pdu_content_len();
        let message_content = integer_tlv_len(self.version.as_i32().into())
            + 1
            + length_len(self.community.len())
            + self.community.len()
            + 1
            + length_len(pdu_content)
            + pdu_content;
        1 + length_len(message_content) + message_content
    }

    /// Encode the full message.
    ///
    /// Fails when the error status is a local marker, or when a TrapV1 PDU
    /// has no trap header.
    pub fn encode(&self) -> Result<Bytes> {
        if self.pdu_type != PduType::GetBulkRequest && self.error_status.is_local() {
            return Err(Error::encode(EncodeErrorKind::LocalErrorStatus(
                self.error_status.as_i32(),
            )));
        }

        let mut buf = EncodeBuf::with_capacity(self.encoded_len());
        buf.push_sequence(|buf| {
            self.encode_pdu(buf)?;
            buf.push_octet_string(tag::universal::OCTET_STRING, &self.community)?;
            buf.push_integer(self.version.as_i32().into())
        })?;
        Ok(buf.finish())
    }

    fn encode_pdu(&self, buf: &mut EncodeBuf) -> Result<()> {
        if self.pdu_type == PduType::TrapV1 {
            let trap = self.trap.as_ref().ok_or(Error::encode(EncodeErrorKind::MissingTrapHeader))?;
            return buf.push_constructed(tag::pdu::TRAP_V1, |buf| {
                encode_varbind_list(buf, &self.varbinds)?;
                buf.push_unsigned(tag::application::TIMETICKS, trap.time_stamp.into())?;
                buf.push_integer(trap.specific_trap.into())?;
                buf.push_integer(trap.generic_trap.into())?;
                buf.push_octet_string(tag::application::IP_ADDRESS, &trap.agent_addr)?;
                buf.push_oid(&trap.enterprise)
            });
        }

        let (second, third) = self.second_third();
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds)?;
            buf.push_integer(third.into())?;
            buf.push_integer(second.into())?;
            buf.push_integer(self.request_id.into())
        })
    }

    /// Decode a full message.
    ///
    /// The inner PDU is located by scanning the envelope for the first
    /// constructed element with a PDU tag. Undecodable values inside varbinds
    /// are kept as incorrect values.
    pub fn decode(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.is_empty() {
            return Err(Error::decode(0, DecodeErrorKind::Empty));
        }

        let message = Decoder::new(data).read_value()?;
        if message.tag() != tag::universal::SEQUENCE {
            tracing::debug!(target: "snmp_stack::ber", { tag = message.tag() }, "message is not a SEQUENCE");
            return Err(Error::decode(0, DecodeErrorKind::MissingSequence));
        }
        let envelope_offset = offset_of(&message);
        let items = message.into_items().unwrap_or_default();

        let raw_version = items
            .first()
            .and_then(AsnValue::as_i64)
            .ok_or(Error::decode(envelope_offset, DecodeErrorKind::MalformedPdu))?;
        let version = Version::from_i64(raw_version).ok_or_else(|| {
            tracing::debug!(target: "snmp_stack::ber", { version = raw_version }, "unknown SNMP version");
            Error::decode(envelope_offset, DecodeErrorKind::UnknownVersion(raw_version))
        })?;

        let community = match items.get(1).map(AsnValue::data) {
            Some(AsnData::OctetString(OctetSubtype::Octets, bytes)) => bytes.clone(),
            _ => return Err(Error::decode(envelope_offset, DecodeErrorKind::MalformedPdu)),
        };

        let Some(inner) = items
            .into_iter()
            .find(|item| tag::is_pdu_tag(item.tag()) && item.items().is_some())
        else {
            tracing::debug!(target: "snmp_stack::ber", { snmp.offset = envelope_offset }, "no PDU in message");
            return Err(Error::decode(envelope_offset, DecodeErrorKind::MissingPdu));
        };

        let pdu_type = PduType::from_tag(inner.tag())
            .ok_or(Error::decode(envelope_offset, DecodeErrorKind::UnknownPduType(inner.tag())))?;
        let pdu_offset = offset_of(&inner);
        let fields = inner.into_items().unwrap_or_default();

        let mut pdu = Pdu {
            version,
            community,
            ..Pdu::new(pdu_type)
        };

        if pdu_type == PduType::TrapV1 {
            let (trap, varbinds) = decode_trap_v1(fields, pdu_offset)?;
            pdu.trap = Some(trap);
            pdu.varbinds = varbinds;
            return Ok(pdu);
        }

        let mut fields = fields.into_iter();
        let request_id = int_field(fields.next(), pdu_offset)?;
        let second = int_field(fields.next(), pdu_offset)?;
        let third = int_field(fields.next(), pdu_offset)?;
        let list = fields
            .next()
            .ok_or(Error::decode(pdu_offset, DecodeErrorKind::MalformedPdu))?;

        pdu.request_id = request_id;
        if pdu_type == PduType::GetBulkRequest {
            pdu.non_repeaters = second;
            pdu.max_repetitions = third;
        } else {
            pdu.error_status = ErrorStatus::from_i32(second);
            pdu.error_index = third;
        }
        pdu.varbinds = decode_varbind_list(list)?;
        Ok(pdu)
    }
}

fn integer_tlv_len(value: i64) -> usize {
    2 + integer_content_len(value)
}

fn offset_of(value: &AsnValue) -> usize {
    value.span().map(|s| s.offset).unwrap_or_default()
}

fn int_field(value: Option<AsnValue>, pdu_offset: usize) -> Result<i32> {
    let value = value.ok_or(Error::decode(pdu_offset, DecodeErrorKind::MalformedPdu))?;
    let offset = offset_of(&value);
    let raw = value
        .as_i64()
        .ok_or(Error::decode(offset, DecodeErrorKind::MalformedPdu))?;
    i32::try_from(raw).map_err(|_| Error::decode(offset, DecodeErrorKind::IntegerOverflow))
}

fn decode_trap_v1(fields: Vec<AsnValue>, pdu_offset: usize) -> Result<(TrapV1, Vec<VarBind>)> {
    let malformed = || Error::decode(pdu_offset, DecodeErrorKind::MalformedPdu);
    let mut fields = fields.into_iter();

    let enterprise = match fields.next().map(AsnValue::into_data) {
        Some(AsnData::ObjectId(oid)) => oid,
        _ => return Err(malformed()),
    };
    let agent_addr = match fields.next().map(AsnValue::into_data) {
        Some(AsnData::OctetString(OctetSubtype::IpAddress, bytes)) => {
            <[u8; 4]>::try_from(&bytes[..]).map_err(|_| malformed())?
        }
        _ => return Err(malformed()),
    };
    let generic_trap = int_field(fields.next(), pdu_offset)?;
    let specific_trap = int_field(fields.next(), pdu_offset)?;
    let time_stamp = match fields.next().map(AsnValue::into_data) {
        Some(AsnData::Unsigned32(Unsigned32Kind::TimeTicks, ticks)) => ticks,
        _ => return Err(malformed()),
    };
    let varbinds = decode_varbind_list(fields.next().ok_or_else(malformed)?)?;

    Ok((
        TrapV1 {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            time_stamp,
        },
        varbinds,
    ))
}
