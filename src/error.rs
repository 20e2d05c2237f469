//! Error types for snmp-stack.
//!
//! - [`Error`] - the main error type for all library operations
//! - [`ErrorStatus`] - SNMP protocol error status carried inside PDUs
//! - kind enums for decode, encode, OID and MIB registration failures
//!
//! Protocol-level problems (unknown OID, read-only object, ...) are never
//! reported through [`Error`] by the agent: they travel in the
//! `error_status`/`error_index` fields of a normal Response PDU. On the manager
//! side a timeout is an ordinary [`Outcome`](crate::manager::Outcome), not an
//! error.

use std::net::SocketAddr;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// BER decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Expected different tag.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Data truncated unexpectedly.
    TruncatedData,
    /// Indefinite length not supported.
    IndefiniteLength,
    /// Length field uses more octets than supported.
    LengthTooLong { octets: usize },
    /// TLV extends past end of data.
    TlvOverflow { declared: usize, available: usize },
    /// Message is not wrapped in a SEQUENCE.
    MissingSequence,
    /// Unknown SNMP version.
    UnknownVersion(i64),
    /// Unknown PDU type.
    UnknownPduType(u8),
    /// No PDU found inside the message envelope.
    MissingPdu,
    /// Element required by the PDU layout is missing or has the wrong type.
    MalformedPdu,
    /// Varbind is not a SEQUENCE of OID and value.
    MalformedVarBind { index: usize },
    /// Integer field does not fit the target type.
    IntegerOverflow,
    /// Constructed elements nested deeper than the decoder allows.
    NestingTooDeep { max: usize },
    /// Empty datagram.
    Empty,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{:02X}, got 0x{:02X}", expected, actual)
            }
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::IndefiniteLength => write!(f, "indefinite length encoding not supported"),
            Self::LengthTooLong { octets } => {
                write!(f, "length encoding too long ({} octets)", octets)
            }
            Self::TlvOverflow {
                declared,
                available,
            } => write!(
                f,
                "declared length {} exceeds {} available bytes",
                declared, available
            ),
            Self::MissingSequence => write!(f, "message is not a SEQUENCE"),
            Self::UnknownVersion(v) => write!(f, "unknown SNMP version: {}", v),
            Self::UnknownPduType(t) => write!(f, "unknown PDU type: 0x{:02X}", t),
            Self::MissingPdu => write!(f, "missing PDU in message"),
            Self::MalformedPdu => write!(f, "malformed PDU"),
            Self::MalformedVarBind { index } => write!(f, "malformed varbind at index {}", index),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::NestingTooDeep { max } => {
                write!(f, "constructed elements nested deeper than {}", max)
            }
            Self::Empty => write!(f, "empty message"),
        }
    }
}

/// BER encode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// Content too long for a 3-octet BER length.
    LengthOverflow { length: usize },
    /// OID cannot be BER encoded (fewer than two arcs or bad first arcs).
    InvalidOid,
    /// Error status is a local marker and must not go on the wire.
    LocalErrorStatus(i32),
    /// BIT STRING unused-bit count above 7.
    InvalidUnusedBits(u8),
    /// TrapV1 PDU without its header fields.
    MissingTrapHeader,
}

impl std::fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LengthOverflow { length } => {
                write!(f, "length {} does not fit in 3 length octets", length)
            }
            Self::InvalidOid => write!(f, "OID cannot be BER encoded"),
            Self::LocalErrorStatus(code) => {
                write!(f, "error status 0x{:02X} is local and not transmittable", code)
            }
            Self::InvalidUnusedBits(n) => write!(f, "BIT STRING unused bits {} > 7", n),
            Self::MissingTrapHeader => write!(f, "TrapV1 PDU has no trap header"),
        }
    }
}

/// OID validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidErrorKind {
    /// Empty OID string.
    Empty,
    /// Empty component between dots.
    EmptyComponent,
    /// Component is not a non-negative integer.
    NonNumeric,
    /// First arc must be 0, 1, or 2.
    InvalidFirstArc(u64),
    /// Second arc too large for first arc value.
    InvalidSecondArc { first: u64, second: u64 },
    /// OID has too many arcs.
    TooManyArcs { count: usize, max: usize },
    /// Subidentifier overflow during decoding.
    SubidentifierOverflow,
    /// Encoded OID ends in the middle of a subidentifier.
    Truncated,
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty OID"),
            Self::EmptyComponent => write!(f, "empty component"),
            Self::NonNumeric => write!(f, "non-numeric component"),
            Self::InvalidFirstArc(v) => write!(f, "first arc must be 0, 1, or 2, got {}", v),
            Self::InvalidSecondArc { first, second } => {
                write!(f, "second arc {} too large for first arc {}", second, first)
            }
            Self::TooManyArcs { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
            Self::SubidentifierOverflow => write!(f, "subidentifier overflow"),
            Self::Truncated => write!(f, "truncated subidentifier"),
        }
    }
}

/// MIB registration error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MibErrorKind {
    /// Node OID does not strictly extend the parent OID.
    NotUnderParent,
    /// A node with the same OID is already registered.
    Duplicate,
    /// A sibling already covers part of this OID.
    Overlap,
    /// Leaf nodes cannot have children.
    ParentIsLeaf,
    /// Parent node id does not exist.
    UnknownNode,
    /// Leaf registered without a handler, or a handler given to a non-leaf.
    HandlerMismatch,
}

impl std::fmt::Display for MibErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotUnderParent => write!(f, "OID is not a strict extension of its parent"),
            Self::Duplicate => write!(f, "OID already registered"),
            Self::Overlap => write!(f, "OID overlaps a registered sibling"),
            Self::ParentIsLeaf => write!(f, "leaf nodes cannot have children"),
            Self::UnknownNode => write!(f, "unknown node"),
            Self::HandlerMismatch => write!(f, "only leaf nodes carry a handler"),
        }
    }
}

/// SNMP protocol error status codes (RFC 1157, RFC 1905).
///
/// Codes 0 to 18 are wire values. `DecodeFailed`, `EncodeFailed` and
/// `ValueDecodeFailed` (0x13 to 0x15) are local markers used while processing
/// a message; they are never transmitted.
///
/// # Example
///
/// ```
/// use snmp_stack::ErrorStatus;
///
/// let status = ErrorStatus::from_i32(2);
/// assert_eq!(status, ErrorStatus::NoSuchName);
/// assert_eq!(status.as_i32(), 2);
/// assert_eq!(ErrorStatus::NotWritable.to_v1(), ErrorStatus::NoSuchName);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorStatus {
    /// Operation completed successfully (status = 0).
    NoError,
    /// Response message would be too large for transport (status = 1).
    TooBig,
    /// Requested OID not found (status = 2). SNMPv1 only; v2c uses exception values.
    NoSuchName,
    /// Invalid value provided in SET request (status = 3).
    BadValue,
    /// Attempted to SET a read-only object (status = 4).
    ReadOnly,
    /// Unspecified error occurred (status = 5).
    GenErr,
    /// Object exists but access is denied (status = 6).
    NoAccess,
    /// SET value has wrong ASN.1 type (status = 7).
    WrongType,
    /// SET value has incorrect length (status = 8).
    WrongLength,
    /// SET value uses wrong encoding (status = 9).
    WrongEncoding,
    /// SET value is out of range or otherwise invalid (status = 10).
    WrongValue,
    /// Object does not support row creation (status = 11).
    NoCreation,
    /// Value is inconsistent with other managed objects (status = 12).
    InconsistentValue,
    /// Resource required for SET is unavailable (status = 13).
    ResourceUnavailable,
    /// SET commit phase failed (status = 14).
    CommitFailed,
    /// SET undo phase failed (status = 15).
    UndoFailed,
    /// Access denied (status = 16).
    AuthorizationError,
    /// Object does not support modification (status = 17).
    NotWritable,
    /// Named object cannot be created (status = 18).
    InconsistentName,
    /// Local marker: message could not be decoded (0x13).
    DecodeFailed,
    /// Local marker: message could not be encoded (0x14).
    EncodeFailed,
    /// Local marker: a value inside the message could not be decoded (0x15).
    ValueDecodeFailed,
    /// Unknown or future error status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            0x13 => Self::DecodeFailed,
            0x14 => Self::EncodeFailed,
            0x15 => Self::ValueDecodeFailed,
            other => Self::Unknown(other),
        }
    }

    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::DecodeFailed => 0x13,
            Self::EncodeFailed => 0x14,
            Self::ValueDecodeFailed => 0x15,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether this is a local processing marker rather than a wire value.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailed | Self::EncodeFailed | Self::ValueDecodeFailed
        )
    }

    /// Whether the code is defined by SNMPv1 (RFC 1157).
    pub fn is_v1(&self) -> bool {
        (0..=5).contains(&self.as_i32()) && !matches!(self, Self::Unknown(_))
    }

    /// Map to the nearest SNMPv1 status (RFC 2576 section 4.3).
    ///
    /// Local markers and unknown codes map to `GenErr`.
    pub fn to_v1(self) -> Self {
        match self {
            Self::NoError
            | Self::TooBig
            | Self::NoSuchName
            | Self::BadValue
            | Self::ReadOnly
            | Self::GenErr => self,
            Self::WrongValue
            | Self::WrongEncoding
            | Self::WrongType
            | Self::WrongLength
            | Self::InconsistentValue => Self::BadValue,
            Self::NoAccess
            | Self::NotWritable
            | Self::NoCreation
            | Self::InconsistentName
            | Self::AuthorizationError => Self::NoSuchName,
            Self::ResourceUnavailable
            | Self::CommitFailed
            | Self::UndoFailed
            | Self::DecodeFailed
            | Self::EncodeFailed
            | Self::ValueDecodeFailed
            | Self::Unknown(_) => Self::GenErr,
        }
    }

    /// Map to a status that may be sent in an SNMPv2c response.
    ///
    /// Local markers and unknown codes map to `GenErr`.
    pub fn to_v2c(self) -> Self {
        match self {
            Self::DecodeFailed | Self::EncodeFailed | Self::ValueDecodeFailed | Self::Unknown(_) => {
                Self::GenErr
            }
            other => other,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::TooBig => write!(f, "tooBig"),
            Self::NoSuchName => write!(f, "noSuchName"),
            Self::BadValue => write!(f, "badValue"),
            Self::ReadOnly => write!(f, "readOnly"),
            Self::GenErr => write!(f, "genErr"),
            Self::NoAccess => write!(f, "noAccess"),
            Self::WrongType => write!(f, "wrongType"),
            Self::WrongLength => write!(f, "wrongLength"),
            Self::WrongEncoding => write!(f, "wrongEncoding"),
            Self::WrongValue => write!(f, "wrongValue"),
            Self::NoCreation => write!(f, "noCreation"),
            Self::InconsistentValue => write!(f, "inconsistentValue"),
            Self::ResourceUnavailable => write!(f, "resourceUnavailable"),
            Self::CommitFailed => write!(f, "commitFailed"),
            Self::UndoFailed => write!(f, "undoFailed"),
            Self::AuthorizationError => write!(f, "authorizationError"),
            Self::NotWritable => write!(f, "notWritable"),
            Self::InconsistentName => write!(f, "inconsistentName"),
            Self::DecodeFailed => write!(f, "decodeFailed"),
            Self::EncodeFailed => write!(f, "encodeFailed"),
            Self::ValueDecodeFailed => write!(f, "valueDecodeFailed"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// The main error type for all snmp-stack operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during network communication.
    #[error("I/O error{}: {source}", target.map(|t| format!(" communicating with {}", t)).unwrap_or_default())]
    Io {
        target: Option<SocketAddr>,
        #[source]
        source: std::io::Error,
    },

    /// SNMP protocol error returned in a response.
    #[error("SNMP error{}: {status} at index {index}", target.map(|t| format!(" from {}", t)).unwrap_or_default())]
    Snmp {
        target: Option<SocketAddr>,
        status: ErrorStatus,
        index: u32,
        oid: Option<crate::oid::Oid>,
    },

    /// Invalid OID format.
    #[error("invalid OID: {kind}")]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<Box<str>>,
    },

    /// BER decoding error.
    #[error("decode error at offset {offset}: {kind}")]
    Decode {
        offset: usize,
        kind: DecodeErrorKind,
    },

    /// BER encoding error.
    #[error("encode error: {kind}")]
    Encode { kind: EncodeErrorKind },

    /// MIB registration error.
    #[error("MIB error for {oid}: {kind}")]
    Mib {
        oid: crate::oid::Oid,
        kind: MibErrorKind,
    },

    /// Message exceeds maximum size.
    #[error("message too large: {size} bytes exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// No pending request for this invoke id.
    #[error("unknown invoke id {0}")]
    UnknownInvoke(u64),

    /// Every request id in the wrapping range is still outstanding.
    #[error("no free request id")]
    RequestIdsExhausted,

    /// Transaction hook refused the request.
    #[error("transaction rejected: {0}")]
    Transaction(String),

    /// The engine was shut down while the operation was outstanding.
    #[error("engine closed")]
    Closed,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a decode error.
    pub fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Create an encode error.
    pub fn encode(kind: EncodeErrorKind) -> Self {
        Self::Encode { kind }
    }

    /// Create an invalid OID error from a kind (no input string).
    pub fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    /// Create an invalid OID error with the input string that failed.
    pub fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input.into()),
        }
    }

    /// Create a MIB registration error.
    pub fn mib(oid: crate::oid::Oid, kind: MibErrorKind) -> Self {
        Self::Mib { oid, kind }
    }

    /// Get the target address if this error has one.
    pub fn target(&self) -> Option<SocketAddr> {
        match self {
            Self::Io { target, .. } => *target,
            Self::Snmp { target, .. } => *target,
            _ => None,
        }
    }
}
