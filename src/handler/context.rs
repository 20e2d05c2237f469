//! Request context for MIB handlers.

use std::net::SocketAddr;

use bytes::Bytes;

use crate::pdu::PduType;
use crate::version::Version;

/// Request context passed to MIB handlers.
///
/// Describes where the request came from and what it is. Handlers can use it
/// for logging or their own access decisions.
///
/// # Example
///
/// ```rust
/// use snmp_stack::handler::{BoxFuture, GetNextResult, GetResult, MibHandler, RequestContext};
/// use snmp_stack::{AsnValue, Oid, oid};
///
/// struct LoggingHandler;
///
/// impl MibHandler for LoggingHandler {
///     fn get<'a>(&'a self, ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
///         Box::pin(async move {
///             println!("GET {} from {} ({})", oid, ctx.source, ctx.version);
///             if oid == &oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0) {
///                 GetResult::Value(AsnValue::integer(42))
///             } else {
///                 GetResult::NoSuchInstance
///             }
///         })
///     }
///
///     fn get_next<'a>(&'a self, _ctx: &'a RequestContext, _oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
///         Box::pin(async { GetNextResult::Exhausted })
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Source address of the request.
    pub source: SocketAddr,

    /// SNMP version of the request.
    pub version: Version,

    /// Community string the request was authenticated with.
    pub community: Bytes,

    /// Request ID from the PDU.
    pub request_id: i32,

    /// PDU type (GetRequest, GetNextRequest, SetRequest, ...).
    pub pdu_type: PduType,
}

impl RequestContext {
    /// Build the context for a decoded request.
    pub fn from_pdu(pdu: &crate::pdu::Pdu, source: SocketAddr) -> Self {
        Self {
            source,
            version: pdu.version,
            community: pdu.community.clone(),
            request_id: pdu.request_id,
            pdu_type: pdu.pdu_type,
        }
    }

    /// Create a minimal context for unit testing.
    pub fn test_context() -> Self {
        use std::net::{IpAddr, Ipv4Addr};

        Self {
            source: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            version: Version::V2c,
            community: Bytes::from_static(b"public"),
            request_id: 1,
            pdu_type: PduType::GetRequest,
        }
    }
}
