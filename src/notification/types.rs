//! Notification values and the sink they are delivered to.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::handler::BoxFuture;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType, TrapV1};
use crate::varbind::VarBind;
use crate::version::Version;

use super::varbind::extract_notification_varbinds;

/// Received SNMP notification.
///
/// This enum represents all types of SNMP notifications that can be received:
/// - SNMPv1 Trap (different PDU structure)
/// - SNMPv2c Trap (standard PDU with sysUpTime.0 and snmpTrapOID.0)
/// - InformRequest (confirmed notification, response is sent automatically)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// SNMPv1 Trap with its own header.
    TrapV1 {
        community: Bytes,
        trap: TrapV1,
        varbinds: Vec<VarBind>,
    },

    /// SNMPv2c Trap (unconfirmed notification).
    TrapV2c {
        community: Bytes,
        /// sysUpTime.0 value (hundredths of seconds since agent init)
        uptime: u32,
        /// snmpTrapOID.0 value (trap type identifier)
        trap_oid: Oid,
        /// Variable bindings after sysUpTime.0 and snmpTrapOID.0
        varbinds: Vec<VarBind>,
        request_id: i32,
    },

    /// InformRequest (confirmed notification).
    ///
    /// The receiver has already answered it by the time it is delivered.
    InformV2c {
        community: Bytes,
        uptime: u32,
        trap_oid: Oid,
        varbinds: Vec<VarBind>,
        request_id: i32,
    },
}

impl Notification {
    /// Build a notification from a decoded PDU.
    ///
    /// Returns `Ok(None)` for PDUs that are not notifications, or that are not
    /// valid for their version (v2 traps and informs over SNMPv1).
    pub fn from_pdu(pdu: &Pdu) -> Result<Option<Self>> {
        match (pdu.pdu_type, pdu.version) {
            (PduType::TrapV1, Version::V1) => Ok(pdu.trap.clone().map(|trap| Self::TrapV1 {
                community: pdu.community.clone(),
                trap,
                varbinds: pdu.varbinds.clone(),
            })),
            (PduType::TrapV2, Version::V2c) => {
                let (uptime, trap_oid, varbinds) = extract_notification_varbinds(pdu)?;
                Ok(Some(Self::TrapV2c {
                    community: pdu.community.clone(),
                    uptime,
                    trap_oid,
                    varbinds,
                    request_id: pdu.request_id,
                }))
            }
            (PduType::InformRequest, Version::V2c) => {
                let (uptime, trap_oid, varbinds) = extract_notification_varbinds(pdu)?;
                Ok(Some(Self::InformV2c {
                    community: pdu.community.clone(),
                    uptime,
                    trap_oid,
                    varbinds,
                    request_id: pdu.request_id,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Get the trap/notification OID.
    ///
    /// For TrapV1 this is derived from enterprise and generic/specific trap
    /// (RFC 3584 Section 3.1). For v2c it is the snmpTrapOID.0 value.
    pub fn trap_oid(&self) -> Oid {
        match self {
            Notification::TrapV1 { trap, .. } => trap.v2_trap_oid(),
            Notification::TrapV2c { trap_oid, .. } | Notification::InformV2c { trap_oid, .. } => {
                trap_oid.clone()
            }
        }
    }

    /// Get the uptime value (sysUpTime.0 or time_stamp for v1).
    pub fn uptime(&self) -> u32 {
        match self {
            Notification::TrapV1 { trap, .. } => trap.time_stamp,
            Notification::TrapV2c { uptime, .. } | Notification::InformV2c { uptime, .. } => {
                *uptime
            }
        }
    }

    pub fn varbinds(&self) -> &[VarBind] {
        match self {
            Notification::TrapV1 { varbinds, .. }
            | Notification::TrapV2c { varbinds, .. }
            | Notification::InformV2c { varbinds, .. } => varbinds,
        }
    }

    pub fn community(&self) -> &Bytes {
        match self {
            Notification::TrapV1 { community, .. }
            | Notification::TrapV2c { community, .. }
            | Notification::InformV2c { community, .. } => community,
        }
    }

    /// Check if this is a confirmed notification (InformRequest).
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Notification::InformV2c { .. })
    }

    pub fn version(&self) -> Version {
        match self {
            Notification::TrapV1 { .. } => Version::V1,
            Notification::TrapV2c { .. } | Notification::InformV2c { .. } => Version::V2c,
        }
    }
}

/// Destination for received notifications.
///
/// The receiver awaits each delivery before reading the next datagram.
pub trait NotificationSink: Send + Sync {
    fn deliver<'a>(&'a self, notification: Notification, source: SocketAddr) -> BoxFuture<'a, ()>;
}

impl NotificationSink for mpsc::Sender<(Notification, SocketAddr)> {
    fn deliver<'a>(&'a self, notification: Notification, source: SocketAddr) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if self.send((notification, source)).await.is_err() {
                tracing::debug!(target: "snmp_stack::notification", { snmp.source = %source }, "notification channel closed, dropping");
            }
        })
    }
}

impl NotificationSink for mpsc::UnboundedSender<(Notification, SocketAddr)> {
    fn deliver<'a>(&'a self, notification: Notification, source: SocketAddr) -> BoxFuture<'a, ()> {
        if self.send((notification, source)).is_err() {
            tracing::debug!(target: "snmp_stack::notification", { snmp.source = %source }, "notification channel closed, dropping");
        }
        Box::pin(async {})
    }
}

/// Sink calling a synchronous closure; see [`sink_fn`].
#[derive(Debug, Clone)]
pub struct FnSink<F>(F);

/// Wrap a closure as a [`NotificationSink`].
///
/// ```rust
/// use snmp_stack::notification::{sink_fn, NotificationSink};
///
/// let sink = sink_fn(|notification, source| {
///     println!("{source}: {}", notification.trap_oid());
/// });
/// # fn assert_sink(_: &impl NotificationSink) {}
/// # assert_sink(&sink);
/// ```
pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: Fn(Notification, SocketAddr) + Send + Sync,
{
    FnSink(f)
}

impl<F> NotificationSink for FnSink<F>
where
    F: Fn(Notification, SocketAddr) + Send + Sync,
{
    fn deliver<'a>(&'a self, notification: Notification, source: SocketAddr) -> BoxFuture<'a, ()> {
        (self.0)(notification, source);
        Box::pin(async {})
    }
}
