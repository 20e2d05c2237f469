//! Varbind extraction and validation for SNMP notifications.
//!
//! Per RFC 3416, notification PDUs have a specific varbind structure:
//! - First varbind: sysUpTime.0 (1.3.6.1.2.1.1.3.0) with TimeTicks value
//! - Second varbind: snmpTrapOID.0 (1.3.6.1.6.3.1.1.4.1.0) with OID value
//! - Remaining varbinds: notification-specific data

use crate::ber::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::varbind::VarBind;

use super::oids;

/// Extract uptime, trap OID, and additional varbinds from a v2c notification.
///
/// Only the value types of the first two varbinds are checked, not their OIDs.
pub(crate) fn extract_notification_varbinds(pdu: &Pdu) -> Result<(u32, Oid, Vec<VarBind>)> {
    let [uptime_vb, trap_vb, rest @ ..] = pdu.varbinds.as_slice() else {
        tracing::debug!(target: "snmp_stack::notification", { count = pdu.varbinds.len() }, "notification has fewer than 2 varbinds");
        return Err(Error::decode(
            0,
            DecodeErrorKind::MalformedVarBind {
                index: pdu.varbinds.len(),
            },
        ));
    };

    let uptime = match uptime_vb.value.tag() {
        tag::application::TIMETICKS => uptime_vb.value.as_u32(),
        _ => None,
    };
    let Some(uptime) = uptime else {
        tracing::debug!(target: "snmp_stack::notification", { actual = %uptime_vb.value }, "first varbind is not TimeTicks");
        return Err(Error::decode(0, DecodeErrorKind::MalformedVarBind { index: 0 }));
    };

    let Some(trap_oid) = trap_vb.value.as_oid() else {
        tracing::debug!(target: "snmp_stack::notification", { actual = %trap_vb.value }, "second varbind is not an OID");
        return Err(Error::decode(0, DecodeErrorKind::MalformedVarBind { index: 1 }));
    };

    Ok((uptime, trap_oid.clone(), rest.to_vec()))
}

/// Validate notification varbinds strictly per RFC 3416.
///
/// Returns `true` if the first two varbinds have the correct OIDs:
/// - First: sysUpTime.0 (1.3.6.1.2.1.1.3.0) with TimeTicks value
/// - Second: snmpTrapOID.0 (1.3.6.1.6.3.1.1.4.1.0) with OID value
pub fn validate_notification_varbinds(pdu: &Pdu) -> bool {
    let [uptime, trap, ..] = pdu.varbinds.as_slice() else {
        return false;
    };
    uptime.oid == oids::sys_uptime()
        && uptime.value.tag() == tag::application::TIMETICKS
        && trap.oid == oids::snmp_trap_oid()
        && trap.value.as_oid().is_some()
}
