//! SNMP Notification Receiver (RFC 3413).
//!
//! This module provides functionality for receiving SNMP notifications:
//! - TrapV1 (SNMPv1 format, different PDU structure)
//! - TrapV2/SNMPv2-Trap (SNMPv2c format)
//! - InformRequest (confirmed notification, requires response)
//!
//! Decoded notifications are handed to a [`NotificationSink`]; a tokio mpsc
//! sender works as one.
//!
//! # Example
//!
//! ```rust,no_run
//! use snmp_stack::notification::NotificationReceiver;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmp_stack::Error> {
//!     let receiver = NotificationReceiver::builder()
//!         .bind("0.0.0.0:1162")
//!         .build()
//!         .await?;
//!
//!     let (tx, mut rx) = mpsc::channel(64);
//!     tokio::spawn({
//!         let receiver = receiver.clone();
//!         async move { receiver.run(tx).await }
//!     });
//!
//!     while let Some((notification, source)) = rx.recv().await {
//!         println!("{source}: {}", notification.trap_oid());
//!     }
//!     Ok(())
//! }
//! ```

mod types;
mod varbind;

pub use types::{FnSink, Notification, NotificationSink, sink_fn};
pub use varbind::validate_notification_varbinds;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::pdu::Pdu;
use crate::util::{bind_udp_socket, community_matches};

/// Well-known OIDs for notification varbinds.
pub mod oids {
    use crate::oid;

    /// sysUpTime.0 - first varbind in v2c notifications
    pub fn sys_uptime() -> crate::Oid {
        oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
    }

    /// snmpTrapOID.0 - second varbind in v2c notifications (contains trap type)
    pub fn snmp_trap_oid() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0)
    }

    /// snmpTrapEnterprise.0 - optional, enterprise OID for enterprise-specific traps
    pub fn snmp_trap_enterprise() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 4, 3, 0)
    }

    /// Standard trap OID prefix (snmpTraps)
    pub fn snmp_traps() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 5)
    }

    /// coldStart trap OID (snmpTraps.1)
    pub fn cold_start() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 1)
    }

    /// warmStart trap OID (snmpTraps.2)
    pub fn warm_start() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 2)
    }

    /// linkDown trap OID (snmpTraps.3)
    pub fn link_down() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3)
    }

    /// linkUp trap OID (snmpTraps.4)
    pub fn link_up() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 4)
    }

    /// authenticationFailure trap OID (snmpTraps.5)
    pub fn auth_failure() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 5)
    }

    /// egpNeighborLoss trap OID (snmpTraps.6)
    pub fn egp_neighbor_loss() -> crate::Oid {
        oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 6)
    }
}

/// Builder for `NotificationReceiver`.
pub struct NotificationReceiverBuilder {
    bind_addr: String,
    communities: Vec<Vec<u8>>,
    cancel: Option<CancellationToken>,
}

impl NotificationReceiverBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - Bind address: `0.0.0.0:162` (UDP, standard SNMP trap port)
    /// - No communities (every community accepted)
    pub fn new() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", crate::DEFAULT_TRAP_PORT),
            communities: Vec::new(),
            cancel: None,
        }
    }

    /// Set the UDP bind address.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Accept only notifications carrying this community (may be repeated).
    pub fn community(mut self, community: &[u8]) -> Self {
        self.communities.push(community.to_vec());
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the notification receiver.
    pub async fn build(self) -> Result<NotificationReceiver> {
        let bind_addr: SocketAddr = self
            .bind_addr
            .parse()
            .map_err(|_| Error::Config(format!("invalid bind address: {}", self.bind_addr)))?;

        let socket = bind_udp_socket(bind_addr).await.map_err(|e| Error::Io {
            target: Some(bind_addr),
            source: e,
        })?;

        let local_addr = socket.local_addr().map_err(|e| Error::Io {
            target: Some(bind_addr),
            source: e,
        })?;

        Ok(NotificationReceiver {
            inner: Arc::new(ReceiverInner {
                socket,
                local_addr,
                communities: self.communities,
                cancel: self.cancel.unwrap_or_default(),
            }),
        })
    }
}

impl Default for NotificationReceiverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// SNMP Notification Receiver.
///
/// Listens for incoming SNMP notifications (traps and informs) on a UDP socket.
/// For InformRequest notifications, automatically sends a Response-PDU before
/// the notification is delivered.
#[derive(Clone)]
pub struct NotificationReceiver {
    inner: Arc<ReceiverInner>,
}

struct ReceiverInner {
    socket: UdpSocket,
    local_addr: SocketAddr,
    communities: Vec<Vec<u8>>,
    cancel: CancellationToken,
}

impl NotificationReceiver {
    pub fn builder() -> NotificationReceiverBuilder {
        NotificationReceiverBuilder::new()
    }

    /// Get the local address this receiver is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    pub fn cancel(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Receive notifications and deliver them to `sink` until cancelled.
    ///
    /// Malformed datagrams and non-notification PDUs are logged and skipped.
    #[instrument(skip(self, sink), err, fields(snmp.local_addr = %self.local_addr()))]
    pub async fn run<S: NotificationSink>(&self, sink: S) -> Result<()> {
        let mut buf = vec![0u8; 65535];

        loop {
            let (len, source) = tokio::select! {
                result = self.inner.socket.recv_from(&mut buf) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        tracing::warn!(target: "snmp_stack::notification", { error = %e }, "receive failed");
                        continue;
                    }
                },
                _ = self.inner.cancel.cancelled() => {
                    tracing::debug!(target: "snmp_stack::notification", "notification receiver shutdown requested");
                    return Ok(());
                }
            };

            let data = Bytes::copy_from_slice(&buf[..len]);
            match self.parse_and_respond(data, source).await {
                Ok(Some(notification)) => sink.deliver(notification, source).await,
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(target: "snmp_stack::notification", { snmp.source = %source, error = %e }, "failed to parse notification");
                }
            }
        }
    }

    /// Parse received data and answer informs.
    ///
    /// Returns `None` if the message is not an acceptable notification.
    async fn parse_and_respond(
        &self,
        data: Bytes,
        source: SocketAddr,
    ) -> Result<Option<Notification>> {
        let mut pdu = Pdu::decode(data)?;
        pdu.source = Some(source);

        if !self.inner.communities.is_empty()
            && !community_matches(&self.inner.communities, &pdu.community)
        {
            tracing::debug!(target: "snmp_stack::notification", { snmp.source = %source }, "invalid community string");
            return Ok(None);
        }

        let Some(notification) = Notification::from_pdu(&pdu)? else {
            tracing::debug!(target: "snmp_stack::notification", { snmp.source = %source, snmp.pdu_type = %pdu.pdu_type, version = %pdu.version }, "ignoring non-notification PDU");
            return Ok(None);
        };

        if notification.is_confirmed() {
            let response = pdu.to_response().encode()?;
            self.inner
                .socket
                .send_to(&response, source)
                .await
                .map_err(|e| Error::Io {
                    target: Some(source),
                    source: e,
                })?;
            tracing::trace!(target: "snmp_stack::notification", { snmp.source = %source, snmp.request_id = pdu.request_id }, "inform acknowledged");
        }

        Ok(Some(notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::PduType;
    use crate::value::AsnValue;
    use crate::varbind::VarBind;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn header() -> Vec<VarBind> {
        vec![
            VarBind::new(oids::sys_uptime(), AsnValue::timeticks(100)),
            VarBind::new(oids::snmp_trap_oid(), AsnValue::oid(oids::cold_start())),
        ]
    }

    #[test]
    fn test_notification_receiver_builder_default() {
        let builder = NotificationReceiverBuilder::new();
        assert_eq!(builder.bind_addr, "0.0.0.0:162");
        assert!(builder.communities.is_empty());
    }

    async fn receiver(community: Option<&[u8]>) -> NotificationReceiver {
        let mut builder = NotificationReceiver::builder().bind("127.0.0.1:0");
        if let Some(c) = community {
            builder = builder.community(c);
        }
        builder.build().await.unwrap()
    }

    #[tokio::test]
    async fn test_inform_answered_and_delivered() {
        let receiver = receiver(None).await;
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn({
            let receiver = receiver.clone();
            async move { receiver.run(tx).await }
        });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let inform = Pdu::inform(77, header()).encode().unwrap();
        sender.send_to(&inform, receiver.local_addr()).await.unwrap();

        let mut buf = [0u8; 1500];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), sender.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let ack = Pdu::decode(Bytes::copy_from_slice(&buf[..len])).unwrap();
        assert_eq!(ack.pdu_type, PduType::Response);
        assert_eq!(ack.request_id, 77);
        assert_eq!(ack.varbinds, header());

        let (notification, source) = rx.recv().await.unwrap();
        assert_eq!(source, sender.local_addr().unwrap());
        assert_eq!(notification.trap_oid(), oids::cold_start());
        assert!(notification.is_confirmed());

        receiver.cancel().cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wrong_community_skipped() {
        let receiver = receiver(Some(b"traps")).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn({
            let receiver = receiver.clone();
            async move { receiver.run(tx).await }
        });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let wrong = Pdu::trap_v2(1, header()).encode().unwrap();
        sender.send_to(&wrong, receiver.local_addr()).await.unwrap();
        let right = Pdu::trap_v2(2, header())
            .with_community(&b"traps"[..])
            .encode()
            .unwrap();
        sender.send_to(&right, receiver.local_addr()).await.unwrap();

        let (notification, _) = rx.recv().await.unwrap();
        assert!(matches!(
            notification,
            Notification::TrapV2c { request_id: 2, .. }
        ));

        receiver.cancel().cancel();
        task.await.unwrap().unwrap();
    }
}
