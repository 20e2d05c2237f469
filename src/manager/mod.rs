//! SNMP Manager.
//!
//! A [`Manager`] owns one UDP socket and correlates replies with outstanding
//! requests by request id. Sending and receiving are split: [`Manager::send`]
//! returns an [`InvokeId`] straight away and [`Manager::receive`] resolves to
//! the reply or to [`Outcome::Timeout`], whichever comes first.
//!
//! # Example
//!
//! ```rust,no_run
//! use snmp_stack::manager::{Manager, Outcome};
//! use snmp_stack::oid;
//! use std::time::Duration;
//!
//! # async fn example() -> snmp_stack::Result<()> {
//! let manager = Manager::builder()
//!     .community(b"public")
//!     .timeout(Duration::from_secs(2))
//!     .build()
//!     .await?;
//!
//! let agent = "192.168.1.1:161".parse().unwrap();
//! match manager.get(agent, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]).await? {
//!     Outcome::Reply(pdu) => {
//!         for vb in &pdu.varbinds {
//!             println!("{vb}");
//!         }
//!     }
//!     Outcome::Timeout => println!("no answer"),
//! }
//! # Ok(())
//! # }
//! ```

mod pending;

pub use pending::{InvokeId, MAX_REQUEST_ID, MAX_UNCLAIMED_OUTCOMES, Outcome};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::util::bind_udp_socket;
use crate::varbind::VarBind;
use crate::version::Version;

use pending::PendingTable;

/// Default time to wait for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for [`Manager`].
pub struct ManagerBuilder {
    bind_addr: String,
    community: Bytes,
    version: Version,
    timeout: Duration,
    max_message_size: usize,
    cancel: Option<CancellationToken>,
}

impl ManagerBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - Bind address: `0.0.0.0:0` (ephemeral port)
    /// - Community: `public`, SNMPv2c
    /// - Timeout: 5 seconds
    /// - Max message size: 1300 bytes
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".into(),
            community: Bytes::from_static(b"public"),
            version: Version::V2c,
            timeout: DEFAULT_TIMEOUT,
            max_message_size: crate::DEFAULT_MAX_MESSAGE_SIZE,
            cancel: None,
        }
    }

    /// Set the local address. Use `[::]:0` to talk to IPv6 agents.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Community used by the convenience request methods.
    pub fn community(mut self, community: &[u8]) -> Self {
        self.community = Bytes::copy_from_slice(community);
        self
    }

    /// Version used by the convenience request methods.
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Timeout used by [`Manager::request`] and the convenience methods.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Largest request the manager will send.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bind the socket and start the receive task.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn build(self) -> Result<Manager> {
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

        let inner = Arc::new(ManagerInner {
            socket,
            local_addr,
            community: self.community,
            version: self.version,
            timeout: self.timeout,
            max_message_size: self.max_message_size,
            pending: PendingTable::new(),
            cancel: self.cancel.unwrap_or_default(),
        });
        tokio::spawn(recv_loop(inner.clone()));

        Ok(Manager { inner })
    }
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct ManagerInner {
    socket: UdpSocket,
    local_addr: SocketAddr,
    community: Bytes,
    version: Version,
    timeout: Duration,
    max_message_size: usize,
    pending: PendingTable,
    cancel: CancellationToken,
}

/// SNMP Manager.
///
/// Cloning is cheap; clones share the socket and the pending request table.
/// The receive task runs until the [`cancel`](Self::cancel) token fires.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

impl Manager {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Token that stops the receive task. Outstanding requests then resolve
    /// to [`Error::Closed`].
    pub fn cancel(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Number of requests awaiting a reply or a timeout.
    pub fn pending(&self) -> usize {
        self.inner.pending.len()
    }

    /// Send `request` to `destination` and start its timer.
    ///
    /// The request id of `request` is replaced with the next free id in
    /// `1..=50000`. The envelope (version, community) is sent as given.
    pub async fn send(
        &self,
        destination: SocketAddr,
        mut request: Pdu,
        timeout: Duration,
    ) -> Result<InvokeId> {
        if self.inner.cancel.is_cancelled() {
            return Err(Error::Closed);
        }

        let pending = &self.inner.pending;
        let (invoke, request_id) = pending.register(destination)?;
        request.request_id = request_id;

        let data = match self.encode(&request) {
            Ok(data) => data,
            Err(e) => {
                pending.cancel(request_id, invoke);
                return Err(e);
            }
        };

        let inner = self.inner.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            inner.pending.expire(request_id, invoke);
        });
        pending.set_timer(request_id, invoke, timer.abort_handle());

        tracing::trace!(target: "snmp_stack::manager", { snmp.destination = %destination, snmp.request_id = request_id, snmp.pdu_type = %request.pdu_type, length = data.len() }, "sending request");
        if let Err(e) = self.inner.socket.send_to(&data, destination).await {
            pending.cancel(request_id, invoke);
            tracing::warn!(target: "snmp_stack::manager", { snmp.destination = %destination, snmp.request_id = request_id, error = %e }, "send failed");
            return Err(Error::Io {
                target: Some(destination),
                source: e,
            });
        }
        Ok(invoke)
    }

    fn encode(&self, request: &Pdu) -> Result<Bytes> {
        let data = request.encode()?;
        if data.len() > self.inner.max_message_size {
            return Err(Error::MessageTooLarge {
                size: data.len(),
                max: self.inner.max_message_size,
            });
        }
        Ok(data)
    }

    /// Wait for the outcome of a sent request.
    ///
    /// Each invoke id can be received once. An outcome left unreceived behind
    /// [`MAX_UNCLAIMED_OUTCOMES`] newer ones is dropped and its invoke id
    /// reports [`Error::UnknownInvoke`].
    pub async fn receive(&self, invoke: InvokeId) -> Result<Outcome> {
        let rx = self
            .inner
            .pending
            .take_waiter(invoke)
            .ok_or(Error::UnknownInvoke(invoke.as_u64()))?;
        rx.await.map_err(|_| Error::Closed)
    }

    /// Send with the configured timeout and wait for the outcome.
    pub async fn request(&self, destination: SocketAddr, request: Pdu) -> Result<Outcome> {
        let invoke = self.send(destination, request, self.inner.timeout).await?;
        self.receive(invoke).await
    }

    fn envelope(&self, pdu: Pdu) -> Pdu {
        pdu.with_version(self.inner.version)
            .with_community(self.inner.community.clone())
    }

    pub async fn get(&self, destination: SocketAddr, oids: &[Oid]) -> Result<Outcome> {
        let pdu = self.envelope(Pdu::get_request(0, oids));
        self.request(destination, pdu).await
    }

    pub async fn get_next(&self, destination: SocketAddr, oids: &[Oid]) -> Result<Outcome> {
        let pdu = self.envelope(Pdu::get_next_request(0, oids));
        self.request(destination, pdu).await
    }

    /// GETBULK. Fails with [`Error::Config`] when the manager speaks SNMPv1.
    pub async fn get_bulk(
        &self,
        destination: SocketAddr,
        non_repeaters: i32,
        max_repetitions: i32,
        oids: &[Oid],
    ) -> Result<Outcome> {
        if self.inner.version == Version::V1 {
            return Err(Error::Config("GETBULK requires SNMPv2c".into()));
        }
        let pdu = self.envelope(Pdu::get_bulk(0, non_repeaters, max_repetitions, oids));
        self.request(destination, pdu).await
    }

    pub async fn set(&self, destination: SocketAddr, varbinds: Vec<VarBind>) -> Result<Outcome> {
        let pdu = self.envelope(Pdu::set_request(0, varbinds));
        self.request(destination, pdu).await
    }
}

/// Receive replies until cancelled.
async fn recv_loop(inner: Arc<ManagerInner>) {
    let mut buf = vec![0u8; 65535];

    loop {
        let (len, source) = tokio::select! {
            result = inner.socket.recv_from(&mut buf) => match result {
                Ok(received) => received,
                Err(e) => {
                    tracing::warn!(target: "snmp_stack::manager", { error = %e }, "receive failed");
                    continue;
                }
            },
            _ = inner.cancel.cancelled() => {
                tracing::debug!(target: "snmp_stack::manager", "manager shutdown requested");
                inner.pending.close();
                return;
            }
        };

        let reply = match Pdu::decode(Bytes::copy_from_slice(&buf[..len])) {
            Ok(pdu) => pdu,
            Err(e) => {
                tracing::debug!(target: "snmp_stack::manager", { snmp.source = %source, error = %e }, "failed to decode reply");
                continue;
            }
        };

        if !matches!(reply.pdu_type, PduType::Response | PduType::Report) {
            tracing::debug!(target: "snmp_stack::manager", { snmp.source = %source, snmp.pdu_type = %reply.pdu_type }, "ignoring non-response PDU");
            continue;
        }

        tracing::trace!(target: "snmp_stack::manager", { snmp.source = %source, snmp.request_id = reply.request_id }, "reply received");
        let mut reply = reply;
        reply.source = Some(source);
        inner.pending.complete(source, reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_builder_defaults() {
        let builder = ManagerBuilder::new();
        assert_eq!(builder.bind_addr, "0.0.0.0:0");
        assert_eq!(builder.community.as_ref(), b"public");
        assert_eq!(builder.version, Version::V2c);
        assert_eq!(builder.timeout, DEFAULT_TIMEOUT);
        assert_eq!(builder.max_message_size, 1300);
    }

    async fn manager(timeout: Duration) -> Manager {
        Manager::builder()
            .bind("127.0.0.1:0")
            .timeout(timeout)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_timeout_outcome() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let manager = manager(Duration::from_millis(20)).await;
        let outcome = manager
            .get(silent.local_addr().unwrap(), &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)])
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Timeout);
        assert_eq!(manager.pending(), 0);
    }

    #[tokio::test]
    async fn test_unknown_invoke() {
        let manager = manager(DEFAULT_TIMEOUT).await;
        assert!(matches!(
            manager.receive(InvokeId(42)).await,
            Err(Error::UnknownInvoke(42))
        ));
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let manager = Manager::builder()
            .bind("127.0.0.1:0")
            .max_message_size(64)
            .build()
            .await
            .unwrap();
        let oids = vec![oid!(1, 3, 6, 1, 2, 1, 1, 1, 0); 10];
        let dest: SocketAddr = "127.0.0.1:161".parse().unwrap();
        let err = manager.get(dest, &oids).await.unwrap_err();
        assert!(matches!(err, Error::MessageTooLarge { max: 64, .. }));
        assert_eq!(manager.pending(), 0);
    }

    #[tokio::test]
    async fn test_get_bulk_v1_rejected() {
        let manager = Manager::builder()
            .bind("127.0.0.1:0")
            .version(Version::V1)
            .build()
            .await
            .unwrap();
        let dest: SocketAddr = "127.0.0.1:161".parse().unwrap();
        assert!(matches!(
            manager.get_bulk(dest, 0, 10, &[oid!(1, 3, 6)]).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_closes_pending() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let manager = manager(Duration::from_secs(30)).await;
        let invoke = manager
            .send(
                silent.local_addr().unwrap(),
                Pdu::get_request(0, &[oid!(1, 3, 6, 1)]),
                Duration::from_secs(30),
            )
            .await
            .unwrap();
        manager.cancel().cancel();
        assert!(matches!(manager.receive(invoke).await, Err(Error::Closed)));
        assert!(matches!(
            manager
                .send(
                    silent.local_addr().unwrap(),
                    Pdu::get_request(0, &[oid!(1, 3, 6, 1)]),
                    Duration::from_secs(1)
                )
                .await,
            Err(Error::Closed)
        ));
    }
}
