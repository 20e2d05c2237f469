//! SNMP Agent.
//!
//! This module provides the server side of the stack: a [`MibTree`] of
//! registered objects and an [`Agent`] that answers GET, GETNEXT, GETBULK and
//! SET requests over UDP.
//!
//! # Features
//!
//! - **Async handlers**: leaf handlers return boxed futures and may await I/O
//! - **Two-pass SET**: every varbind is tested before any is written
//! - **Transaction hook**: optional per-request prepare/commit
//! - **Worker pool**: bounded parallel dispatch that falls back to inline
//!   processing instead of dropping requests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use snmp_stack::agent::{Agent, MibTree, NodeKind};
//! use snmp_stack::handler::ScalarHandler;
//! use snmp_stack::oid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmp_stack::Error> {
//!     let mut mib = MibTree::new();
//!     mib.insert(oid!(1, 3, 6, 1, 2, 1, 1), NodeKind::Group, 0, None)?;
//!     let descr = oid!(1, 3, 6, 1, 2, 1, 1, 1);
//!     mib.leaf(descr.clone(), 1, Arc::new(ScalarHandler::new(descr, "My SNMP Agent")))?;
//!
//!     let agent = Agent::builder()
//!         .bind("0.0.0.0:1161")
//!         .community(b"public")
//!         .mib(mib)
//!         .build()
//!         .await?;
//!
//!     agent.run().await
//! }
//! ```

mod dispatch;
mod mib;
mod request;
mod transaction;

pub use mib::{MibNode, MibTree, NodeId, NodeKind};
pub use transaction::Transaction;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::util::{bind_udp_socket, community_matches};

use transaction::TransactionFactory;

/// How the agent processes received datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Process each datagram on the receive task, in arrival order.
    #[default]
    Sequential,
    /// Process datagrams on up to `n` concurrent tasks. When all are busy the
    /// datagram is processed inline on the receive task.
    Pool(usize),
}

/// Builder for [`Agent`].
///
/// ```rust,no_run
/// use snmp_stack::agent::{Agent, DispatchMode, MibTree};
///
/// # async fn example() -> Result<(), snmp_stack::Error> {
/// let agent = Agent::builder()
///     .bind("127.0.0.1:1161")
///     .community(b"public")
///     .dispatch(DispatchMode::Pool(8))
///     .mib(MibTree::new())
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct AgentBuilder {
    bind_addr: String,
    communities: Vec<Vec<u8>>,
    max_message_size: usize,
    dispatch: DispatchMode,
    transaction: Option<TransactionFactory>,
    mib: MibTree,
    cancel: Option<CancellationToken>,
}

impl AgentBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - Bind address: `0.0.0.0:161`
    /// - Max message size: 1300 bytes
    /// - Sequential dispatch, no transaction hook, empty MIB
    /// - No communities (all requests rejected)
    pub fn new() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", crate::DEFAULT_AGENT_PORT),
            communities: Vec::new(),
            max_message_size: crate::DEFAULT_MAX_MESSAGE_SIZE,
            dispatch: DispatchMode::Sequential,
            transaction: None,
            mib: MibTree::new(),
            cancel: None,
        }
    }

    /// Set the UDP bind address. IPv6 addresses bind IPv6-only.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Add an accepted community string.
    ///
    /// Multiple communities can be added. If none are added, all requests
    /// are rejected.
    pub fn community(mut self, community: &[u8]) -> Self {
        self.communities.push(community.to_vec());
        self
    }

    /// Add multiple community strings.
    pub fn communities<I, C>(mut self, communities: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        for c in communities {
            self.communities.push(c.as_ref().to_vec());
        }
        self
    }

    /// Largest response datagram the agent sends.
    ///
    /// Larger GET/GETNEXT/SET responses become `tooBig`; GETBULK responses
    /// lose trailing rows.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }

    /// Install a transaction hook; each request gets its own clone.
    pub fn transaction<T>(mut self, prototype: T) -> Self
    where
        T: Transaction + Clone + Sync + 'static,
    {
        self.transaction = Some(transaction::factory(prototype));
        self
    }

    /// Set the MIB tree served by the agent.
    pub fn mib(mut self, mib: MibTree) -> Self {
        self.mib = mib;
        self
    }

    /// Set a cancellation token for graceful shutdown.
    ///
    /// If not set, the agent creates its own token accessible via `Agent::cancel()`.
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bind the socket and build the agent.
    pub async fn build(self) -> Result<Agent> {
        let bind_addr: SocketAddr = self
            .bind_addr
            .parse()
            .map_err(|_| Error::Config(format!("invalid bind address: {}", self.bind_addr)))?;

        let pool = match self.dispatch {
            DispatchMode::Sequential => None,
            DispatchMode::Pool(0) => {
                return Err(Error::Config("worker pool size must be at least 1".into()));
            }
            DispatchMode::Pool(n) => Some(Arc::new(Semaphore::new(n))),
        };

        let socket = bind_udp_socket(bind_addr).await.map_err(|e| Error::Io {
            target: Some(bind_addr),
            source: e,
        })?;
        let local_addr = socket.local_addr().map_err(|e| Error::Io {
            target: Some(bind_addr),
            source: e,
        })?;

        Ok(Agent {
            inner: Arc::new(AgentInner {
                socket,
                local_addr,
                communities: self.communities,
                max_message_size: self.max_message_size,
                pool,
                transaction: self.transaction,
                mib: self.mib,
                cancel: self.cancel.unwrap_or_default(),
            }),
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Inner state shared across agent clones.
pub(crate) struct AgentInner {
    pub(crate) socket: UdpSocket,
    pub(crate) local_addr: SocketAddr,
    pub(crate) communities: Vec<Vec<u8>>,
    pub(crate) max_message_size: usize,
    pub(crate) pool: Option<Arc<Semaphore>>,
    pub(crate) transaction: Option<TransactionFactory>,
    pub(crate) mib: MibTree,
    pub(crate) cancel: CancellationToken,
}

/// SNMP Agent.
///
/// Cloning is cheap; clones share the socket and the MIB.
#[derive(Clone)]
pub struct Agent {
    pub(crate) inner: Arc<AgentInner>,
}

impl Agent {
    /// Create a builder for configuring the agent.
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Get the local address the agent is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Get the cancellation token for this agent.
    ///
    /// Call `token.cancel()` to stop [`run`](Self::run).
    pub fn cancel(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn mib(&self) -> &MibTree {
        &self.inner.mib
    }

    /// Receive and answer requests until cancelled.
    ///
    /// Socket errors on receive are logged and the loop continues.
    #[instrument(skip(self), err, fields(snmp.local_addr = %self.local_addr()))]
    pub async fn run(&self) -> Result<()> {
        let mut buf = vec![0u8; 65535];

        loop {
            let (len, source) = tokio::select! {
                result = self.inner.socket.recv_from(&mut buf) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        tracing::warn!(target: "snmp_stack::agent", { error = %e }, "receive failed");
                        continue;
                    }
                },
                _ = self.inner.cancel.cancelled() => {
                    tracing::info!(target: "snmp_stack::agent", "agent shutdown requested");
                    return Ok(());
                }
            };

            let data = Bytes::copy_from_slice(&buf[..len]);
            tracing::trace!(target: "snmp_stack::agent", { snmp.source = %source, length = len }, "datagram received");

            let Some(pool) = &self.inner.pool else {
                self.process_inline(data, source).await;
                continue;
            };

            match pool.clone().try_acquire_owned() {
                Ok(permit) => {
                    let agent = self.clone();
                    tokio::spawn(async move {
                        agent.process(data, source).await;
                        drop(permit);
                    });
                }
                Err(_) => {
                    tracing::trace!(target: "snmp_stack::agent", { snmp.source = %source }, "worker pool busy, processing inline");
                    self.process_inline(data, source).await;
                }
            }
        }
    }

    /// Process one datagram before receiving the next.
    ///
    /// Runs on its own task so a panicking handler fails only this request.
    async fn process_inline(&self, data: Bytes, source: SocketAddr) {
        let agent = self.clone();
        let task = tokio::spawn(async move { agent.process(data, source).await });
        if let Err(e) = task.await {
            tracing::warn!(target: "snmp_stack::agent", { snmp.source = %source, error = %e }, "request processing aborted");
        }
    }

    /// Handle one datagram and send the response, if any.
    async fn process(&self, data: Bytes, source: SocketAddr) {
        let Some(response) = self.handle_request(data, source).await else {
            return;
        };
        if let Err(e) = self.inner.socket.send_to(&response, source).await {
            tracing::warn!(target: "snmp_stack::agent", { snmp.source = %source, error = %e }, "failed to send response");
        }
    }

    /// Validate community string using constant-time comparison.
    pub(crate) fn validate_community(&self, community: &[u8]) -> bool {
        community_matches(&self.inner.communities, community)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_builder_defaults() {
        let builder = AgentBuilder::new();
        assert_eq!(builder.bind_addr, "0.0.0.0:161");
        assert_eq!(builder.max_message_size, 1300);
        assert_eq!(builder.dispatch, DispatchMode::Sequential);
        assert!(builder.communities.is_empty());
        assert!(builder.mib.is_empty());
    }

    #[test]
    fn test_agent_builder_communities() {
        let builder = AgentBuilder::new()
            .community(b"public")
            .communities(["private", "monitor"]);
        assert_eq!(builder.communities.len(), 3);
    }

    #[tokio::test]
    async fn test_pool_of_zero_rejected() {
        let err = Agent::builder()
            .bind("127.0.0.1:0")
            .dispatch(DispatchMode::Pool(0))
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let err = Agent::builder().bind("not an address").build().await.err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_validate_community() {
        let agent = Agent::builder()
            .bind("127.0.0.1:0")
            .community(b"public")
            .community(b"private")
            .build()
            .await
            .unwrap();
        assert!(agent.validate_community(b"public"));
        assert!(agent.validate_community(b"private"));
        assert!(!agent.validate_community(b"publi"));
        assert!(!agent.validate_community(b""));

        let closed = Agent::builder().bind("127.0.0.1:0").build().await.unwrap();
        assert!(!closed.validate_community(b"public"));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let agent = Agent::builder().bind("127.0.0.1:0").build().await.unwrap();
        let cancel = agent.cancel();
        let task = tokio::spawn({
            let agent = agent.clone();
            async move { agent.run().await }
        });
        cancel.cancel();
        task.await.unwrap().unwrap();
    }
}
