//! In-process SNMP agent for testing.
//!
//! Wraps the library's Agent with automatic lifecycle management.
//! Agents bind to ephemeral localhost ports and shut down cleanly on drop.

use snmp_stack::agent::{Agent, AgentBuilder, MibTree};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::fixtures;

/// An in-process SNMP agent for testing.
///
/// Automatically starts on creation and stops on drop.
pub struct TestAgent {
    addr: SocketAddr,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl TestAgent {
    /// Agent serving [`fixtures::standard_mib`] with community `public`.
    pub async fn new() -> Self {
        Self::with_mib(fixtures::standard_mib()).await
    }

    pub async fn with_mib(mib: MibTree) -> Self {
        Self::with_builder(Agent::builder().community(b"public").mib(mib)).await
    }

    /// Start an agent from a partially configured builder.
    ///
    /// The bind address and cancellation token are overridden.
    pub async fn with_builder(builder: AgentBuilder) -> Self {
        super::init_tracing();
        let cancel = CancellationToken::new();

        let agent = builder
            .bind("127.0.0.1:0")
            .cancel(cancel.clone())
            .build()
            .await
            .expect("failed to build test agent");

        let addr = agent.local_addr();
        let task = tokio::spawn(async move {
            if let Err(e) = agent.run().await {
                eprintln!("TestAgent error: {}", e);
            }
        });

        Self {
            addr,
            cancel,
            _task: task,
        }
    }

    /// Get the agent's listening address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Explicitly stop the agent.
    ///
    /// Called automatically on drop, but can be called early if needed.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
