// Allow large error types - the Error enum includes OIDs inline for debugging convenience.
#![allow(clippy::result_large_err)]

//! # snmp-stack
//!
//! Async SNMP v1/v2c protocol stack for Rust.
//!
//! ## Features
//!
//! - Zero-copy, failure-tolerant BER encoding/decoding
//! - Type-safe OID and value handling
//! - Extensible agent: a MIB tree of async handlers answering
//!   GET/GETNEXT/GETBULK/SET, with an optional worker pool
//! - Manager with request-id correlation, timeouts as a first-class outcome,
//!   and a trap/inform receiver
//!
//! ## Agent
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use snmp_stack::agent::{Agent, DispatchMode, MibTree};
//! use snmp_stack::handler::ScalarHandler;
//! use snmp_stack::oid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmp_stack::Error> {
//!     let mut mib = MibTree::new();
//!     let descr = oid!(1, 3, 6, 1, 2, 1, 1, 1);
//!     mib.leaf(descr.clone(), 1, Arc::new(ScalarHandler::new(descr, "edge router")))?;
//!
//!     Agent::builder()
//!         .bind("0.0.0.0:1161")
//!         .community(b"public")
//!         .dispatch(DispatchMode::Pool(4))
//!         .mib(mib)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```
//!
//! ## Manager
//!
//! ```rust,no_run
//! use snmp_stack::manager::{Manager, Outcome};
//! use snmp_stack::oid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmp_stack::Error> {
//!     let manager = Manager::builder().community(b"public").build().await?;
//!     let agent = "192.168.1.1:161".parse().unwrap();
//!
//!     if let Outcome::Reply(pdu) = manager.get(agent, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]).await? {
//!         println!("sysDescr: {}", pdu.varbinds[0].value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod ber;
pub mod error;
pub mod handler;
pub mod manager;
pub mod notification;
pub mod oid;
pub mod pdu;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

// Re-exports for convenience
pub use agent::{Agent, AgentBuilder, DispatchMode, MibTree, NodeKind, Transaction};
pub use error::{
    DecodeErrorKind, EncodeErrorKind, Error, ErrorStatus, MibErrorKind, OidErrorKind, Result,
};
pub use handler::{
    BoxFuture, GetNextResult, GetResult, MibHandler, RequestContext, ScalarHandler, SetResult,
};
pub use manager::{InvokeId, Manager, ManagerBuilder, Outcome};
pub use notification::{
    Notification, NotificationReceiver, NotificationReceiverBuilder, NotificationSink,
};
pub use oid::Oid;
pub use pdu::{GenericTrap, Pdu, PduType, TrapV1};
pub use value::{AsnData, AsnValue};
pub use varbind::VarBind;
pub use version::Version;

/// Standard agent port.
pub const DEFAULT_AGENT_PORT: u16 = 161;

/// Standard notification port.
pub const DEFAULT_TRAP_PORT: u16 = 162;

/// Default largest datagram sent by the agent and the manager.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1300;
