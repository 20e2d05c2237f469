//! MIB handler interface.
//!
//! A [`MibHandler`] serves the instances below one Leaf of the agent's
//! [`MibTree`](crate::agent::MibTree). The engine resolves which leaf a
//! varbind belongs to; the handler only answers for its own subtree.
//!
//! Handler methods return boxed futures so that trait objects can be stored
//! in the tree and handlers may await I/O.

mod context;
mod results;
mod scalar;

pub use context::RequestContext;
pub use results::{GetNextResult, GetResult, SetResult};
pub use scalar::ScalarHandler;

use std::future::Future;
use std::pin::Pin;

use crate::oid::Oid;
use crate::value::AsnValue;

/// Boxed future returned by handler methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capability set of a Leaf node.
///
/// `get` and `get_next` are required. SET support is opt-in: the default
/// `test_set` accepts and the default `set` reports `notWritable`.
///
/// SET runs in two passes over the request: `test_set` for every varbind,
/// then `set` for every varbind, stopping at the first failure of either.
pub trait MibHandler: Send + Sync {
    /// Read one instance. `oid` is the full instance OID.
    fn get<'a>(&'a self, ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult>;

    /// Return the first instance of this leaf that sorts after `oid`.
    ///
    /// `oid` is either inside the leaf's subtree or equal to the leaf OID
    /// itself (when the walk enters the leaf from outside).
    fn get_next<'a>(
        &'a self,
        ctx: &'a RequestContext,
        oid: &'a Oid,
    ) -> BoxFuture<'a, GetNextResult>;

    fn test_set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _oid: &'a Oid,
        _value: &'a AsnValue,
    ) -> BoxFuture<'a, SetResult> {
        Box::pin(async { SetResult::Ok })
    }

    fn set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _oid: &'a Oid,
        _value: &'a AsnValue,
    ) -> BoxFuture<'a, SetResult> {
        Box::pin(async { SetResult::NotWritable })
    }
}
