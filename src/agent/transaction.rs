//! Per-request transaction hook.

use std::sync::Arc;

use crate::error::Result;
use crate::pdu::Pdu;

/// Hook run around every accepted request.
///
/// The agent takes a fresh copy for each request, calls
/// [`prepare`](Self::prepare) before dispatch and [`commit`](Self::commit)
/// after the response is built. A `prepare` error drops the request without
/// a reply. A `commit` error is logged; the response is still sent.
///
/// ```rust
/// use snmp_stack::agent::Transaction;
/// use snmp_stack::pdu::{Pdu, PduType};
/// use snmp_stack::{Error, Result};
///
/// #[derive(Clone, Default)]
/// struct ReadOnly;
///
/// impl Transaction for ReadOnly {
///     fn prepare(&mut self, request: &Pdu) -> Result<()> {
///         if request.pdu_type == PduType::SetRequest {
///             return Err(Error::Transaction("read-only agent".into()));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Transaction: Send {
    fn prepare(&mut self, _request: &Pdu) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self, _request: &Pdu, _response: &Pdu) -> Result<()> {
        Ok(())
    }
}

/// Produces one [`Transaction`] per request.
pub(crate) type TransactionFactory = Arc<dyn Fn() -> Box<dyn Transaction> + Send + Sync>;

pub(crate) fn factory<T>(prototype: T) -> TransactionFactory
where
    T: Transaction + Clone + Sync + 'static,
{
    Arc::new(move || Box::new(prototype.clone()))
}
