//! Outstanding request table.
//!
//! Every sent request owns one entry keyed by request id. The entry is removed
//! exactly once: by the receive task when the matching reply arrives, or by the
//! request's timer when it fires. Both paths take the same lock, so a reply
//! that arrives after the timeout finds nothing to complete.
//!
//! Outcomes nobody has received are kept until
//! [`MAX_UNCLAIMED_OUTCOMES`] newer ones pile up behind them.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::error::{Error, Result};
use crate::pdu::Pdu;

/// Largest request id handed out before wrapping back to 1.
pub const MAX_REQUEST_ID: i32 = 50_000;

/// Finished outcomes kept for callers that have not received them yet.
///
/// Past this many, the oldest unreceived outcome is dropped and its invoke id
/// becomes unknown.
pub const MAX_UNCLAIMED_OUTCOMES: usize = 1024;

/// Handle for one sent request, used to [`receive`](super::Manager::receive)
/// its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvokeId(pub(crate) u64);

impl InvokeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InvokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The agent answered. The PDU may still carry an error status.
    Reply(Pdu),
    /// No reply arrived before the timeout.
    Timeout,
}

impl Outcome {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub fn into_reply(self) -> Option<Pdu> {
        match self {
            Self::Reply(pdu) => Some(pdu),
            Self::Timeout => None,
        }
    }
}

struct PendingRequest {
    invoke: InvokeId,
    destination: SocketAddr,
    reply: oneshot::Sender<Outcome>,
    timer: Option<AbortHandle>,
}

impl PendingRequest {
    fn finish(self, outcome: Outcome) {
        if let Some(timer) = self.timer {
            timer.abort();
        }
        // The caller may have stopped waiting.
        let _ = self.reply.send(outcome);
    }
}

struct State {
    next_request_id: i32,
    next_invoke: u64,
    requests: HashMap<i32, PendingRequest>,
    waiters: HashMap<InvokeId, oneshot::Receiver<Outcome>>,
    unclaimed: VecDeque<InvokeId>,
}

impl State {
    /// Track a finished request whose outcome nobody has taken yet.
    fn finished(&mut self, invoke: InvokeId) {
        if !self.waiters.contains_key(&invoke) {
            return;
        }
        self.unclaimed.push_back(invoke);
        while self.unclaimed.len() > MAX_UNCLAIMED_OUTCOMES {
            if let Some(oldest) = self.unclaimed.pop_front()
                && self.waiters.remove(&oldest).is_some()
            {
                tracing::debug!(target: "snmp_stack::manager", invoke = %oldest, "dropping unreceived outcome");
            }
        }
    }

    fn allocate_request_id(&mut self) -> Option<i32> {
        for _ in 0..MAX_REQUEST_ID {
            let id = self.next_request_id;
            self.next_request_id = if id >= MAX_REQUEST_ID { 1 } else { id + 1 };
            if !self.requests.contains_key(&id) {
                return Some(id);
            }
        }
        None
    }
}

/// Pending requests and the receivers waiting on them, under one mutex.
pub(crate) struct PendingTable {
    state: Mutex<State>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_request_id: 1,
                next_invoke: 1,
                requests: HashMap::new(),
                waiters: HashMap::new(),
                unclaimed: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a request id and record a request to `destination`.
    pub(crate) fn register(&self, destination: SocketAddr) -> Result<(InvokeId, i32)> {
        let mut state = self.lock();
        let request_id = state
            .allocate_request_id()
            .ok_or(Error::RequestIdsExhausted)?;
        let invoke = InvokeId(state.next_invoke);
        state.next_invoke += 1;

        let (tx, rx) = oneshot::channel();
        state.requests.insert(
            request_id,
            PendingRequest {
                invoke,
                destination,
                reply: tx,
                timer: None,
            },
        );
        state.waiters.insert(invoke, rx);
        Ok((invoke, request_id))
    }

    /// Attach the timer task so a reply can cancel it.
    ///
    /// No-op when the request already finished.
    pub(crate) fn set_timer(&self, request_id: i32, invoke: InvokeId, timer: AbortHandle) {
        let mut state = self.lock();
        match state.requests.get_mut(&request_id) {
            Some(pending) if pending.invoke == invoke => pending.timer = Some(timer),
            _ => timer.abort(),
        }
    }

    /// Deliver a reply. Returns `false` when it matched nothing.
    ///
    /// A reply from an address other than the request's destination leaves the
    /// request pending.
    pub(crate) fn complete(&self, source: SocketAddr, reply: Pdu) -> bool {
        let request_id = reply.request_id;
        let mut state = self.lock();
        let destination = state.requests.get(&request_id).map(|p| p.destination);
        match destination {
            None => {
                drop(state);
                tracing::debug!(target: "snmp_stack::manager", { snmp.source = %source, snmp.request_id = request_id }, "reply for unknown or expired request, ignoring");
                false
            }
            Some(destination) if destination != source => {
                drop(state);
                tracing::debug!(target: "snmp_stack::manager", { snmp.source = %source, snmp.request_id = request_id, snmp.destination = %destination }, "reply source does not match destination, ignoring");
                false
            }
            Some(_) => {
                if let Some(pending) = state.requests.remove(&request_id) {
                    let invoke = pending.invoke;
                    pending.finish(Outcome::Reply(reply));
                    state.finished(invoke);
                }
                true
            }
        }
    }

    /// Time out a request. Returns `false` when a reply won the race.
    pub(crate) fn expire(&self, request_id: i32, invoke: InvokeId) -> bool {
        let mut state = self.lock();
        let matches = state
            .requests
            .get(&request_id)
            .is_some_and(|pending| pending.invoke == invoke);
        if !matches {
            return false;
        }
        if let Some(mut pending) = state.requests.remove(&request_id) {
            // Running on the timer itself; nothing to abort.
            pending.timer = None;
            pending.finish(Outcome::Timeout);
            state.finished(invoke);
        }
        drop(state);
        tracing::debug!(target: "snmp_stack::manager", { snmp.request_id = request_id, invoke = %invoke }, "request timed out");
        true
    }

    /// Forget a request that could not be sent.
    pub(crate) fn cancel(&self, request_id: i32, invoke: InvokeId) {
        let mut state = self.lock();
        state.waiters.remove(&invoke);
        if state
            .requests
            .get(&request_id)
            .is_some_and(|pending| pending.invoke == invoke)
            && let Some(pending) = state.requests.remove(&request_id)
            && let Some(timer) = pending.timer
        {
            timer.abort();
        }
    }

    /// Take the receiver for `invoke`; each invoke id can be received once.
    pub(crate) fn take_waiter(&self, invoke: InvokeId) -> Option<oneshot::Receiver<Outcome>> {
        self.lock().waiters.remove(&invoke)
    }

    /// Drop every pending request. Their receivers observe a closed channel.
    pub(crate) fn close(&self) {
        let mut state = self.lock();
        for (_, pending) in state.requests.drain() {
            if let Some(timer) = pending.timer {
                timer.abort();
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().requests.len()
    }

    /// Receivers not yet taken, pending or finished.
    #[cfg(test)]
    pub(crate) fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }
}
