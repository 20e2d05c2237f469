//! Handler for scalar objects (single instance `.0`).

use std::sync::RwLock;

use crate::oid::Oid;
use crate::value::AsnValue;
use crate::varbind::VarBind;

use super::{BoxFuture, GetNextResult, GetResult, MibHandler, RequestContext, SetResult};

/// A Leaf handler holding one scalar value at `<oid>.0`.
///
/// Read-only unless built with [`writable`](Self::writable). Writes must keep
/// the value's type.
///
/// ```rust
/// use snmp_stack::handler::ScalarHandler;
/// use snmp_stack::oid;
///
/// let sys_name = ScalarHandler::new(oid!(1, 3, 6, 1, 2, 1, 1, 5), "router1").writable();
/// assert_eq!(sys_name.value().as_str(), Some("router1"));
/// ```
#[derive(Debug)]
pub struct ScalarHandler {
    oid: Oid,
    value: RwLock<AsnValue>,
    writable: bool,
}

impl ScalarHandler {
    /// `oid` is the object OID, without the `.0` instance arc.
    pub fn new(oid: Oid, value: impl Into<AsnValue>) -> Self {
        Self {
            oid,
            value: RwLock::new(value.into()),
            writable: false,
        }
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// The instance OID (`<oid>.0`).
    pub fn instance(&self) -> Oid {
        self.oid.child(0)
    }

    /// Current value.
    pub fn value(&self) -> AsnValue {
        self.value
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn check_write(&self, oid: &Oid, value: &AsnValue) -> SetResult {
        if !self.writable {
            return SetResult::NotWritable;
        }
        if *oid != self.instance() {
            return SetResult::Error(crate::error::ErrorStatus::NoCreation);
        }
        if !value.is_correct() || value.tag() != self.value().tag() {
            return SetResult::WrongType;
        }
        SetResult::Ok
    }
}

impl MibHandler for ScalarHandler {
    fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
        let result = if *oid == self.instance() {
            GetResult::Value(self.value())
        } else {
            GetResult::NoSuchInstance
        };
        Box::pin(async move { result })
    }

    fn get_next<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        oid: &'a Oid,
    ) -> BoxFuture<'a, GetNextResult> {
        let instance = self.instance();
        let result = if *oid < instance {
            GetNextResult::Value(VarBind::new(instance, self.value()))
        } else {
            GetNextResult::Exhausted
        };
        Box::pin(async move { result })
    }

    fn test_set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        oid: &'a Oid,
        value: &'a AsnValue,
    ) -> BoxFuture<'a, SetResult> {
        let result = self.check_write(oid, value);
        Box::pin(async move { result })
    }

    fn set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        oid: &'a Oid,
        value: &'a AsnValue,
    ) -> BoxFuture<'a, SetResult> {
        let result = self.check_write(oid, value);
        if result.is_ok() {
            *self
                .value
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = value.clone();
        }
        Box::pin(async move { result })
    }
}
