//! BTreeMap-backed MibHandler for testing.
//!
//! Stores instance OID -> value mappings with correct lexicographic ordering
//! for GETNEXT operations.

use snmp_stack::handler::{
    BoxFuture, GetNextResult, GetResult, MibHandler, RequestContext, SetResult,
};
use snmp_stack::{AsnValue, Oid, VarBind};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A simple MibHandler backed by an in-memory BTreeMap.
///
/// Registered on a Leaf, it answers for every instance it stores. SETs are
/// accepted for existing instances of the same type.
pub struct TestHandler {
    data: RwLock<BTreeMap<Oid, AsnValue>>,
}

impl TestHandler {
    pub fn new(initial: impl IntoIterator<Item = (Oid, AsnValue)>) -> Self {
        Self {
            data: RwLock::new(initial.into_iter().collect()),
        }
    }

    pub fn empty() -> Self {
        Self::new([])
    }

    /// Insert or update a value.
    pub fn insert(&self, oid: Oid, value: AsnValue) {
        self.data.write().unwrap().insert(oid, value);
    }

    /// Get a value (cloned).
    pub fn value(&self, oid: &Oid) -> Option<AsnValue> {
        self.data.read().unwrap().get(oid).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    fn check(&self, oid: &Oid, value: &AsnValue) -> SetResult {
        match self.data.read().unwrap().get(oid) {
            None => SetResult::NotWritable,
            Some(current) if current.tag() != value.tag() => SetResult::WrongType,
            Some(_) => SetResult::Ok,
        }
    }
}

impl MibHandler for TestHandler {
    fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
        let result = self.value(oid).into();
        Box::pin(async move { result })
    }

    fn get_next<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        oid: &'a Oid,
    ) -> BoxFuture<'a, GetNextResult> {
        let data = self.data.read().unwrap();
        let result = data
            .range(oid..)
            .find(|(k, _)| *k > oid)
            .map(|(k, v)| GetNextResult::Value(VarBind::new(k.clone(), v.clone())))
            .unwrap_or(GetNextResult::Exhausted);
        Box::pin(async move { result })
    }

    fn test_set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        oid: &'a Oid,
        value: &'a AsnValue,
    ) -> BoxFuture<'a, SetResult> {
        let result = self.check(oid, value);
        Box::pin(async move { result })
    }

    fn set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        oid: &'a Oid,
        value: &'a AsnValue,
    ) -> BoxFuture<'a, SetResult> {
        let result = self.check(oid, value);
        if result.is_ok() {
            self.insert(oid.clone(), value.clone());
        }
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snmp_stack::oid;

    #[tokio::test]
    async fn test_get_next_skips_equal() {
        let handler = TestHandler::new([
            (oid!(1, 3, 6, 1), AsnValue::integer(1)),
            (oid!(1, 3, 6, 2), AsnValue::integer(2)),
        ]);
        let ctx = RequestContext::test_context();

        match handler.get_next(&ctx, &oid!(1, 3, 6, 1)).await {
            GetNextResult::Value(vb) => assert_eq!(vb.oid, oid!(1, 3, 6, 2)),
            other => panic!("expected Value, got {:?}", other),
        }
        assert_eq!(
            handler.get_next(&ctx, &oid!(1, 3, 6, 2)).await,
            GetNextResult::Exhausted
        );
    }
}
