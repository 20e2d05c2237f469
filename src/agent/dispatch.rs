//! Per-PDU dispatch against the MIB tree.

use crate::error::ErrorStatus;
use crate::handler::{GetNextResult, GetResult, MibHandler, RequestContext};
use crate::oid::Oid;
use crate::pdu::{BulkSplit, Pdu, PduType};
use crate::value::AsnValue;
use crate::varbind::VarBind;
use crate::version::Version;

use super::mib::MibTree;

/// Bytes a response's varbind list, PDU and message headers may grow by once
/// varbinds are added to an otherwise empty response.
const HEADER_SLACK: usize = 6;

/// Resolves request PDUs to responses.
pub(crate) struct Dispatcher<'a> {
    pub(crate) mib: &'a MibTree,
    pub(crate) max_message_size: usize,
}

impl Dispatcher<'_> {
    /// Build the response for a request PDU.
    ///
    /// Returns `None` for PDUs the agent does not answer (GETBULK over v1,
    /// non-request PDU types).
    pub(crate) async fn dispatch(&self, ctx: &RequestContext, request: &Pdu) -> Option<Pdu> {
        let response = match request.pdu_type {
            PduType::GetRequest => self.get(ctx, request).await,
            PduType::GetNextRequest => self.get_next(ctx, request).await,
            PduType::SetRequest => self.set(ctx, request).await,
            PduType::GetBulkRequest => {
                if request.version == Version::V1 {
                    tracing::debug!(target: "snmp_stack::agent", { snmp.source = %ctx.source, snmp.request_id = request.request_id }, "GETBULK over SNMPv1, dropping");
                    return None;
                }
                return Some(self.get_bulk(ctx, request).await);
            }
            _ => return None,
        };
        Some(self.fit(request, response))
    }

    /// Replace a response that exceeds the message size with `tooBig`.
    fn fit(&self, request: &Pdu, response: Pdu) -> Pdu {
        if response.encoded_len() <= self.max_message_size {
            return response;
        }
        tracing::debug!(target: "snmp_stack::agent", { snmp.request_id = request.request_id, size = response.encoded_len(), max = self.max_message_size }, "response too big");
        too_big(request)
    }

    fn handler_for(&self, oid: &Oid) -> Option<&dyn MibHandler> {
        let id = self.mib.find_exact(oid)?;
        self.mib.node(id)?.handler().map(|h| h.as_ref())
    }

    async fn get(&self, ctx: &RequestContext, request: &Pdu) -> Pdu {
        let mut varbinds = Vec::with_capacity(request.varbinds.len());

        for (index, vb) in request.varbinds.iter().enumerate() {
            let result = match self.handler_for(&vb.oid) {
                Some(handler) => handler.get(ctx, &vb.oid).await,
                None => self.miss(&vb.oid),
            };

            let value = match result {
                GetResult::Value(value) => value,
                GetResult::NoSuchObject | GetResult::NoSuchInstance
                    if ctx.version == Version::V1 =>
                {
                    return error_response(request, ErrorStatus::NoSuchName, index);
                }
                GetResult::NoSuchObject => AsnValue::no_such_object(),
                GetResult::NoSuchInstance => AsnValue::no_such_instance(),
                GetResult::Error(status) => {
                    return error_response(request, map_status(status, ctx.version), index);
                }
            };
            varbinds.push(VarBind::new(vb.oid.clone(), value));
        }

        Pdu {
            varbinds,
            ..request.to_response()
        }
    }

    /// GET result for an OID no Leaf serves exactly.
    fn miss(&self, oid: &Oid) -> GetResult {
        let id = self.mib.deepest_containing(oid);
        match self.mib.node(id) {
            Some(node) if node.is_leaf() => GetResult::NoSuchInstance,
            _ => GetResult::NoSuchObject,
        }
    }

    async fn get_next(&self, ctx: &RequestContext, request: &Pdu) -> Pdu {
        let mut varbinds = Vec::with_capacity(request.varbinds.len());

        for (index, vb) in request.varbinds.iter().enumerate() {
            match self.next_varbind(ctx, &vb.oid).await {
                Ok(Some(next)) => varbinds.push(next),
                Ok(None) if ctx.version == Version::V1 => {
                    return error_response(request, ErrorStatus::NoSuchName, index);
                }
                Ok(None) => varbinds.push(VarBind::new(vb.oid.clone(), AsnValue::end_of_mib_view())),
                Err(status) => {
                    return error_response(request, map_status(status, ctx.version), index);
                }
            }
        }

        Pdu {
            varbinds,
            ..request.to_response()
        }
    }

    /// Lexicographic successor of `oid` across the whole tree.
    ///
    /// Starts at the first Leaf containing or following `oid` and moves on to
    /// the next Leaf whenever a handler is exhausted. `Ok(None)` means the end
    /// of the MIB view.
    pub(crate) async fn next_varbind(
        &self,
        ctx: &RequestContext,
        oid: &Oid,
    ) -> Result<Option<VarBind>, ErrorStatus> {
        let mut cursor = self.mib.seek_next(oid);

        while let Some(id) = cursor {
            let Some(node) = self.mib.node(id) else {
                break;
            };
            let Some(handler) = node.handler() else {
                cursor = self.mib.find_next(id);
                continue;
            };

            let start = if node.oid().contains(oid) { oid } else { node.oid() };
            match handler.get_next(ctx, start).await {
                GetNextResult::Value(next) if next.oid > *oid && node.oid().contains(&next.oid) => {
                    return Ok(Some(next));
                }
                GetNextResult::Value(next) => {
                    tracing::debug!(target: "snmp_stack::agent", { leaf = %node.oid(), returned = %next.oid, requested = %oid }, "handler returned an OID outside its range, skipping leaf");
                }
                GetNextResult::Exhausted => {}
                GetNextResult::Error(status) => return Err(status),
            }
            cursor = self.mib.find_next(id);
        }

        Ok(None)
    }

    async fn get_bulk(&self, ctx: &RequestContext, request: &Pdu) -> Pdu {
        let empty = Pdu {
            varbinds: Vec::new(),
            ..request.to_response()
        };
        let budget = self
            .max_message_size
            .saturating_sub(empty.encoded_len() + HEADER_SLACK);

        let split = BulkSplit::from_pdu(request).with_size_limit(budget);
        let result = split
            .resolve(&request.varbinds, |oid| async move {
                match self.next_varbind(ctx, &oid).await {
                    Ok(Some(next)) => Ok(next),
                    Ok(None) => Ok(VarBind::new(oid, AsnValue::end_of_mib_view())),
                    Err(status) => Err(status),
                }
            })
            .await;

        match result {
            Ok(varbinds) => {
                let mut response = Pdu { varbinds, ..empty };
                let repeaters = request.varbinds.len() - split.non_repeaters();
                while response.encoded_len() > self.max_message_size
                    && repeaters > 0
                    && response.varbinds.len() >= split.non_repeaters() + repeaters
                {
                    let keep = response.varbinds.len() - repeaters;
                    response.varbinds.truncate(keep);
                }
                self.fit(request, response)
            }
            Err(failure) if failure.status == ErrorStatus::TooBig => too_big(request),
            Err(failure) => Pdu {
                error_status: map_status(failure.status, ctx.version),
                error_index: failure.index,
                ..request.to_response()
            },
        }
    }

    async fn set(&self, ctx: &RequestContext, request: &Pdu) -> Pdu {
        let mut targets = Vec::with_capacity(request.varbinds.len());

        for (index, vb) in request.varbinds.iter().enumerate() {
            if !vb.value.is_correct() {
                let status = match ctx.version {
                    Version::V1 => ErrorStatus::BadValue,
                    Version::V2c => ErrorStatus::WrongEncoding,
                };
                return error_response(request, status, index);
            }
            match self.handler_for(&vb.oid) {
                Some(handler) => targets.push(handler),
                None => {
                    let status = match ctx.version {
                        Version::V1 => ErrorStatus::NoSuchName,
                        Version::V2c => ErrorStatus::NotWritable,
                    };
                    return error_response(request, status, index);
                }
            }
        }

        for (index, (vb, handler)) in request.varbinds.iter().zip(&targets).enumerate() {
            let result = handler.test_set(ctx, &vb.oid, &vb.value).await;
            if !result.is_ok() {
                return error_response(request, map_status(result.to_error_status(), ctx.version), index);
            }
        }

        for (index, (vb, handler)) in request.varbinds.iter().zip(&targets).enumerate() {
            let result = handler.set(ctx, &vb.oid, &vb.value).await;
            if !result.is_ok() {
                return error_response(request, map_status(result.to_error_status(), ctx.version), index);
            }
        }

        request.to_response()
    }
}

/// Map a handler status to one valid for the request version.
fn map_status(status: ErrorStatus, version: Version) -> ErrorStatus {
    let mapped = match version {
        Version::V1 => status.to_v1(),
        Version::V2c => status.to_v2c(),
    };
    if mapped == ErrorStatus::NoError {
        ErrorStatus::GenErr
    } else {
        mapped
    }
}

fn error_response(request: &Pdu, status: ErrorStatus, zero_based: usize) -> Pdu {
    let index = i32::try_from(zero_based + 1).unwrap_or(i32::MAX);
    tracing::trace!(target: "snmp_stack::agent", { snmp.request_id = request.request_id, status = %status, index }, "error response");
    request.to_error_response(status, index)
}

fn too_big(request: &Pdu) -> Pdu {
    Pdu {
        varbinds: Vec::new(),
        ..request.to_error_response(ErrorStatus::TooBig, 0)
    }
}
