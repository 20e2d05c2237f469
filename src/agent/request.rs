//! Request pipeline: decode, authenticate, dispatch, encode.

use std::net::SocketAddr;

use bytes::Bytes;

use crate::handler::RequestContext;
use crate::pdu::{Pdu, PduType};

use super::Agent;
use super::dispatch::Dispatcher;

impl Agent {
    /// Turn one received datagram into the datagram to send back.
    ///
    /// Returns `None` when nothing should be sent: undecodable input, an
    /// unknown community, a PDU type the agent does not answer, or a
    /// transaction that refused the request.
    pub(crate) async fn handle_request(&self, data: Bytes, source: SocketAddr) -> Option<Bytes> {
        let mut request = match Pdu::decode(data) {
            Ok(pdu) => pdu,
            Err(e) => {
                tracing::debug!(target: "snmp_stack::agent", { snmp.source = %source, error = %e }, "failed to decode request");
                return None;
            }
        };
        request.source = Some(source);

        if !self.validate_community(&request.community) {
            tracing::debug!(target: "snmp_stack::agent", { snmp.source = %source }, "invalid community string");
            return None;
        }

        if !is_request_pdu(request.pdu_type) {
            tracing::debug!(target: "snmp_stack::agent", { snmp.source = %source, pdu_type = %request.pdu_type }, "ignoring non-request PDU");
            return None;
        }

        let mut txn = self.inner.transaction.as_ref().map(|make| make());
        if let Some(txn) = txn.as_mut()
            && let Err(e) = txn.prepare(&request)
        {
            tracing::debug!(target: "snmp_stack::agent", { snmp.source = %source, snmp.request_id = request.request_id, error = %e }, "transaction refused request");
            return None;
        }

        let ctx = RequestContext::from_pdu(&request, source);
        let dispatcher = Dispatcher {
            mib: &self.inner.mib,
            max_message_size: self.inner.max_message_size,
        };
        let response = dispatcher.dispatch(&ctx, &request).await?;

        if let Some(txn) = txn.as_mut()
            && let Err(e) = txn.commit(&request, &response)
        {
            tracing::warn!(target: "snmp_stack::agent", { snmp.source = %source, snmp.request_id = request.request_id, error = %e }, "transaction commit failed");
        }

        match response.encode() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(target: "snmp_stack::agent", { snmp.source = %source, snmp.request_id = request.request_id, error = %e }, "failed to encode response");
                None
            }
        }
    }
}

/// PDU types the agent answers.
pub(super) fn is_request_pdu(pdu_type: PduType) -> bool {
    matches!(
        pdu_type,
        PduType::GetRequest
            | PduType::GetNextRequest
            | PduType::GetBulkRequest
            | PduType::SetRequest
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::agent::{MibTree, NodeKind, Transaction};
    use crate::error::{Error, ErrorStatus, Result};
    use crate::handler::ScalarHandler;
    use crate::oid;
    use crate::value::AsnValue;
    use crate::varbind::VarBind;
    use crate::version::Version;

    fn source() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn system_mib() -> MibTree {
        let mut mib = MibTree::new();
        mib.insert(oid!(1, 3, 6, 1, 2, 1, 1), NodeKind::Group, 0, None)
            .unwrap();
        let descr = oid!(1, 3, 6, 1, 2, 1, 1, 1);
        mib.leaf(descr.clone(), 1, Arc::new(ScalarHandler::new(descr, "test agent")))
            .unwrap();
        mib
    }

    async fn agent() -> Agent {
        Agent::builder()
            .bind("127.0.0.1:0")
            .community(b"public")
            .mib(system_mib())
            .build()
            .await
            .unwrap()
    }

    fn encoded(pdu: Pdu) -> Bytes {
        pdu.encode().unwrap()
    }

    #[test]
    fn test_is_request_pdu() {
        assert!(is_request_pdu(PduType::GetRequest));
        assert!(is_request_pdu(PduType::GetNextRequest));
        assert!(is_request_pdu(PduType::GetBulkRequest));
        assert!(is_request_pdu(PduType::SetRequest));
        assert!(!is_request_pdu(PduType::InformRequest));
        assert!(!is_request_pdu(PduType::Response));
        assert!(!is_request_pdu(PduType::TrapV2));
    }

    #[tokio::test]
    async fn test_get_roundtrip() {
        let agent = agent().await;
        let request = Pdu::get_request(7, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let reply = agent
            .handle_request(encoded(request), source())
            .await
            .unwrap();
        let response = Pdu::decode(reply).unwrap();
        assert_eq!(response.pdu_type, PduType::Response);
        assert_eq!(response.request_id, 7);
        assert_eq!(response.error_status, ErrorStatus::NoError);
        assert_eq!(
            response.varbinds,
            vec![VarBind::new(
                oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                AsnValue::from("test agent")
            )]
        );
    }

    #[tokio::test]
    async fn test_wrong_community_dropped() {
        let agent = agent().await;
        let request = Pdu::get_request(1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)])
            .with_community(&b"private"[..]);
        assert!(agent.handle_request(encoded(request), source()).await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_and_notifications_dropped() {
        let agent = agent().await;
        assert!(
            agent
                .handle_request(Bytes::from_static(&[0x04, 0x01, 0x00]), source())
                .await
                .is_none()
        );
        let trap = Pdu::trap_v2(1, Vec::new());
        assert!(agent.handle_request(encoded(trap), source()).await.is_none());
    }

    #[tokio::test]
    async fn test_getbulk_v1_dropped() {
        let agent = agent().await;
        let request =
            Pdu::get_bulk(1, 0, 5, &[oid!(1, 3, 6, 1, 2, 1, 1)]).with_version(Version::V1);
        assert!(agent.handle_request(encoded(request), source()).await.is_none());
    }

    #[derive(Clone)]
    struct Audit {
        commits: Arc<AtomicUsize>,
    }

    impl Transaction for Audit {
        fn prepare(&mut self, request: &Pdu) -> Result<()> {
            if request.pdu_type == PduType::SetRequest {
                return Err(Error::Transaction("read-only".into()));
            }
            Ok(())
        }

        fn commit(&mut self, _request: &Pdu, response: &Pdu) -> Result<()> {
            assert_eq!(response.pdu_type, PduType::Response);
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_transaction_hook() {
        let commits = Arc::new(AtomicUsize::new(0));
        let agent = Agent::builder()
            .bind("127.0.0.1:0")
            .community(b"public")
            .transaction(Audit {
                commits: commits.clone(),
            })
            .mib(system_mib())
            .build()
            .await
            .unwrap();

        let get = Pdu::get_request(1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        assert!(agent.handle_request(encoded(get), source()).await.is_some());
        assert_eq!(commits.load(Ordering::SeqCst), 1);

        let set = Pdu::set_request(
            2,
            vec![VarBind::new(
                oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                AsnValue::from("x"),
            )],
        );
        assert!(agent.handle_request(encoded(set), source()).await.is_none());
        assert_eq!(commits.load(Ordering::SeqCst), 1);
    }
}
