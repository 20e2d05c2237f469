//! Notification receiver tests over real UDP sockets.

mod common;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use snmp_stack::notification::{oids, sink_fn};
use snmp_stack::{
    AsnValue, GenericTrap, Manager, Notification, NotificationReceiver, Outcome, Pdu, TrapV1,
    VarBind, oid,
};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct Receiver {
    addr: SocketAddr,
    cancel: CancellationToken,
    notifications: mpsc::Receiver<(Notification, SocketAddr)>,
}

impl Receiver {
    async fn start(community: Option<&[u8]>) -> Self {
        common::init_tracing();
        let cancel = CancellationToken::new();
        let mut builder = NotificationReceiver::builder()
            .bind("127.0.0.1:0")
            .cancel(cancel.clone());
        if let Some(community) = community {
            builder = builder.community(community);
        }
        let receiver = builder.build().await.expect("build receiver");
        let addr = receiver.local_addr();

        let (tx, notifications) = mpsc::channel(16);
        tokio::spawn(async move { receiver.run(tx).await });

        Self {
            addr,
            cancel,
            notifications,
        }
    }

    async fn next(&mut self) -> Option<(Notification, SocketAddr)> {
        tokio::time::timeout(Duration::from_millis(500), self.notifications.recv())
            .await
            .ok()
            .flatten()
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn link_down_varbinds() -> Vec<VarBind> {
    vec![
        VarBind::new(oids::sys_uptime(), AsnValue::timeticks(4200)),
        VarBind::new(oids::snmp_trap_oid(), AsnValue::oid(oids::link_down())),
        VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 2), 2i32),
    ]
}

#[tokio::test]
async fn inform_is_acknowledged_and_delivered() {
    let mut receiver = Receiver::start(None).await;
    let manager = Manager::builder()
        .bind("127.0.0.1:0")
        .timeout(Duration::from_secs(2))
        .build()
        .await
        .unwrap();

    let outcome = manager
        .request(receiver.addr, Pdu::inform(0, link_down_varbinds()))
        .await
        .unwrap();
    let ack = match outcome {
        Outcome::Reply(pdu) => pdu,
        Outcome::Timeout => panic!("inform was not acknowledged"),
    };
    assert_eq!(ack.varbinds, link_down_varbinds());

    let (notification, source) = receiver.next().await.expect("notification");
    assert_eq!(source, manager.local_addr());
    assert!(notification.is_confirmed());
    assert_eq!(notification.uptime(), 4200);
    assert_eq!(notification.trap_oid(), oids::link_down());
    assert_eq!(notification.varbinds().len(), 1);
}

#[tokio::test]
async fn v1_trap_is_mapped_to_v2_trap_oid() {
    let mut receiver = Receiver::start(Some(&b"public"[..])).await;
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let trap = TrapV1 {
        enterprise: oid!(1, 3, 6, 1, 4, 1, 99999),
        agent_addr: [192, 0, 2, 1],
        generic_trap: GenericTrap::EnterpriseSpecific as i32,
        specific_trap: 7,
        time_stamp: 100,
    };
    let message = Pdu::trap_v1(trap, Vec::new()).encode().unwrap();
    sender.send_to(&message, receiver.addr).await.unwrap();

    let (notification, _) = receiver.next().await.expect("notification");
    assert!(matches!(notification, Notification::TrapV1 { .. }));
    assert!(!notification.is_confirmed());
    assert_eq!(notification.uptime(), 100);
    assert_eq!(notification.trap_oid(), oid!(1, 3, 6, 1, 4, 1, 99999, 0, 7));
}

#[tokio::test]
async fn community_filter_drops_other_communities() {
    let mut receiver = Receiver::start(Some(&b"traps"[..])).await;
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let wrong = Pdu::trap_v2(1, link_down_varbinds()).encode().unwrap();
    sender.send_to(&wrong, receiver.addr).await.unwrap();
    let right = Pdu::trap_v2(2, link_down_varbinds())
        .with_community(&b"traps"[..])
        .encode()
        .unwrap();
    sender.send_to(&right, receiver.addr).await.unwrap();

    let (notification, _) = receiver.next().await.expect("notification");
    match notification {
        Notification::TrapV2c { request_id, .. } => assert_eq!(request_id, 2),
        other => panic!("unexpected notification {other:?}"),
    }
}

#[tokio::test]
async fn malformed_notification_is_skipped() {
    let mut receiver = Receiver::start(None).await;
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // snmpTrapOID.0 missing
    let bad = Pdu::trap_v2(
        1,
        vec![VarBind::new(oids::sys_uptime(), AsnValue::timeticks(1))],
    )
    .encode()
    .unwrap();
    sender.send_to(&bad, receiver.addr).await.unwrap();
    sender.send_to(b"not snmp", receiver.addr).await.unwrap();

    assert!(receiver.next().await.is_none());
}

#[tokio::test]
async fn closure_sink_receives_notifications() {
    common::init_tracing();
    let cancel = CancellationToken::new();
    let receiver = NotificationReceiver::builder()
        .bind("127.0.0.1:0")
        .cancel(cancel.clone())
        .build()
        .await
        .unwrap();
    let addr = receiver.local_addr();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = sink_fn({
        let seen = seen.clone();
        move |notification: Notification, _source: SocketAddr| {
            seen.lock().unwrap().push(notification.trap_oid());
        }
    });
    let task = tokio::spawn(async move { receiver.run(sink).await });

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let message = Pdu::trap_v2(9, link_down_varbinds()).encode().unwrap();
    sender.send_to(&message, addr).await.unwrap();

    for _ in 0..50 {
        if !seen.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*seen.lock().unwrap(), vec![oids::link_down()]);

    cancel.cancel();
    task.await.unwrap().unwrap();
}
