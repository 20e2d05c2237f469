//! Faulty agent variants for edge case testing.
//!
//! These responders sit directly on a UDP socket and answer every request
//! with an empty Response carrying the request's id, so timing and source
//! address can be controlled exactly.

use bytes::Bytes;
use snmp_stack::Pdu;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

async fn next_request(socket: &UdpSocket) -> Option<(Pdu, SocketAddr)> {
    let mut buf = vec![0u8; 65535];
    let (len, source) = socket.recv_from(&mut buf).await.ok()?;
    let pdu = Pdu::decode(Bytes::copy_from_slice(&buf[..len])).ok()?;
    Some((pdu, source))
}

/// An agent that delays every response by a fixed duration.
///
/// Useful for testing timeout behavior.
pub struct SlowAgent {
    addr: SocketAddr,
    delay: Duration,
    answered: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl SlowAgent {
    pub async fn with_delay(delay: Duration) -> Self {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.expect("bind slow agent"));
        let addr = socket.local_addr().expect("local addr");
        let answered = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn({
            let answered = answered.clone();
            async move {
                while let Some((request, source)) = next_request(&socket).await {
                    let socket = socket.clone();
                    let answered = answered.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let reply = request.to_response().encode().expect("encode reply");
                        if socket.send_to(&reply, source).await.is_ok() {
                            answered.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            }
        });

        Self {
            addr,
            delay,
            answered,
            task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of replies sent so far.
    pub fn answered(&self) -> usize {
        self.answered.load(Ordering::SeqCst)
    }
}

impl Drop for SlowAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An agent that answers from a different socket than the one it listens on.
pub struct SpoofingAgent {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl SpoofingAgent {
    pub async fn new() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind spoofing agent");
        let other = UdpSocket::bind("127.0.0.1:0").await.expect("bind spoof socket");
        let addr = socket.local_addr().expect("local addr");

        let task = tokio::spawn(async move {
            while let Some((request, source)) = next_request(&socket).await {
                let reply = request.to_response().encode().expect("encode reply");
                let _ = other.send_to(&reply, source).await;
            }
        });

        Self { addr, task }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for SpoofingAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}
