//! Internal utilities.

use std::io;
use std::fmt::Write;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use subtle::ConstantTimeEq;
use tokio::net::UdpSocket;

/// Create and bind a UDP socket with proper IPv6 configuration.
///
/// For IPv6 sockets, sets `IPV6_V6ONLY = true` to ensure the socket only
/// accepts IPv6 connections and does not use IPv4-mapped addresses.
///
/// # Arguments
///
/// * `addr` - The socket address to bind to. The domain (IPv4/IPv6) is
///   inferred from the address type.
///
/// # Returns
///
/// A tokio `UdpSocket` bound to the specified address.
pub(crate) async fn bind_udp_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    // IPv6 sockets never see IPv4-mapped traffic.
    if addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }

    // Allow address reuse for quick restarts
    socket.set_reuse_address(true)?;

    // Set non-blocking before converting to tokio socket
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;

    UdpSocket::from_std(socket.into())
}

/// Whether `community` equals one of `configured`.
///
/// Every configured entry is compared in constant time, whether or not an
/// earlier one matched.
pub(crate) fn community_matches(configured: &[Vec<u8>], community: &[u8]) -> bool {
    let mut valid = false;
    for candidate in configured {
        if candidate.len() == community.len() && bool::from(candidate.as_slice().ct_eq(community)) {
            valid = true;
        }
    }
    valid
}

/// Lowercase hex rendering of a byte slice.
pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
