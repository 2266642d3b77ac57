//! Local address discovery and classification.
//!
//! The prepare response tells the viewer which address the camera streams
//! from. Discovering that address is delegated to an [`AddressResolver`] so
//! tests (and hosts with unusual routing) can pin it.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use serde::{Deserialize, Serialize};

/// Address family advertised in the prepare response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    V4,
    V6,
}

impl AddressType {
    /// Classify an address string: `V4` iff it is an IPv4 literal.
    ///
    /// ```
    /// use hkcam::net::AddressType;
    ///
    /// assert_eq!(AddressType::of("192.168.1.5"), AddressType::V4);
    /// assert_eq!(AddressType::of("fe80::1"), AddressType::V6);
    /// ```
    pub fn of(address: &str) -> Self {
        if address.parse::<Ipv4Addr>().is_ok() {
            AddressType::V4
        } else {
            AddressType::V6
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::V4 => "v4",
            AddressType::V6 => "v6",
        }
    }
}

/// Source of the local address advertised to viewers.
pub trait AddressResolver: Send + Sync {
    fn local_address(&self) -> IpAddr;
}

/// Resolves the address of the interface carrying the default route.
///
/// Connecting a UDP socket sends nothing; it only asks the OS to pick a
/// route, after which the socket's local address is the one peers reach us
/// on. Falls back to loopback when there is no route.
#[derive(Debug, Clone, Default)]
pub struct DefaultRouteResolver;

/// Any routable address works; no packet leaves the host.
const ROUTE_TARGET: &str = "8.8.8.8:80";

impl AddressResolver for DefaultRouteResolver {
    fn local_address(&self) -> IpAddr {
        match route_local_address() {
            Ok(ip) => ip,
            Err(e) => {
                tracing::warn!(error = %e, "local address discovery failed, using loopback");
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            }
        }
    }
}

fn route_local_address() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(ROUTE_TARGET)?;
    Ok(socket.local_addr()?.ip())
}

/// Always returns the same address.
#[derive(Debug, Clone)]
pub struct FixedAddress(pub IpAddr);

impl AddressResolver for FixedAddress {
    fn local_address(&self) -> IpAddr {
        self.0
    }
}
