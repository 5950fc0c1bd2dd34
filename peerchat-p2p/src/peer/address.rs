//! Multiaddr-style address parsing.
//!
//! Peers are written as `/ip4/<ip>/tcp/<port>/p2p/<endpoint id>` (or `/ip6/...`)
//! and listen addresses as `/ip4/<ip>/tcp/<port>`.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use peerchat_core::EndpointId;

use crate::error::{P2pError, P2pResult};

/// Address of a remote peer together with the identity it must prove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    /// Where to dial.
    pub socket: SocketAddr,
    /// Endpoint identifier pinned for the peer.
    pub endpoint_id: EndpointId,
}

/// Local address to listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenAddr(pub SocketAddr);

impl ListenAddr {
    /// The socket address to bind.
    pub fn socket(&self) -> SocketAddr {
        self.0
    }
}

fn invalid(text: &str, reason: &str) -> P2pError {
    P2pError::InvalidAddress(format!("{:?}: {}", text, reason))
}

/// Parse the leading `/<ip proto>/<ip>/tcp/<port>` segments.
fn parse_socket<'a, I>(text: &str, segments: &mut I) -> P2pResult<SocketAddr>
where
    I: Iterator<Item = &'a str>,
{
    let proto = segments.next().ok_or_else(|| invalid(text, "missing ip protocol"))?;
    let host = segments.next().ok_or_else(|| invalid(text, "missing host"))?;
    let ip: IpAddr = match proto {
        "ip4" => host
            .parse::<Ipv4Addr>()
            .map_err(|_| invalid(text, "bad ipv4 address"))?
            .into(),
        "ip6" => host
            .parse::<Ipv6Addr>()
            .map_err(|_| invalid(text, "bad ipv6 address"))?
            .into(),
        other => return Err(invalid(text, &format!("unsupported protocol {}", other))),
    };

    match segments.next() {
        Some("tcp") => {}
        Some(other) => return Err(invalid(text, &format!("unsupported transport {}", other))),
        None => return Err(invalid(text, "missing transport")),
    }
    let port = segments
        .next()
        .ok_or_else(|| invalid(text, "missing port"))?
        .parse::<u16>()
        .map_err(|_| invalid(text, "bad port"))?;

    Ok(SocketAddr::new(ip, port))
}

/// Split off the mandatory leading slash.
fn segments(text: &str) -> P2pResult<std::str::Split<'_, char>> {
    let rest = text
        .strip_prefix('/')
        .ok_or_else(|| invalid(text, "must start with '/'"))?;
    Ok(rest.split('/'))
}

fn write_socket(f: &mut fmt::Formatter<'_>, socket: &SocketAddr) -> fmt::Result {
    match socket.ip() {
        IpAddr::V4(ip) => write!(f, "/ip4/{}/tcp/{}", ip, socket.port()),
        IpAddr::V6(ip) => write!(f, "/ip6/{}/tcp/{}", ip, socket.port()),
    }
}

impl FromStr for PeerAddr {
    type Err = P2pError;

    fn from_str(text: &str) -> P2pResult<Self> {
        let mut parts = segments(text)?;
        let socket = parse_socket(text, &mut parts)?;

        match parts.next() {
            Some("p2p") => {}
            _ => return Err(invalid(text, "missing /p2p/<endpoint id>")),
        }
        let endpoint_id = parts
            .next()
            .ok_or_else(|| invalid(text, "missing endpoint id"))?
            .parse::<EndpointId>()
            .map_err(|e| invalid(text, &e.to_string()))?;

        if parts.next().is_some() {
            return Err(invalid(text, "trailing segments"));
        }
        Ok(Self { socket, endpoint_id })
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_socket(f, &self.socket)?;
        write!(f, "/p2p/{}", self.endpoint_id)
    }
}

impl FromStr for ListenAddr {
    type Err = P2pError;

    fn from_str(text: &str) -> P2pResult<Self> {
        let mut parts = segments(text)?;
        let socket = parse_socket(text, &mut parts)?;
        if parts.next().is_some() {
            return Err(invalid(text, "trailing segments"));
        }
        Ok(Self(socket))
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_socket(f, &self.0)
    }
}
