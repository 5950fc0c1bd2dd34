//! Peer information for an established stream.

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use peerchat_core::EndpointId;

/// Direction of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionDirection {
    /// We initiated the connection.
    Outbound,
    /// Peer connected to us.
    Inbound,
}

impl fmt::Display for ConnectionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionDirection::Outbound => write!(f, "outbound"),
            ConnectionDirection::Inbound => write!(f, "inbound"),
        }
    }
}

/// Information about an authenticated peer on one stream.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    /// Endpoint identifier the peer proved during the handshake.
    pub endpoint_id: EndpointId,
    /// Socket address of the peer.
    pub addr: SocketAddr,
    /// Direction of the connection.
    pub direction: ConnectionDirection,
    /// Negotiated application protocol.
    pub protocol: String,
    /// When the stream was established.
    pub connected_at: Instant,
}

impl PeerInfo {
    /// Create info for a freshly established stream.
    pub fn new(
        endpoint_id: EndpointId,
        addr: SocketAddr,
        direction: ConnectionDirection,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_id,
            addr,
            direction,
            protocol: protocol.into(),
            connected_at: Instant::now(),
        }
    }

    /// Check if this is an outbound stream.
    pub fn is_outbound(&self) -> bool {
        self.direction == ConnectionDirection::Outbound
    }

    /// Check if this is an inbound stream.
    pub fn is_inbound(&self) -> bool {
        self.direction == ConnectionDirection::Inbound
    }

    /// How long the stream has been open.
    pub fn connection_duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.endpoint_id.short(),
            self.addr,
            self.direction,
            self.protocol
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_info_new() {
        let id = EndpointId::from_bytes([0xab; 20]);
        let addr: SocketAddr = "127.0.0.1:3021".parse().unwrap();
        let info = PeerInfo::new(id, addr, ConnectionDirection::Outbound, "/chat/1.0.0");

        assert_eq!(info.endpoint_id, id);
        assert!(info.is_outbound());
        assert!(!info.is_inbound());
        assert_eq!(info.to_string(), "abababab (127.0.0.1:3021, outbound, /chat/1.0.0)");
    }
}
