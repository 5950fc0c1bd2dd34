//! Connection slot tracking.

use std::collections::{HashMap, HashSet};

use peerchat_core::EndpointId;

use crate::peer::{ConnectionDirection, PeerInfo};

/// Node-local handle for an established stream.
pub type StreamKey = u64;

/// Tracks in-flight outbound attempts and established streams.
///
/// At most one outbound attempt runs per peer endpoint; a peer that already
/// has an outbound stream is never dialed again.
#[derive(Debug, Default)]
pub struct ConnectionSlots {
    /// Peers we're currently connecting to.
    connecting: HashSet<EndpointId>,
    /// Established streams.
    streams: HashMap<StreamKey, PeerInfo>,
    /// Next stream key.
    next_key: StreamKey,
}

impl ConnectionSlots {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if we're currently connecting to a peer.
    pub fn is_connecting(&self, peer: &EndpointId) -> bool {
        self.connecting.contains(peer)
    }

    /// Check if we hold an outbound stream to a peer.
    pub fn has_outbound(&self, peer: &EndpointId) -> bool {
        self.streams
            .values()
            .any(|info| info.is_outbound() && &info.endpoint_id == peer)
    }

    /// Check if we should start connecting to a peer.
    pub fn should_connect(&self, peer: &EndpointId) -> bool {
        !self.is_connecting(peer) && !self.has_outbound(peer)
    }

    /// Claim the outbound slot for a peer. Returns false if it is taken.
    pub fn start_connecting(&mut self, peer: EndpointId) -> bool {
        if !self.should_connect(&peer) {
            return false;
        }
        self.connecting.insert(peer)
    }

    /// Release a peer's outbound slot after a failed attempt.
    pub fn stop_connecting(&mut self, peer: &EndpointId) {
        self.connecting.remove(peer);
    }

    /// Register an established stream.
    pub fn add_stream(&mut self, info: PeerInfo) -> StreamKey {
        if info.is_outbound() {
            self.connecting.remove(&info.endpoint_id);
        }
        let key = self.next_key;
        self.next_key += 1;
        self.streams.insert(key, info);
        key
    }

    /// Forget a stream.
    pub fn remove_stream(&mut self, key: StreamKey) -> Option<PeerInfo> {
        self.streams.remove(&key)
    }

    fn count(&self, direction: ConnectionDirection) -> usize {
        self.streams
            .values()
            .filter(|info| info.direction == direction)
            .count()
    }

    /// Get outbound stream count.
    pub fn outbound_count(&self) -> usize {
        self.count(ConnectionDirection::Outbound)
    }

    /// Get inbound stream count.
    pub fn inbound_count(&self) -> usize {
        self.count(ConnectionDirection::Inbound)
    }

    /// Get connecting count.
    pub fn connecting_count(&self) -> usize {
        self.connecting.len()
    }

    /// Iterate over all streams.
    pub fn iter(&self) -> impl Iterator<Item = &PeerInfo> {
        self.streams.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> EndpointId {
        EndpointId::from_bytes([byte; 20])
    }

    fn make_stream(byte: u8, direction: ConnectionDirection) -> PeerInfo {
        PeerInfo::new(id(byte), "127.0.0.1:3021".parse().unwrap(), direction, "/chat/1.0.0")
    }

    #[test]
    fn test_one_attempt_per_peer() {
        let mut slots = ConnectionSlots::new();

        assert!(slots.start_connecting(id(1)));
        assert!(!slots.start_connecting(id(1)));
        assert!(slots.start_connecting(id(2)));
        assert_eq!(slots.connecting_count(), 2);

        slots.stop_connecting(&id(1));
        assert!(slots.should_connect(&id(1)));
    }

    #[test]
    fn test_outbound_stream_releases_attempt() {
        let mut slots = ConnectionSlots::new();
        slots.start_connecting(id(1));

        let key = slots.add_stream(make_stream(1, ConnectionDirection::Outbound));
        assert!(!slots.is_connecting(&id(1)));
        assert!(!slots.should_connect(&id(1)));
        assert_eq!(slots.outbound_count(), 1);

        let removed = slots.remove_stream(key).unwrap();
        assert_eq!(removed.endpoint_id, id(1));
        assert_eq!(slots.outbound_count(), 0);
    }

    #[test]
    fn test_inbound_stream_does_not_block_dialing() {
        let mut slots = ConnectionSlots::new();
        slots.add_stream(make_stream(1, ConnectionDirection::Inbound));
        slots.add_stream(make_stream(1, ConnectionDirection::Inbound));

        assert_eq!(slots.inbound_count(), 2);
        assert!(slots.should_connect(&id(1)));
    }
}
