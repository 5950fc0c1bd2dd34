//! Static peer directory.

use std::sync::OnceLock;

use crate::error::{P2pError, P2pResult};
use crate::peer::PeerAddr;

/// Built-in peers, pinned to the provisioned identities by index.
const BUILTIN_PEERS: [&str; 3] = [
    "/ip4/127.0.0.1/tcp/3021/p2p/6f6aaedc2a6e50475336b3aa4a73e988e61fc3af",
    "/ip4/127.0.0.1/tcp/3022/p2p/f602a16648c2e723d2cb80ed553e1bfaae2e382e",
    "/ip4/127.0.0.1/tcp/3023/p2p/47c419cdfe252162736e758047cdd498a4cbd463",
];

/// One entry of the directory.
///
/// The address is kept as text and only parsed when the peer is dialed, so a
/// malformed entry fails that peer alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDescriptor {
    /// Position in the directory.
    pub index: usize,
    /// Address text, `/ip4/<ip>/tcp/<port>/p2p/<endpoint id>`.
    pub address: String,
}

impl PeerDescriptor {
    /// Create a descriptor.
    pub fn new(index: usize, address: impl Into<String>) -> Self {
        Self {
            index,
            address: address.into(),
        }
    }

    /// Parse the address text.
    pub fn peer_addr(&self) -> P2pResult<PeerAddr> {
        self.address.parse()
    }
}

/// Ordered, read-only table of known peers.
#[derive(Debug, Clone, Default)]
pub struct PeerDirectory {
    peers: Vec<PeerDescriptor>,
}

impl PeerDirectory {
    /// Build a directory from address texts, indexed by position.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers = addresses
            .into_iter()
            .enumerate()
            .map(|(index, address)| PeerDescriptor::new(index, address))
            .collect();
        Self { peers }
    }

    /// The process-wide built-in directory.
    pub fn builtin() -> &'static PeerDirectory {
        static BUILTIN: OnceLock<PeerDirectory> = OnceLock::new();
        BUILTIN.get_or_init(|| PeerDirectory::new(BUILTIN_PEERS))
    }

    /// Look up the descriptor at `index`.
    pub fn peer_at(&self, index: usize) -> P2pResult<&PeerDescriptor> {
        self.peers.get(index).ok_or(P2pError::PeerIndexOutOfRange {
            index,
            len: self.peers.len(),
        })
    }

    /// Every descriptor except the one at `local_index`.
    pub fn others(&self, local_index: usize) -> impl Iterator<Item = &PeerDescriptor> {
        self.peers.iter().filter(move |peer| peer.index != local_index)
    }

    /// All descriptors in index order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerDescriptor> {
        self.peers.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerchat_core::{IdentitySelector, NodeIdentity};

    #[test]
    fn test_builtin_lookup() {
        let directory = PeerDirectory::builtin();
        assert_eq!(directory.len(), 3);

        let peer = directory.peer_at(1).unwrap();
        assert_eq!(peer.index, 1);
        assert_eq!(peer.address, BUILTIN_PEERS[1]);
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(std::ptr::eq(PeerDirectory::builtin(), PeerDirectory::builtin()));
    }

    #[test]
    fn test_out_of_range() {
        let err = PeerDirectory::builtin().peer_at(3).unwrap_err();
        assert!(matches!(err, P2pError::PeerIndexOutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn test_builtin_entries_match_provisioned_identities() {
        for peer in PeerDirectory::builtin().iter() {
            let identity = NodeIdentity::select(IdentitySelector::Provisioned(peer.index)).unwrap();
            let addr = peer.peer_addr().unwrap();
            assert_eq!(addr.endpoint_id, identity.endpoint_id());
            assert_eq!(addr.socket.port(), 3021 + peer.index as u16);
        }
    }

    #[test]
    fn test_others_skips_local() {
        let directory = PeerDirectory::new(["a", "b", "c"]);
        let indices: Vec<usize> = directory.others(1).map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_malformed_entry_fails_on_parse() {
        let directory = PeerDirectory::new(["not an address"]);
        let peer = directory.peer_at(0).unwrap();
        assert!(matches!(peer.peer_addr(), Err(P2pError::InvalidAddress(_))));
    }
}
