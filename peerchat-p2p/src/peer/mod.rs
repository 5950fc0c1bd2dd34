//! Peer addressing and metadata.
//!
//! This module provides:
//! - Multiaddr-style peer and listen addresses
//! - The static peer directory
//! - Metadata for established streams

pub mod address;
pub mod directory;
pub mod info;

// Re-export main types
pub use address::{ListenAddr, PeerAddr};
pub use directory::{PeerDescriptor, PeerDirectory};
pub use info::{ConnectionDirection, PeerInfo};
