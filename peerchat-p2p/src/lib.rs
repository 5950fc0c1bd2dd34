//! Peer-to-peer chat networking.
//!
//! This crate connects a node to a small, statically known set of peers and
//! exchanges newline-delimited text with them:
//!
//! - Static peer directory with multiaddr-style addresses
//! - Ed25519 mutual authentication over TCP
//! - Outbound connection establishment with fixed-interval retry
//! - Per-stream reader and throttled writer tasks
//! - A single inbox that merges every inbound line
//!
//! # Architecture
//!
//! Every stream half runs in its own tokio task. Tasks report back to the
//! node over a channel; received lines go straight to the inbox.
//!
//! ```text
//! Main Task (ChatNode::run())
//! ├── Listener (accept incoming, authenticate, negotiate)
//! ├── Establisher Task per peer (dial with retry, negotiate with retry)
//! ├── Reader Task per stream ──► Inbox ──► application loop
//! └── Writer Task per outbound stream ◄── PayloadSource
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use peerchat_core::{IdentitySelector, NodeIdentity};
//! use peerchat_p2p::{ChatNode, Inbox, P2pConfig, PeerDirectory};
//!
//! let identity = Arc::new(NodeIdentity::select(IdentitySelector::Provisioned(0))?);
//! let (inbox_tx, mut inbox) = Inbox::new(1024);
//! let config = P2pConfig::new("0.0.0.0:3021".parse()?, 0);
//!
//! let node = ChatNode::bind(config, identity, inbox_tx).await?;
//! tokio::spawn(async move { node.run(PeerDirectory::builtin()).await });
//!
//! while let Some(message) = inbox.recv().await {
//!     println!("{}", message.text());
//! }
//! ```

pub mod config;
pub mod error;

pub mod inbox;
pub mod manager;
pub mod node;
pub mod peer;
pub mod protocol;
pub mod stream;
pub mod transport;

// Re-export main types
pub use config::{ConnectFailurePolicy, P2pConfig, DEFAULT_INBOX_CAPACITY, PROTOCOL_ID};
pub use error::{P2pError, P2pResult};
pub use inbox::{Inbox, InboxMessage, InboxSender, StreamSource};
pub use manager::{ConnectionEstablisher, RetryPolicy};
pub use node::{ChatNode, NodeStateUpdate, PeerSnapshot};
pub use peer::{ConnectionDirection, ListenAddr, PeerAddr, PeerDescriptor, PeerDirectory, PeerInfo};
pub use stream::{
    BroadcastPayloadFactory, ChatStream, CounterPayloadFactory, PayloadFactory, PayloadSource,
    ReaderExit, WriterExit, WriterPacing,
};
pub use transport::{Session, TcpTransport, Transport};
