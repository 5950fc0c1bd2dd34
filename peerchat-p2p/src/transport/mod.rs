//! Authenticated transport sessions.
//!
//! The establisher only sees these traits, so retry behaviour can be driven
//! by a scripted transport in tests while the node uses [`TcpTransport`].

pub mod tcp;

use async_trait::async_trait;
use peerchat_core::{EndpointId, NodeIdentity};

use crate::error::P2pResult;
use crate::peer::PeerAddr;
use crate::stream::ChatStream;

pub use tcp::{TcpSession, TcpTransport};

/// Dials peers and authenticates the resulting sessions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Session type produced by a successful dial.
    type Session: Session;

    /// Connect to `peer` and prove identities both ways.
    ///
    /// Fails with `IdentityMismatch` if the remote side is not the endpoint
    /// pinned in `peer`.
    async fn dial(&self, local: &NodeIdentity, peer: &PeerAddr) -> P2pResult<Self::Session>;
}

/// An authenticated connection that can carry one chat stream.
#[async_trait]
pub trait Session: Send {
    /// Endpoint id the remote side proved.
    fn remote_endpoint(&self) -> EndpointId;

    /// Whether the session can carry another stream request.
    fn is_open(&self) -> bool;

    /// Ask the remote side for a stream speaking `protocol`.
    ///
    /// A refused request leaves the session open for another attempt. Any
    /// other failure, including a timeout, closes it: a late answer could
    /// otherwise be taken for the reply to a later request.
    async fn open_stream(&mut self, protocol: &str) -> P2pResult<ChatStream>;
}
