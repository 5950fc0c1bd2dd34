//! TCP transport with Ed25519 mutual authentication.

use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use peerchat_core::{EndpointId, NodeIdentity};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use crate::config::P2pConfig;
use crate::error::{P2pError, P2pResult};
use crate::peer::{ConnectionDirection, PeerAddr, PeerInfo};
use crate::protocol::{
    answer_stream_requests, authenticate, request_stream, AuthenticatedPeer, HandshakeCodec,
};
use crate::stream::ChatStream;
use crate::transport::{Session, Transport};

/// Dials peers over plain TCP.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    dial_timeout: Duration,
    handshake_timeout: Duration,
}

impl TcpTransport {
    /// Create a transport using the configured timeouts.
    pub fn new(config: &P2pConfig) -> Self {
        Self {
            dial_timeout: config.dial_timeout,
            handshake_timeout: config.handshake_timeout,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Session = TcpSession;

    async fn dial(&self, local: &NodeIdentity, peer: &PeerAddr) -> P2pResult<TcpSession> {
        tracing::debug!(addr = %peer.socket, peer = %peer.endpoint_id, "Dialing peer");

        let stream = match timeout(self.dial_timeout, TcpStream::connect(peer.socket)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(P2pError::Io(e)),
            Err(_) => return Err(P2pError::ConnectionTimeout { addr: peer.socket }),
        };

        TcpSession::establish(
            stream,
            peer.socket,
            local,
            Some(peer.endpoint_id),
            ConnectionDirection::Outbound,
            self.handshake_timeout,
        )
        .await
    }
}

/// An authenticated TCP connection, before its chat stream is opened.
#[derive(Debug)]
pub struct TcpSession {
    peer: AuthenticatedPeer,
    remote_addr: SocketAddr,
    direction: ConnectionDirection,
    handshake_timeout: Duration,
    /// Taken when the connection is handed to a chat stream.
    framed: Option<Framed<TcpStream, HandshakeCodec>>,
}

impl TcpSession {
    async fn establish(
        stream: TcpStream,
        remote_addr: SocketAddr,
        local: &NodeIdentity,
        expected: Option<EndpointId>,
        direction: ConnectionDirection,
        handshake_timeout: Duration,
    ) -> P2pResult<Self> {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %remote_addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let mut framed = Framed::new(stream, HandshakeCodec::new());
        let peer = match timeout(handshake_timeout, authenticate(&mut framed, local, expected)).await {
            Ok(result) => result?,
            Err(_) => return Err(P2pError::HandshakeTimeout),
        };

        tracing::debug!(
            addr = %remote_addr,
            peer = %peer.endpoint_id,
            direction = %direction,
            "Session authenticated"
        );
        Ok(Self {
            peer,
            remote_addr,
            direction,
            handshake_timeout,
            framed: Some(framed),
        })
    }

    /// Run the responder side of the handshake on an accepted connection.
    pub async fn accept(
        stream: TcpStream,
        remote_addr: SocketAddr,
        local: &NodeIdentity,
        handshake_timeout: Duration,
    ) -> P2pResult<Self> {
        Self::establish(
            stream,
            remote_addr,
            local,
            None,
            ConnectionDirection::Inbound,
            handshake_timeout,
        )
        .await
    }

    /// Answer the dialer's stream requests until it asks for `supported`.
    ///
    /// `wait` bounds the whole negotiation, including the dialer's pauses
    /// between rejected requests.
    pub async fn accept_stream(
        &mut self,
        supported: &str,
        max_rejections: usize,
        wait: Duration,
    ) -> P2pResult<ChatStream> {
        let framed = self.framed.as_mut().ok_or(P2pError::SessionClosed)?;
        let answer = answer_stream_requests(framed, supported, max_rejections);
        let protocol = match timeout(wait, answer).await {
            Ok(result) => result?,
            Err(_) => return Err(P2pError::HandshakeTimeout),
        };
        self.take_stream(protocol)
    }

    /// Socket address of the remote side.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Proven identity of the remote side.
    pub fn peer(&self) -> &AuthenticatedPeer {
        &self.peer
    }

    fn take_stream(&mut self, protocol: String) -> P2pResult<ChatStream> {
        let framed = self.framed.take().ok_or(P2pError::SessionClosed)?;
        let info = PeerInfo::new(self.peer.endpoint_id, self.remote_addr, self.direction, protocol);

        // Bytes read past the last handshake frame belong to the chat stream.
        let parts = framed.into_parts();
        let (read_half, write_half) = parts.io.into_split();
        let reader = Cursor::new(parts.read_buf).chain(read_half);

        Ok(ChatStream::new(info, Box::new(reader), Box::new(write_half)))
    }
}

#[async_trait]
impl Session for TcpSession {
    fn remote_endpoint(&self) -> EndpointId {
        self.peer.endpoint_id
    }

    fn is_open(&self) -> bool {
        self.framed.is_some()
    }

    async fn open_stream(&mut self, protocol: &str) -> P2pResult<ChatStream> {
        let framed = self.framed.as_mut().ok_or(P2pError::SessionClosed)?;
        let result = match timeout(self.handshake_timeout, request_stream(framed, protocol)).await {
            Ok(result) => result,
            Err(_) => Err(P2pError::HandshakeTimeout),
        };

        match result {
            Ok(()) => self.take_stream(protocol.to_string()),
            Err(e @ P2pError::ProtocolRejected { .. }) => Err(e),
            Err(e) => {
                tracing::debug!(
                    peer = %self.peer.endpoint_id,
                    error = %e,
                    "Closing session after failed stream request"
                );
                self.framed = None;
                Err(e)
            }
        }
    }
}
