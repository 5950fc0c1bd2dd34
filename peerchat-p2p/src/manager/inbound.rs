//! Inbound connection listener.

use std::net::SocketAddr;

use peerchat_core::NodeIdentity;
use tokio::net::{TcpListener, TcpStream};

use crate::config::P2pConfig;
use crate::error::{P2pError, P2pResult};
use crate::stream::ChatStream;
use crate::transport::TcpSession;

/// Inbound connection listener.
#[derive(Debug)]
pub struct InboundListener {
    /// TCP listener.
    listener: TcpListener,
}

impl InboundListener {
    /// Bind to the configured listen address.
    pub async fn bind(config: &P2pConfig) -> P2pResult<Self> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "Listening for inbound connections");
        Ok(Self { listener })
    }

    /// Get the local address we're listening on.
    pub fn local_addr(&self) -> P2pResult<SocketAddr> {
        self.listener.local_addr().map_err(P2pError::Io)
    }

    /// Accept the next TCP connection.
    pub async fn accept(&self) -> P2pResult<(TcpStream, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await?;
        tracing::debug!(addr = %addr, "Accepted inbound connection");
        Ok((stream, addr))
    }
}

/// Authenticate an accepted connection and wait for its chat stream request.
///
/// The dialer may retry an unsupported protocol; the wait covers its pauses
/// between requests.
pub async fn accept_chat_stream(
    stream: TcpStream,
    addr: SocketAddr,
    identity: &NodeIdentity,
    config: &P2pConfig,
) -> P2pResult<ChatStream> {
    let mut session = TcpSession::accept(stream, addr, identity, config.handshake_timeout).await?;
    tracing::debug!(
        peer = %session.peer().endpoint_id,
        addr = %session.remote_addr(),
        "Inbound session authenticated, awaiting stream request"
    );

    let retries = u32::try_from(config.max_protocol_rejections).unwrap_or(u32::MAX);
    let wait = config
        .handshake_timeout
        .saturating_add(config.negotiate_retry.interval.saturating_mul(retries));

    session
        .accept_stream(&config.protocol_id, config.max_protocol_rejections, wait)
        .await
}
