//! Outbound connection establishment.

use peerchat_core::NodeIdentity;

use crate::config::P2pConfig;
use crate::error::{P2pError, P2pResult};
use crate::manager::retry::{retry, Attempts, RetryPolicy};
use crate::peer::PeerDescriptor;
use crate::stream::ChatStream;
use crate::transport::{Session, Transport};

/// Turns a peer descriptor into an open chat stream.
///
/// Dialing and stream negotiation each get their own retry budget. Failures
/// are returned to the caller; a finished stream is never reconnected.
#[derive(Debug)]
pub struct ConnectionEstablisher<T> {
    transport: T,
    protocol: String,
    connect_retry: RetryPolicy,
    negotiate_retry: RetryPolicy,
}

impl<T: Transport> ConnectionEstablisher<T> {
    /// Create an establisher using the configured protocol and retry policies.
    pub fn new(transport: T, config: &P2pConfig) -> Self {
        Self {
            transport,
            protocol: config.protocol_id.clone(),
            connect_retry: config.connect_retry,
            negotiate_retry: config.negotiate_retry,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Dial `peer`, authenticate it and open the chat stream.
    ///
    /// A refused stream request is retried on the same session; a request
    /// that breaks the session is retried on a freshly dialed one.
    pub async fn connect(&self, local: &NodeIdentity, peer: &PeerDescriptor) -> P2pResult<ChatStream> {
        let addr = peer.peer_addr()?;
        let endpoint = addr.endpoint_id;
        tracing::info!(index = peer.index, addr = %addr.socket, peer = %endpoint, "Connecting to peer");

        let transport = &self.transport;
        let addr = &addr;
        let mut session = retry(self.connect_retry, "connect", move || transport.dial(local, addr))
            .await
            .map_err(|exhausted| P2pError::ConnectFailed {
                peer: endpoint,
                attempts: exhausted.attempts,
                source: Box::new(exhausted.last_error),
            })?;

        tracing::info!(peer = %endpoint, "Connected, opening stream");

        let mut attempts = Attempts::new(self.negotiate_retry, "open stream");
        loop {
            attempts.begin();
            let result = if session.is_open() {
                session.open_stream(&self.protocol).await
            } else {
                // A broken session may still deliver a stale answer; start over.
                tracing::debug!(peer = %endpoint, "Redialing for a fresh session");
                match self.transport.dial(local, addr).await {
                    Ok(fresh) => {
                        session = fresh;
                        session.open_stream(&self.protocol).await
                    }
                    Err(e) => Err(e),
                }
            };

            match result {
                Ok(stream) => {
                    tracing::info!(peer = %endpoint, protocol = %self.protocol, "Stream established");
                    return Ok(stream);
                }
                Err(e) => {
                    if let Err(exhausted) = attempts.failed(e).await {
                        return Err(P2pError::StreamNegotiationFailed {
                            peer: endpoint,
                            attempts: exhausted.attempts,
                            source: Box::new(exhausted.last_error),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{ConnectionDirection, PeerAddr, PeerInfo};
    use async_trait::async_trait;
    use peerchat_core::{EndpointId, IdentitySelector};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Transport whose dials fail until attempt `dial_ok_at`; sessions refuse
    /// streams until attempt `open_ok_at`. Zero means never succeed. Open
    /// attempts listed in `open_breaks` time out and close their session.
    #[derive(Default)]
    struct ScriptedTransport {
        dial_ok_at: u32,
        open_ok_at: u32,
        open_breaks: Vec<u32>,
        dials: AtomicU32,
        opens: Arc<AtomicU32>,
    }

    struct ScriptedSession {
        peer: EndpointId,
        open_ok_at: u32,
        open_breaks: Vec<u32>,
        open: bool,
        opens: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        type Session = ScriptedSession;

        async fn dial(&self, _local: &NodeIdentity, peer: &PeerAddr) -> P2pResult<ScriptedSession> {
            let n = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
            // Once the scripted dial has succeeded, later redials succeed too.
            if self.dial_ok_at != 0 && n >= self.dial_ok_at {
                Ok(ScriptedSession {
                    peer: peer.endpoint_id,
                    open_ok_at: self.open_ok_at,
                    open_breaks: self.open_breaks.clone(),
                    open: true,
                    opens: self.opens.clone(),
                })
            } else {
                Err(P2pError::HandshakeFailed(format!("dial {}", n)))
            }
        }
    }

    #[async_trait]
    impl Session for ScriptedSession {
        fn remote_endpoint(&self) -> EndpointId {
            self.peer
        }

        fn is_open(&self) -> bool {
            self.open
        }

        async fn open_stream(&mut self, protocol: &str) -> P2pResult<ChatStream> {
            if !self.open {
                return Err(P2pError::SessionClosed);
            }
            let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
            if self.open_breaks.contains(&n) {
                self.open = false;
                return Err(P2pError::HandshakeTimeout);
            }
            if n != self.open_ok_at {
                return Err(P2pError::ProtocolRejected {
                    protocol: protocol.to_string(),
                    reason: format!("open {}", n),
                });
            }
            let (a, _b) = tokio::io::duplex(64);
            let (reader, writer) = tokio::io::split(a);
            let info = PeerInfo::new(
                self.peer,
                "127.0.0.1:1".parse().unwrap(),
                ConnectionDirection::Outbound,
                protocol,
            );
            Ok(ChatStream::new(info, Box::new(reader), Box::new(writer)))
        }
    }

    fn establisher(transport: ScriptedTransport) -> ConnectionEstablisher<ScriptedTransport> {
        let fast = RetryPolicy::new(5, Duration::from_millis(1));
        ConnectionEstablisher::new(transport, &P2pConfig::default().with_retry(fast))
    }

    fn local() -> NodeIdentity {
        NodeIdentity::select(IdentitySelector::Provisioned(0)).unwrap()
    }

    fn descriptor() -> PeerDescriptor {
        PeerDescriptor::new(
            1,
            "/ip4/127.0.0.1/tcp/3022/p2p/f602a16648c2e723d2cb80ed553e1bfaae2e382e",
        )
    }

    #[tokio::test]
    async fn test_succeeds_on_third_dial() {
        let establisher = establisher(ScriptedTransport {
            dial_ok_at: 3,
            open_ok_at: 1,
            ..Default::default()
        });

        let stream = establisher.connect(&local(), &descriptor()).await.unwrap();
        assert_eq!(stream.info().protocol, "/chat/1.0.0");
        assert_eq!(establisher.transport().dials.load(Ordering::SeqCst), 3);
        assert_eq!(establisher.transport().opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_carries_fifth_error() {
        let establisher = establisher(ScriptedTransport::default());

        let err = establisher.connect(&local(), &descriptor()).await.unwrap_err();
        match err {
            P2pError::ConnectFailed { attempts, source, .. } => {
                assert_eq!(attempts, 5);
                assert_eq!(source.to_string(), "Handshake failed: dial 5");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(establisher.transport().dials.load(Ordering::SeqCst), 5);
        assert_eq!(establisher.transport().opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_negotiation_retries_on_same_session() {
        let establisher = establisher(ScriptedTransport {
            dial_ok_at: 1,
            open_ok_at: 4,
            ..Default::default()
        });

        establisher.connect(&local(), &descriptor()).await.unwrap();
        assert_eq!(establisher.transport().dials.load(Ordering::SeqCst), 1);
        assert_eq!(establisher.transport().opens.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_negotiation_failure_carries_fifth_error() {
        let establisher = establisher(ScriptedTransport {
            dial_ok_at: 1,
            ..Default::default()
        });

        let err = establisher.connect(&local(), &descriptor()).await.unwrap_err();
        match err {
            P2pError::StreamNegotiationFailed { attempts, source, .. } => {
                assert_eq!(attempts, 5);
                assert!(matches!(
                    *source,
                    P2pError::ProtocolRejected { ref reason, .. } if reason == "open 5"
                ));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broken_session_is_redialed() {
        let establisher = establisher(ScriptedTransport {
            dial_ok_at: 1,
            open_ok_at: 2,
            open_breaks: vec![1],
            ..Default::default()
        });

        establisher.connect(&local(), &descriptor()).await.unwrap();
        assert_eq!(establisher.transport().dials.load(Ordering::SeqCst), 2);
        assert_eq!(establisher.transport().opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_redial_failures_count_against_negotiation() {
        let establisher = establisher(ScriptedTransport {
            dial_ok_at: 1,
            open_breaks: vec![1, 2, 3, 4, 5],
            ..Default::default()
        });

        let err = establisher.connect(&local(), &descriptor()).await.unwrap_err();
        match err {
            P2pError::StreamNegotiationFailed { attempts, source, .. } => {
                assert_eq!(attempts, 5);
                assert!(matches!(*source, P2pError::HandshakeTimeout));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // One initial dial plus one per broken attempt before the last.
        assert_eq!(establisher.transport().dials.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_invalid_address_is_not_retried() {
        let establisher = establisher(ScriptedTransport::default());
        let peer = PeerDescriptor::new(1, "/ip4/127.0.0.1/tcp/notaport/p2p/00");

        let err = establisher.connect(&local(), &peer).await.unwrap_err();
        assert!(matches!(err, P2pError::InvalidAddress(_)));
        assert_eq!(establisher.transport().dials.load(Ordering::SeqCst), 0);
    }
}
