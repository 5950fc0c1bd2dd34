//! Application protocol negotiation on an authenticated session.

use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::error::{P2pError, P2pResult};
use crate::protocol::auth::recv_message;
use crate::protocol::{HandshakeCodec, HandshakeMessage};

/// Ask the responder for a stream speaking `protocol`.
///
/// A rejection leaves the session usable for another request.
pub async fn request_stream<T>(framed: &mut Framed<T, HandshakeCodec>, protocol: &str) -> P2pResult<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    framed
        .send(HandshakeMessage::OpenStream {
            protocol: protocol.to_string(),
        })
        .await?;

    match recv_message(framed).await? {
        HandshakeMessage::StreamAccepted { protocol: accepted } if accepted == protocol => Ok(()),
        HandshakeMessage::StreamAccepted { protocol: accepted } => Err(P2pError::HandshakeFailed(
            format!("asked for {} but peer accepted {}", protocol, accepted),
        )),
        HandshakeMessage::StreamRejected { protocol, reason } => {
            Err(P2pError::ProtocolRejected { protocol, reason })
        }
        other => Err(P2pError::UnexpectedMessage {
            expected: "StreamAccepted".to_string(),
            actual: other.name().to_string(),
        }),
    }
}

/// Answer stream requests until one asks for `supported`.
///
/// Returns the accepted protocol. Gives up after `max_rejections` requests
/// for anything else.
pub async fn answer_stream_requests<T>(
    framed: &mut Framed<T, HandshakeCodec>,
    supported: &str,
    max_rejections: usize,
) -> P2pResult<String>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut rejections = 0;
    loop {
        let requested = match recv_message(framed).await? {
            HandshakeMessage::OpenStream { protocol } => protocol,
            other => {
                return Err(P2pError::UnexpectedMessage {
                    expected: "OpenStream".to_string(),
                    actual: other.name().to_string(),
                })
            }
        };

        if requested == supported {
            framed
                .send(HandshakeMessage::StreamAccepted {
                    protocol: requested.clone(),
                })
                .await?;
            return Ok(requested);
        }

        rejections += 1;
        tracing::debug!(protocol = %requested, rejections, "Rejecting unsupported protocol");
        framed
            .send(HandshakeMessage::StreamRejected {
                protocol: requested.clone(),
                reason: format!("unsupported protocol, this node speaks {}", supported),
            })
            .await?;

        if rejections >= max_rejections {
            return Err(P2pError::ProtocolRejected {
                protocol: requested,
                reason: "too many unsupported stream requests".to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: &str = "/chat/1.0.0";

    fn pair() -> (
        Framed<tokio::io::DuplexStream, HandshakeCodec>,
        Framed<tokio::io::DuplexStream, HandshakeCodec>,
    ) {
        let (a, b) = tokio::io::duplex(4096);
        (
            Framed::new(a, HandshakeCodec::new()),
            Framed::new(b, HandshakeCodec::new()),
        )
    }

    #[tokio::test]
    async fn test_accepts_supported_protocol() {
        let (mut dialer, mut responder) = pair();

        let (requested, answered) = tokio::join!(
            request_stream(&mut dialer, CHAT),
            answer_stream_requests(&mut responder, CHAT, 3),
        );

        requested.unwrap();
        assert_eq!(answered.unwrap(), CHAT);
    }

    #[tokio::test]
    async fn test_rejects_then_accepts_on_same_session() {
        let (mut dialer, mut responder) = pair();

        let responder_task =
            tokio::spawn(async move { answer_stream_requests(&mut responder, CHAT, 3).await });

        let first = request_stream(&mut dialer, "/chat/0.9.0").await;
        assert!(matches!(first, Err(P2pError::ProtocolRejected { .. })));

        request_stream(&mut dialer, CHAT).await.unwrap();
        assert_eq!(responder_task.await.unwrap().unwrap(), CHAT);
    }

    #[tokio::test]
    async fn test_responder_gives_up_after_limit() {
        let (mut dialer, mut responder) = pair();

        let responder_task =
            tokio::spawn(async move { answer_stream_requests(&mut responder, CHAT, 2).await });

        for _ in 0..2 {
            let result = request_stream(&mut dialer, "/other/1.0.0").await;
            assert!(matches!(result, Err(P2pError::ProtocolRejected { .. })));
        }

        let answered = responder_task.await.unwrap();
        assert!(matches!(answered, Err(P2pError::ProtocolRejected { .. })));
    }
}
