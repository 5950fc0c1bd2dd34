//! Mutual authentication handshake.
//!
//! The handshake protocol:
//! 1. Both sides send Hello with their public key and a fresh nonce
//! 2. Both sides answer with Proof, a signature over
//!    `AUTH_DOMAIN || peer nonce || own public key`
//! 3. Each side verifies the proof against the key from the peer's Hello and
//!    derives the peer's endpoint id from that key

use futures::{SinkExt, StreamExt};
use peerchat_core::crypto::{sha256_concat, verify};
use peerchat_core::{EndpointId, NodeIdentity, PublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::config::HANDSHAKE_VERSION;
use crate::error::{P2pError, P2pResult};
use crate::protocol::{HandshakeCodec, HandshakeMessage, HelloMessage, ProofMessage, NONCE_LEN};

/// Domain separation tag for handshake signatures.
pub const AUTH_DOMAIN: &[u8] = b"peerchat/auth/v1";

/// Identity proven by the remote side of a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedPeer {
    /// Endpoint id derived from the proven key.
    pub endpoint_id: EndpointId,
    /// The proven key.
    pub public_key: PublicKey,
}

/// Create a Hello with a fresh nonce.
pub fn create_hello(identity: &NodeIdentity) -> HelloMessage {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    HelloMessage {
        version: HANDSHAKE_VERSION,
        public_key: identity.public_key(),
        nonce,
    }
}

/// Validate a received Hello.
pub fn validate_hello(received: &HelloMessage) -> P2pResult<()> {
    if received.version != HANDSHAKE_VERSION {
        return Err(P2pError::IncompatibleVersion {
            peer_version: received.version,
            our_version: HANDSHAKE_VERSION,
        });
    }
    Ok(())
}

/// Digest a signer commits to when answering `challenge`.
pub fn transcript(challenge: &[u8; NONCE_LEN], signer: &PublicKey) -> [u8; 32] {
    sha256_concat(&[AUTH_DOMAIN, challenge, signer.as_bytes()])
}

/// Answer the peer's challenge.
pub fn create_proof(identity: &NodeIdentity, challenge: &[u8; NONCE_LEN]) -> ProofMessage {
    let digest = transcript(challenge, &identity.public_key());
    ProofMessage {
        signature: identity.sign(&digest),
    }
}

/// Check that `proof` answers `our_nonce` with the key announced in `hello`.
pub fn verify_proof(
    hello: &HelloMessage,
    our_nonce: &[u8; NONCE_LEN],
    proof: &ProofMessage,
) -> P2pResult<EndpointId> {
    let digest = transcript(our_nonce, &hello.public_key);
    verify(&hello.public_key, &digest, &proof.signature)?;
    Ok(EndpointId::from_public_key(&hello.public_key))
}

/// Receive the next handshake frame.
pub(crate) async fn recv_message<T>(
    framed: &mut Framed<T, HandshakeCodec>,
) -> P2pResult<HandshakeMessage>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(result) => result,
        None => Err(P2pError::PeerDisconnected {
            reason: "connection closed during handshake".to_string(),
        }),
    }
}

fn unexpected(expected: &str, actual: &HandshakeMessage) -> P2pError {
    P2pError::UnexpectedMessage {
        expected: expected.to_string(),
        actual: actual.name().to_string(),
    }
}

/// Run the handshake on a fresh connection.
///
/// Both roles run the same steps. A dialer passes the endpoint id pinned for
/// the peer as `expected`; a responder passes `None` and learns the id.
pub async fn authenticate<T>(
    framed: &mut Framed<T, HandshakeCodec>,
    identity: &NodeIdentity,
    expected: Option<EndpointId>,
) -> P2pResult<AuthenticatedPeer>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let ours = create_hello(identity);
    framed.send(HandshakeMessage::Hello(ours.clone())).await?;

    let theirs = match recv_message(framed).await? {
        HandshakeMessage::Hello(hello) => hello,
        other => return Err(unexpected("Hello", &other)),
    };
    validate_hello(&theirs)?;

    framed
        .send(HandshakeMessage::Proof(create_proof(identity, &theirs.nonce)))
        .await?;

    let proof = match recv_message(framed).await? {
        HandshakeMessage::Proof(proof) => proof,
        other => return Err(unexpected("Proof", &other)),
    };
    let endpoint_id = verify_proof(&theirs, &ours.nonce, &proof)?;

    if endpoint_id == identity.endpoint_id() {
        return Err(P2pError::HandshakeFailed("connected to self".to_string()));
    }
    if let Some(expected) = expected {
        if expected != endpoint_id {
            return Err(P2pError::IdentityMismatch {
                expected,
                actual: endpoint_id,
            });
        }
    }

    tracing::debug!(peer = %endpoint_id, "Handshake complete");
    Ok(AuthenticatedPeer {
        endpoint_id,
        public_key: theirs.public_key,
    })
}
