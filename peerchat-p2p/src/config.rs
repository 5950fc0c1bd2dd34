//! P2P configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::manager::RetryPolicy;
use crate::stream::WriterPacing;

/// Protocol identifier negotiated when opening a chat stream.
pub const PROTOCOL_ID: &str = "/chat/1.0.0";

/// Version of the authentication handshake.
pub const HANDSHAKE_VERSION: u32 = 1;

/// Magic bytes opening every handshake frame.
pub const NETWORK_MAGIC: [u8; 4] = *b"PCHT";

/// Maximum handshake frame body size in bytes (64 KiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Default attempts for dialing a peer and for opening a stream.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

/// Default fixed wait between failed attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Default TCP dial timeout.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the authentication handshake and each stream request.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of messages a writer sends before pausing.
pub const DEFAULT_WRITER_BURST: usize = 20;

/// Default writer pause after each burst.
pub const DEFAULT_WRITER_PAUSE: Duration = Duration::from_secs(1);

/// Default inbox queue capacity.
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;

/// Default number of unsupported stream requests a responder answers
/// before closing the session.
pub const DEFAULT_MAX_PROTOCOL_REJECTIONS: usize = 5;

/// What the node does when a peer cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectFailurePolicy {
    /// Log the failure and keep serving the remaining peers.
    #[default]
    Continue,
    /// Stop the node with the failure.
    Abort,
}

/// Configuration for the chat node.
#[derive(Debug, Clone)]
pub struct P2pConfig {
    /// Address to bind the listener to.
    pub listen_addr: SocketAddr,

    /// This node's slot in the peer directory (skipped when dialing).
    pub local_index: usize,

    /// Application protocol offered and accepted on streams.
    pub protocol_id: String,

    /// Retry budget for dialing and authenticating a session.
    pub connect_retry: RetryPolicy,

    /// Retry budget for negotiating the chat stream on a session.
    pub negotiate_retry: RetryPolicy,

    /// Timeout for a single TCP dial.
    pub dial_timeout: Duration,

    /// Timeout for the authentication handshake and each stream request.
    pub handshake_timeout: Duration,

    /// Writer throttle.
    pub pacing: WriterPacing,

    /// Unsupported stream requests answered before an inbound session is dropped.
    pub max_protocol_rejections: usize,

    /// Reaction to a peer that exhausts its retry budget.
    pub on_connect_failure: ConnectFailurePolicy,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3021)),
            local_index: 0,
            protocol_id: PROTOCOL_ID.to_string(),
            connect_retry: RetryPolicy::default(),
            negotiate_retry: RetryPolicy::default(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            pacing: WriterPacing::default(),
            max_protocol_rejections: DEFAULT_MAX_PROTOCOL_REJECTIONS,
            on_connect_failure: ConnectFailurePolicy::default(),
        }
    }
}

impl P2pConfig {
    /// Create a configuration for the node at `local_index` listening on `listen_addr`.
    pub fn new(listen_addr: SocketAddr, local_index: usize) -> Self {
        Self {
            listen_addr,
            local_index,
            ..Default::default()
        }
    }

    /// Set the retry policy for both dialing and stream negotiation.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.connect_retry = policy;
        self.negotiate_retry = policy;
        self
    }

    /// Set the retry policy for dialing.
    pub fn with_connect_retry(mut self, policy: RetryPolicy) -> Self {
        self.connect_retry = policy;
        self
    }

    /// Set the retry policy for stream negotiation.
    pub fn with_negotiate_retry(mut self, policy: RetryPolicy) -> Self {
        self.negotiate_retry = policy;
        self
    }

    /// Set the dial timeout.
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the writer throttle.
    pub fn with_pacing(mut self, pacing: WriterPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the application protocol identifier.
    pub fn with_protocol_id(mut self, protocol_id: impl Into<String>) -> Self {
        self.protocol_id = protocol_id.into();
        self
    }

    /// Set the connect failure policy.
    pub fn with_connect_failure_policy(mut self, policy: ConnectFailurePolicy) -> Self {
        self.on_connect_failure = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = P2pConfig::default();
        assert_eq!(config.protocol_id, PROTOCOL_ID);
        assert_eq!(config.connect_retry.attempts, DEFAULT_RETRY_ATTEMPTS);
        assert_eq!(config.connect_retry.interval, DEFAULT_RETRY_INTERVAL);
        assert_eq!(config.negotiate_retry, config.connect_retry);
        assert_eq!(config.pacing.burst, DEFAULT_WRITER_BURST);
        assert_eq!(config.pacing.pause, DEFAULT_WRITER_PAUSE);
        assert_eq!(config.on_connect_failure, ConnectFailurePolicy::Continue);
    }

    #[test]
    fn test_config_builder() {
        let fast = RetryPolicy::new(2, Duration::from_millis(10));
        let config = P2pConfig::new("127.0.0.1:9999".parse().unwrap(), 2)
            .with_retry(fast)
            .with_protocol_id("/chat/2.0.0")
            .with_connect_failure_policy(ConnectFailurePolicy::Abort);

        assert_eq!(config.listen_addr.port(), 9999);
        assert_eq!(config.local_index, 2);
        assert_eq!(config.connect_retry, fast);
        assert_eq!(config.negotiate_retry, fast);
        assert_eq!(config.protocol_id, "/chat/2.0.0");
        assert_eq!(config.on_connect_failure, ConnectFailurePolicy::Abort);
    }
}
