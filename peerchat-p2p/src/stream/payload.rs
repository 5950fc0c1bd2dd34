//! Payload sources feeding stream writers.

use async_trait::async_trait;
use peerchat_core::EndpointId;
use tokio::sync::broadcast;

use crate::peer::PeerInfo;

/// Produces the lines a writer sends.
#[async_trait]
pub trait PayloadSource: Send {
    /// Next line to send, without its newline; `None` ends the writer.
    async fn next_payload(&mut self) -> Option<String>;
}

/// Creates one payload source per outbound stream.
pub trait PayloadFactory: Send + Sync {
    /// Source for the stream to `peer`.
    fn payload_for(&self, peer: &PeerInfo) -> Box<dyn PayloadSource>;
}

impl<F> PayloadFactory for F
where
    F: Fn(&PeerInfo) -> Box<dyn PayloadSource> + Send + Sync,
{
    fn payload_for(&self, peer: &PeerInfo) -> Box<dyn PayloadSource> {
        self(peer)
    }
}

/// Synthetic `"<endpoint id>: round <n>"` lines, counting from 1.
#[derive(Debug, Clone)]
pub struct CounterPayload {
    sender: EndpointId,
    round: u64,
    limit: Option<u64>,
}

impl CounterPayload {
    /// Unbounded counter signed with `sender`.
    pub fn new(sender: EndpointId) -> Self {
        Self {
            sender,
            round: 0,
            limit: None,
        }
    }

    /// Stop after `rounds` lines.
    pub fn with_limit(mut self, rounds: u64) -> Self {
        self.limit = Some(rounds);
        self
    }
}

#[async_trait]
impl PayloadSource for CounterPayload {
    async fn next_payload(&mut self) -> Option<String> {
        if self.limit.is_some_and(|limit| self.round >= limit) {
            return None;
        }
        self.round += 1;
        Some(format!("{}: round {}", self.sender, self.round))
    }
}

/// Gives every outbound stream its own [`CounterPayload`].
#[derive(Debug, Clone)]
pub struct CounterPayloadFactory {
    sender: EndpointId,
    limit: Option<u64>,
}

impl CounterPayloadFactory {
    /// Unbounded counters signed with `sender`.
    pub fn new(sender: EndpointId) -> Self {
        Self { sender, limit: None }
    }

    /// Each counter stops after `rounds` lines.
    pub fn with_limit(mut self, rounds: u64) -> Self {
        self.limit = Some(rounds);
        self
    }
}

impl PayloadFactory for CounterPayloadFactory {
    fn payload_for(&self, _peer: &PeerInfo) -> Box<dyn PayloadSource> {
        let counter = CounterPayload::new(self.sender);
        match self.limit {
            Some(limit) => Box::new(counter.with_limit(limit)),
            None => Box::new(counter),
        }
    }
}

/// Lines published on a broadcast channel.
#[derive(Debug)]
pub struct BroadcastPayload {
    rx: broadcast::Receiver<String>,
}

impl BroadcastPayload {
    /// Drain `rx`.
    pub fn new(rx: broadcast::Receiver<String>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl PayloadSource for BroadcastPayload {
    async fn next_payload(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(line) => return Some(line),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Writer fell behind, dropped lines");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Subscribes every outbound stream to one broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastPayloadFactory {
    tx: broadcast::Sender<String>,
}

impl BroadcastPayloadFactory {
    /// Fan lines sent on `tx` out to every outbound stream.
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl PayloadFactory for BroadcastPayloadFactory {
    fn payload_for(&self, _peer: &PeerInfo) -> Box<dyn PayloadSource> {
        Box::new(BroadcastPayload::new(self.tx.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counter_rounds_start_at_one() {
        let id = EndpointId::from_bytes([0x11; 20]);
        let mut counter = CounterPayload::new(id).with_limit(2);

        assert_eq!(counter.next_payload().await.unwrap(), format!("{}: round 1", id));
        assert_eq!(counter.next_payload().await.unwrap(), format!("{}: round 2", id));
        assert!(counter.next_payload().await.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_ends_when_sender_dropped() {
        let (tx, _) = broadcast::channel(4);
        let factory = BroadcastPayloadFactory::new(tx.clone());
        let peer = PeerInfo::new(
            EndpointId::from_bytes([0x22; 20]),
            "127.0.0.1:1".parse().unwrap(),
            crate::peer::ConnectionDirection::Outbound,
            "/chat/1.0.0",
        );
        let mut source = factory.payload_for(&peer);

        tx.send("hi".to_string()).unwrap();
        drop(factory);
        drop(tx);

        assert_eq!(source.next_payload().await.as_deref(), Some("hi"));
        assert!(source.next_payload().await.is_none());
    }
}
