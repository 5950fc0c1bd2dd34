//! Console output and input for the chat loop.
//!
//! Received lines print in red followed by `<-----`; sent lines print in
//! green followed by `----->`.

use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use peerchat_core::EndpointId;
use peerchat_p2p::{InboxMessage, ListenAddr, PayloadFactory, PayloadSource, PeerInfo};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Console form of a received line.
pub fn format_received(message: &InboxMessage) -> String {
    format!("{}<-----", message.text().red())
}

/// Console form of a sent line.
pub fn format_sent(line: &str) -> String {
    format!("{} ----->", line.green())
}

/// Print a received line.
pub fn print_received(message: &InboxMessage) {
    println!("{}", format_received(message));
}

/// Print the startup banner.
pub fn print_banner(endpoint: EndpointId, listen: ListenAddr) {
    println!("{} {}", "NODE STARTED:".bold(), endpoint);
    println!("{} {}/p2p/{}", "MULTIADDR:".bold(), listen, endpoint);
}

/// Echoes every payload to the console as it is handed to the writer.
pub struct EchoPayload {
    inner: Box<dyn PayloadSource>,
}

#[async_trait]
impl PayloadSource for EchoPayload {
    async fn next_payload(&mut self) -> Option<String> {
        let line = self.inner.next_payload().await?;
        println!("{}", format_sent(&line));
        Some(line)
    }
}

/// Wraps another factory so each outbound stream echoes what it sends.
#[derive(Clone)]
pub struct EchoPayloadFactory {
    inner: Arc<dyn PayloadFactory>,
}

impl EchoPayloadFactory {
    /// Echo the payloads of `inner`.
    pub fn new(inner: Arc<dyn PayloadFactory>) -> Self {
        Self { inner }
    }
}

impl PayloadFactory for EchoPayloadFactory {
    fn payload_for(&self, peer: &PeerInfo) -> Box<dyn PayloadSource> {
        Box::new(EchoPayload {
            inner: self.inner.payload_for(peer),
        })
    }
}

/// Forward non-empty stdin lines to `tx` until stdin closes.
pub fn spawn_stdin_reader(tx: broadcast::Sender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim_end().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    // No subscribers until the first outbound stream opens.
                    if tx.send(line).is_err() {
                        tracing::debug!("No outbound streams, line dropped");
                    }
                }
                Ok(None) => {
                    tracing::info!("Stdin closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stdin read failed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerchat_p2p::{ConnectionDirection, CounterPayloadFactory, StreamSource};

    fn peer() -> PeerInfo {
        PeerInfo::new(
            EndpointId::from_bytes([0x33; 20]),
            "127.0.0.1:3022".parse().unwrap(),
            ConnectionDirection::Outbound,
            "/chat/1.0.0",
        )
    }

    #[test]
    fn test_received_line_marker() {
        let source = StreamSource {
            peer: EndpointId::from_bytes([0x44; 20]),
            direction: ConnectionDirection::Inbound,
        };
        let message = InboxMessage::new(source, "hello\n".to_string());

        let out = format_received(&message);
        assert!(out.contains("hello"));
        assert!(!out.contains('\n'));
        assert!(out.ends_with("<-----"));
    }

    #[test]
    fn test_sent_line_marker() {
        let out = format_sent("hi there");
        assert!(out.contains("hi there"));
        assert!(out.ends_with(" ----->"));
    }

    #[tokio::test]
    async fn test_echo_passes_payloads_through() {
        let id = EndpointId::from_bytes([0x55; 20]);
        let factory = EchoPayloadFactory::new(Arc::new(CounterPayloadFactory::new(id).with_limit(2)));
        let mut source = factory.payload_for(&peer());

        assert_eq!(source.next_payload().await, Some(format!("{}: round 1", id)));
        assert_eq!(source.next_payload().await, Some(format!("{}: round 2", id)));
        assert_eq!(source.next_payload().await, None);
    }
}
