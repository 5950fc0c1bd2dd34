//! Node orchestrator.
//!
//! Wires the identity, the chat node and the console loop together.

use std::future::Future;
use std::io;
use std::sync::Arc;

use anyhow::Context;
use peerchat_core::{IdentitySelector, NodeIdentity};
use peerchat_p2p::{
    BroadcastPayloadFactory, ChatNode, CounterPayloadFactory, Inbox, ListenAddr, PayloadFactory,
    DEFAULT_INBOX_CAPACITY, PROTOCOL_ID,
};
use tokio::sync::broadcast;

use crate::config::NodeConfig;
use crate::console::{self, EchoPayloadFactory};
use crate::shutdown::wait_for_shutdown_signal;

/// Lines buffered for stdin-fed writers.
const STDIN_BUFFER: usize = 256;

/// The main node structure.
pub struct Node {
    /// Node configuration.
    config: NodeConfig,

    /// Provisioned identity for the configured index.
    identity: Arc<NodeIdentity>,
}

impl Node {
    /// Create a node with the provisioned identity for its index.
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let identity = NodeIdentity::select(IdentitySelector::Provisioned(config.index))
            .with_context(|| format!("no identity for node index {}", config.index))?;

        Ok(Self {
            config,
            identity: Arc::new(identity),
        })
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Run until `shutdown` resolves or the chat node stops on its own.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = io::Result<()>>,
    {
        let endpoint = self.identity.endpoint_id();
        tracing::info!("Starting chat node...");
        tracing::info!("  Index: {}", self.config.index);
        tracing::info!("  Endpoint: {}", endpoint);
        tracing::info!("  Protocol: {}", PROTOCOL_ID);
        tracing::info!("  Input: {}", if self.config.stdin { "stdin" } else { "rounds" });

        let (inbox_tx, mut inbox) = Inbox::new(DEFAULT_INBOX_CAPACITY);

        let payloads: Arc<dyn PayloadFactory> = if self.config.stdin {
            let (tx, _) = broadcast::channel(STDIN_BUFFER);
            console::spawn_stdin_reader(tx.clone());
            Arc::new(BroadcastPayloadFactory::new(tx))
        } else {
            Arc::new(CounterPayloadFactory::new(endpoint))
        };

        let mut chat = ChatNode::bind(self.config.p2p_config(), self.identity.clone(), inbox_tx)
            .await
            .context("failed to start chat node")?
            .with_payloads(Arc::new(EchoPayloadFactory::new(payloads)));

        let local = chat.local_addr()?;
        console::print_banner(endpoint, ListenAddr(local));

        let mut updates = chat.state_updates_receiver();
        let stop = chat.shutdown_handle();
        let directory = self.config.directory.clone();
        let mut handle = tokio::spawn(async move { chat.run(&directory).await });

        tokio::pin!(shutdown);
        let mut signal = Ok(());

        let finished = loop {
            tokio::select! {
                Some(message) = inbox.recv() => console::print_received(&message),

                Some(update) = updates.recv() => {
                    tracing::info!(
                        outbound = update.outbound_streams,
                        inbound = update.inbound_streams,
                        connecting = update.connecting,
                        "Connections changed"
                    );
                }

                result = &mut shutdown => {
                    signal = result;
                    break None;
                }

                joined = &mut handle => break Some(joined),
            }
        };

        let joined = match finished {
            Some(joined) => joined,
            None => {
                tracing::info!("Shutting down node...");
                let _ = stop.send(()).await;
                handle.await
            }
        };

        signal.context("failed to install signal handlers")?;
        joined
            .context("chat node task failed")?
            .context("chat node stopped")?;

        tracing::info!("Node shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerchat_p2p::PeerDirectory;
    use std::time::Duration;

    fn config(index: usize) -> NodeConfig {
        NodeConfig {
            index,
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            // Only this node's own entry, so nothing is dialed.
            directory: PeerDirectory::new([PeerDirectory::builtin()
                .peer_at(index)
                .unwrap()
                .address
                .clone()]),
            stdin: false,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_unknown_identity_index() {
        assert!(Node::new(config(0)).is_ok());

        let mut bad = config(0);
        bad.index = 9;
        assert!(Node::new(bad).is_err());
    }

    #[tokio::test]
    async fn test_stops_on_shutdown_future() {
        let node = Node::new(config(0)).unwrap();
        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        };

        let result = tokio::time::timeout(Duration::from_secs(5), node.run_until(shutdown)).await;
        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_signal_failure_is_reported() {
        let node = Node::new(config(0)).unwrap();
        let shutdown = async { Err(io::Error::new(io::ErrorKind::Other, "no signals")) };

        let result = tokio::time::timeout(Duration::from_secs(5), node.run_until(shutdown)).await;
        assert!(result.unwrap().is_err());
    }
}
