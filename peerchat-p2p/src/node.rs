//! Chat node orchestrator.
//!
//! Owns the listener, dials every other peer in the directory once, and
//! starts a reader for every established stream plus a writer for every
//! outbound one. All received lines go to the injected inbox.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use peerchat_core::{EndpointId, NodeIdentity};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::{ConnectFailurePolicy, P2pConfig};
use crate::error::{P2pError, P2pResult};
use crate::inbox::InboxSender;
use crate::manager::{
    accept_chat_stream, ConnectionEstablisher, ConnectionSlots, InboundListener, StreamKey,
};
use crate::peer::{ConnectionDirection, PeerDescriptor, PeerDirectory};
use crate::stream::{
    run_reader, run_writer, ChatStream, CounterPayloadFactory, PayloadFactory, ReaderExit,
    WriterExit,
};
use crate::transport::TcpTransport;

/// State update sent from the node to external observers.
#[derive(Debug, Clone)]
pub struct NodeStateUpdate {
    /// Number of outbound streams.
    pub outbound_streams: usize,
    /// Number of inbound streams.
    pub inbound_streams: usize,
    /// Peers with an establishment attempt in flight.
    pub connecting: usize,
    /// Open streams.
    pub peers: Vec<PeerSnapshot>,
}

/// Snapshot of one open stream for external reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    /// Proven endpoint id.
    pub endpoint_id: EndpointId,
    /// Remote socket address.
    pub addr: SocketAddr,
    /// Connection direction.
    pub direction: ConnectionDirection,
}

/// Events from spawned tasks back to the run loop.
enum NodeEvent {
    StreamReady(ChatStream),
    ConnectFailed {
        index: usize,
        peer: Option<EndpointId>,
        error: P2pError,
    },
    ReaderFinished {
        key: StreamKey,
        exit: ReaderExit,
    },
    WriterFinished {
        key: StreamKey,
        exit: WriterExit,
    },
}

/// A running chat endpoint.
pub struct ChatNode {
    /// P2P configuration.
    config: Arc<P2pConfig>,
    /// This node's identity.
    identity: Arc<NodeIdentity>,
    /// Bound listener.
    listener: InboundListener,
    /// Outbound establisher shared by the dial tasks.
    establisher: Arc<ConnectionEstablisher<TcpTransport>>,
    /// Where readers deliver lines.
    inbox: InboxSender,
    /// Payloads for outbound writers.
    payloads: Arc<dyn PayloadFactory>,
    /// Attempt and stream bookkeeping.
    slots: ConnectionSlots,
    /// Stream halves still running, per stream.
    open_halves: HashMap<StreamKey, usize>,
    /// Shutdown signal receiver.
    shutdown_rx: Option<mpsc::Receiver<()>>,
    /// Shutdown signal sender (for cloning).
    shutdown_tx: mpsc::Sender<()>,
    /// Channel to send state updates to external observers.
    state_tx: Option<mpsc::Sender<NodeStateUpdate>>,
}

impl ChatNode {
    /// Bind the listener and prepare the node.
    ///
    /// Outbound writers send numbered rounds until replaced with
    /// [`ChatNode::with_payloads`].
    pub async fn bind(
        config: P2pConfig,
        identity: Arc<NodeIdentity>,
        inbox: InboxSender,
    ) -> P2pResult<Self> {
        let config = Arc::new(config);
        let listener = InboundListener::bind(&config).await?;
        let establisher = Arc::new(ConnectionEstablisher::new(TcpTransport::new(&config), &config));
        let payloads = Arc::new(CounterPayloadFactory::new(identity.endpoint_id()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tracing::info!(
            endpoint = %identity.endpoint_id(),
            index = config.local_index,
            "Chat node ready"
        );

        Ok(Self {
            config,
            identity,
            listener,
            establisher,
            inbox,
            payloads,
            slots: ConnectionSlots::new(),
            open_halves: HashMap::new(),
            shutdown_rx: Some(shutdown_rx),
            shutdown_tx,
            state_tx: None,
        })
    }

    /// Replace the payload source for outbound writers.
    pub fn with_payloads(mut self, payloads: Arc<dyn PayloadFactory>) -> Self {
        self.payloads = payloads;
        self
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> P2pResult<SocketAddr> {
        self.listener.local_addr()
    }

    /// This node's endpoint id.
    pub fn endpoint_id(&self) -> EndpointId {
        self.identity.endpoint_id()
    }

    /// Get the shutdown sender for external shutdown signals.
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Subscribe to connection state updates.
    pub fn state_updates_receiver(&mut self) -> mpsc::Receiver<NodeStateUpdate> {
        let (tx, rx) = mpsc::channel(64);
        self.state_tx = Some(tx);
        rx
    }

    /// Connect to every other peer in `directory` and serve until shutdown.
    ///
    /// Returns an error only when a peer fails under
    /// [`ConnectFailurePolicy::Abort`].
    pub async fn run(mut self, directory: &PeerDirectory) -> P2pResult<()> {
        let mut shutdown_rx = self.shutdown_rx.take().ok_or(P2pError::Shutdown)?;
        let (event_tx, mut event_rx) = mpsc::channel::<NodeEvent>(64);
        let mut tasks = JoinSet::new();

        for peer in directory.others(self.config.local_index) {
            self.dial(peer, &event_tx, &mut tasks);
        }
        self.send_state_update();

        let result = loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Chat node shutting down");
                    break Ok(());
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_inbound(stream, addr, &event_tx, &mut tasks),
                        Err(e) => tracing::warn!(error = %e, "Accept error"),
                    }
                }

                Some(event) = event_rx.recv() => {
                    if let Err(e) = self.handle_event(event, &event_tx, &mut tasks) {
                        break Err(e);
                    }
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Peer task panicked");
                        }
                    }
                }
            }
        };

        tracing::info!(count = tasks.len(), "Stopping peer tasks");
        tasks.shutdown().await;
        result
    }

    /// Spawn the establisher for one peer unless an attempt is already running.
    fn dial(
        &mut self,
        peer: &PeerDescriptor,
        event_tx: &mpsc::Sender<NodeEvent>,
        tasks: &mut JoinSet<()>,
    ) {
        // A malformed address still goes to the establisher, which reports it.
        let endpoint = peer.peer_addr().ok().map(|addr| addr.endpoint_id);
        if let Some(endpoint) = endpoint {
            if endpoint == self.identity.endpoint_id() {
                tracing::debug!(index = peer.index, "Skipping directory entry for this node");
                return;
            }
            if !self.slots.start_connecting(endpoint) {
                tracing::debug!(index = peer.index, peer = %endpoint, "Already connecting");
                return;
            }
        }

        let establisher = self.establisher.clone();
        let identity = self.identity.clone();
        let descriptor = peer.clone();
        let event_tx = event_tx.clone();
        tasks.spawn(async move {
            let event = match establisher.connect(&identity, &descriptor).await {
                Ok(stream) => NodeEvent::StreamReady(stream),
                Err(error) => NodeEvent::ConnectFailed {
                    index: descriptor.index,
                    peer: endpoint,
                    error,
                },
            };
            let _ = event_tx.send(event).await;
        });
    }

    fn spawn_inbound(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        event_tx: &mpsc::Sender<NodeEvent>,
        tasks: &mut JoinSet<()>,
    ) {
        let identity = self.identity.clone();
        let config = self.config.clone();
        let event_tx = event_tx.clone();
        tasks.spawn(async move {
            match accept_chat_stream(stream, addr, &identity, &config).await {
                Ok(stream) => {
                    let _ = event_tx.send(NodeEvent::StreamReady(stream)).await;
                }
                Err(e) => {
                    tracing::warn!(addr = %addr, error = %e, "Inbound stream setup failed");
                }
            }
        });
    }

    fn handle_event(
        &mut self,
        event: NodeEvent,
        event_tx: &mpsc::Sender<NodeEvent>,
        tasks: &mut JoinSet<()>,
    ) -> P2pResult<()> {
        match event {
            NodeEvent::StreamReady(stream) => self.start_stream(stream, event_tx, tasks),

            NodeEvent::ConnectFailed { index, peer, error } => {
                if let Some(peer) = peer {
                    self.slots.stop_connecting(&peer);
                }
                tracing::warn!(index, error = %error, "Could not reach peer");
                self.send_state_update();
                if self.config.on_connect_failure == ConnectFailurePolicy::Abort {
                    return Err(error);
                }
            }

            NodeEvent::ReaderFinished { key, exit } => {
                tracing::debug!(stream = key, exit = ?exit, "Reader finished");
                self.half_closed(key);
            }

            NodeEvent::WriterFinished { key, exit } => {
                tracing::debug!(stream = key, exit = ?exit, "Writer finished");
                self.half_closed(key);
            }
        }
        Ok(())
    }

    fn start_stream(
        &mut self,
        stream: ChatStream,
        event_tx: &mpsc::Sender<NodeEvent>,
        tasks: &mut JoinSet<()>,
    ) {
        let source = stream.source();
        let (info, reader, writer) = stream.into_parts();
        let key = self.slots.add_stream(info.clone());

        tracing::info!(
            peer = %info.endpoint_id,
            addr = %info.addr,
            direction = %info.direction,
            "Stream open"
        );

        let inbox = self.inbox.clone();
        let tx = event_tx.clone();
        if info.is_outbound() {
            tasks.spawn(async move {
                let exit = run_reader(source, reader, inbox).await;
                let _ = tx.send(NodeEvent::ReaderFinished { key, exit }).await;
            });

            let payload = self.payloads.payload_for(&info);
            let pacing = self.config.pacing;
            let tx = event_tx.clone();
            tasks.spawn(async move {
                let exit = run_writer(info.endpoint_id, writer, payload, pacing).await;
                let _ = tx.send(NodeEvent::WriterFinished { key, exit }).await;
            });
            self.open_halves.insert(key, 2);
        } else {
            tasks.spawn(async move {
                // Dropping the write half would half-close the connection.
                let _writer = writer;
                let exit = run_reader(source, reader, inbox).await;
                let _ = tx.send(NodeEvent::ReaderFinished { key, exit }).await;
            });
            self.open_halves.insert(key, 1);
        }

        self.send_state_update();
    }

    fn half_closed(&mut self, key: StreamKey) {
        let remaining = match self.open_halves.get_mut(&key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining > 0 {
            return;
        }

        self.open_halves.remove(&key);
        if let Some(info) = self.slots.remove_stream(key) {
            tracing::info!(
                peer = %info.endpoint_id,
                direction = %info.direction,
                duration = ?info.connection_duration(),
                "Stream closed"
            );
        }
        self.send_state_update();
    }

    /// Send a state update to external observers if a channel is configured.
    fn send_state_update(&self) {
        if let Some(ref tx) = self.state_tx {
            let peers = self
                .slots
                .iter()
                .map(|info| PeerSnapshot {
                    endpoint_id: info.endpoint_id,
                    addr: info.addr,
                    direction: info.direction,
                })
                .collect();

            let update = NodeStateUpdate {
                outbound_streams: self.slots.outbound_count(),
                inbound_streams: self.slots.inbound_count(),
                connecting: self.slots.connecting_count(),
                peers,
            };

            // Skipped if the observer is slow or gone.
            let _ = tx.try_send(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbox::Inbox;
    use peerchat_core::IdentitySelector;
    use std::time::Duration;

    fn identity(index: usize) -> Arc<NodeIdentity> {
        Arc::new(NodeIdentity::select(IdentitySelector::Provisioned(index)).unwrap())
    }

    #[tokio::test]
    async fn test_binds_ephemeral_port() {
        let (tx, _inbox) = Inbox::new(4);
        let config = P2pConfig::new("127.0.0.1:0".parse().unwrap(), 0);
        let node = ChatNode::bind(config, identity(0), tx).await.unwrap();

        assert_ne!(node.local_addr().unwrap().port(), 0);
        assert_eq!(node.endpoint_id(), identity(0).endpoint_id());
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_node() {
        let (tx, _inbox) = Inbox::new(4);
        let config = P2pConfig::new("127.0.0.1:0".parse().unwrap(), 0);
        let node = ChatNode::bind(config, identity(0), tx).await.unwrap();
        let shutdown = node.shutdown_handle();

        // A directory holding only this node dials nobody.
        let directory = PeerDirectory::new(["/ip4/127.0.0.1/tcp/1/p2p/00".to_string()]);
        let handle = tokio::spawn(async move { node.run(&directory).await });

        shutdown.send(()).await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap();
        assert!(result.unwrap().is_ok());
    }
}
