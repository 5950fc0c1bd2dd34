//! Acceptance tests for the node binary's library.
//!
//! A full `Node` runs against a bare `ChatNode` peer and must deliver its
//! numbered rounds, then stop cleanly when its shutdown future resolves.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;

use peerchat_core::{IdentitySelector, NodeIdentity};
use peerchat_node::config::NodeConfig;
use peerchat_node::node::Node;
use peerchat_p2p::{ChatNode, Inbox, P2pConfig, PeerDirectory};

const TEST_TIMEOUT: Duration = Duration::from_secs(15);

fn identity(index: usize) -> Arc<NodeIdentity> {
    Arc::new(NodeIdentity::select(IdentitySelector::Provisioned(index)).unwrap())
}

#[tokio::test]
async fn test_node_sends_rounds_to_peer() {
    // Bare peer at index 1 that only listens.
    let (peer_tx, mut peer_inbox) = Inbox::new(64);
    let peer = ChatNode::bind(
        P2pConfig::new("127.0.0.1:0".parse().unwrap(), 1),
        identity(1),
        peer_tx,
    )
    .await
    .unwrap();
    let peer_addr = format!(
        "/ip4/127.0.0.1/tcp/{}/p2p/{}",
        peer.local_addr().unwrap().port(),
        identity(1).endpoint_id()
    );
    let peer_stop = peer.shutdown_handle();
    let peer_directory = PeerDirectory::new([peer_addr.clone()]);
    let peer_handle = tokio::spawn(async move { peer.run(&peer_directory).await });

    // The node's own entry is never dialed; it listens on an ephemeral port.
    let own = format!("/ip4/127.0.0.1/tcp/1/p2p/{}", identity(0).endpoint_id());
    let config = NodeConfig {
        index: 0,
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        directory: PeerDirectory::new([own, peer_addr]),
        stdin: false,
        log_level: "info".to_string(),
    };
    let node = Node::new(config).unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let node_handle = tokio::spawn(node.run_until(async move {
        let _ = stop_rx.await;
        Ok(())
    }));

    for round in 1..=3 {
        let message = timeout(TEST_TIMEOUT, peer_inbox.recv()).await.unwrap().unwrap();
        assert_eq!(
            message.text(),
            format!("{}: round {}", identity(0).endpoint_id(), round)
        );
        assert_eq!(message.source.peer, identity(0).endpoint_id());
    }

    stop_tx.send(()).unwrap();
    let result = timeout(TEST_TIMEOUT, node_handle).await.unwrap().unwrap();
    assert!(result.is_ok());

    peer_stop.send(()).await.unwrap();
    assert!(peer_handle.await.unwrap().is_ok());
}
