//! Node configuration.

use std::net::SocketAddr;

use peerchat_p2p::{ListenAddr, P2pConfig, P2pResult, PeerDirectory};

use crate::cli::Cli;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// This node's index in the directory and identity table.
    pub index: usize,

    /// P2P listen address.
    pub listen_addr: SocketAddr,

    /// Peers to connect to.
    pub directory: PeerDirectory,

    /// Feed stdin to outbound streams instead of numbered rounds.
    pub stdin: bool,

    /// Log level.
    pub log_level: String,
}

impl NodeConfig {
    /// Create a node configuration from CLI arguments.
    ///
    /// Without `-p` the node listens on the port of its own directory entry.
    /// Fails if the index has no directory entry.
    pub fn from_cli(cli: &Cli, directory: &PeerDirectory) -> P2pResult<Self> {
        let own = directory.peer_at(cli.index)?.peer_addr()?;
        let port = cli.port.unwrap_or(own.socket.port());
        let listen: ListenAddr = format!("/ip4/0.0.0.0/tcp/{}", port).parse()?;

        Ok(Self {
            index: cli.index,
            listen_addr: listen.socket(),
            directory: directory.clone(),
            stdin: cli.stdin,
            log_level: cli.log_level.clone(),
        })
    }

    /// Build P2P configuration from node config.
    pub fn p2p_config(&self) -> P2pConfig {
        P2pConfig::new(self.listen_addr, self.index)
    }
}
