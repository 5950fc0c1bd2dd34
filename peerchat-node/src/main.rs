//! Peer-to-peer chat node binary.
//!
//! Runs one node of the static peer table: connects to every other node,
//! sends them messages and prints everything it receives.

use peerchat_node::cli::Cli;
use peerchat_node::config::NodeConfig;
use peerchat_node::node::Node;
use peerchat_p2p::PeerDirectory;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Peerchat Node v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration
    let config = NodeConfig::from_cli(&cli, PeerDirectory::builtin())?;

    // Create and run node
    let node = Node::new(config)?;
    node.run().await?;

    Ok(())
}
