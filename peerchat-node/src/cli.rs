//! Command-line argument parsing.

use clap::Parser;

/// Peer-to-peer chat node.
#[derive(Parser, Debug, Clone)]
#[command(name = "peerchat-node")]
#[command(about = "Chat with the other nodes of a static peer table")]
#[command(version)]
pub struct Cli {
    /// Node index to run (selects the identity and directory entry).
    #[arg(short = 'i', long = "index", default_value_t = 0)]
    pub index: usize,

    /// Port to listen on; defaults to the port of this node's directory entry.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Send lines typed on stdin instead of numbered rounds.
    #[arg(long)]
    pub stdin: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::parse_from(["peerchat-node"]);
        assert_eq!(cli.index, 0);
        assert_eq!(cli.port, None);
        assert_eq!(cli.log_level, "info");
        assert!(!cli.stdin);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from(["peerchat-node", "-i", "2", "-p", "4000"]);
        assert_eq!(cli.index, 2);
        assert_eq!(cli.port, Some(4000));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["peerchat-node", "-p", "70000"]).is_err());
        assert!(Cli::try_parse_from(["peerchat-node", "-i", "-1"]).is_err());
    }
}
