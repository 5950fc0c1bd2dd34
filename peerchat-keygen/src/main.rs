//! Peerchat key generation tool.
//!
//! Generates Ed25519 node identities in the text encoding the node loads.
//!
//! # Usage
//!
//! ```bash
//! # Generate an identity (human-readable output)
//! peerchat-keygen
//!
//! # Generate an identity (JSON output)
//! peerchat-keygen --json
//!
//! # Show one of the built-in identities
//! peerchat-keygen --provisioned 1
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use peerchat_core::crypto::verify;
use peerchat_core::{encode_secret_key, IdentitySelector, NodeIdentity};
use serde::Serialize;

/// Message signed by `--verify`.
const VERIFY_MESSAGE: &[u8] = b"peerchat identity verification";

/// Peerchat key generation tool.
#[derive(Parser, Debug)]
#[command(name = "peerchat-keygen")]
#[command(about = "Generate Ed25519 identities for peerchat nodes")]
#[command(version)]
struct Cli {
    /// Output in JSON format for machine parsing.
    #[arg(long)]
    json: bool,

    /// Verify the identity by signing a test message and reloading the encoded key.
    #[arg(long)]
    verify: bool,

    /// Print the built-in identity at this index instead of generating one.
    #[arg(long, value_name = "INDEX")]
    provisioned: Option<usize>,
}

/// JSON output format.
#[derive(Serialize, Debug)]
struct IdentityJson {
    /// Private key as base64 of its hex form.
    private_key: String,
    /// Public key in hex format (64 characters).
    public_key: String,
    /// Endpoint id (40 hex characters).
    endpoint_id: String,
}

impl IdentityJson {
    fn new(identity: &NodeIdentity) -> Self {
        Self {
            private_key: encode_secret_key(identity.secret_bytes()),
            public_key: hex::encode(identity.public_key().as_bytes()),
            endpoint_id: identity.endpoint_id().to_string(),
        }
    }
}

/// Sign and verify a test message, then check the encoded key reloads to
/// the same endpoint.
fn verify_identity(identity: &NodeIdentity) -> anyhow::Result<()> {
    let signature = identity.sign(VERIFY_MESSAGE);
    verify(&identity.public_key(), VERIFY_MESSAGE, &signature)
        .context("generated identity failed signature verification")?;

    let reloaded = NodeIdentity::from_encoded(&encode_secret_key(identity.secret_bytes()))
        .context("encoded key does not load")?;
    if reloaded.endpoint_id() != identity.endpoint_id() {
        bail!("encoded key reloads to a different endpoint");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let selector = match cli.provisioned {
        Some(index) => IdentitySelector::Provisioned(index),
        None => IdentitySelector::Generate,
    };
    let identity = NodeIdentity::select(selector)?;

    if cli.verify {
        verify_identity(&identity)?;
    }

    let output = IdentityJson::new(&identity);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("=== Peerchat Identity ===");
        println!();
        println!("Private Key: {}", output.private_key);
        println!("Public Key:  {}", output.public_key);
        println!("Endpoint:    {}", output.endpoint_id);
        println!();
        println!("Peer address: /ip4/<ip>/tcp/<port>/p2p/{}", output.endpoint_id);
        println!();
        println!("IMPORTANT: Store your private key securely!");
        println!("           Anyone with this key can impersonate this node.");
    }

    Ok(())
}
