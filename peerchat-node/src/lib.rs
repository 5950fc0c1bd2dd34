//! Peer-to-peer chat node library.
//!
//! This library provides the components behind the `peerchat-node` binary:
//! argument parsing, configuration, the console loop and shutdown handling.
//! It is also used for testing and embedding.

pub mod cli;
pub mod config;
pub mod console;
pub mod node;
pub mod shutdown;
