//! Connection management.
//!
//! Establishes outbound streams with retry, accepts inbound streams, and
//! tracks which peers have an attempt or stream in flight.

pub mod inbound;
pub mod outbound;
pub mod retry;
pub mod slots;

pub use inbound::{accept_chat_stream, InboundListener};
pub use outbound::ConnectionEstablisher;
pub use retry::{retry, Attempts, RetryExhausted, RetryPolicy};
pub use slots::{ConnectionSlots, StreamKey};
