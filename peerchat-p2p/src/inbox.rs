//! Inbox multiplexer.
//!
//! Every reader holds an [`InboxSender`]; the application owns the single
//! [`Inbox`] and drains it. Lines from one stream keep their order; lines
//! from different streams interleave in arrival order.

use peerchat_core::EndpointId;
use tokio::sync::mpsc;

use crate::error::{P2pError, P2pResult};
use crate::peer::ConnectionDirection;

/// Stream a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamSource {
    /// Authenticated peer.
    pub peer: EndpointId,
    /// Which side opened the stream.
    pub direction: ConnectionDirection,
}

/// One line received from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    /// The line as read, including its trailing newline.
    pub line: String,
    /// Where it came from.
    pub source: StreamSource,
}

impl InboxMessage {
    /// Create a message.
    pub fn new(source: StreamSource, line: String) -> Self {
        Self { line, source }
    }

    /// The line without its line terminator.
    pub fn text(&self) -> &str {
        self.line.trim_end_matches(|c| c == '\n' || c == '\r')
    }
}

/// Producer handle, cloned into every reader.
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: mpsc::Sender<InboxMessage>,
}

impl InboxSender {
    /// Enqueue a message, waiting while the inbox is full.
    pub async fn push(&self, message: InboxMessage) -> P2pResult<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| P2pError::ChannelSend("inbox closed".to_string()))
    }

    /// Check if the consumer is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the multiplexer.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<InboxMessage>,
}

impl Inbox {
    /// Create an inbox holding at most `capacity` undelivered messages.
    pub fn new(capacity: usize) -> (InboxSender, Inbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (InboxSender { tx }, Inbox { rx })
    }

    /// Next message in arrival order; `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<InboxMessage> {
        self.rx.recv().await
    }

    /// Close the inbox; pending pushes fail.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
