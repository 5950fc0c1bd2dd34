//! Chat streams and the tasks that drive them.
//!
//! A [`ChatStream`] is split into an independent read half and write half
//! as soon as it is established; the reader feeds the inbox and the writer
//! (outbound streams only) drains a payload source.

pub mod payload;
pub mod reader;
pub mod writer;

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::inbox::StreamSource;
use crate::peer::PeerInfo;

pub use payload::{
    BroadcastPayload, BroadcastPayloadFactory, CounterPayload, CounterPayloadFactory,
    PayloadFactory, PayloadSource,
};
pub use reader::{run_reader, ReaderExit};
pub use writer::{run_writer, WriterExit, WriterPacing};

/// Read half of a chat stream.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of a chat stream.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An established, authenticated chat stream.
pub struct ChatStream {
    info: PeerInfo,
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl ChatStream {
    /// Assemble a stream from its halves.
    pub fn new(info: PeerInfo, reader: BoxedReader, writer: BoxedWriter) -> Self {
        Self { info, reader, writer }
    }

    /// Metadata about the remote peer.
    pub fn info(&self) -> &PeerInfo {
        &self.info
    }

    /// Inbox source tag for lines read from this stream.
    pub fn source(&self) -> StreamSource {
        StreamSource {
            peer: self.info.endpoint_id,
            direction: self.info.direction,
        }
    }

    /// Split into metadata, read half and write half.
    pub fn into_parts(self) -> (PeerInfo, BoxedReader, BoxedWriter) {
        (self.info, self.reader, self.writer)
    }
}

impl fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatStream")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
