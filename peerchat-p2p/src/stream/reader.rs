//! Stream reader task.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::inbox::{InboxMessage, InboxSender, StreamSource};

/// Why a reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// The peer closed its side of the stream.
    EndOfStream,
    /// Reading failed; the stream is dead.
    ReadError(io::ErrorKind),
    /// The application dropped the inbox.
    InboxClosed,
}

/// Forward newline-terminated lines from `reader` into the inbox.
///
/// Lines keep their trailing newline. Empty reads and bare `"\n"` lines are
/// skipped. Never retries: the first end-of-stream or read error ends the
/// task.
pub async fn run_reader<R>(source: StreamSource, reader: R, inbox: InboxSender) -> ReaderExit
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut forwarded: u64 = 0;

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                tracing::debug!(peer = %source.peer, direction = %source.direction, forwarded, "Stream ended");
                return ReaderExit::EndOfStream;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(peer = %source.peer, direction = %source.direction, error = %e, "Stream read failed");
                return ReaderExit::ReadError(e.kind());
            }
        }

        if line.is_empty() || line == "\n" {
            continue;
        }

        let message = InboxMessage::new(source, std::mem::take(&mut line));
        if inbox.push(message).await.is_err() {
            tracing::debug!(peer = %source.peer, "Inbox closed, reader exiting");
            return ReaderExit::InboxClosed;
        }
        forwarded += 1;
    }
}
