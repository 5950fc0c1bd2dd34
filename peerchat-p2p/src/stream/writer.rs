//! Stream writer task.

use std::io;
use std::time::Duration;

use peerchat_core::EndpointId;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::config::{DEFAULT_WRITER_BURST, DEFAULT_WRITER_PAUSE};
use crate::stream::PayloadSource;

/// Writer throttle: after every `burst` messages, sleep `pause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterPacing {
    /// Messages per burst; zero disables pausing.
    pub burst: usize,
    /// Pause after each burst.
    pub pause: Duration,
}

impl Default for WriterPacing {
    fn default() -> Self {
        Self {
            burst: DEFAULT_WRITER_BURST,
            pause: DEFAULT_WRITER_PAUSE,
        }
    }
}

/// Why a writer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// The payload source has nothing more to send.
    SourceExhausted { sent: u64 },
    /// Writing or flushing failed; the stream is dead.
    WriteError { sent: u64, kind: io::ErrorKind },
}

/// Send every payload from `source` to `writer`, one line at a time.
///
/// Each payload is written with a single trailing newline and flushed before
/// the next one is pulled.
pub async fn run_writer<W>(
    peer: EndpointId,
    writer: W,
    mut source: Box<dyn PayloadSource>,
    pacing: WriterPacing,
) -> WriterExit
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);
    let mut sent: u64 = 0;

    while let Some(payload) = source.next_payload().await {
        if let Err(e) = write_line(&mut writer, &payload).await {
            tracing::debug!(peer = %peer, sent, error = %e, "Stream write failed");
            return WriterExit::WriteError {
                sent,
                kind: e.kind(),
            };
        }
        sent += 1;
        tracing::trace!(peer = %peer, sent, "Line sent");

        if pacing.burst > 0 && sent % pacing.burst as u64 == 0 {
            tokio::time::sleep(pacing.pause).await;
        }
    }

    tracing::debug!(peer = %peer, sent, "Payload source exhausted");
    WriterExit::SourceExhausted { sent }
}

async fn write_line<W>(writer: &mut BufWriter<W>, payload: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(payload.trim_end_matches('\n').as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
