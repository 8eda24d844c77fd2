//! The streaming pipeline: bytes in, sanitized document out.
//!
//! Idle → Streaming → per-line {Emit | PendingRejoin} → Draining →
//! Sanitizing → Done, with transport failures and idle expiry as the
//! terminal error paths. One pipeline instance per run; nothing here is
//! shared across runs.

use std::time::Duration;

use futures_util::StreamExt;
use tracing::{debug, trace, warn};

use crate::decoder::{Frame, decode_frame};
use crate::error::{CoreResult, OrganizerError};
use crate::http_client::ByteStream;
use crate::ingest::{LineBuffer, Utf8Decoder};
use crate::sanitize::strip_fences;

/// Drains `stream` through the decoder, invoking `on_partial` with the full
/// accumulated content after every appended delta, and returns the sanitized
/// final document.
///
/// `idle_timeout` bounds the wait for each transport read; expiry yields
/// `Timeout`. Content already published through `on_partial` stays with the
/// caller even when the run ends in an error.
pub async fn collect_stream<F>(
    mut stream: ByteStream,
    idle_timeout: Option<Duration>,
    on_partial: &mut F,
) -> CoreResult<String>
where
    F: FnMut(&str),
{
    let mut utf8 = Utf8Decoder::new();
    let mut lines = LineBuffer::new();
    let mut content = String::new();

    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                Ok(item) => item,
                Err(_) => {
                    // round sub-second limits up so the message never reads "0s"
                    return Err(OrganizerError::Timeout {
                        seconds: limit.as_secs().max(1),
                    });
                }
            },
            None => stream.next().await,
        };
        let Some(item) = next else { break };
        let chunk = item?;
        lines.extend(&utf8.decode(&chunk));

        while let Some(line) = lines.next_line() {
            match decode_frame(&line) {
                Frame::Delta(delta) => {
                    content.push_str(&delta);
                    on_partial(&content);
                }
                Frame::Done => {
                    trace!("sentinel frame, ending this batch");
                    break;
                }
                Frame::Ignored => {}
                Frame::Incomplete => {
                    // Truncated payload; rejoin it with whatever arrives next.
                    trace!(len = line.len(), "requeueing unparsed frame");
                    lines.requeue(line);
                    break;
                }
            }
        }
    }

    // End-of-stream drain: one last attempt at anything still buffered.
    // Frames that still fail to parse have no remainder coming and are
    // dropped rather than treated as corruption.
    lines.extend(&utf8.flush());
    for line in lines.drain_remaining() {
        match decode_frame(&line) {
            Frame::Delta(delta) => {
                content.push_str(&delta);
                on_partial(&content);
            }
            Frame::Incomplete => {
                warn!(len = line.len(), "dropping unparseable trailing frame");
            }
            Frame::Done | Frame::Ignored => {}
        }
    }

    debug!(chars = content.len(), "stream drained");
    Ok(strip_fences(&content))
}
