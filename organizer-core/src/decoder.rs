//! Frame classification for the chat-completion event stream.
//!
//! One line in, one `Frame` out. The decoder itself is stateless; the rejoin
//! state for truncated payloads lives in the line buffer, which the pipeline
//! threads through (see `pipeline::collect_stream`).

use serde_json::Value;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Classification of one event-stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A content delta extracted from `choices[0].delta.content`.
    Delta(String),
    /// The `[DONE]` sentinel; ends the current batch, not the transport.
    Done,
    /// Blank line, comment/heartbeat, unrecognized field, or a well-formed
    /// payload that simply carries no content. Contributes nothing.
    Ignored,
    /// The payload is not valid JSON, presumably truncated mid-chunk. The
    /// caller should requeue the line and wait for more bytes.
    Incomplete,
}

pub fn decode_frame(line: &str) -> Frame {
    if line.trim().is_empty() {
        return Frame::Ignored;
    }
    if line.starts_with(':') {
        return Frame::Ignored;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        // unknown field; skip for forward compatibility
        return Frame::Ignored;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(v) => match v.pointer("/choices/0/delta/content").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => Frame::Delta(text.to_owned()),
            _ => Frame::Ignored,
        },
        Err(_) => Frame::Incomplete,
    }
}
