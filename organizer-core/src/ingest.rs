//! Byte-to-line ingestion for the event stream.
//!
//! Contract:
//! - Lines come out in delivery order, each exactly once, never before the
//!   terminating `\n` has arrived (except the end-of-stream flush).
//! - A multi-byte character split across two chunks decodes correctly; the
//!   undecoded tail is carried between `decode` calls, not substituted.

/// Incremental UTF-8 decoder. A chunk boundary may fall inside a multi-byte
/// sequence; the incomplete tail is held until the next call. Truly invalid
/// bytes become U+FFFD, matching lossy decoding on a whole buffer.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(chunk);

        let mut out = String::with_capacity(data.len());
        let mut rest: &[u8] = &data;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            out.push('\u{FFFD}');
                            rest = &rest[valid + bad..];
                        }
                        None => {
                            // incomplete sequence at the end; wait for more bytes
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }
        self.pending = rest.to_vec();
        out
    }

    /// Decode whatever is still held, lossily. The transport is done, so an
    /// incomplete sequence can no longer be completed.
    pub fn flush(&mut self) -> String {
        let tail = std::mem::take(&mut self.pending);
        if tail.is_empty() {
            String::new()
        } else {
            String::from_utf8_lossy(&tail).into_owned()
        }
    }
}

/// Accumulates decoded text and pops complete lines. The pipeline can push a
/// line back (`requeue`) when its payload turned out to be truncated, so it
/// rejoins the buffer ahead of whatever arrives next.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Pops the next complete line, without its `\n` and with a single
    /// trailing `\r` trimmed. Returns `None` while the buffer holds only a
    /// partial line.
    pub fn next_line(&mut self) -> Option<String> {
        let idx = self.buf.find('\n')?;
        let mut line: String = self.buf.drain(..=idx).collect();
        line.pop(); // the '\n'
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Puts a line back at the front, newline restored, so the next
    /// `next_line` retries it once more data has been appended.
    pub fn requeue(&mut self, line: String) {
        let mut restored = line;
        restored.push('\n');
        restored.push_str(&self.buf);
        self.buf = restored;
    }

    /// End-of-stream drain: every remaining line, including a final
    /// pseudo-line that never got its `\n`. Empties the buffer.
    pub fn drain_remaining(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buf);
        rest.split('\n')
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw.strip_suffix('\r').unwrap_or(raw).to_string())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_whole_chunks() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(b"hello"), "hello");
        assert_eq!(dec.flush(), "");
    }

    #[test]
    fn carries_split_multibyte_char_across_chunks() {
        // "é" is 0xC3 0xA9
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(&[b'h', 0xC3]), "h");
        assert_eq!(dec.decode(&[0xA9, b'!']), "é!");
        assert_eq!(dec.flush(), "");
    }

    #[test]
    fn carries_split_four_byte_char() {
        let emoji = "🎉".as_bytes(); // 4 bytes
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(&emoji[..1]), "");
        assert_eq!(dec.decode(&emoji[1..3]), "");
        assert_eq!(dec.decode(&emoji[3..]), "🎉");
    }

    #[test]
    fn invalid_byte_becomes_replacement_char() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn flush_is_lossy_on_incomplete_tail() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.decode(&[b'x', 0xC3]), "x");
        assert_eq!(dec.flush(), "\u{FFFD}");
        assert_eq!(dec.flush(), "");
    }

    #[test]
    fn pops_lines_in_order_and_trims_cr() {
        let mut lines = LineBuffer::new();
        lines.extend("one\r\ntwo\nthr");
        assert_eq!(lines.next_line().as_deref(), Some("one"));
        assert_eq!(lines.next_line().as_deref(), Some("two"));
        assert_eq!(lines.next_line(), None);
        lines.extend("ee\n");
        assert_eq!(lines.next_line().as_deref(), Some("three"));
        assert!(lines.is_empty());
    }

    #[test]
    fn requeued_line_comes_back_first() {
        let mut lines = LineBuffer::new();
        lines.extend("later\n");
        lines.requeue("first".to_string());
        assert_eq!(lines.next_line().as_deref(), Some("first"));
        assert_eq!(lines.next_line().as_deref(), Some("later"));
    }

    #[test]
    fn drain_includes_unterminated_tail() {
        let mut lines = LineBuffer::new();
        lines.extend("a\nb\r\ntail-without-newline");
        assert_eq!(lines.next_line().as_deref(), Some("a"));
        let rest = lines.drain_remaining();
        assert_eq!(rest, vec!["b", "tail-without-newline"]);
        assert!(lines.is_empty());
    }

    #[test]
    fn drain_skips_blank_segments() {
        let mut lines = LineBuffer::new();
        lines.extend("\n\nx\n\n");
        assert_eq!(lines.drain_remaining(), vec!["x"]);
    }
}
