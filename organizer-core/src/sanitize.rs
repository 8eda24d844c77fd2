//! Strips the markdown fence a model likes to wrap JSON output in.

/// Removes at most one leading ```` ```json ```` (or bare ```` ``` ````)
/// marker and at most one trailing ```` ``` ```` marker, then trims
/// surrounding whitespace. Interior fences are left alone. Call this once,
/// only after the stream is fully drained; a partial fence prefix on
/// in-flight content must not be mistaken for a complete one.
pub fn strip_fences(content: &str) -> String {
    let mut out = content;
    if let Some(rest) = out.strip_prefix("```json") {
        out = rest;
    } else if let Some(rest) = out.strip_prefix("```") {
        out = rest;
    }
    if let Some(rest) = out.strip_suffix("```") {
        out = rest;
    }
    out.trim().to_string()
}
