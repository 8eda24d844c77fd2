use unicode_normalization::UnicodeNormalization;

/// Cleans pasted free-form text before it is sent to the gateway:
/// Unicode NFC normalization + BOM strip + CRLF -> LF + trim.
pub fn clean_input(s: &str) -> String {
    let mut t = s.nfc().collect::<String>();
    if t.starts_with('\u{FEFF}') {
        t.remove(0);
    }
    if t.contains("\r\n") {
        t = t.replace("\r\n", "\n");
    }
    t.trim().to_string()
}
