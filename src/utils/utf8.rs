/// Incremental UTF-8 decoder for chunked bodies.
///
/// A chunk may end in the middle of a multi-byte sequence; those bytes are held
/// back until the next chunk completes them. Invalid bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let mut out = String::with_capacity(buf.len());
        let mut rest: &[u8] = &buf;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            // incomplete sequence at the end of the chunk
                            rest = tail;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// End-of-stream flush. A sequence left incomplete becomes one U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_multibyte_char_across_chunks() {
        let bytes = "你好".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();

        let first = decoder.decode(&bytes[..2]);
        assert_eq!(first, "");
        assert!(decoder.has_pending());

        let second = decoder.decode(&bytes[2..4]);
        assert_eq!(second, "你");

        let third = decoder.decode(&bytes[4..]);
        assert_eq!(third, "好");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_byte_by_byte_never_emits_replacement() {
        let text = "第一章：风起 🌪️ end";
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for b in text.as_bytes() {
            let piece = decoder.decode(std::slice::from_ref(b));
            assert!(!piece.contains(char::REPLACEMENT_CHARACTER));
            out.push_str(&piece);
        }
        out.push_str(&decoder.finish());
        assert_eq!(out, text);
    }

    #[test]
    fn test_invalid_byte_is_replaced_and_decoding_continues() {
        let mut decoder = Utf8StreamDecoder::new();
        let out = decoder.decode(&[b'a', 0xFF, b'b']);
        assert_eq!(out, "a\u{FFFD}b");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_truncated_tail_flushes_to_replacement() {
        let mut decoder = Utf8StreamDecoder::new();
        let bytes = "好".as_bytes();
        assert_eq!(decoder.decode(&bytes[..2]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(!decoder.has_pending());
    }
}
