//! Newline framing over an incrementally decoded byte stream.
//!
//! Transport chunks arrive at arbitrary byte boundaries, so a record may be
//! split anywhere, including inside a multi-byte UTF-8 sequence. The framer
//! carries the incomplete sequence and the unterminated line tail across
//! calls to [`LineFramer::feed`].

use bytes::BytesMut;

#[derive(Debug, Default)]
pub struct LineFramer {
    /// Bytes of a UTF-8 sequence cut off at the end of the last chunk.
    carry: BytesMut,
    /// Decoded text after the last newline seen.
    pending: String,
}

impl LineFramer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return every line it completed.
    ///
    /// Empty lines are returned as empty records; the decoder skips them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.carry.is_empty() {
            self.decode(chunk);
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(chunk);
            self.decode(&joined);
        }

        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };
        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);
        complete[..last_newline].split('\n').map(str::to_owned).collect()
    }

    /// End of stream: return the unterminated tail if it holds anything
    /// besides whitespace.
    pub fn flush(&mut self) -> Option<String> {
        if !self.carry.is_empty() {
            self.carry.clear();
            self.pending.push(char::REPLACEMENT_CHARACTER);
        }
        let tail = std::mem::take(&mut self.pending);
        (!tail.trim().is_empty()).then_some(tail)
    }

    /// Bytes and characters held back waiting for more input.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.carry.len() + self.pending.len()
    }

    fn decode(&mut self, mut bytes: &[u8]) {
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    self.pending.push_str(text);
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.pending.push_str(&String::from_utf8_lossy(&bytes[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.pending.push(char::REPLACEMENT_CHARACTER);
                            bytes = &bytes[valid + bad..];
                        }
                        None => {
                            // truncated sequence, wait for the next chunk
                            self.carry.extend_from_slice(&bytes[valid..]);
                            return;
                        }
                    }
                }
            }
        }
    }
}
