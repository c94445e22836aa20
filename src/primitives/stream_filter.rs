//! Cleanup of raw shell output before it is appended to the transcript.
//!
//! The transcript is a plain text buffer, not a terminal emulator, so escape
//! sequences are removed rather than interpreted. Two passes run in order:
//!
//! 1. ANSI/C1 escape and control sequences are deleted.
//! 2. Every "character followed by backspace" pair is deleted, which collapses
//!    the overstrike and progress-bar tricks some programs use.
//!
//! Chunks arrive at arbitrary byte boundaries. [`ChunkDecoder`] carries an
//! incomplete UTF-8 tail over to the next chunk so multi-byte characters are
//! never split. Escape sequences split across chunks are left as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// ESC or the single-byte CSI introducer, optional intermediate characters,
/// then either an OSC-style body terminated by BEL or a CSI-style numeric
/// body terminated by a final character.
static ANSI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[\x1b\x{9b}][\[\]()#;?]*",
        r"(?:(?:(?:[a-zA-Z\d]*(?:;[a-zA-Z\d]*)*)?\x07)",
        r"|(?:(?:\d{1,4}(?:;\d{0,4})*)?[\dA-PRZcf-ntqry=><~]))",
    ))
    .expect("ANSI pattern is valid")
});

static BACKSPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r".\x08").expect("backspace pattern is valid")
});

/// Filter a raw chunk of output bytes.
///
/// Invalid UTF-8 is replaced with U+FFFD. Use a [`ChunkDecoder`] when the
/// chunk is one of many read from the same stream.
pub fn filter(raw: &[u8]) -> String {
    filter_str(&String::from_utf8_lossy(raw))
}

/// Filter already-decoded text.
pub fn filter_str(text: &str) -> String {
    let without_escapes = strip_escapes(text);
    BACKSPACE_RE
        .replace_all(&without_escapes, "")
        .into_owned()
}

fn strip_escapes(text: &str) -> Cow<'_, str> {
    if !text.contains(['\x1b', '\u{9b}']) {
        return Cow::Borrowed(text);
    }
    ANSI_RE.replace_all(text, "")
}

/// Incremental UTF-8 decoder for one output stream.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, holding back an incomplete trailing sequence.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush whatever is still held back at end of stream.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    /// Decode and filter in one step.
    pub fn filter(&mut self, chunk: &[u8]) -> String {
        filter_str(&self.decode(chunk))
    }
}
