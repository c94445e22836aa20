//! Plain text buffer with a caret and selection.
//!
//! Used for both the open file and the shell transcript. Offsets are byte
//! offsets into the UTF-8 text and are always kept on char boundaries.

use std::ops::Range;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    text: String,
    /// Selection anchor; equal to `caret` when nothing is selected
    anchor: usize,
    caret: usize,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding `text` with the caret at the start.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchor: 0,
            caret: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Ordered selection range; empty when nothing is selected.
    pub fn selection(&self) -> Range<usize> {
        self.anchor.min(self.caret)..self.anchor.max(self.caret)
    }

    pub fn has_selection(&self) -> bool {
        self.anchor != self.caret
    }

    pub fn set_caret(&mut self, offset: usize) {
        let offset = self.clamp(offset);
        self.anchor = offset;
        self.caret = offset;
    }

    pub fn set_selection(&mut self, anchor: usize, caret: usize) {
        self.anchor = self.clamp(anchor);
        self.caret = self.clamp(caret);
    }

    pub fn move_caret_to_end(&mut self) {
        self.set_caret(self.text.len());
    }

    /// Insert at the caret as typing does: the selection is replaced and the
    /// caret ends up after the inserted text.
    pub fn insert(&mut self, text: &str) {
        let range = self.selection();
        self.text.replace_range(range.clone(), text);
        self.set_caret(range.start + text.len());
    }

    /// Append at the end of the buffer.
    ///
    /// A caret parked at the end follows the appended text; a caret anywhere
    /// else stays where the user left it.
    pub fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let end = self.text.len();
        let follow = self.caret == end && self.anchor == end;
        self.text.push_str(text);
        if follow {
            self.move_caret_to_end();
        }
    }

    /// Replace the whole content, keeping the caret where it was if possible.
    pub fn replace_all(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.anchor = self.clamp(self.anchor);
        self.caret = self.clamp(self.caret);
    }

    /// The line ending right before the caret, if the caret sits immediately
    /// after a newline and nothing is selected.
    pub fn line_before_caret(&self) -> Option<&str> {
        if self.has_selection() || self.caret == 0 {
            return None;
        }
        let before = &self.text[..self.caret];
        let without_newline = before.strip_suffix('\n')?;
        let start = without_newline.rfind('\n').map(|i| i + 1).unwrap_or(0);
        Some(&without_newline[start..])
    }

    fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
